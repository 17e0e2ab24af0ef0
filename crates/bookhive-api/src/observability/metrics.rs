//! Prometheus metrics infrastructure.
//!
//! # Metrics Exposed
//!
//! - `bookhive_http_requests_total` - HTTP requests by method, route, status class
//! - `bookhive_http_request_duration_seconds` - request duration histogram
//! - `bookhive_http_requests_in_flight` - requests currently being served
//! - `bookhive_auth_rejections_total` - gate rejections by reason
//! - `bookhive_login_failures_total` - failed logins by route
//! - `bookhive_signups_total` - new accounts by role
//! - `bookhive_orders_placed_total` - orders placed
//! - `bookhive_order_amount` - order totals histogram

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use bookhive_domain::Role;

/// Shared state holding the Prometheus handle.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Renders current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    describe_metrics();

    Ok(MetricsState::new(handle))
}

fn describe_metrics() {
    metrics::describe_counter!("bookhive_http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "bookhive_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    metrics::describe_gauge!(
        "bookhive_http_requests_in_flight",
        "HTTP requests currently being served"
    );
    metrics::describe_counter!(
        "bookhive_auth_rejections_total",
        "Requests rejected by the authorization gate, by reason"
    );
    metrics::describe_counter!(
        "bookhive_login_failures_total",
        "Failed login attempts by route"
    );
    metrics::describe_counter!("bookhive_signups_total", "Accounts created by role");
    metrics::describe_counter!("bookhive_orders_placed_total", "Orders placed");
    metrics::describe_histogram!("bookhive_order_amount", "Order total amount");
}

/// Prometheus exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for `GET /metrics`.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

/// `reason` is `unauthenticated` or `forbidden`.
pub fn record_auth_rejection(reason: &'static str) {
    metrics::counter!("bookhive_auth_rejections_total", "reason" => reason).increment(1);
}

pub fn record_login_failure(route: &'static str) {
    metrics::counter!("bookhive_login_failures_total", "route" => route).increment(1);
}

pub fn record_signup(role: Role) {
    metrics::counter!("bookhive_signups_total", "role" => role.as_str()).increment(1);
}

pub fn record_order_placed(total_amount: f64) {
    metrics::counter!("bookhive_orders_placed_total").increment(1);
    metrics::histogram!("bookhive_order_amount").record(total_amount);
}
