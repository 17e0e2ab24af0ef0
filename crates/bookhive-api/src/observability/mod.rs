//! Observability infrastructure for bookhive.
//!
//! This module provides:
//! - Structured logging configuration
//! - Prometheus metrics endpoint and business counters

mod logging;
mod metrics;

pub use logging::{create_json_layer, init_logging, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_auth_rejection, record_login_failure,
    record_order_placed, record_signup, MetricsError, MetricsState,
};
