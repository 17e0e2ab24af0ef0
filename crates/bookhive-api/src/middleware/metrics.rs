//! HTTP metrics middleware.
//!
//! # Metrics Emitted
//!
//! - `bookhive_http_requests_total` - counter labelled method, route, status_class
//! - `bookhive_http_request_duration_seconds` - histogram with the same labels
//! - `bookhive_http_requests_in_flight` - gauge
//!
//! Routes are labelled by their matched template (`/api/books/:id`), never
//! the raw path, to keep label cardinality bounded.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use tower::{Layer, Service};

/// Label used when no route matched.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Point-in-time copy of the in-process counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub success: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    /// 401 and 403 responses, a subset of `client_errors`.
    pub auth_rejections: u64,
    pub total_duration_us: u64,
}

impl MetricsSnapshot {
    pub fn avg_duration_us(&self) -> u64 {
        if self.requests == 0 {
            0
        } else {
            self.total_duration_us / self.requests
        }
    }
}

/// Request counters kept in-process alongside the `metrics` facade.
///
/// The atomics let tests read counts back without a Prometheus recorder.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
    success: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    auth_rejections: AtomicU64,
    total_duration_us: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished request.
    pub fn record(&self, method: &str, route: &str, status: u16, duration_us: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_us.fetch_add(duration_us, Ordering::Relaxed);

        let status_class = match status {
            200..=399 => {
                self.success.fetch_add(1, Ordering::Relaxed);
                if status < 300 {
                    "2xx"
                } else {
                    "3xx"
                }
            }
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
                if status == 401 || status == 403 {
                    self.auth_rejections.fetch_add(1, Ordering::Relaxed);
                }
                "4xx"
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
                "5xx"
            }
            _ => "other",
        };

        let labels = [
            ("method", method.to_string()),
            ("route", route.to_string()),
            ("status_class", status_class.to_string()),
        ];
        metrics::counter!("bookhive_http_requests_total", &labels).increment(1);
        metrics::histogram!("bookhive_http_request_duration_seconds", &labels)
            .record(duration_us as f64 / 1_000_000.0);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
            total_duration_us: self.total_duration_us.load(Ordering::Relaxed),
        }
    }
}

/// Layer that records request metrics.
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<RequestMetrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<RequestMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> Arc<RequestMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<RequestMetrics>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let start = Instant::now();
        let method = request.method().to_string();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();

        metrics::gauge!("bookhive_http_requests_in_flight").increment(1.0);
        Box::pin(async move {
            let result = inner.call(request).await;
            metrics::gauge!("bookhive_http_requests_in_flight").decrement(1.0);

            let response = result?;
            let duration_us = start.elapsed().as_micros() as u64;
            metrics.record(&method, &route, response.status().as_u16(), duration_us);
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zeroed() {
        let metrics = RequestMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
        assert_eq!(metrics.snapshot().avg_duration_us(), 0);
    }

    #[test]
    fn test_status_classes_are_counted() {
        let metrics = RequestMetrics::new();
        metrics.record("GET", "/api/books", 200, 100);
        metrics.record("POST", "/api/books", 201, 200);
        metrics.record("GET", "/api/books/:id", 404, 50);
        metrics.record("DELETE", "/api/books/:id", 500, 150);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 4);
        assert_eq!(snap.success, 2);
        assert_eq!(snap.client_errors, 1);
        assert_eq!(snap.server_errors, 1);
        assert_eq!(snap.auth_rejections, 0);
        assert_eq!(snap.total_duration_us, 500);
        assert_eq!(snap.avg_duration_us(), 125);
    }

    // Test: 401 and 403 are tracked separately from other client errors
    #[test]
    fn test_auth_rejections_are_counted() {
        let metrics = RequestMetrics::new();
        metrics.record("GET", "/api/orders/admin/all", 401, 10);
        metrics.record("GET", "/api/orders/admin/all", 403, 10);
        metrics.record("POST", "/api/cart", 400, 10);

        let snap = metrics.snapshot();
        assert_eq!(snap.client_errors, 3);
        assert_eq!(snap.auth_rejections, 2);
    }

    #[test]
    fn test_recording_without_recorder_does_not_panic() {
        let metrics = RequestMetrics::new();
        metrics.record("GET", UNMATCHED_ROUTE, 404, 1);
        assert_eq!(metrics.snapshot().requests, 1);
    }
}
