//! API middleware.
//!
//! Includes:
//! - Request id generation and propagation
//! - Request logging
//! - Metrics collection
//! - Per-request tracing spans
//! - CORS configuration

mod logging;
mod metrics;
mod request_id;
mod tracing_layer;

pub use logging::RequestLoggingLayer;
pub use metrics::{MetricsLayer, MetricsSnapshot, RequestMetrics};
pub use request_id::{RequestIdLayer, MAX_REQUEST_ID_LEN, REQUEST_ID_HEADER};
pub use tracing_layer::TracingLayer;

use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS: any origin, method and header.
///
/// The storefront is served from a separate origin.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

#[cfg(test)]
mod tests;
