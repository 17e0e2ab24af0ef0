//! bookhive-api: HTTP API layer
//!
//! This crate provides the API layer including:
//! - HTTP REST endpoints via Axum
//! - The authorization gate as request extractors
//! - Middleware (request ids, logging, metrics, tracing, CORS)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                bookhive-api                  │
//! ├─────────────────────────────────────────────┤
//! │  http/          - Routes, state, extractors │
//! │  errors.rs      - Error classification      │
//! │  middleware/    - Request-scoped layers     │
//! │  observability/ - Logging and Prometheus    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod errors;
pub mod http;
pub mod middleware;
pub mod observability;
