//! bookhive-server: authentication and business logic
//!
//! This crate sits between the HTTP layer and storage:
//! - Authorization gate (bearer tokens, role checks)
//! - Service handlers for accounts, carts, catalog, orders and proposals
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              bookhive-server                 │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  auth/       - Passwords, tokens, gate      │
//! │  handlers/   - Service handlers             │
//! │    accounts.rs  - Identity, admin accounts  │
//! │    cart.rs      - Cart, wishlist, addresses │
//! │    catalog.rs   - Books and reviews         │
//! │    orders.rs    - Checkout and analytics    │
//! │    proposals.rs - Author proposals          │
//! │    publisher.rs - Publisher dashboard       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod handlers;

// Re-exports for convenience
pub use auth::{Authenticator, PasswordHasher, TokenIssuer};
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::{ServiceError, ServiceResult};
