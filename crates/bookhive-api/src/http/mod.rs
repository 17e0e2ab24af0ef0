//! HTTP REST API endpoints.
//!
//! # Endpoints
//!
//! | Prefix | Gate | Description |
//! |--------|------|-------------|
//! | `/api/auth` | public, admin for user admin | Signup, login, session probe, role changes |
//! | `/api/authors-auth` | public | Author registration and login |
//! | `/api/authors` | author | Author profile and own books |
//! | `/api/books` | public reads, contributor writes | Catalog, moderation, reviews |
//! | `/api/cart` | authenticated | Cart lines and quantities |
//! | `/api/orders` | authenticated, admin for `admin/*` | Checkout, history, analytics |
//! | `/api/proposals` | author submits, publisher or admin decides | Book proposals |
//! | `/api/publisher` | publisher | Profile, books, proposals, insights |
//! | `/api/users` | authenticated, admin for account admin | Addresses, wishlist, accounts |
//! | `/api/health`, `/ready` | public | Liveness and readiness |
//!
//! Every error body has the shape `{"code": "...", "message": "..."}`.

pub mod extract;
pub mod routes;
pub mod state;

pub use extract::{
    AdminOnly, Authenticated, Authorized, AuthorOnly, Contributors, PublisherOnly,
    PublisherOrAdmin, RoleSet,
};
pub use routes::{
    create_router, create_router_with_body_limit, create_router_with_observability,
    create_router_with_observability_and_limit, error_codes, ApiError, DEFAULT_BODY_LIMIT,
};
pub use state::AppState;
