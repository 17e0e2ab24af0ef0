//! bookhive-domain: Core marketplace domain logic
//!
//! This crate contains the rules that do not depend on storage or transport:
//! - Account, book, order and proposal models with their wire shapes
//! - Ownership resolution across the historical owner encodings
//! - Cart, wishlist and address collection maintenance
//! - Catalog rollups (ratings, "my books" scoping, sales analytics)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               bookhive-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/       - Documents, roles, enums     │
//! │  ownership/   - OwnerRef & mutation policy  │
//! │  collections/ - Cart, wishlist, addresses   │
//! │  catalog/     - Ratings, scopes, analytics  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod collections;
pub mod error;
pub mod model;
pub mod ownership;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use model::{
    Account, Address, Book, BookStatus, CartItem, Order, OrderItem, OrderStatus, PaymentMethod,
    Principal, Proposal, ProposalStatus, Review, Role,
};
pub use ownership::{can_mutate, ensure_can_mutate, is_owned_by, Access, OwnedResource, OwnerRef};
