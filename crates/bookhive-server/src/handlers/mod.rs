//! Service handlers: the operations behind each route.
//!
//! Every handler owns an `Arc` of the store and, where it rewrites whole
//! documents, the shared [`AccountLocks`]. Handlers take an already
//! authenticated [`Principal`](bookhive_domain::Principal); role gating
//! happens before they are called.

mod accounts;
mod cart;
mod catalog;
mod locks;
mod orders;
mod proposals;
mod publisher;
mod views;

pub use accounts::{AccountHandler, AccountUpdate, AuthSession, Credentials, SignupRequest};
pub use cart::{AddToCart, CartHandler, CartLine};
pub use catalog::{BookUpdate, CatalogHandler, NewBook};
pub use locks::{AccountLockGuard, AccountLocks};
pub use orders::{OrderHandler, OrderLine, OrderUpdate, PlaceOrder};
pub use proposals::{NewProposal, ProposalHandler};
pub use publisher::{Awards, Insights, ProfileUpdate, PublisherHandler};
pub use views::{AccountSummary, BookView};

use thiserror::Error;

use bookhive_domain::DomainError;
use bookhive_storage::StorageError;

use crate::auth::{PasswordError, TokenError};

/// Errors surfaced by service handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Result type for service handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trims a required text field, failing with the field's name.
pub(crate) fn required(value: Option<&str>, field: &str) -> Result<String, DomainError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DomainError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests;
