//! Marketplace documents and their wire shapes.
//!
//! Field names and enum spellings are part of the JSON contract and must
//! stay stable: roles `user|author|publisher|admin`, book status
//! `pending|approved|rejected`, order status `Pending|Shipped|Delivered`,
//! payment method `cash on delivery|upi|rupay`.

mod account;
mod book;
mod order;
mod principal;
mod proposal;
mod role;

pub use account::{normalize_email, Account, Address, CartItem};
pub use book::{Book, BookStatus, Review};
pub use order::{Order, OrderItem, OrderStatus, PaymentMethod};
pub use principal::Principal;
pub use proposal::{Proposal, ProposalStatus};
pub use role::Role;

/// Generates a new document identifier.
///
/// Identifiers are ULID strings, which keeps them sortable by creation time
/// and distinguishable from free-text owner names.
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Returns true if `value` has the shape of a document identifier.
pub fn is_document_id(value: &str) -> bool {
    ulid::Ulid::from_string(value).is_ok()
}
