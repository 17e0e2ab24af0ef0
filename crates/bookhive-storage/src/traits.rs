//! Storage trait definitions.

use async_trait::async_trait;

use bookhive_domain::catalog::MyBooksScope;
use bookhive_domain::{
    Account, Book, BookStatus, Order, OrderStatus, PaymentMethod, Principal, Proposal,
    ProposalStatus, Review, Role,
};

use crate::error::{HealthStatus, StorageError, StorageResult};

/// Filter for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub role: Option<Role>,
    /// Exact display name, ignoring case.
    pub name: Option<String>,
}

/// Targeted field update for an account. `None` leaves a field untouched.
///
/// Password and collections are absent: collections are written with
/// [`DataStore::save_account_collections`].
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub logo_url: Option<String>,
    pub awards: Option<Vec<String>>,
}

impl AccountPatch {
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.bio.is_none()
            && self.logo_url.is_none()
            && self.awards.is_none()
    }
}

/// Filter for listing books. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub status: Option<BookStatus>,
    /// Exact category, ignoring case.
    pub category: Option<String>,
    /// Books whose author is a reference to this account.
    pub author_id: Option<String>,
    /// "My books" scoping shared with the ownership rules.
    pub scope: Option<MyBooksScope>,
}

/// Targeted field update for a book.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub cover_url: Option<String>,
    pub status: Option<BookStatus>,
}

impl BookPatch {
    pub fn status(status: BookStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }
}

/// Filter for listing orders. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user: Option<String>,
}

/// Targeted field update for an order (admin only).
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// Filter for listing proposals. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub author_id: Option<String>,
    /// Proposals owned by this publisher under the ownership rules.
    pub addressed_to: Option<Principal>,
}

/// Storage abstraction for the marketplace documents.
///
/// Reads return `Ok(None)` for absent documents. Every write touches only
/// the fields it names, so a read-modify-write of one field group never
/// restores stale values in another. Collection and review writes of a
/// missing document fail with the matching `*NotFound` error.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Inserts a new account. Fails with `DuplicateEmail` if the email is
    /// already registered.
    async fn create_account(&self, account: Account) -> StorageResult<Account>;

    async fn find_account(&self, id: &str) -> StorageResult<Option<Account>>;

    /// Looks up an account by normalized email.
    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<Account>>;

    async fn list_accounts(&self, filter: &AccountFilter) -> StorageResult<Vec<Account>>;

    /// Writes only `cart`, `wishlist`, `addresses` and `books` from
    /// `account`. Profile fields and role are left as stored.
    async fn save_account_collections(&self, account: &Account) -> StorageResult<()>;

    /// Sets only the fields present in `patch`.
    async fn update_account_fields(
        &self,
        id: &str,
        patch: &AccountPatch,
    ) -> StorageResult<Option<Account>>;

    async fn delete_account(&self, id: &str) -> StorageResult<Option<Account>>;

    // ------------------------------------------------------------------
    // Books
    // ------------------------------------------------------------------

    async fn create_book(&self, book: Book) -> StorageResult<Book>;

    async fn find_book(&self, id: &str) -> StorageResult<Option<Book>>;

    /// Fetches the books that still exist among `ids`, in `ids` order.
    async fn find_books(&self, ids: &[String]) -> StorageResult<Vec<Book>>;

    async fn list_books(&self, filter: &BookFilter) -> StorageResult<Vec<Book>>;

    /// Replaces only the embedded reviews of a book.
    async fn save_reviews(&self, book_id: &str, reviews: &[Review]) -> StorageResult<()>;

    async fn update_book_fields(&self, id: &str, patch: &BookPatch)
        -> StorageResult<Option<Book>>;

    async fn delete_book(&self, id: &str) -> StorageResult<Option<Book>>;

    /// Removes a book id from every cart, wishlist and back-reference list.
    /// Returns the number of accounts changed.
    async fn remove_book_references(&self, book_id: &str) -> StorageResult<usize>;

    /// Refreshes the publisher display name cached on books and proposals
    /// that reference `publisher_id`. Returns the number of documents changed.
    async fn rename_publisher(&self, publisher_id: &str, name: &str) -> StorageResult<usize>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Inserts an order and clears the placing account's cart as one
    /// operation: either both happen or neither does.
    async fn place_order(&self, order: Order) -> StorageResult<Order>;

    async fn find_order(&self, id: &str) -> StorageResult<Option<Order>>;

    async fn list_orders(&self, filter: &OrderFilter) -> StorageResult<Vec<Order>>;

    async fn update_order_fields(
        &self,
        id: &str,
        patch: &OrderPatch,
    ) -> StorageResult<Option<Order>>;

    async fn delete_order(&self, id: &str) -> StorageResult<Option<Order>>;

    // ------------------------------------------------------------------
    // Proposals
    // ------------------------------------------------------------------

    async fn create_proposal(&self, proposal: Proposal) -> StorageResult<Proposal>;

    async fn find_proposal(&self, id: &str) -> StorageResult<Option<Proposal>>;

    async fn list_proposals(&self, filter: &ProposalFilter) -> StorageResult<Vec<Proposal>>;

    /// Sets only a proposal's status.
    async fn set_proposal_status(
        &self,
        id: &str,
        status: ProposalStatus,
    ) -> StorageResult<Option<Proposal>>;

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Probes the backend.
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}

/// Rejects empty document ids before they reach a backend.
pub fn validate_id(id: &str) -> StorageResult<()> {
    if id.trim().is_empty() {
        return Err(StorageError::InvalidInput {
            message: "id cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Rejects negative or non-finite prices.
pub fn validate_price(price: f64) -> StorageResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(StorageError::InvalidInput {
            message: format!("price must be a non-negative number, got {price}"),
        });
    }
    Ok(())
}
