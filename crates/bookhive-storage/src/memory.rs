//! In-memory storage implementation for development and testing.
//!
//! Each collection is a `DashMap` keyed by document id. Emails are kept in a
//! separate unique index so registration is an atomic check-and-insert.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use bookhive_domain::model::normalize_email;
use bookhive_domain::ownership::names_match;
use bookhive_domain::{Account, Book, OwnedResource, Order, Proposal, ProposalStatus, Review};

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::traits::{
    validate_id, validate_price, AccountFilter, AccountPatch, BookFilter, BookPatch, DataStore,
    OrderFilter, OrderPatch, ProposalFilter,
};

/// In-memory implementation of DataStore.
///
/// Lock order when two maps are involved: `emails` before `accounts`, and
/// `accounts` before `orders`.
#[derive(Debug, Default)]
pub struct MemoryDataStore {
    accounts: DashMap<String, Account>,
    /// Normalized email -> account id.
    emails: DashMap<String, String>,
    books: DashMap<String, Book>,
    orders: DashMap<String, Order>,
    proposals: DashMap<String, Proposal>,
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Points `new_email` at `id` and releases `old_email`.
    fn reindex_email(&self, id: &str, old_email: &str, new_email: &str) -> StorageResult<()> {
        if old_email == new_email {
            return Ok(());
        }
        match self.emails.entry(new_email.to_string()) {
            Entry::Occupied(owner) => {
                if owner.get() != id {
                    return Err(StorageError::DuplicateEmail {
                        email: new_email.to_string(),
                    });
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(id.to_string());
            }
        }
        self.emails.remove(old_email);
        Ok(())
    }
}

/// Newest first, ties broken by id so the order is stable.
macro_rules! sort_newest_first {
    ($docs:expr) => {
        $docs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        })
    };
}

#[async_trait]
impl DataStore for MemoryDataStore {
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn create_account(&self, mut account: Account) -> StorageResult<Account> {
        validate_id(&account.id)?;
        account.email = normalize_email(&account.email);
        if account.email.is_empty() {
            return Err(StorageError::InvalidInput {
                message: "email cannot be empty".to_string(),
            });
        }

        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateEmail {
                email: account.email,
            }),
            Entry::Vacant(email_slot) => match self.accounts.entry(account.id.clone()) {
                Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                    collection: "account",
                    id: account.id,
                }),
                Entry::Vacant(doc_slot) => {
                    email_slot.insert(account.id.clone());
                    doc_slot.insert(account.clone());
                    Ok(account)
                }
            },
        }
    }

    async fn find_account(&self, id: &str) -> StorageResult<Option<Account>> {
        Ok(self.accounts.get(id).map(|doc| doc.clone()))
    }

    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<Account>> {
        let id = match self.emails.get(&normalize_email(email)) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        Ok(self.accounts.get(&id).map(|doc| doc.clone()))
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> StorageResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|doc| filter.role.map_or(true, |role| doc.role == role))
            .filter(|doc| {
                filter
                    .name
                    .as_deref()
                    .map_or(true, |name| names_match(&doc.name, name))
            })
            .map(|doc| doc.clone())
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(accounts)
    }

    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn save_account_collections(&self, account: &Account) -> StorageResult<()> {
        let Some(mut doc) = self.accounts.get_mut(&account.id) else {
            return Err(StorageError::AccountNotFound {
                id: account.id.clone(),
            });
        };
        doc.cart = account.cart.clone();
        doc.wishlist = account.wishlist.clone();
        doc.addresses = account.addresses.clone();
        doc.books = account.books.clone();
        doc.touch();
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update_account_fields(
        &self,
        id: &str,
        patch: &AccountPatch,
    ) -> StorageResult<Option<Account>> {
        let stored_email = match self.accounts.get(id) {
            Some(doc) => doc.email.clone(),
            None => return Ok(None),
        };
        if let Some(email) = &patch.email {
            let email = normalize_email(email);
            if email.is_empty() {
                return Err(StorageError::InvalidInput {
                    message: "email cannot be empty".to_string(),
                });
            }
            self.reindex_email(id, &stored_email, &email)?;
        }

        let Some(mut doc) = self.accounts.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            doc.name = name.clone();
        }
        if let Some(email) = &patch.email {
            doc.email = normalize_email(email);
        }
        if let Some(role) = patch.role {
            doc.role = role;
        }
        if let Some(bio) = &patch.bio {
            doc.bio = Some(bio.clone());
        }
        if let Some(logo_url) = &patch.logo_url {
            doc.logo_url = Some(logo_url.clone());
        }
        if let Some(awards) = &patch.awards {
            doc.awards = awards.clone();
        }
        doc.touch();
        Ok(Some(doc.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_account(&self, id: &str) -> StorageResult<Option<Account>> {
        let removed = self.accounts.remove(id).map(|(_, doc)| doc);
        if let Some(account) = &removed {
            self.emails.remove(&account.email);
        }
        Ok(removed)
    }

    #[instrument(skip(self, book), fields(book_id = %book.id))]
    async fn create_book(&self, book: Book) -> StorageResult<Book> {
        validate_id(&book.id)?;
        validate_price(book.price)?;
        match self.books.entry(book.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                collection: "book",
                id: book.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(book.clone());
                Ok(book)
            }
        }
    }

    async fn find_book(&self, id: &str) -> StorageResult<Option<Book>> {
        Ok(self.books.get(id).map(|doc| doc.clone()))
    }

    async fn find_books(&self, ids: &[String]) -> StorageResult<Vec<Book>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.books.get(id).map(|doc| doc.clone()))
            .collect())
    }

    async fn list_books(&self, filter: &BookFilter) -> StorageResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .books
            .iter()
            .filter(|doc| filter.status.map_or(true, |status| doc.status == status))
            .filter(|doc| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |category| doc.category.eq_ignore_ascii_case(category.trim()))
            })
            .filter(|doc| {
                filter
                    .author_id
                    .as_deref()
                    .map_or(true, |author| doc.author.account_id() == Some(author))
            })
            .filter(|doc| filter.scope.as_ref().map_or(true, |scope| scope.includes(doc)))
            .map(|doc| doc.clone())
            .collect();
        sort_newest_first!(books);
        Ok(books)
    }

    #[instrument(skip(self, reviews), fields(reviews = reviews.len()))]
    async fn save_reviews(&self, book_id: &str, reviews: &[Review]) -> StorageResult<()> {
        let Some(mut doc) = self.books.get_mut(book_id) else {
            return Err(StorageError::BookNotFound {
                id: book_id.to_string(),
            });
        };
        doc.reviews = reviews.to_vec();
        doc.touch();
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update_book_fields(
        &self,
        id: &str,
        patch: &BookPatch,
    ) -> StorageResult<Option<Book>> {
        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        let Some(mut doc) = self.books.get_mut(id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            doc.title = title.clone();
        }
        if let Some(description) = &patch.description {
            doc.description = description.clone();
        }
        if let Some(price) = patch.price {
            doc.price = price;
        }
        if let Some(category) = &patch.category {
            doc.category = category.clone();
        }
        if let Some(cover_url) = &patch.cover_url {
            doc.cover_url = cover_url.clone();
        }
        if let Some(status) = patch.status {
            doc.status = status;
        }
        doc.touch();
        Ok(Some(doc.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_book(&self, id: &str) -> StorageResult<Option<Book>> {
        Ok(self.books.remove(id).map(|(_, doc)| doc))
    }

    #[instrument(skip(self))]
    async fn remove_book_references(&self, book_id: &str) -> StorageResult<usize> {
        let mut changed = 0;
        for mut account in self.accounts.iter_mut() {
            let before = (account.cart.len(), account.wishlist.len(), account.books.len());
            account.cart.retain(|item| item.book != book_id);
            account.wishlist.retain(|id| id != book_id);
            account.books.retain(|id| id != book_id);
            if before != (account.cart.len(), account.wishlist.len(), account.books.len()) {
                account.touch();
                changed += 1;
            }
        }
        debug!(book_id, accounts = changed, "removed dangling book references");
        Ok(changed)
    }

    #[instrument(skip(self))]
    async fn rename_publisher(&self, publisher_id: &str, name: &str) -> StorageResult<usize> {
        let mut changed = 0;
        for mut book in self.books.iter_mut() {
            if book.publisher.as_deref() == Some(publisher_id)
                && book.publisher_name.as_deref() != Some(name)
            {
                book.publisher_name = Some(name.to_string());
                changed += 1;
            }
        }
        for mut proposal in self.proposals.iter_mut() {
            if proposal.publisher_id.as_deref() == Some(publisher_id)
                && proposal.publisher_name != name
            {
                proposal.publisher_name = name.to_string();
                changed += 1;
            }
        }
        Ok(changed)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, user = %order.user))]
    async fn place_order(&self, order: Order) -> StorageResult<Order> {
        validate_id(&order.id)?;
        // Holding the account's shard keeps the insert and the cart clear
        // indivisible for other writers of this account.
        let mut account =
            self.accounts
                .get_mut(&order.user)
                .ok_or_else(|| StorageError::AccountNotFound {
                    id: order.user.clone(),
                })?;
        match self.orders.entry(order.id.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::AlreadyExists {
                    collection: "order",
                    id: order.id,
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
            }
        }
        account.clear_cart();
        Ok(order)
    }

    async fn find_order(&self, id: &str) -> StorageResult<Option<Order>> {
        Ok(self.orders.get(id).map(|doc| doc.clone()))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StorageResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|doc| filter.user.as_deref().map_or(true, |user| doc.user == user))
            .map(|doc| doc.clone())
            .collect();
        sort_newest_first!(orders);
        Ok(orders)
    }

    #[instrument(skip(self, patch))]
    async fn update_order_fields(
        &self,
        id: &str,
        patch: &OrderPatch,
    ) -> StorageResult<Option<Order>> {
        let Some(mut doc) = self.orders.get_mut(id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            doc.status = status;
        }
        if let Some(address) = &patch.address {
            doc.address = address.clone();
        }
        if let Some(contact_number) = &patch.contact_number {
            doc.contact_number = contact_number.clone();
        }
        if let Some(payment_method) = patch.payment_method {
            doc.payment_method = payment_method;
        }
        doc.updated_at = chrono::Utc::now();
        Ok(Some(doc.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_order(&self, id: &str) -> StorageResult<Option<Order>> {
        Ok(self.orders.remove(id).map(|(_, doc)| doc))
    }

    #[instrument(skip(self, proposal), fields(proposal_id = %proposal.id))]
    async fn create_proposal(&self, proposal: Proposal) -> StorageResult<Proposal> {
        validate_id(&proposal.id)?;
        match self.proposals.entry(proposal.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                collection: "proposal",
                id: proposal.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(proposal.clone());
                Ok(proposal)
            }
        }
    }

    async fn find_proposal(&self, id: &str) -> StorageResult<Option<Proposal>> {
        Ok(self.proposals.get(id).map(|doc| doc.clone()))
    }

    async fn list_proposals(&self, filter: &ProposalFilter) -> StorageResult<Vec<Proposal>> {
        let mut proposals: Vec<Proposal> = self
            .proposals
            .iter()
            .filter(|doc| {
                filter
                    .author_id
                    .as_deref()
                    .map_or(true, |author| doc.author_id == author)
            })
            .filter(|doc| {
                filter
                    .addressed_to
                    .as_ref()
                    .map_or(true, |publisher| doc.owner_match(publisher).is_some())
            })
            .map(|doc| doc.clone())
            .collect();
        sort_newest_first!(proposals);
        Ok(proposals)
    }

    #[instrument(skip(self))]
    async fn set_proposal_status(
        &self,
        id: &str,
        status: ProposalStatus,
    ) -> StorageResult<Option<Proposal>> {
        let Some(mut doc) = self.proposals.get_mut(id) else {
            return Ok(None);
        };
        doc.status = status;
        doc.updated_at = chrono::Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        // No external dependencies
        Ok(HealthStatus {
            healthy: true,
            latency: Duration::ZERO,
            message: Some("in-memory storage".to_string()),
        })
    }
}
