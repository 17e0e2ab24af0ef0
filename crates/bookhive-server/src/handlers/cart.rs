//! Self-service cart, wishlist and address mutations.
//!
//! Every mutation loads the account, changes it in memory and saves the
//! whole document while holding the account's lock, so concurrent
//! requests for one account apply one after another.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use bookhive_domain::{Account, Address, DomainError, Principal};
use bookhive_storage::DataStore;

use super::views::{render_books, BookView};
use super::{AccountLocks, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub book_id: Option<String>,
    pub quantity: Option<u32>,
}

/// A cart entry with its book rendered.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub book: BookView,
    pub quantity: u32,
}

pub struct CartHandler<S> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
}

impl<S: DataStore> CartHandler<S> {
    pub fn new(store: Arc<S>, locks: Arc<AccountLocks>) -> Self {
        Self { store, locks }
    }

    async fn load(&self, id: &str) -> ServiceResult<Account> {
        Ok(self
            .store
            .find_account(id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", id))?)
    }

    async fn ensure_book(&self, book_id: &str) -> ServiceResult<()> {
        if self.store.find_book(book_id).await?.is_none() {
            return Err(DomainError::not_found("book", book_id).into());
        }
        Ok(())
    }

    /// Runs `mutate` on the caller's account under its lock and saves the
    /// result.
    async fn mutate<T>(
        &self,
        principal: &Principal,
        mutate: impl FnOnce(&mut Account) -> Result<T, DomainError>,
    ) -> ServiceResult<(Account, T)> {
        let _guard = self.locks.lock(&principal.id).await;
        let mut account = self.load(&principal.id).await?;
        let out = mutate(&mut account)?;
        account.touch();
        self.store.save_account_collections(&account).await?;
        Ok((account, out))
    }

    // ========================================================================
    // Cart
    // ========================================================================

    /// The caller's cart, with lines for deleted books dropped and the
    /// cleanup saved.
    #[instrument(skip_all, fields(account_id = %principal.id))]
    pub async fn cart(&self, principal: &Principal) -> ServiceResult<Vec<CartLine>> {
        let _guard = self.locks.lock(&principal.id).await;
        let mut account = self.load(&principal.id).await?;

        let ids: Vec<String> = account.cart.iter().map(|line| line.book.clone()).collect();
        let books = self.store.find_books(&ids).await?;
        let existing: HashSet<&str> = books.iter().map(|b| b.id.as_str()).collect();
        let dropped = account.prune_cart(|id| existing.contains(id));
        if dropped > 0 {
            account.touch();
            self.store.save_account_collections(&account).await?;
            debug!(account_id = %account.id, dropped, "pruned cart lines for deleted books");
        }

        let views = render_books(self.store.as_ref(), books).await?;
        Ok(views
            .into_iter()
            .zip(account.cart.iter())
            .map(|(book, line)| CartLine {
                book,
                quantity: line.quantity,
            })
            .collect())
    }

    /// Adds a book or increments its quantity. Returns the line's new
    /// quantity.
    #[instrument(skip_all, fields(account_id = %principal.id))]
    pub async fn add_to_cart(&self, principal: &Principal, request: AddToCart) -> ServiceResult<u32> {
        let book_id = super::required(request.book_id.as_deref(), "bookId")?;
        self.ensure_book(&book_id).await?;
        let (_, quantity) = self
            .mutate(principal, |account| {
                account.add_to_cart(&book_id, request.quantity)
            })
            .await?;
        Ok(quantity)
    }

    pub async fn set_quantity(
        &self,
        principal: &Principal,
        book_id: &str,
        quantity: u32,
    ) -> ServiceResult<Account> {
        let (account, ()) = self
            .mutate(principal, |account| account.set_cart_quantity(book_id, quantity))
            .await?;
        Ok(account)
    }

    /// Removing a book that is not in the cart succeeds.
    pub async fn remove_from_cart(&self, principal: &Principal, book_id: &str) -> ServiceResult<Account> {
        let (account, _) = self
            .mutate(principal, |account| Ok(account.remove_from_cart(book_id)))
            .await?;
        Ok(account)
    }

    // ========================================================================
    // Wishlist
    // ========================================================================

    pub async fn wishlist(&self, principal: &Principal) -> ServiceResult<Vec<BookView>> {
        let _guard = self.locks.lock(&principal.id).await;
        let mut account = self.load(&principal.id).await?;

        let books = self.store.find_books(&account.wishlist).await?;
        let existing: HashSet<&str> = books.iter().map(|b| b.id.as_str()).collect();
        if account.prune_wishlist(|id| existing.contains(id)) > 0 {
            account.touch();
            self.store.save_account_collections(&account).await?;
        }
        render_books(self.store.as_ref(), books).await
    }

    /// Adding a book already on the wishlist is a no-op.
    pub async fn add_to_wishlist(&self, principal: &Principal, book_id: &str) -> ServiceResult<Account> {
        self.ensure_book(book_id).await?;
        let (account, _) = self
            .mutate(principal, |account| Ok(account.add_to_wishlist(book_id)))
            .await?;
        Ok(account)
    }

    pub async fn remove_from_wishlist(&self, principal: &Principal, book_id: &str) -> ServiceResult<Account> {
        let (account, _) = self
            .mutate(principal, |account| Ok(account.remove_from_wishlist(book_id)))
            .await?;
        Ok(account)
    }

    // ========================================================================
    // Addresses
    // ========================================================================

    pub async fn addresses(&self, principal: &Principal) -> ServiceResult<Vec<Address>> {
        Ok(self.load(&principal.id).await?.addresses)
    }

    pub async fn add_address(&self, principal: &Principal, text: &str) -> ServiceResult<Vec<Address>> {
        let (account, _) = self
            .mutate(principal, |account| account.add_address(text).map(|_| ()))
            .await?;
        Ok(account.addresses)
    }

    pub async fn edit_address(
        &self,
        principal: &Principal,
        address_id: &str,
        text: &str,
    ) -> ServiceResult<Vec<Address>> {
        let (account, ()) = self
            .mutate(principal, |account| account.edit_address(address_id, text))
            .await?;
        Ok(account.addresses)
    }

    pub async fn delete_address(&self, principal: &Principal, address_id: &str) -> ServiceResult<Vec<Address>> {
        let (account, removed) = self
            .mutate(principal, |account| Ok(account.delete_address(address_id)))
            .await?;
        if !removed {
            return Err(DomainError::not_found("address", address_id).into());
        }
        Ok(account.addresses)
    }

    pub async fn set_default_address(
        &self,
        principal: &Principal,
        address_id: &str,
    ) -> ServiceResult<Vec<Address>> {
        let (account, ()) = self
            .mutate(principal, |account| account.set_default_address(address_id))
            .await?;
        Ok(account.addresses)
    }
}
