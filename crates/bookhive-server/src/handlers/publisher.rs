//! Publisher dashboard: profile, own catalog and sales insights.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bookhive_domain::catalog::{sales_by_book, BookSales, MyBooksScope};
use bookhive_domain::{Account, Book, DomainError, Principal};
use bookhive_storage::{AccountPatch, BookFilter, BookPatch, DataStore, OrderFilter};

use super::catalog::{check_price, remove_book};
use super::views::{render_book, render_books, BookView};
use super::{AccountLocks, ServiceResult};

/// Awards as either a JSON array or one comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Awards {
    List(Vec<String>),
    Text(String),
}

impl Awards {
    pub fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Awards::List(list) => list,
            Awards::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub logo_url: Option<String>,
    pub awards: Option<Awards>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub publisher_name: String,
    pub sales_by_book: Vec<BookSales>,
}

pub struct PublisherHandler<S> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
}

impl<S: DataStore> PublisherHandler<S> {
    pub fn new(store: Arc<S>, locks: Arc<AccountLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn profile(&self, principal: &Principal) -> ServiceResult<Account> {
        Ok(self
            .store
            .find_account(&principal.id)
            .await?
            .ok_or_else(|| DomainError::not_found("publisher", principal.id.as_str()))?)
    }

    /// Edits the caller's profile. A new name is pushed to the name cached
    /// on their books and proposals.
    #[instrument(skip_all, fields(publisher_id = %principal.id))]
    pub async fn update_profile(&self, principal: &Principal, update: ProfileUpdate) -> ServiceResult<Account> {
        let patch = AccountPatch {
            name: update
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            bio: update.bio,
            logo_url: update.logo_url,
            awards: update.awards.map(Awards::into_vec),
            ..Default::default()
        };
        if patch.is_empty() {
            return Err(DomainError::validation("no fields to update").into());
        }

        let _guard = self.locks.lock(&principal.id).await;
        let account = self
            .store
            .update_account_fields(&principal.id, &patch)
            .await?
            .ok_or_else(|| DomainError::not_found("publisher", principal.id.as_str()))?;
        if let Some(name) = &patch.name {
            let refreshed = self.store.rename_publisher(&principal.id, name).await?;
            info!(refreshed, "publisher name cache refreshed");
        }
        Ok(account)
    }

    async fn own_books(&self, principal: &Principal) -> ServiceResult<Vec<Book>> {
        Ok(self
            .store
            .list_books(&BookFilter {
                scope: Some(MyBooksScope::Published(principal.id.clone())),
                ..Default::default()
            })
            .await?)
    }

    /// Loads a book the caller publishes; other books are reported as
    /// not found.
    async fn own_book(&self, principal: &Principal, id: &str) -> ServiceResult<Book> {
        self.store
            .find_book(id)
            .await?
            .filter(|b| b.publisher.as_deref() == Some(principal.id.as_str()))
            .ok_or_else(|| DomainError::not_found("book", id).into())
    }

    pub async fn books(&self, principal: &Principal) -> ServiceResult<Vec<BookView>> {
        let books = self.own_books(principal).await?;
        render_books(self.store.as_ref(), books).await
    }

    #[instrument(skip(self, principal), fields(publisher_id = %principal.id))]
    pub async fn update_price(&self, principal: &Principal, id: &str, price: Option<f64>) -> ServiceResult<BookView> {
        let price = price.ok_or_else(|| DomainError::missing_field("price"))?;
        check_price(price)?;
        self.own_book(principal, id).await?;
        let _guard = self.locks.lock(&AccountLocks::book_key(id)).await;
        let book = self
            .store
            .update_book_fields(id, &BookPatch::price(price))
            .await?
            .ok_or_else(|| DomainError::not_found("book", id))?;
        render_book(self.store.as_ref(), book).await
    }

    #[instrument(skip(self, principal), fields(publisher_id = %principal.id))]
    pub async fn delete_book(&self, principal: &Principal, id: &str) -> ServiceResult<Book> {
        self.own_book(principal, id).await?;
        remove_book(self.store.as_ref(), id).await
    }

    /// Units sold per book the caller publishes.
    pub async fn insights(&self, principal: &Principal) -> ServiceResult<Insights> {
        let account = self.profile(principal).await?;
        let books = self.own_books(principal).await?;
        let orders = self.store.list_orders(&OrderFilter::default()).await?;
        Ok(Insights {
            publisher_name: account.name,
            sales_by_book: sales_by_book(&books, &orders),
        })
    }
}
