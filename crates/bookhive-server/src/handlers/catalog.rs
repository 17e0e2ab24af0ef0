//! Catalog reads, book mutations, moderation and reviews.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use bookhive_domain::catalog::MyBooksScope;
use bookhive_domain::model::normalize_email;
use bookhive_domain::ownership::BOOK_PRIVILEGED;
use bookhive_domain::{
    ensure_can_mutate, Account, Book, BookStatus, DomainError, OwnerRef, Principal, Review, Role,
};
use bookhive_storage::{BookFilter, BookPatch, DataStore};

use super::views::{render_book, render_books, BookView};
use super::{required, AccountLocks, ServiceResult};

/// Fields accepted when creating a book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: Option<String>,
    /// An account id or a free-text name.
    pub author: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub cover_url: Option<String>,
    pub publisher_id: Option<String>,
    pub publisher_email: Option<String>,
}

/// Partial book edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub cover_url: Option<String>,
}

impl BookUpdate {
    fn into_patch(self) -> Result<BookPatch, DomainError> {
        if let Some(price) = self.price {
            check_price(price)?;
        }
        let patch = BookPatch {
            title: non_blank(self.title),
            description: self.description,
            price: self.price,
            category: non_blank(self.category),
            cover_url: self.cover_url,
            status: None,
        };
        if patch.title.is_none()
            && patch.description.is_none()
            && patch.price.is_none()
            && patch.category.is_none()
            && patch.cover_url.is_none()
        {
            return Err(DomainError::validation("no fields to update"));
        }
        Ok(patch)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn check_price(price: f64) -> Result<(), DomainError> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

/// Deletes a book and scrubs every cart, wishlist and back-reference that
/// points at it.
pub(crate) async fn remove_book<S: DataStore>(store: &S, id: &str) -> ServiceResult<Book> {
    let book = store
        .delete_book(id)
        .await?
        .ok_or_else(|| DomainError::not_found("book", id))?;
    let touched = store.remove_book_references(id).await?;
    info!(book_id = %id, accounts = touched, "book deleted");
    Ok(book)
}

pub struct CatalogHandler<S> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
}

impl<S: DataStore> CatalogHandler<S> {
    pub fn new(store: Arc<S>, locks: Arc<AccountLocks>) -> Self {
        Self { store, locks }
    }

    async fn load(&self, id: &str) -> ServiceResult<Book> {
        Ok(self
            .store
            .find_book(id)
            .await?
            .ok_or_else(|| DomainError::not_found("book", id))?)
    }

    async fn render(&self, filter: BookFilter) -> ServiceResult<Vec<BookView>> {
        let books = self.store.list_books(&filter).await?;
        render_books(self.store.as_ref(), books).await
    }

    // ========================================================================
    // Public reads
    // ========================================================================

    /// Approved books, newest first.
    pub async fn list_approved(&self) -> ServiceResult<Vec<BookView>> {
        self.render(BookFilter {
            status: Some(BookStatus::Approved),
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_category(&self, category: &str) -> ServiceResult<Vec<BookView>> {
        self.render(BookFilter {
            status: Some(BookStatus::Approved),
            category: Some(category.trim().to_string()),
            ..Default::default()
        })
        .await
    }

    /// A single book in any moderation state.
    pub async fn get_book(&self, id: &str) -> ServiceResult<BookView> {
        let book = self.load(id).await?;
        render_book(self.store.as_ref(), book).await
    }

    /// Books referencing `author_id` as their author. An author with no
    /// books is reported as not found.
    pub async fn books_by_author(&self, author_id: &str) -> ServiceResult<Vec<BookView>> {
        let books = self
            .render(BookFilter {
                author_id: Some(author_id.to_string()),
                ..Default::default()
            })
            .await?;
        if books.is_empty() {
            return Err(DomainError::not_found("books for author", author_id).into());
        }
        Ok(books)
    }

    /// "My books", scoped by the caller's role.
    pub async fn my_books(&self, principal: &Principal) -> ServiceResult<Vec<BookView>> {
        self.render(BookFilter {
            scope: Some(MyBooksScope::for_principal(principal)?),
            ..Default::default()
        })
        .await
    }

    // ========================================================================
    // Creation
    // ========================================================================

    async fn resolve_publisher(&self, book: &NewBook) -> ServiceResult<Option<Account>> {
        let publisher = if let Some(id) = book.publisher_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.store
                .find_account(id)
                .await?
                .ok_or_else(|| DomainError::not_found("publisher", id))?
        } else if let Some(email) = book.publisher_email.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.store
                .find_account_by_email(email)
                .await?
                .ok_or_else(|| DomainError::not_found("publisher", normalize_email(email)))?
        } else {
            return Ok(None);
        };
        if publisher.role != Role::Publisher {
            return Err(DomainError::validation(format!(
                "account {} is not a publisher",
                publisher.id
            ))
            .into());
        }
        Ok(Some(publisher))
    }

    async fn link_book(&self, account_id: &str, book_id: &str) -> ServiceResult<()> {
        let _guard = self.locks.lock(account_id).await;
        if let Some(mut account) = self.store.find_account(account_id).await? {
            account.link_book(book_id);
            account.touch();
            self.store.save_account_collections(&account).await?;
        }
        Ok(())
    }

    async fn insert(&self, principal: &Principal, request: NewBook, author: Option<OwnerRef>) -> ServiceResult<BookView> {
        let title = required(request.title.as_deref(), "title")?;
        let price = request.price.ok_or_else(|| DomainError::missing_field("price"))?;
        check_price(price)?;
        let author = match author {
            Some(author) => author,
            None => {
                let raw = required(request.author.as_deref(), "author")?;
                match self.store.find_account(&raw).await? {
                    Some(account) => OwnerRef::ById(account.id),
                    None => OwnerRef::ByName(raw),
                }
            }
        };
        let publisher = self.resolve_publisher(&request).await?;

        let mut book = Book::new(title, author, price);
        book.description = request.description.unwrap_or_default();
        if let Some(category) = non_blank(request.category) {
            book.category = category;
        }
        book.cover_url = request.cover_url.unwrap_or_default();
        book.created_by = Some(principal.id.clone());
        if let Some(publisher) = &publisher {
            book.publisher = Some(publisher.id.clone());
            book.publisher_name = Some(publisher.name.clone());
        }

        let book = self.store.create_book(book).await?;
        if let Some(author_id) = book.author.account_id() {
            self.link_book(author_id, &book.id).await?;
        }
        if let Some(publisher_id) = &book.publisher {
            self.link_book(publisher_id, &book.id).await?;
        }
        info!(book_id = %book.id, created_by = %principal.id, "book created");
        render_book(self.store.as_ref(), book).await
    }

    /// Creates a book with an explicit author (id or name).
    #[instrument(skip_all, fields(principal = %principal.id))]
    pub async fn create_book(&self, principal: &Principal, request: NewBook) -> ServiceResult<BookView> {
        self.insert(principal, request, None).await
    }

    /// Creates a book authored by the caller.
    #[instrument(skip_all, fields(principal = %principal.id))]
    pub async fn create_authored_book(&self, principal: &Principal, request: NewBook) -> ServiceResult<BookView> {
        let author = OwnerRef::ById(principal.id.clone());
        self.insert(principal, request, Some(author)).await
    }

    // ========================================================================
    // Owner mutations
    // ========================================================================

    /// Edits a book owned by the caller (or any book, for admins).
    #[instrument(skip(self, principal, update), fields(principal = %principal.id))]
    pub async fn update_book(&self, principal: &Principal, id: &str, update: BookUpdate) -> ServiceResult<BookView> {
        let book = self.load(id).await?;
        ensure_can_mutate(&book, principal, BOOK_PRIVILEGED)?;
        self.apply(id, update).await
    }

    /// Deletes a book owned by the caller and scrubs references to it.
    #[instrument(skip(self, principal), fields(principal = %principal.id))]
    pub async fn delete_book(&self, principal: &Principal, id: &str) -> ServiceResult<Book> {
        let book = self.load(id).await?;
        let access = ensure_can_mutate(&book, principal, BOOK_PRIVILEGED)?;
        info!(book_id = %id, ?access, "deleting book");
        self.remove(id).await
    }

    async fn apply(&self, id: &str, update: BookUpdate) -> ServiceResult<BookView> {
        let patch = update.into_patch()?;
        let _guard = self.locks.lock(&AccountLocks::book_key(id)).await;
        let book = self
            .store
            .update_book_fields(id, &patch)
            .await?
            .ok_or_else(|| DomainError::not_found("book", id))?;
        render_book(self.store.as_ref(), book).await
    }

    async fn remove(&self, id: &str) -> ServiceResult<Book> {
        remove_book(self.store.as_ref(), id).await
    }

    // ========================================================================
    // Moderation and admin
    // ========================================================================

    /// Sets a book's moderation status.
    #[instrument(skip(self))]
    pub async fn moderate(&self, id: &str, status: BookStatus) -> ServiceResult<BookView> {
        let _guard = self.locks.lock(&AccountLocks::book_key(id)).await;
        let book = self
            .store
            .update_book_fields(id, &BookPatch::status(status))
            .await?
            .ok_or_else(|| DomainError::not_found("book", id))?;
        info!(book_id = %id, status = %status, "book moderated");
        render_book(self.store.as_ref(), book).await
    }

    /// Every book regardless of status.
    pub async fn admin_list(&self) -> ServiceResult<Vec<BookView>> {
        self.render(BookFilter::default()).await
    }

    pub async fn admin_update(&self, id: &str, update: BookUpdate) -> ServiceResult<BookView> {
        self.apply(id, update).await
    }

    pub async fn admin_delete(&self, id: &str) -> ServiceResult<Book> {
        self.remove(id).await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Adds the caller's review. Only the review list is written back.
    #[instrument(skip(self, principal, comment), fields(principal = %principal.id))]
    pub async fn add_review(
        &self,
        principal: &Principal,
        book_id: &str,
        rating: Option<u8>,
        comment: Option<&str>,
    ) -> ServiceResult<BookView> {
        let rating = rating.ok_or_else(|| DomainError::missing_field("rating"))?;
        let comment = comment.unwrap_or_default();

        let _guard = self.locks.lock(&AccountLocks::book_key(book_id)).await;
        let mut book = self.load(book_id).await?;
        book.add_review(principal, rating, comment)?;
        self.store.save_reviews(book_id, &book.reviews).await?;
        render_book(self.store.as_ref(), book).await
    }

    /// Removes a review; only the reviewer or an admin may.
    #[instrument(skip(self, principal), fields(principal = %principal.id))]
    pub async fn delete_review(&self, principal: &Principal, book_id: &str, review_id: &str) -> ServiceResult<Review> {
        let _guard = self.locks.lock(&AccountLocks::book_key(book_id)).await;
        let mut book = self.load(book_id).await?;
        let removed = book.remove_review(review_id, principal)?;
        self.store.save_reviews(book_id, &book.reviews).await?;
        Ok(removed)
    }
}
