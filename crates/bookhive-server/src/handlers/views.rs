//! Read models returned by handlers.

use std::collections::HashMap;

use serde::Serialize;

use bookhive_domain::catalog::RatingSummary;
use bookhive_domain::{Account, Book, DomainError, OwnerRef, Role};
use bookhive_storage::DataStore;

use super::ServiceResult;

/// A book as rendered to clients: author reference expanded with the
/// account's name, plus the rating rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

impl BookView {
    /// Renders a book whose author has already been resolved (or needs
    /// no resolution).
    pub fn new(book: Book) -> Self {
        let rating = book.rating_summary();
        Self { book, rating }
    }
}

/// Public identity fields of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Expands author references and attaches ratings.
///
/// References to accounts that no longer exist are left bare.
pub(crate) async fn render_books<S: DataStore>(
    store: &S,
    books: Vec<Book>,
) -> ServiceResult<Vec<BookView>> {
    let mut names: HashMap<String, Option<String>> = HashMap::new();
    let mut views = Vec::with_capacity(books.len());
    for mut book in books {
        if let Some(id) = book.author.account_id().map(str::to_string) {
            if !names.contains_key(&id) {
                let name = store.find_account(&id).await?.map(|a| a.name);
                names.insert(id.clone(), name);
            }
            if let Some(Some(name)) = names.get(&id) {
                book.author = book.author.expanded(name.clone());
            }
        }
        views.push(BookView::new(book));
    }
    Ok(views)
}

pub(crate) async fn render_book<S: DataStore>(store: &S, book: Book) -> ServiceResult<BookView> {
    render_books(store, vec![book])
        .await?
        .pop()
        .ok_or_else(|| DomainError::unexpected("book rendering produced no view").into())
}

/// Display name for a book's author, resolving bare references.
pub(crate) async fn author_name<S: DataStore>(store: &S, book: &Book) -> ServiceResult<String> {
    let fallback = match &book.author {
        OwnerRef::ById(id) => store.find_account(id).await?.map(|a| a.name),
        _ => None,
    };
    Ok(book.author_display(fallback.as_deref()))
}
