use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, Role};

/// One account document serves all four roles.
///
/// Publisher-only fields (`bio`, `logo_url`, `awards`) and the author-only
/// `books` back-references are empty for other roles. The password hash is
/// never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub awards: Vec<String>,
    /// Ids of books this account authored or publishes.
    #[serde(default)]
    pub books: Vec<String>,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    /// Book ids, no duplicates.
    #[serde(default)]
    pub wishlist: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates an account with empty collections.
    ///
    /// The email is normalized (trimmed, lower-cased) since it is the
    /// unique login key.
    pub fn new(
        name: impl Into<String>,
        email: &str,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            email: normalize_email(email),
            password_hash: password_hash.into(),
            role,
            bio: None,
            logo_url: None,
            awards: Vec::new(),
            books: Vec::new(),
            cart: Vec::new(),
            wishlist: Vec::new(),
            addresses: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the document as modified.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Records a book back-reference, once.
    pub fn link_book(&mut self, book_id: &str) {
        if !self.books.iter().any(|b| b == book_id) {
            self.books.push(book_id.to_string());
        }
    }
}

/// Canonical form of an email address used as the unique key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// One cart line, unique per book within an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub book: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// A shipping address with an opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_default: bool,
}
