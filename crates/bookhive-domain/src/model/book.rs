use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::ownership::OwnerRef;

/// Moderation state of a catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookStatus::Pending => "pending",
            BookStatus::Approved => "approved",
            BookStatus::Rejected => "rejected",
        })
    }
}

/// A reader review embedded in its book. One per reviewer per book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Reviewer account id.
    pub user: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A catalog entry.
///
/// `author` keeps whatever encoding the book was written with: a reference
/// to an account, an expanded reference, or a free-text name.
/// `publisher_name` is a display cache of the publisher account's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub author: OwnerRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub status: BookStatus,
    /// Account that created the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn default_category() -> String {
    "General".to_string()
}

impl Book {
    /// Creates an approved book with no reviews.
    pub fn new(title: impl Into<String>, author: OwnerRef, price: f64) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title: title.into(),
            author,
            publisher: None,
            publisher_name: None,
            description: String::new(),
            price,
            category: default_category(),
            cover_url: String::new(),
            status: BookStatus::default(),
            created_by: None,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the document as modified.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Display name of the author, whatever the encoding.
    ///
    /// A bare reference has no name; `fallback` resolves it (usually an
    /// account lookup done by the caller).
    pub fn author_display(&self, fallback: Option<&str>) -> String {
        match &self.author {
            OwnerRef::ByName(name) => name.clone(),
            OwnerRef::Expanded { name, .. } => name.clone(),
            OwnerRef::ById(id) => fallback.map(str::to_string).unwrap_or_else(|| id.clone()),
        }
    }
}
