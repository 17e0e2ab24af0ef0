use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl FromStr for ProposalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ProposalStatus::Pending),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(DomainError::validation(format!(
                "invalid proposal status: {other}"
            ))),
        }
    }
}

/// An author's pitch to a publisher.
///
/// The publisher is keyed by `publisher_id`; `publisher_name` is only a
/// display cache. Documents written before the reference existed have no
/// `publisher_id` and are matched by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,
    pub publisher_name: String,
    pub book_title: String,
    pub proposal_body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        publisher_id: impl Into<String>,
        publisher_name: impl Into<String>,
        book_title: impl Into<String>,
        proposal_body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            publisher_id: Some(publisher_id.into()),
            publisher_name: publisher_name.into(),
            book_title: book_title.into(),
            proposal_body: proposal_body.into(),
            category: None,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
