use chrono::Utc;

use crate::error::{DomainError, DomainResult};
use crate::model::{new_id, Book, Principal, Review};
use crate::ownership::{ensure_can_mutate, REVIEW_PRIVILEGED};

/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

impl Book {
    /// Adds a review by `reviewer`. A second review by the same reviewer is
    /// a conflict and leaves the book unchanged.
    pub fn add_review(
        &mut self,
        reviewer: &Principal,
        rating: u8,
        comment: &str,
    ) -> DomainResult<&Review> {
        if rating > MAX_RATING {
            return Err(DomainError::validation(format!(
                "rating must be between 0 and {MAX_RATING}"
            )));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(DomainError::missing_field("comment"));
        }
        if self.reviews.iter().any(|r| r.user == reviewer.id) {
            return Err(DomainError::conflict("Book already reviewed"));
        }

        self.reviews.push(Review {
            id: new_id(),
            user: reviewer.id.clone(),
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        });
        self.touch();
        Ok(&self.reviews[self.reviews.len() - 1])
    }

    /// Removes a review. Only the reviewer or an admin may do so.
    pub fn remove_review(&mut self, review_id: &str, principal: &Principal) -> DomainResult<Review> {
        let pos = self
            .reviews
            .iter()
            .position(|r| r.id == review_id)
            .ok_or_else(|| DomainError::not_found("review", review_id))?;
        ensure_can_mutate(&self.reviews[pos], principal, REVIEW_PRIVILEGED)?;
        let removed = self.reviews.remove(pos);
        self.touch();
        Ok(removed)
    }
}
