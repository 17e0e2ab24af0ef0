use serde::Serialize;

use crate::model::{Book, Review};

/// Mean review rating rounded to one decimal, plus the review count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub rating: f64,
    pub num_reviews: usize,
}

impl RatingSummary {
    /// No reviews yields rating 0 and count 0.
    pub fn of(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self {
                rating: 0.0,
                num_reviews: 0,
            };
        }
        let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        let mean = f64::from(sum) / reviews.len() as f64;
        Self {
            rating: (mean * 10.0).round() / 10.0,
            num_reviews: reviews.len(),
        }
    }
}

impl Book {
    pub fn rating_summary(&self) -> RatingSummary {
        RatingSummary::of(&self.reviews)
    }
}
