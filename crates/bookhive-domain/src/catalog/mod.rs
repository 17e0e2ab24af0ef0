//! Catalog read paths: derived fields and reporting views.
//!
//! Nothing here is stored. Rollups are recomputed from the documents on
//! every read.

mod analytics;
mod rating;
mod reviews;
mod scope;

pub use analytics::{sales_by_book, sales_by_month_and_category, BookSales, SalesBucket};
pub use rating::RatingSummary;
pub use scope::MyBooksScope;
