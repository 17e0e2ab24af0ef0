use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::model::{Book, Order};

/// Sales total for one calendar month and category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesBucket {
    pub year: i32,
    pub month: u32,
    pub category: String,
    pub total_sales: f64,
    pub units_sold: u64,
}

/// Groups order line items by (year, month, category), summing
/// `price × quantity`.
///
/// `category_of` looks up a book's current category; line items whose book
/// no longer exists are skipped. Buckets are ordered by year, month,
/// category.
pub fn sales_by_month_and_category<'a>(
    orders: impl IntoIterator<Item = &'a Order>,
    category_of: impl Fn(&str) -> Option<String>,
) -> Vec<SalesBucket> {
    let mut buckets: BTreeMap<(i32, u32, String), (f64, u64)> = BTreeMap::new();
    for order in orders {
        let (year, month) = (order.created_at.year(), order.created_at.month());
        for item in &order.items {
            let Some(category) = category_of(&item.book_id) else {
                continue;
            };
            let entry = buckets.entry((year, month, category)).or_default();
            entry.0 += item.subtotal();
            entry.1 += u64::from(item.quantity);
        }
    }

    buckets
        .into_iter()
        .map(|((year, month, category), (total_sales, units_sold))| SalesBucket {
            year,
            month,
            category,
            total_sales,
            units_sold,
        })
        .collect()
}

/// Units sold for one book.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSales {
    pub book_id: String,
    pub title: String,
    pub sales: u64,
}

/// Units sold per book across all orders, in the order of `books`.
pub fn sales_by_book<'a>(
    books: &[Book],
    orders: impl IntoIterator<Item = &'a Order>,
) -> Vec<BookSales> {
    let mut units: BTreeMap<&str, u64> = BTreeMap::new();
    for order in orders {
        for item in &order.items {
            *units.entry(item.book_id.as_str()).or_default() += u64::from(item.quantity);
        }
    }

    books
        .iter()
        .map(|book| BookSales {
            book_id: book.id.clone(),
            title: book.title.clone(),
            sales: units.get(book.id.as_str()).copied().unwrap_or(0),
        })
        .collect()
}
