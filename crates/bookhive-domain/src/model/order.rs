use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::DomainError;

/// Accepted payment methods. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "cash on delivery")]
    CashOnDelivery,
    #[serde(rename = "upi")]
    Upi,
    #[serde(rename = "rupay")]
    Rupay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CashOnDelivery,
        PaymentMethod::Upi,
        PaymentMethod::Rupay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash on delivery",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Rupay => "rupay",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("invalid payment method: {wanted}")))
    }
}

/// Fulfillment state, changed only by admins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(DomainError::validation(format!(
                "invalid order status: {other}"
            ))),
        }
    }
}

/// Snapshot of a book taken when the order was placed.
///
/// Later edits to the book do not change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub book_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_url: String,
    pub price: f64,
    pub quantity: u32,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Placing account id.
    pub user: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub contact_number: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order; the total is always derived from the items.
    pub fn new(
        user: impl Into<String>,
        items: Vec<OrderItem>,
        address: impl Into<String>,
        contact_number: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Self {
        let now = Utc::now();
        let total_amount = items.iter().map(OrderItem::subtotal).sum();
        Self {
            id: new_id(),
            user: user.into(),
            items,
            total_amount,
            contact_number: contact_number.into(),
            address: address.into(),
            payment_method,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
