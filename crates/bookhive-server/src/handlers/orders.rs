//! Order placement, history and admin reporting.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};

use bookhive_domain::catalog::{sales_by_month_and_category, SalesBucket};
use bookhive_domain::{DomainError, Order, OrderItem, OrderStatus, PaymentMethod, Principal};
use bookhive_storage::{BookFilter, DataStore, OrderFilter, OrderPatch};

use super::views::author_name;
use super::{required, AccountLocks, ServiceResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub book_id: Option<String>,
    pub quantity: Option<u32>,
}

/// Checkout request. Without `items` the caller's cart is ordered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub items: Option<Vec<OrderLine>>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub payment_method: Option<String>,
}

/// Admin edit of an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub status: Option<String>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub payment_method: Option<String>,
}

impl OrderUpdate {
    fn into_patch(self) -> Result<OrderPatch, DomainError> {
        let patch = OrderPatch {
            status: self.status.as_deref().map(str::parse::<OrderStatus>).transpose()?,
            address: self.address,
            contact_number: self.contact_number,
            payment_method: self
                .payment_method
                .as_deref()
                .map(str::parse::<PaymentMethod>)
                .transpose()?,
        };
        if patch.status.is_none()
            && patch.address.is_none()
            && patch.contact_number.is_none()
            && patch.payment_method.is_none()
        {
            return Err(DomainError::validation("no fields to update"));
        }
        Ok(patch)
    }
}

pub struct OrderHandler<S> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
}

impl<S: DataStore> OrderHandler<S> {
    pub fn new(store: Arc<S>, locks: Arc<AccountLocks>) -> Self {
        Self { store, locks }
    }

    /// Places an order and empties the caller's cart in one store
    /// operation. Prices and titles are copied from the books as they are
    /// now; the total is always computed here.
    #[instrument(skip_all, fields(account_id = %principal.id))]
    pub async fn place_order(&self, principal: &Principal, request: PlaceOrder) -> ServiceResult<Order> {
        let address = required(request.address.as_deref(), "address")?;
        let contact = required(request.contact_number.as_deref(), "contactNumber")?;
        let payment = required(request.payment_method.as_deref(), "paymentMethod")?
            .parse::<PaymentMethod>()?;

        let _guard = self.locks.lock(&principal.id).await;
        let account = self
            .store
            .find_account(&principal.id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", principal.id.as_str()))?;

        let lines: Vec<(String, u32)> = match request.items {
            Some(items) if !items.is_empty() => items
                .into_iter()
                .map(|line| {
                    let book_id = required(line.book_id.as_deref(), "bookId")?;
                    match line.quantity.unwrap_or(1) {
                        0 => Err(DomainError::validation("quantity must be at least 1")),
                        quantity => Ok((book_id, quantity)),
                    }
                })
                .collect::<Result<_, _>>()?,
            _ => account
                .cart
                .iter()
                .map(|line| (line.book.clone(), line.quantity))
                .collect(),
        };
        if lines.is_empty() {
            return Err(DomainError::validation("Cart is empty").into());
        }

        let mut items = Vec::with_capacity(lines.len());
        for (book_id, quantity) in lines {
            let book = self
                .store
                .find_book(&book_id)
                .await?
                .ok_or_else(|| DomainError::not_found("book", book_id.as_str()))?;
            items.push(OrderItem {
                author: author_name(self.store.as_ref(), &book).await?,
                book_id: book.id,
                title: book.title,
                cover_url: book.cover_url,
                price: book.price,
                quantity,
            });
        }

        let order = Order::new(account.id, items, address, contact, payment);
        let order = self.store.place_order(order).await?;
        info!(
            order_id = %order.id,
            items = order.items.len(),
            total = order.total_amount,
            "order placed"
        );
        Ok(order)
    }

    /// The caller's orders, newest first.
    pub async fn my_orders(&self, principal: &Principal) -> ServiceResult<Vec<Order>> {
        Ok(self
            .store
            .list_orders(&OrderFilter {
                user: Some(principal.id.clone()),
            })
            .await?)
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<Order>> {
        Ok(self.store.list_orders(&OrderFilter::default()).await?)
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &str, update: OrderUpdate) -> ServiceResult<Order> {
        let patch = update.into_patch()?;
        let order = self
            .store
            .update_order_fields(id, &patch)
            .await?
            .ok_or_else(|| DomainError::not_found("order", id))?;
        info!(order_id = %id, status = ?order.status, "order updated");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ServiceResult<Order> {
        Ok(self
            .store
            .delete_order(id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", id))?)
    }

    /// Sales grouped by month of purchase and current book category.
    pub async fn analytics(&self) -> ServiceResult<Vec<SalesBucket>> {
        let orders = self.store.list_orders(&OrderFilter::default()).await?;
        let categories: HashMap<String, String> = self
            .store
            .list_books(&BookFilter::default())
            .await?
            .into_iter()
            .map(|b| (b.id, b.category))
            .collect();
        Ok(sales_by_month_and_category(&orders, |id| {
            categories.get(id).cloned()
        }))
    }
}
