use crate::error::{DomainError, DomainResult};
use crate::model::{Account, CartItem};

impl Account {
    /// Adds `quantity` (default 1) of a book, merging into an existing line.
    ///
    /// Returns the line's resulting quantity.
    pub fn add_to_cart(&mut self, book_id: &str, quantity: Option<u32>) -> DomainResult<u32> {
        let quantity = quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        let total = match self.cart.iter_mut().find(|item| item.book == book_id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                item.quantity
            }
            None => {
                self.cart.push(CartItem {
                    book: book_id.to_string(),
                    quantity,
                });
                quantity
            }
        };
        self.touch();
        Ok(total)
    }

    /// Removes a book's line. Absent lines are a no-op; returns whether
    /// anything was removed.
    pub fn remove_from_cart(&mut self, book_id: &str) -> bool {
        let before = self.cart.len();
        self.cart.retain(|item| item.book != book_id);
        let removed = self.cart.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Replaces the quantity of an existing line.
    pub fn set_cart_quantity(&mut self, book_id: &str, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        let item = self
            .cart
            .iter_mut()
            .find(|item| item.book == book_id)
            .ok_or_else(|| DomainError::not_found("cart item", book_id))?;
        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Drops lines whose book no longer exists. Returns the number dropped.
    pub fn prune_cart(&mut self, exists: impl Fn(&str) -> bool) -> usize {
        let before = self.cart.len();
        self.cart.retain(|item| exists(&item.book));
        let dropped = before - self.cart.len();
        if dropped > 0 {
            self.touch();
        }
        dropped
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.touch();
    }
}
