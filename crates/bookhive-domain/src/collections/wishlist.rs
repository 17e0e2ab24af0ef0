use crate::model::Account;

impl Account {
    /// Adds a book; duplicates are ignored. Returns whether it was added.
    pub fn add_to_wishlist(&mut self, book_id: &str) -> bool {
        if self.wishlist.iter().any(|b| b == book_id) {
            return false;
        }
        self.wishlist.push(book_id.to_string());
        self.touch();
        true
    }

    /// Removes a book; absent entries are a no-op.
    pub fn remove_from_wishlist(&mut self, book_id: &str) -> bool {
        let before = self.wishlist.len();
        self.wishlist.retain(|b| b != book_id);
        let removed = self.wishlist.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn prune_wishlist(&mut self, exists: impl Fn(&str) -> bool) -> usize {
        let before = self.wishlist.len();
        self.wishlist.retain(|b| exists(b));
        let dropped = before - self.wishlist.len();
        if dropped > 0 {
            self.touch();
        }
        dropped
    }
}
