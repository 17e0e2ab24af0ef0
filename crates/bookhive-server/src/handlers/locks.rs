//! Per-document serialization for read-modify-write sequences.
//!
//! Cart, wishlist, address and review edits load a document, change one
//! field group and write that group back. Holding the document's lock for
//! the whole sequence keeps concurrent edits from overwriting each other.
//! Targeted patches on the same document take the lock too. Locks are
//! process-local.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutexes keyed by document key.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> AccountLockGuard<'_> {
        let mutex = match self.locks.entry(key.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => Arc::clone(entry.insert(Arc::new(Mutex::new(()))).value()),
        };
        let guard = mutex.lock_owned().await;
        AccountLockGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Lock key for a book document.
    pub fn book_key(book_id: &str) -> String {
        format!("book:{book_id}")
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// RAII guard; dropping it releases the lock and forgets idle keys.
pub struct AccountLockGuard<'a> {
    locks: &'a AccountLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AccountLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map holds the mutex now: nobody is waiting on it.
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
