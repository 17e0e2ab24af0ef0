//! bookhive-storage: Storage abstraction layer
//!
//! This crate provides the storage abstraction for bookhive, including:
//! - DataStore trait covering accounts, books, orders and proposals
//! - Targeted field patches for updates that must not clobber other fields
//! - In-memory document store for development and tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              bookhive-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait, filters     │
//! │  error.rs    - StorageError, HealthStatus   │
//! │  memory.rs   - In-memory implementation     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{HealthStatus, StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use traits::{
    AccountFilter, AccountPatch, BookFilter, BookPatch, DataStore, OrderFilter, OrderPatch,
    ProposalFilter,
};
