//! Storage error types.

use std::time::Duration;

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Account not found.
    #[error("account not found: {id}")]
    AccountNotFound { id: String },

    /// Book not found.
    #[error("book not found: {id}")]
    BookNotFound { id: String },

    /// Order not found.
    #[error("order not found: {id}")]
    OrderNotFound { id: String },

    /// Proposal not found.
    #[error("proposal not found: {id}")]
    ProposalNotFound { id: String },

    /// Email already registered to another account.
    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    /// A document with this id already exists.
    #[error("{collection} already exists: {id}")]
    AlreadyExists { collection: &'static str, id: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Backend connection error.
    #[error("database connection error: {message}")]
    ConnectionError { message: String },

    /// Backend query error.
    #[error("database query error: {message}")]
    QueryError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a storage health probe.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency: Duration,
    pub message: Option<String>,
}
