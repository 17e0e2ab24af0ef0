//! Shared error classification for the API layer.
//!
//! Service errors are mapped to a protocol-agnostic [`ErrorKind`] before the
//! HTTP layer turns them into status codes. [`ErrorConfig`] controls how much
//! detail reaches the client: production mode drops resource ids and storage
//! messages, development mode keeps them.
//!
//! Internal failures (storage faults, hashing, token signing, unexpected
//! domain errors) are generic in both modes.
//!
//! ```rust
//! use bookhive_api::errors::{classify_service_error_with_config, ErrorConfig, ErrorKind};
//! use bookhive_domain::DomainError;
//! use bookhive_server::ServiceError;
//!
//! let err = ServiceError::from(DomainError::not_found("book", "b-42"));
//!
//! let kind = classify_service_error_with_config(&err, &ErrorConfig::production());
//! assert_eq!(kind, ErrorKind::NotFound("book not found".to_string()));
//!
//! let kind = classify_service_error_with_config(&err, &ErrorConfig::development());
//! assert_eq!(kind, ErrorKind::NotFound("book not found: b-42".to_string()));
//! ```

use bookhive_domain::DomainError;
use bookhive_server::ServiceError;
use bookhive_storage::StorageError;

/// Message sent for every internal failure.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Message sent when registration hits an existing email.
pub const DUPLICATE_EMAIL_MESSAGE: &str = "User already exists";

/// Configuration for error message detail level.
#[derive(Debug, Clone, Default)]
pub struct ErrorConfig {
    /// Include resource ids and storage messages in responses.
    ///
    /// Internal error messages are hidden regardless.
    pub detailed_errors: bool,
}

impl ErrorConfig {
    /// Hides resource ids and storage detail.
    pub fn production() -> Self {
        Self {
            detailed_errors: false,
        }
    }

    /// Shows resource ids and storage detail.
    pub fn development() -> Self {
        Self {
            detailed_errors: true,
        }
    }
}

/// Protocol-agnostic classification of a service error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable credential (401)
    Unauthenticated(String),
    /// Wrong role or not the owner (403)
    Forbidden(String),
    /// Resource does not exist (404)
    NotFound(String),
    /// Missing or malformed input (400)
    InvalidInput(String),
    /// Conflicts with existing state (400)
    Conflict(String),
    /// Backend temporarily unreachable (503)
    Unavailable(String),
    /// Anything the caller cannot act on (500)
    Internal(String),
}

impl ErrorKind {
    /// True for failures that must be logged server-side.
    pub fn is_internal(&self) -> bool {
        matches!(self, ErrorKind::Internal(_) | ErrorKind::Unavailable(_))
    }
}

/// Classifies with production settings.
pub fn classify_service_error(err: &ServiceError) -> ErrorKind {
    classify_service_error_with_config(err, &ErrorConfig::production())
}

/// Classifies a service error with a configurable detail level.
pub fn classify_service_error_with_config(err: &ServiceError, config: &ErrorConfig) -> ErrorKind {
    match err {
        ServiceError::Domain(e) => classify_domain_error(e, config.detailed_errors),
        ServiceError::Storage(e) => classify_storage_error(e, config.detailed_errors),
        ServiceError::Password(_) | ServiceError::Token(_) => {
            ErrorKind::Internal(INTERNAL_MESSAGE.to_string())
        }
    }
}

fn classify_domain_error(err: &DomainError, detailed: bool) -> ErrorKind {
    match err {
        DomainError::Unauthenticated { reason } => ErrorKind::Unauthenticated(reason.clone()),
        DomainError::Forbidden { message } => ErrorKind::Forbidden(message.clone()),
        DomainError::NotFound { resource, .. } if !detailed => {
            ErrorKind::NotFound(format!("{resource} not found"))
        }
        DomainError::NotFound { .. } => ErrorKind::NotFound(err.to_string()),
        DomainError::Validation { message } => ErrorKind::InvalidInput(message.clone()),
        DomainError::Conflict { message } => ErrorKind::Conflict(message.clone()),
        DomainError::Unexpected { .. } => ErrorKind::Internal(INTERNAL_MESSAGE.to_string()),
    }
}

fn classify_storage_error(err: &StorageError, detailed: bool) -> ErrorKind {
    let not_found = |resource: &str| {
        if detailed {
            ErrorKind::NotFound(err.to_string())
        } else {
            ErrorKind::NotFound(format!("{resource} not found"))
        }
    };

    match err {
        StorageError::AccountNotFound { .. } => not_found("account"),
        StorageError::BookNotFound { .. } => not_found("book"),
        StorageError::OrderNotFound { .. } => not_found("order"),
        StorageError::ProposalNotFound { .. } => not_found("proposal"),
        StorageError::DuplicateEmail { .. } => {
            ErrorKind::InvalidInput(DUPLICATE_EMAIL_MESSAGE.to_string())
        }
        StorageError::AlreadyExists { collection, .. } => {
            if detailed {
                ErrorKind::Conflict(err.to_string())
            } else {
                ErrorKind::Conflict(format!("{collection} already exists"))
            }
        }
        StorageError::InvalidInput { message } => {
            if detailed {
                ErrorKind::InvalidInput(message.clone())
            } else {
                ErrorKind::InvalidInput("invalid input".to_string())
            }
        }
        StorageError::ConnectionError { .. } => {
            ErrorKind::Unavailable("storage unavailable".to_string())
        }
        StorageError::QueryError { .. } | StorageError::InternalError { .. } => {
            ErrorKind::Internal(INTERNAL_MESSAGE.to_string())
        }
    }
}
