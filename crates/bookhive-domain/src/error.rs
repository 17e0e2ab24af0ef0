//! Domain error taxonomy shared by every layer above the models.

use thiserror::Error;

/// Domain-specific errors for marketplace operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Missing, invalid or expired credential, or the credential's subject is gone.
    #[error("not authenticated: {reason}")]
    Unauthenticated { reason: String },

    /// Authenticated but not allowed: wrong role or not the resource owner.
    #[error("{message}")]
    Forbidden { message: String },

    /// A referenced resource does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Missing or malformed input.
    #[error("{message}")]
    Validation { message: String },

    /// The request conflicts with existing state (duplicate review).
    #[error("{message}")]
    Conflict { message: String },

    /// Storage or codec failure. Never shown verbatim to callers.
    #[error("unexpected error: {reason}")]
    Unexpected { reason: String },
}

impl DomainError {
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Validation failure naming the absent field.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation {
            message: format!("missing required field: {field}"),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn unexpected(reason: impl Into<String>) -> Self {
        Self::Unexpected {
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
