//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the outline model.
/// These are independent of storage concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed entry data: {message}")]
    Malformed { message: String },

    #[error("invalid entry title: {0:?}")]
    InvalidTitle(String),

    #[error("unknown entry: {0}")]
    UnknownEntry(String),

    #[error("cycle detected: {0}")]
    CycleDetected(String),
}

impl DomainError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
