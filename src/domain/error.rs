//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent invalid input and business rule violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Flag/argument validation failure; the message is shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("invalid JSON config: {0}")]
    InvalidConfig(String),

    #[error("invalid collections config: {0}")]
    InvalidCollectionsConfig(String),

    #[error("invalid policy [{policy}]: {reason}")]
    InvalidPolicy { policy: String, reason: String },
}

impl DomainError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
