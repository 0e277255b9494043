//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Error reported by a remote client (gateway, peer, factory); shown verbatim.
    #[error("{0}")]
    Remote(String),

    /// Non-200 HTTP response.
    #[error("status code {status}: {body}{hint}")]
    HttpStatus {
        status: u16,
        body: String,
        hint: String,
    },

    /// Workflow precondition not met, e.g. a missing handler config.
    #[error("{0}")]
    Precondition(String),

    #[error("error retrieving contents of file [{reference}]: {path}: {source}")]
    FileReference {
        reference: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("{context}: {source}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn operation(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::OperationFailed {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
