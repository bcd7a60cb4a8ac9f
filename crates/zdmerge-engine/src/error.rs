//! Engine error types.

use thiserror::Error;
use zdmerge_client::ClientError;

/// Errors that can occur during a reconciliation run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Local datastore error.
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    /// Support-system gateway error.
    #[error("Helpdesk error: {0}")]
    Desk(#[from] ClientError),

    /// Audit report serialization error.
    #[error("Report error: {0}")]
    Csv(#[from] csv::Error),

    /// Report file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON handling error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Internal invariant violation.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
