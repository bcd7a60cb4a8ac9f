//! CLI error types.

use thiserror::Error;
use zdmerge_client::ClientError;
use zdmerge_engine::EngineError;

/// Errors surfaced to the operator.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file missing, unreadable or incomplete.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Gateway construction failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Database connection failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
