//! Zendesk client error types.

use thiserror::Error;

/// Errors surfaced by the Zendesk gateway.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure (connect, timeout, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Zendesk API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// The API answered 429; `retry_after_secs` carries the Retry-After
    /// header when present.
    #[error("Rate limited by Zendesk (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Authentication was rejected.
    #[error("Authentication failed (401): {0}")]
    Auth(String),

    /// The record does not exist on the Zendesk side.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The response body did not match the expected shape. Consumers decide
    /// whether to fail closed (treat as not-found); the parse error is never
    /// dropped silently.
    #[error("Failed to parse Zendesk response: {message}")]
    Parse { message: String },

    /// The call succeeded but the result violates an expected invariant
    /// (merge returned the wrong account, identity not primary after
    /// make_primary). Terminal; never retried.
    #[error("Response verification failed: {message}")]
    Verification { message: String },

    /// The client could not be constructed.
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The rate limiter was shut down while a call was queued.
    #[error("Rate limiter unavailable: {0}")]
    Limiter(#[from] crate::rate_limit::RateLimitError),
}

impl ClientError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a verification error.
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    /// Whether the failure is transient and safe to retry.
    ///
    /// Verification failures are deliberately excluded: a merge that
    /// completed with the wrong result is an externally visible side effect
    /// and must not be blindly repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::RateLimited { .. } => true,
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for Zendesk client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::RateLimited {
            retry_after_secs: None
        }
        .is_retryable());
        assert!(ClientError::Api {
            status: 503,
            detail: "unavailable".into()
        }
        .is_retryable());

        assert!(!ClientError::Api {
            status: 404,
            detail: "missing".into()
        }
        .is_retryable());
        assert!(!ClientError::verification("merge returned wrong account").is_retryable());
        assert!(!ClientError::parse("unexpected shape").is_retryable());
        assert!(!ClientError::NotFound("user 5".into()).is_retryable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = ClientError::Api {
            status: 422,
            detail: "Unprocessable".into(),
        };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("Unprocessable"));
    }
}
