//! Error types for the TestRail client.

use std::time::Duration;

/// TestRail client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Credentials rejected by the server.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Entity (run, suite, result) does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-2xx response that is not covered by a more specific variant.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level failure (connect, timeout, TLS).
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body could not be decoded.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Client-side configuration problem.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Attachment file could not be read.
    #[error("attachment error: {path}: {message}")]
    Attachment { path: String, message: String },
}

impl ClientError {
    /// Whether the failed request may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        let err = ClientError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = ClientError::Api {
            status: 400,
            message: "bad field".into(),
        };
        assert!(!err.is_retryable());
        assert!(!ClientError::Unauthorized {
            message: "nope".into()
        }
        .is_retryable());
    }

    #[test]
    fn network_and_rate_limit_are_retryable() {
        assert!(ClientError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(ClientError::RateLimited { retry_after: None }.is_retryable());
    }
}
