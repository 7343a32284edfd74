//! Error types for the transport client.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport failure (connection refused, DNS, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Server responded with a non-2xx status.
    #[error("Server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, or the canonical reason phrase when empty.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Whether a retry of the same request could plausibly succeed.
    ///
    /// Transport-level failures and timeouts are retryable; of the HTTP
    /// statuses only 5xx and 408 are. Everything else is terminal for the
    /// attempt. This flag is advisory: the offline queue applies its own
    /// backoff independently of it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 408,
            Self::Json(_) | Self::InvalidConfig(_) | Self::Url(_) => false,
        }
    }
}
