//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or backend failure.
    #[error("API error: {0}")]
    Api(#[from] starbank_api::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Local storage could not be opened or prepared.
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    /// A read was requested offline with nothing cached for it.
    #[error("No {resource} data available offline")]
    OfflineNoData {
        /// The resource that was requested (e.g. `accounts`).
        resource: String,
    },

    /// Transfer execution requires connectivity and is never queued.
    #[error("Transfer execution failed: {0}")]
    TransferExecution(String),

    /// A sync was requested while offline.
    #[error("Cannot sync while offline")]
    SyncOffline,
}

impl Error {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Api(_) => "API_ERROR",
            Self::Database(_) => "STORAGE_ERROR",
            Self::Serde(_) => "SERIALIZATION_ERROR",
            Self::StorageInit(_) => "STORAGE_INIT_FAILED",
            Self::OfflineNoData { .. } => "OFFLINE_NO_DATA",
            Self::TransferExecution(_) => "TRANSFER_EXECUTION_FAILED",
            Self::SyncOffline => "SYNC_OFFLINE",
        }
    }

    /// Whether a caller-driven retry of the same operation could succeed.
    ///
    /// Advisory only; the action queue applies its own backoff policy.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_retryable(),
            Self::SyncOffline => true,
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
