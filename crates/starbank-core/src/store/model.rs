//! Local store data models.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counts and size of the local store, for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of cached accounts.
    pub accounts: u64,
    /// Number of cached transactions.
    pub transactions: u64,
    /// Number of queued actions (pending and terminal).
    pub queued_actions: u64,
    /// Estimated database size in bytes. Best effort; zero when unknown.
    pub total_size_bytes: u64,
}

/// Result of a data integrity check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Whether no issues were found.
    pub valid: bool,
    /// Human-readable descriptions of each issue found.
    pub errors: Vec<String>,
}

/// Per-scope sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncMetadata {
    /// Scope key, e.g. `"global"`.
    pub scope: String,
    /// Timestamp of the last successful sync for this scope.
    pub last_sync: Option<DateTime<Utc>>,
}
