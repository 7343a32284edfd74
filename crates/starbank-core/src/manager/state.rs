//! Offline manager state snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::security::SecurityStatus;
use crate::store::StorageStats;

/// Sync-related counters surfaced to the status UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Timestamp of the last successful drain.
    pub last_sync: Option<DateTime<Utc>>,
    /// Pending transfers awaiting replay.
    pub pending_transfers: u64,
    /// Pending bill payments awaiting replay.
    pub pending_bill_payments: u64,
    /// Consecutive failed drain cycles; reset on the next success.
    pub failed_syncs: u32,
}

/// One observable snapshot of the whole offline subsystem.
///
/// `errors` and `warnings` are append-only until dismissed by index;
/// dismissal shifts subsequent indices, so consumers re-read the list
/// after each dismissal instead of caching indices.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerState {
    /// Current connectivity.
    pub is_online: bool,
    /// Whether initialization completed successfully.
    pub is_initialized: bool,
    /// Whether a drain cycle is running right now.
    pub is_syncing: bool,
    /// Whether key material is initialized.
    pub is_secure: bool,
    /// Local store counters.
    pub storage: StorageStats,
    /// Sync counters.
    pub sync: SyncStats,
    /// Security validator state.
    pub security: SecurityStatus,
    /// Operator-visible errors, append-only until dismissed.
    pub errors: Vec<String>,
    /// Operator-visible warnings, append-only until dismissed.
    pub warnings: Vec<String>,
}
