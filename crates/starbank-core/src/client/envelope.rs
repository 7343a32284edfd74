//! Response envelope types.
//!
//! Every client response carries the same envelope so callers can always
//! tell where the data came from and whether a write is confirmed or
//! merely queued.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::queue::ActionId;

/// Where a response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Fresh from the backend.
    Network,
    /// Served from the local store.
    Cache,
    /// Produced locally while offline (e.g. a queued write receipt).
    Offline,
}

/// Normalized response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// The payload.
    pub data: T,
    /// Whether the payload came from the local store.
    pub cached: bool,
    /// When the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Origin of the payload.
    pub source: DataSource,
    /// Earliest expected next background sync, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sync: Option<DateTime<Utc>>,
}

impl<T> ApiResponse<T> {
    /// Envelope for data fetched synchronously from the backend.
    pub(crate) fn network(data: T) -> Self {
        Self {
            data,
            cached: false,
            timestamp: Utc::now(),
            source: DataSource::Network,
            next_sync: None,
        }
    }

    /// Envelope for data served from the local store.
    pub(crate) fn cache(data: T) -> Self {
        Self {
            data,
            cached: true,
            timestamp: Utc::now(),
            source: DataSource::Cache,
            next_sync: None,
        }
    }

    /// Envelope for a result produced locally while offline.
    pub(crate) fn offline(data: T) -> Self {
        Self {
            data,
            cached: false,
            timestamp: Utc::now(),
            source: DataSource::Offline,
            next_sync: None,
        }
    }
}

/// Receipt for a write that was queued instead of sent.
///
/// The action identifier is the caller's durable handle for status
/// queries; it is not a confirmed backend transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedReceipt {
    /// Queue-assigned handle for the pending operation.
    pub action_id: ActionId,
    /// Always `"queued"`; mirrors the wire envelope's status field.
    pub status: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

impl QueuedReceipt {
    pub(crate) fn new(action_id: ActionId, message: impl Into<String>) -> Self {
        Self {
            action_id,
            status: "queued",
            message: message.into(),
        }
    }
}

/// Outcome of a write: confirmed by the backend, or durably queued.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum WriteOutcome<T> {
    /// The backend accepted the write.
    Confirmed(T),
    /// The write is queued for replay when connectivity returns.
    Queued(QueuedReceipt),
}

impl<T> WriteOutcome<T> {
    /// The queued receipt, when the write was queued.
    #[must_use]
    pub const fn queued(&self) -> Option<&QueuedReceipt> {
        match self {
            Self::Queued(receipt) => Some(receipt),
            Self::Confirmed(_) => None,
        }
    }

    /// The confirmed payload, when the backend accepted the write.
    #[must_use]
    pub const fn confirmed(&self) -> Option<&T> {
        match self {
            Self::Confirmed(data) => Some(data),
            Self::Queued(_) => None,
        }
    }
}

/// Aggregated offline status polled by the status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OfflineStatus {
    /// Pending transfers awaiting replay.
    pub pending_transfers: u64,
    /// Pending bill payments awaiting replay.
    pub pending_bill_payments: u64,
    /// Timestamp of the last successful drain.
    pub last_sync: Option<DateTime<Utc>>,
    /// Estimated local cache size in bytes.
    pub cache_size_bytes: u64,
}
