//! Queued action data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use starbank_api::{BillPaymentRequest, TransferRequest};

/// Identifier of a queued action.
///
/// Assigned at enqueue time and returned to the caller as the durable
/// handle for the pending operation. Stable until the action is terminally
/// resolved; it is not a confirmed backend transaction id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of write operation, used for per-kind counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Money transfer.
    Transfer,
    /// Bill payment.
    BillPayment,
}

impl ActionKind {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::BillPayment => "bill_payment",
        }
    }
}

/// Typed payload of a queued action.
///
/// A tagged variant rather than an opaque blob, so replay logic is checked
/// exhaustively at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ActionPayload {
    /// A transfer preparation to replay.
    Transfer(TransferRequest),
    /// A bill payment to replay.
    BillPayment(BillPaymentRequest),
}

impl ActionPayload {
    /// The kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Transfer(_) => ActionKind::Transfer,
            Self::BillPayment(_) => ActionKind::BillPayment,
        }
    }
}

/// Persisted lifecycle state of a queued action.
///
/// `in-flight` is a runtime-only condition while a drain holds an action;
/// it is never persisted, so a crash mid-drain leaves the action pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Awaiting replay.
    Pending,
    /// Retry policy exhausted; excluded from automatic drains but still
    /// visible until explicitly cleared.
    FailedTerminal,
}

impl ActionStatus {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FailedTerminal => "failed_terminal",
        }
    }
}

/// One pending (or terminally failed) write operation.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    /// Queue-assigned identifier.
    pub id: ActionId,
    /// Typed payload to replay.
    pub payload: ActionPayload,
    /// Current lifecycle state.
    pub status: ActionStatus,
    /// Number of failed replay attempts so far.
    pub retry_count: u32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the action was enqueued.
    pub queued_at: DateTime<Utc>,
    /// Earliest time the next automatic attempt may run.
    pub next_attempt_at: Option<DateTime<Utc>>,
}
