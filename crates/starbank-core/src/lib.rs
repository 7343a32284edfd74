//! # starbank-core
//!
//! Offline-first banking core.
//!
//! Everything the application reads comes from a local SQLite cache that
//! is refreshed from the network when possible; everything it writes while
//! offline lands in a durable action queue that a sync manager replays
//! with exponential backoff once connectivity returns. The
//! [`OfflineClient`] facade gives callers one cache-first API over both,
//! and the [`OfflineManager`] bundles it with connectivity tracking,
//! periodic stats, and a security seam into a single observable state.
//!
//! Money is always an `i64` in minor units; timestamps are UTC.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod client;
mod error;
pub mod gateway;
pub mod manager;
pub mod network;
pub mod queue;
pub mod security;
pub mod store;
pub mod sync;
#[cfg(test)]
#[allow(clippy::unwrap_used, missing_docs)]
mod test_support;

pub use client::{
    ApiResponse, DataSource, OfflineClient, OfflineStatus, QueuedReceipt, WriteOutcome,
};
pub use error::{Error, Result};
pub use gateway::{BankGateway, GatewayResult};
pub use manager::{ManagerConfig, ManagerState, OfflineManager, SyncStats};
pub use network::NetworkMonitor;
pub use queue::{ActionId, ActionKind, ActionPayload, ActionQueue, ActionStatus, QueuedAction};
pub use security::{Compliance, SecurityStatus, SecurityValidator};
pub use store::{IntegrityReport, LocalStore, StorageStats, SyncMetadata};
pub use sync::{NetworkSnapshot, RetryPolicy, SyncManager, SyncReport};

// Re-exported wire models so downstream code rarely needs `starbank_api`
// directly.
pub use starbank_api::{
    Account, BillPaymentRequest, PaymentReceipt, Transaction, TransactionKind,
    TransferConfirmation, TransferPreparation, TransferReceipt, TransferRequest,
};

/// Metadata scope under which the queue drain records its last success.
pub const SYNC_SCOPE_GLOBAL: &str = "global";
