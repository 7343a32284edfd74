//! Local store for offline-first reads.
//!
//! Durable, namespaced persistence for account and transaction snapshots
//! plus sync metadata. This is the system of record for offline reads:
//! everything in here was produced by a successful network response.

mod model;
mod repository;

pub use model::{IntegrityReport, StorageStats, SyncMetadata};
pub use repository::LocalStore;
