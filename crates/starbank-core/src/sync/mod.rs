//! Queue drain and retry policy.
//!
//! The sync manager replays queued write operations against the backend
//! when connectivity allows, applying one centralized retry policy and
//! guaranteeing that no action is replayed twice within a drain cycle.

mod manager;
mod retry;

pub use manager::{NetworkSnapshot, SyncManager, SyncReport};
pub use retry::RetryPolicy;
