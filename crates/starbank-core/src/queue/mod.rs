//! Durable queue of pending write operations.
//!
//! Transfers and bill payments attempted while offline (or whose network
//! attempt failed) land here and are replayed by the sync manager when
//! connectivity returns. Actions are never silently dropped: a failed
//! action stays pending until it either replays successfully or exhausts
//! its retry policy and becomes terminal, at which point it remains
//! visible in stats until explicitly cleared.

mod model;
mod repository;

pub use model::{ActionId, ActionKind, ActionPayload, ActionStatus, QueuedAction};
pub use repository::ActionQueue;
