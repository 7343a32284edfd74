//! Connectivity state, observable by the rest of the core.
//!
//! A thin wrapper over a [`tokio::sync::watch`] channel: the platform's
//! connectivity signal feeds [`NetworkMonitor::set_online`], and consumers
//! either take a synchronous snapshot or subscribe for transitions. There
//! are no hidden listener registries; a dropped receiver unsubscribes
//! itself.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Single source of truth for online/offline state.
///
/// Cheap to clone; all clones share the same state. Transitioning to
/// offline never cancels network calls already in flight; they fail
/// naturally and fall back through the usual paths.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx: Arc::new(tx) }
    }

    /// Current state, read synchronously.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Feeds a connectivity observation from the platform signal.
    ///
    /// Subscribers are notified only on actual transitions; repeated
    /// observations of the same state are coalesced.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }

    /// Subscribes to connectivity transitions.
    ///
    /// The receiver yields the new state on every transition, in both
    /// directions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
