//! Sync manager: drains the action queue against the backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use crate::gateway::BankGateway;
use crate::network::NetworkMonitor;
use crate::queue::{ActionKind, ActionPayload, ActionQueue, QueuedAction};
use crate::store::LocalStore;
use crate::{Result, SYNC_SCOPE_GLOBAL};

/// Outcome summary of one drain cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Whether every attempted action replayed successfully.
    pub success: bool,
    /// Number of actions replayed and removed from the queue.
    pub synced: usize,
    /// One entry per action that failed this cycle.
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Report for a call that found a drain already in progress.
    #[must_use]
    pub const fn already_running() -> Self {
        Self {
            success: true,
            synced: 0,
            errors: Vec::new(),
        }
    }
}

/// Point-in-time connectivity and sync activity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSnapshot {
    /// Current connectivity state.
    pub is_online: bool,
    /// Whether a drain cycle is running right now.
    pub is_syncing: bool,
}

/// Replays queued write operations when connectivity allows.
///
/// A single drain guard serializes cycles: a `force_sync_now` call that
/// arrives while a drain is running is a no-op rather than a second drain,
/// so no queued action is ever attempted twice concurrently.
pub struct SyncManager<G> {
    store: Arc<LocalStore>,
    queue: Arc<ActionQueue>,
    gateway: Arc<G>,
    network: NetworkMonitor,
    policy: RetryPolicy,
    drain_guard: Mutex<()>,
    syncing: AtomicBool,
}

impl<G: BankGateway> SyncManager<G> {
    /// Creates a sync manager over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<LocalStore>,
        queue: Arc<ActionQueue>,
        gateway: Arc<G>,
        network: NetworkMonitor,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            queue,
            gateway,
            network,
            policy,
            drain_guard: Mutex::new(()),
            syncing: AtomicBool::new(false),
        }
    }

    /// Drains all due pending actions in enqueue order.
    ///
    /// Per action: attempt the network replay; on success remove it; on
    /// failure record the error and either schedule the next attempt per
    /// the retry policy or, once the policy is exhausted, mark the action
    /// terminally failed. Actions enqueued while the drain runs are left
    /// for the next cycle.
    ///
    /// Safe to call concurrently with itself: the second caller returns an
    /// empty report instead of starting a second drain.
    ///
    /// # Errors
    ///
    /// Returns an error if queue or metadata bookkeeping fails; individual
    /// replay failures are reported in the [`SyncReport`], not as errors.
    pub async fn force_sync_now(&self) -> Result<SyncReport> {
        let Ok(_guard) = self.drain_guard.try_lock() else {
            debug!("drain already in progress, skipping");
            return Ok(SyncReport::already_running());
        };

        self.syncing.store(true, Ordering::SeqCst);
        let report = self.drain().await;
        self.syncing.store(false, Ordering::SeqCst);
        report
    }

    async fn drain(&self) -> Result<SyncReport> {
        // Snapshot once: enqueues during this cycle wait for the next one.
        let actions = self.queue.due_pending(Utc::now()).await?;
        if actions.is_empty() {
            self.store
                .set_sync_metadata(SYNC_SCOPE_GLOBAL, Utc::now())
                .await?;
            return Ok(SyncReport {
                success: true,
                synced: 0,
                errors: Vec::new(),
            });
        }

        info!(pending = actions.len(), "draining action queue");
        let mut synced = 0;
        let mut errors = Vec::new();

        for action in actions {
            match self.replay(&action).await {
                Ok(()) => {
                    self.queue.remove(action.id).await?;
                    synced += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    let failed_attempts = action.retry_count + 1;
                    if self.policy.is_exhausted(failed_attempts) {
                        self.queue.mark_terminal(action.id, &message).await?;
                        errors.push(format!(
                            "action {} failed permanently after {failed_attempts} attempts: {message}",
                            action.id
                        ));
                    } else {
                        let delay = self.policy.delay_for(failed_attempts);
                        let next_attempt = Utc::now()
                            + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
                        self.queue
                            .record_failure(action.id, &message, next_attempt)
                            .await?;
                        warn!(
                            action_id = %action.id,
                            attempt = failed_attempts,
                            error = message,
                            "queued action replay failed, will retry"
                        );
                        errors.push(format!(
                            "action {} failed (attempt {failed_attempts}): {message}",
                            action.id
                        ));
                    }
                }
            }
        }

        let success = errors.is_empty();
        if success {
            self.store
                .set_sync_metadata(SYNC_SCOPE_GLOBAL, Utc::now())
                .await?;
        }

        info!(synced, failed = errors.len(), "drain finished");
        Ok(SyncReport {
            success,
            synced,
            errors,
        })
    }

    async fn replay(&self, action: &QueuedAction) -> std::result::Result<(), starbank_api::Error> {
        match &action.payload {
            ActionPayload::Transfer(request) => {
                self.gateway.prepare_transfer(request).await?;
            }
            ActionPayload::BillPayment(request) => {
                self.gateway.pay_bill(request).await?;
            }
        }
        Ok(())
    }

    /// Number of pending transfers, excluding terminal failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_transfers_count(&self) -> Result<u64> {
        self.queue.pending_count(ActionKind::Transfer).await
    }

    /// Number of pending bill payments, excluding terminal failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_bill_payments_count(&self) -> Result<u64> {
        self.queue.pending_count(ActionKind::BillPayment).await
    }

    /// Connectivity and sync activity snapshot.
    #[must_use]
    pub fn network_status(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            is_online: self.network.is_online(),
            is_syncing: self.syncing.load(Ordering::SeqCst),
        }
    }

    /// The retry policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
