//! Aggregate offline manager façade.
//!
//! Composes the local store, the sync manager, the offline-first client,
//! and the security validator into one observable state snapshot plus an
//! operator action surface, so a UI layer can poll and act without any of
//! its logic leaking into the core.
//!
//! The façade is built to run unattended: failures surface as appended
//! `errors`/`warnings` entries in the state snapshot, never as panics or
//! propagated errors.

mod state;

pub use state::{ManagerState, SyncStats};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, warn};

use crate::client::OfflineClient;
use crate::gateway::BankGateway;
use crate::security::SecurityValidator;
use crate::store::IntegrityReport;
use crate::Result;

/// Timing configuration for the façade's background tasks.
#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    /// Interval between periodic stats refreshes.
    pub stats_interval: Duration,
    /// Delay between an online transition and the triggered sync attempt.
    pub online_sync_debounce: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            stats_interval: Duration::from_secs(5),
            online_sync_debounce: Duration::from_secs(1),
        }
    }
}

/// Unified entry point for the offline subsystem.
///
/// Constructed explicitly and torn down with [`shutdown`]; there is no
/// module-level singleton, so tests can run isolated instances
/// concurrently.
///
/// [`shutdown`]: OfflineManager::shutdown
pub struct OfflineManager<G, S> {
    inner: Arc<Inner<G, S>>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

struct Inner<G, S> {
    client: OfflineClient<G>,
    security: S,
    state: RwLock<ManagerState>,
    sync_paused: AtomicBool,
    config: ManagerConfig,
}

impl<G: BankGateway, S: SecurityValidator> OfflineManager<G, S> {
    /// Creates a manager over the given client and security validator.
    ///
    /// Nothing runs until [`initialize`](OfflineManager::initialize) is
    /// called.
    #[must_use]
    pub fn new(client: OfflineClient<G>, security: S, config: ManagerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                security,
                state: RwLock::new(ManagerState::default()),
                sync_paused: AtomicBool::new(false),
                config,
            }),
            tasks: StdMutex::new(Vec::new()),
        }
    }

    /// Runs the initialization sequence: read security status, validate
    /// the session, take an initial stats snapshot, then start the
    /// periodic stats refresh and the connectivity listener.
    ///
    /// A failure leaves the façade in an explicit not-initialized state
    /// with the failure appended to `errors`; it never panics.
    pub async fn initialize(&self) {
        let security_status = self.inner.security.security_status();
        let session_valid = self.inner.security.validate_session().await;

        {
            let mut state = self.inner.state.write().await;
            state.security = security_status;
            state.security.session_active = session_valid;
            state.is_secure = security_status.keys_initialized;
            state.is_online = self.inner.client.network().is_online();
        }

        match self.inner.refresh_stats().await {
            Ok(()) => {
                self.inner.state.write().await.is_initialized = true;
                self.spawn_background_tasks();
            }
            Err(e) => {
                error!(error = %e, "offline manager initialization failed");
                self.inner
                    .push_error(format!("Initialization failed: {e}"))
                    .await;
            }
        }
    }

    /// Returns a snapshot of the current state.
    pub async fn state(&self) -> ManagerState {
        self.inner.state.read().await.clone()
    }

    /// Drains the action queue now, recording the outcome in the state.
    ///
    /// While offline or paused this appends a warning instead of failing.
    pub async fn force_sync_now(&self) {
        if !self.inner.client.network().is_online() {
            self.inner.push_warning("Cannot sync while offline").await;
            return;
        }
        if self.inner.sync_paused.load(Ordering::SeqCst) {
            self.inner.push_warning("Sync is currently paused").await;
            return;
        }
        self.inner.run_sync().await;
    }

    /// Suspends automatic sync attempts.
    pub async fn pause_sync(&self) {
        self.inner.sync_paused.store(true, Ordering::SeqCst);
        self.inner.push_warning("Synchronization paused").await;
    }

    /// Resumes automatic sync attempts, triggering one immediately (after
    /// the configured debounce) when currently online.
    pub async fn resume_sync(&self) {
        self.inner.sync_paused.store(false, Ordering::SeqCst);
        self.inner.push_warning("Synchronization resumed").await;

        if self.inner.client.network().is_online() {
            let inner = Arc::clone(&self.inner);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(inner.config.online_sync_debounce).await;
                inner.run_sync().await;
            });
            self.track(handle);
        }
    }

    /// Irreversibly wipes all offline data.
    pub async fn clear_offline_data(&self) {
        match self.inner.client.clear_offline_data().await {
            Ok(()) => {
                if let Err(e) = self.inner.refresh_stats().await {
                    warn!(error = %e, "stats refresh after wipe failed");
                }
                self.inner
                    .push_warning("All offline data has been cleared")
                    .await;
            }
            Err(e) => {
                self.inner
                    .push_error(format!("Failed to clear offline data: {e}"))
                    .await;
            }
        }
    }

    /// Checks stored data for structural problems.
    ///
    /// Issues found are surfaced as a warning; check failures as an error.
    pub async fn validate_data_integrity(&self) -> IntegrityReport {
        match self.inner.client.store().validate_integrity().await {
            Ok(report) => {
                if !report.valid {
                    self.inner
                        .push_warning(format!(
                            "Data integrity issues found: {} errors",
                            report.errors.len()
                        ))
                        .await;
                }
                report
            }
            Err(e) => {
                let message = format!("Data validation failed: {e}");
                self.inner.push_error(message.clone()).await;
                IntegrityReport {
                    valid: false,
                    errors: vec![message],
                }
            }
        }
    }

    /// Re-validates the session with the security collaborator.
    pub async fn validate_session(&self) -> bool {
        let valid = self.inner.security.validate_session().await;
        {
            let mut state = self.inner.state.write().await;
            state.security.session_active = valid;
        }
        if !valid {
            self.inner.push_warning("Session expired or invalid").await;
        }
        valid
    }

    /// Rotates security key material.
    pub async fn rotate_security_keys(&self) {
        if self.inner.security.rotate_keys().await {
            self.inner
                .push_warning("Security keys rotated successfully")
                .await;
        } else {
            self.inner.push_error("Key rotation failed").await;
        }
    }

    /// Attempts to enable biometric unlock.
    pub async fn enable_biometrics(&self) -> bool {
        let enabled = self.inner.security.enable_biometric_auth().await;
        if enabled {
            let mut state = self.inner.state.write().await;
            state.security.biometric_enabled = true;
            state
                .warnings
                .push("Biometric authentication enabled".into());
        } else {
            self.inner
                .push_warning("Biometric authentication setup failed")
                .await;
        }
        enabled
    }

    /// Dismisses the error at `index`. Subsequent indices shift down, so
    /// re-read the list after each dismissal.
    pub async fn dismiss_error(&self, index: usize) {
        let mut state = self.inner.state.write().await;
        if index < state.errors.len() {
            state.errors.remove(index);
        }
    }

    /// Dismisses the warning at `index`.
    pub async fn dismiss_warning(&self, index: usize) {
        let mut state = self.inner.state.write().await;
        if index < state.warnings.len() {
            state.warnings.remove(index);
        }
    }

    /// Refreshes the stat blocks on demand.
    pub async fn refresh_stats(&self) {
        if let Err(e) = self.inner.refresh_stats().await {
            warn!(error = %e, "stats refresh failed");
        }
    }

    /// Stops the background tasks. Idempotent.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    fn spawn_background_tasks(&self) {
        // Periodic stats refresh.
        let inner = Arc::clone(&self.inner);
        let stats = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.stats_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // the initial immediate tick
            loop {
                ticker.tick().await;
                if let Err(e) = inner.refresh_stats().await {
                    warn!(error = %e, "periodic stats refresh failed");
                }
            }
        });
        self.track(stats);

        // Connectivity listener: debounced sync on transition to online.
        let inner = Arc::clone(&self.inner);
        let connectivity = tokio::spawn(async move {
            let mut rx = inner.client.network().subscribe();
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                inner.state.write().await.is_online = online;
                if online {
                    tokio::time::sleep(inner.config.online_sync_debounce).await;
                    if !inner.sync_paused.load(Ordering::SeqCst)
                        && inner.client.network().is_online()
                    {
                        inner.run_sync().await;
                    }
                }
            }
        });
        self.track(connectivity);
    }

    fn track(&self, handle: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handle);
    }
}

impl<G, S> Drop for OfflineManager<G, S> {
    fn drop(&mut self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl<G: BankGateway, S: SecurityValidator> Inner<G, S> {
    async fn run_sync(&self) {
        let result = self.client.sync_manager().force_sync_now().await;

        {
            let mut state = self.state.write().await;
            match result {
                Ok(report) if report.success => {
                    state.sync.failed_syncs = 0;
                    state
                        .warnings
                        .push(format!("Sync completed: {} items synced", report.synced));
                }
                Ok(report) => {
                    state.sync.failed_syncs += 1;
                    state
                        .errors
                        .push(format!("Sync failed: {}", report.errors.join(", ")));
                }
                Err(e) => {
                    state.sync.failed_syncs += 1;
                    state.errors.push(format!("Sync failed: {e}"));
                }
            }
        }

        if let Err(e) = self.refresh_stats().await {
            warn!(error = %e, "stats refresh after sync failed");
        }
    }

    async fn refresh_stats(&self) -> Result<()> {
        let storage = self.client.store().storage_stats().await?;
        let offline = self.client.offline_status().await?;
        let snapshot = self.client.sync_manager().network_status();
        let security = self.security.security_status();

        let mut state = self.state.write().await;
        state.is_online = snapshot.is_online;
        state.is_syncing = snapshot.is_syncing;
        state.storage = storage;
        state.sync.last_sync = offline.last_sync;
        state.sync.pending_transfers = offline.pending_transfers;
        state.sync.pending_bill_payments = offline.pending_bill_payments;
        // Session and biometric flags are owned by the validation actions,
        // not the periodic status read.
        let session_active = state.security.session_active;
        let biometric_enabled = state.security.biometric_enabled;
        state.security = security;
        state.security.session_active = session_active;
        state.security.biometric_enabled = biometric_enabled;
        state.is_secure = security.keys_initialized;
        Ok(())
    }

    async fn push_error(&self, message: impl Into<String>) {
        self.state.write().await.errors.push(message.into());
    }

    async fn push_warning(&self, message: impl Into<String>) {
        self.state.write().await.warnings.push(message.into());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::network::NetworkMonitor;
    use crate::queue::{ActionPayload, ActionQueue};
    use crate::store::LocalStore;
    use crate::sync::{RetryPolicy, SyncManager};
    use crate::test_support::{MockGateway, MockSecurity, transfer_request};

    fn quick_config() -> ManagerConfig {
        ManagerConfig {
            stats_interval: Duration::from_secs(3600),
            online_sync_debounce: Duration::ZERO,
        }
    }

    struct Fixture {
        gateway: Arc<MockGateway>,
        network: NetworkMonitor,
        queue: Arc<ActionQueue>,
        manager: OfflineManager<MockGateway, MockSecurity>,
    }

    async fn fixture(online: bool, security: MockSecurity) -> Fixture {
        let store = Arc::new(LocalStore::in_memory().await.unwrap());
        let queue = Arc::new(ActionQueue::new(&store));
        let gateway = Arc::new(MockGateway::default());
        let network = NetworkMonitor::new(online);
        let sync = Arc::new(SyncManager::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&gateway),
            network.clone(),
            RetryPolicy::default(),
        ));
        let client = OfflineClient::new(
            store,
            Arc::clone(&queue),
            sync,
            Arc::clone(&gateway),
            network.clone(),
        );
        let manager = OfflineManager::new(client, security, quick_config());
        Fixture {
            gateway,
            network,
            queue,
            manager,
        }
    }

    #[tokio::test]
    async fn initialize_marks_initialized_and_reads_security() {
        let security = MockSecurity::with_keys_initialized();
        let f = fixture(true, security).await;

        f.manager.initialize().await;

        let state = f.manager.state().await;
        assert!(state.is_initialized);
        assert!(state.is_secure);
        assert!(state.security.session_active);
        assert!(state.errors.is_empty());
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn force_sync_while_offline_warns_instead_of_failing() {
        let f = fixture(false, MockSecurity::default()).await;
        f.manager.initialize().await;

        f.manager.force_sync_now().await;

        let state = f.manager.state().await;
        assert!(state.warnings.iter().any(|w| w.contains("offline")));
        assert!(state.errors.is_empty());
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn force_sync_while_paused_warns_and_skips() {
        let f = fixture(true, MockSecurity::default()).await;
        f.manager.initialize().await;
        f.queue
            .enqueue(ActionPayload::Transfer(transfer_request()))
            .await
            .unwrap();

        f.manager.pause_sync().await;
        f.manager.force_sync_now().await;

        assert_eq!(f.gateway.prepare_calls(), 0);
        let state = f.manager.state().await;
        assert!(state.warnings.iter().any(|w| w.contains("paused")));
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn online_transition_triggers_a_drain() {
        let f = fixture(false, MockSecurity::default()).await;
        f.manager.initialize().await;
        f.queue
            .enqueue(ActionPayload::Transfer(transfer_request()))
            .await
            .unwrap();

        f.network.set_online(true);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(f.gateway.prepare_calls(), 1);
        let state = f.manager.state().await;
        assert!(state.is_online);
        assert_eq!(state.sync.pending_transfers, 0);
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn failed_drains_increment_failed_syncs_until_a_success() {
        let f = fixture(true, MockSecurity::default()).await;
        f.manager.initialize().await;
        f.queue
            .enqueue(ActionPayload::Transfer(transfer_request()))
            .await
            .unwrap();
        f.gateway.fail_writes(true);

        f.manager.force_sync_now().await;
        assert_eq!(f.manager.state().await.sync.failed_syncs, 1);

        f.gateway.fail_writes(false);
        f.manager.force_sync_now().await;
        let state = f.manager.state().await;
        assert_eq!(state.sync.failed_syncs, 0);
        assert!(state.warnings.iter().any(|w| w.contains("Sync completed")));
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn dismissal_removes_exactly_the_indexed_entry() {
        // Offline, so resume does not spawn a sync that would append its
        // own warning between the reads below.
        let f = fixture(false, MockSecurity::default()).await;
        f.manager.initialize().await;
        f.manager.pause_sync().await;
        f.manager.resume_sync().await;

        let before = f.manager.state().await.warnings;
        assert!(before.len() >= 2);

        f.manager.dismiss_warning(0).await;
        let after = f.manager.state().await.warnings;
        assert_eq!(after.len(), before.len() - 1);
        assert_eq!(after[0], before[1]);

        // Out-of-range dismissal is a no-op.
        f.manager.dismiss_warning(999).await;
        assert_eq!(f.manager.state().await.warnings.len(), after.len());
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn clear_offline_data_resets_stats_and_warns() {
        let f = fixture(true, MockSecurity::default()).await;
        f.manager.initialize().await;
        f.queue
            .enqueue(ActionPayload::Transfer(transfer_request()))
            .await
            .unwrap();

        f.manager.clear_offline_data().await;

        let state = f.manager.state().await;
        assert_eq!(state.storage.queued_actions, 0);
        assert!(state.warnings.iter().any(|w| w.contains("cleared")));
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn integrity_issues_surface_as_warnings() {
        let f = fixture(true, MockSecurity::default()).await;
        f.manager.initialize().await;

        // An orphaned transaction: account never cached.
        let store = f.manager.inner.client.store();
        store
            .store_transaction(&crate::test_support::transaction("ghost", "tx-1"))
            .await
            .unwrap();

        let report = f.manager.validate_data_integrity().await;
        assert!(!report.valid);
        let state = f.manager.state().await;
        assert!(state.warnings.iter().any(|w| w.contains("integrity")));
        f.manager.shutdown();
    }

    #[tokio::test]
    async fn enable_biometrics_updates_security_state() {
        let f = fixture(true, MockSecurity::with_keys_initialized()).await;
        f.manager.initialize().await;

        assert!(f.manager.enable_biometrics().await);
        assert!(f.manager.state().await.security.biometric_enabled);
        f.manager.shutdown();
    }
}
