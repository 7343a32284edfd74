//! Offline-first client façade.
//!
//! Implements the cache-first read policy and the queue-on-failure write
//! policy: reads serve the local store immediately and refresh from the
//! network in the background; writes go to the network when possible and
//! fall back to the durable action queue otherwise.

mod envelope;

pub use envelope::{ApiResponse, DataSource, OfflineStatus, QueuedReceipt, WriteOutcome};

use std::sync::Arc;

use tracing::{debug, warn};

use starbank_api::{
    Account, BillPaymentRequest, PaymentReceipt, Transaction, TransferConfirmation,
    TransferPreparation, TransferReceipt, TransferRequest,
};

use crate::gateway::BankGateway;
use crate::network::NetworkMonitor;
use crate::queue::{ActionPayload, ActionQueue};
use crate::store::LocalStore;
use crate::sync::{SyncManager, SyncReport};
use crate::{Error, Result, SYNC_SCOPE_GLOBAL};

/// Offline-first client over the local store, the action queue, and the
/// network gateway.
///
/// Cheap to clone; clones share all state. Local reads never block on the
/// network and network calls never block on the store.
pub struct OfflineClient<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for OfflineClient<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<G> {
    store: Arc<LocalStore>,
    queue: Arc<ActionQueue>,
    sync: Arc<SyncManager<G>>,
    gateway: Arc<G>,
    network: NetworkMonitor,
}

impl<G: BankGateway> OfflineClient<G> {
    /// Creates a client over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<LocalStore>,
        queue: Arc<ActionQueue>,
        sync: Arc<SyncManager<G>>,
        gateway: Arc<G>,
        network: NetworkMonitor,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                queue,
                sync,
                gateway,
                network,
            }),
        }
    }

    /// Returns all accounts, cache first.
    ///
    /// A cache hit is returned immediately and refreshed in the background
    /// when online. A cache miss while online fetches synchronously and
    /// populates the store before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OfflineNoData`] on a cache miss while offline, or
    /// an error if the store or the synchronous fetch fails.
    pub async fn accounts(&self) -> Result<ApiResponse<Vec<Account>>> {
        let cached = self.inner.store.all_accounts().await?;

        if !cached.is_empty() {
            if self.inner.network.is_online() {
                self.spawn_accounts_refresh();
            }
            return Ok(ApiResponse::cache(cached));
        }

        if self.inner.network.is_online() {
            let accounts = self.inner.gateway.fetch_accounts().await?;
            self.inner.store.store_accounts(&accounts).await?;
            return Ok(ApiResponse::network(accounts));
        }

        Err(Error::OfflineNoData {
            resource: "accounts".into(),
        })
    }

    /// Returns one account, cache first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OfflineNoData`] on a cache miss while offline, or
    /// an error if the store or the synchronous fetch fails.
    pub async fn account(&self, account_id: &str) -> Result<ApiResponse<Account>> {
        if let Some(cached) = self.inner.store.account(account_id).await? {
            if self.inner.network.is_online() {
                self.spawn_account_refresh(account_id.to_string());
            }
            return Ok(ApiResponse::cache(cached));
        }

        if self.inner.network.is_online() {
            let account = self.inner.gateway.fetch_account(account_id).await?;
            self.inner.store.store_account(&account).await?;
            return Ok(ApiResponse::network(account));
        }

        Err(Error::OfflineNoData {
            resource: "account".into(),
        })
    }

    /// Returns the most recent transactions for an account, cache first.
    ///
    /// Offline, the cached list is returned even when empty: an empty
    /// ledger is a valid cached result, unlike a missing account.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the synchronous fetch fails.
    pub async fn transactions(
        &self,
        account_id: &str,
        limit: u32,
    ) -> Result<ApiResponse<Vec<Transaction>>> {
        let cached = self
            .inner
            .store
            .transactions_for_account(account_id, limit)
            .await?;

        if !self.inner.network.is_online() {
            return Ok(ApiResponse::cache(cached));
        }

        if !cached.is_empty() {
            self.spawn_transactions_refresh(account_id.to_string(), limit);
            return Ok(ApiResponse::cache(cached));
        }

        let transactions = self
            .inner
            .gateway
            .fetch_transactions(account_id, limit)
            .await?;
        self.inner.store.store_transactions(&transactions).await?;
        Ok(ApiResponse::network(transactions))
    }

    /// Prepares a transfer, queueing it when the network is unavailable.
    ///
    /// Online, the backend is tried first; a transport failure (or being
    /// offline from the start) enqueues the request durably and returns a
    /// [`QueuedReceipt`] whose action identifier is the caller's handle
    /// for the pending operation.
    ///
    /// # Errors
    ///
    /// Returns an error only if enqueueing itself fails.
    pub async fn prepare_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<ApiResponse<WriteOutcome<TransferPreparation>>> {
        if self.inner.network.is_online() {
            match self.inner.gateway.prepare_transfer(&request).await {
                Ok(preparation) => {
                    return Ok(ApiResponse::network(WriteOutcome::Confirmed(preparation)));
                }
                Err(e) => {
                    warn!(error = %e, "transfer preparation failed, queueing");
                }
            }
        }

        let action_id = self
            .inner
            .queue
            .enqueue(ActionPayload::Transfer(request))
            .await?;
        Ok(ApiResponse::offline(WriteOutcome::Queued(
            QueuedReceipt::new(action_id, "Transfer queued for processing when online"),
        )))
    }

    /// Executes a previously prepared transfer. Network presence is
    /// required unconditionally: execution finalizes a monetary action and
    /// is never queued speculatively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransferExecution`] while offline, or the
    /// backend's error on failure.
    pub async fn execute_transfer(
        &self,
        transfer_id: &str,
        confirmation: &TransferConfirmation,
    ) -> Result<ApiResponse<TransferReceipt>> {
        if !self.inner.network.is_online() {
            return Err(Error::TransferExecution(
                "transfer execution requires an internet connection".into(),
            ));
        }

        let receipt = self
            .inner
            .gateway
            .execute_transfer(transfer_id, confirmation)
            .await?;
        Ok(ApiResponse::network(receipt))
    }

    /// Submits a bill payment, queueing it when the network is
    /// unavailable. Same contract as [`prepare_transfer`].
    ///
    /// [`prepare_transfer`]: OfflineClient::prepare_transfer
    ///
    /// # Errors
    ///
    /// Returns an error only if enqueueing itself fails.
    pub async fn queue_bill_payment(
        &self,
        request: BillPaymentRequest,
    ) -> Result<ApiResponse<WriteOutcome<PaymentReceipt>>> {
        if self.inner.network.is_online() {
            match self.inner.gateway.pay_bill(&request).await {
                Ok(receipt) => {
                    return Ok(ApiResponse::network(WriteOutcome::Confirmed(receipt)));
                }
                Err(e) => {
                    warn!(error = %e, "bill payment failed, queueing");
                }
            }
        }

        let action_id = self
            .inner
            .queue
            .enqueue(ActionPayload::BillPayment(request))
            .await?;
        Ok(ApiResponse::offline(WriteOutcome::Queued(
            QueuedReceipt::new(action_id, "Bill payment queued for processing when online"),
        )))
    }

    /// Aggregated offline status for the polling status surface.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator query fails.
    pub async fn offline_status(&self) -> Result<OfflineStatus> {
        let pending_transfers = self.inner.sync.pending_transfers_count().await?;
        let pending_bill_payments = self.inner.sync.pending_bill_payments_count().await?;
        let stats = self.inner.store.storage_stats().await?;
        let metadata = self.inner.store.sync_metadata(SYNC_SCOPE_GLOBAL).await?;

        Ok(OfflineStatus {
            pending_transfers,
            pending_bill_payments,
            last_sync: metadata.and_then(|m| m.last_sync),
            cache_size_bytes: stats.total_size_bytes,
        })
    }

    /// Drains the action queue now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SyncOffline`] while offline.
    pub async fn force_sync_now(&self) -> Result<SyncReport> {
        if !self.inner.network.is_online() {
            return Err(Error::SyncOffline);
        }
        self.inner.sync.force_sync_now().await
    }

    /// Irreversibly wipes all offline data.
    ///
    /// # Errors
    ///
    /// Returns an error if the wipe fails; no partial wipe is observable.
    pub async fn clear_offline_data(&self) -> Result<()> {
        self.inner.store.reset().await
    }

    pub(crate) fn store(&self) -> &Arc<LocalStore> {
        &self.inner.store
    }

    pub(crate) fn sync_manager(&self) -> &Arc<SyncManager<G>> {
        &self.inner.sync
    }

    pub(crate) fn network(&self) -> &NetworkMonitor {
        &self.inner.network
    }

    // === Background refresh ===
    //
    // Failures here are logged and dropped: the caller already holds a
    // cache response, and the next read retries naturally.

    fn spawn_accounts_refresh(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match inner.gateway.fetch_accounts().await {
                Ok(accounts) => {
                    if let Err(e) = inner.store.store_accounts(&accounts).await {
                        warn!(error = %e, "failed to cache refreshed accounts");
                    } else {
                        debug!(count = accounts.len(), "background account refresh done");
                    }
                }
                Err(e) => warn!(error = %e, "background account refresh failed"),
            }
        });
    }

    fn spawn_account_refresh(&self, account_id: String) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match inner.gateway.fetch_account(&account_id).await {
                Ok(account) => {
                    if let Err(e) = inner.store.store_account(&account).await {
                        warn!(error = %e, account_id, "failed to cache refreshed account");
                    }
                }
                Err(e) => warn!(error = %e, account_id, "background account refresh failed"),
            }
        });
    }

    fn spawn_transactions_refresh(&self, account_id: String, limit: u32) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match inner.gateway.fetch_transactions(&account_id, limit).await {
                Ok(transactions) => {
                    if let Err(e) = inner.store.store_transactions(&transactions).await {
                        warn!(error = %e, account_id, "failed to cache refreshed transactions");
                    }
                }
                Err(e) => {
                    warn!(error = %e, account_id, "background transaction refresh failed");
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sync::RetryPolicy;
    use crate::test_support::{MockGateway, account, bill_payment_request, transfer_request};

    struct Fixture {
        gateway: Arc<MockGateway>,
        network: NetworkMonitor,
        client: OfflineClient<MockGateway>,
    }

    async fn fixture(online: bool) -> Fixture {
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
        let client = OfflineClient::new(store, queue, sync, Arc::clone(&gateway), network.clone());
        Fixture {
            gateway,
            network,
            client,
        }
    }

    #[tokio::test]
    async fn offline_cache_hit_never_touches_the_network() {
        let f = fixture(false).await;
        f.client
            .store()
            .store_account(&account("acc-1", 1_000))
            .await
            .unwrap();

        let response = f.client.accounts().await.unwrap();

        assert_eq!(response.source, DataSource::Cache);
        assert!(response.cached);
        assert_eq!(response.data.len(), 1);
        assert_eq!(f.gateway.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn online_cache_miss_fetches_exactly_once_and_populates_cache() {
        let f = fixture(true).await;
        f.gateway.set_accounts(vec![account("acc-1", 100), account("acc-2", 200)]);

        let response = f.client.accounts().await.unwrap();

        assert_eq!(response.source, DataSource::Network);
        assert!(!response.cached);
        assert_eq!(response.data.len(), 2);
        assert_eq!(f.gateway.fetch_calls(), 1);

        // Subsequent offline read serves the populated cache.
        f.network.set_online(false);
        let offline = f.client.accounts().await.unwrap();
        assert_eq!(offline.source, DataSource::Cache);
        assert_eq!(offline.data.len(), 2);
    }

    #[tokio::test]
    async fn offline_cache_miss_is_a_hard_error() {
        let f = fixture(false).await;

        let err = f.client.accounts().await.unwrap_err();
        assert_eq!(err.code(), "OFFLINE_NO_DATA");

        let err = f.client.account("acc-1").await.unwrap_err();
        assert_eq!(err.code(), "OFFLINE_NO_DATA");
    }

    #[tokio::test]
    async fn offline_transactions_return_empty_cache_envelope() {
        let f = fixture(false).await;

        let response = f.client.transactions("acc-1", 50).await.unwrap();
        assert_eq!(response.source, DataSource::Cache);
        assert!(response.data.is_empty());
    }

    #[tokio::test]
    async fn offline_transfer_is_queued_with_a_durable_handle() {
        let f = fixture(false).await;

        let response = f.client.prepare_transfer(transfer_request()).await.unwrap();

        assert_eq!(response.source, DataSource::Offline);
        let receipt = response.data.queued().unwrap().clone();
        assert_eq!(receipt.status, "queued");

        let status = f.client.offline_status().await.unwrap();
        assert_eq!(status.pending_transfers, 1);

        // The handle stays resolvable.
        let action = f.client.inner.queue.get(receipt.action_id).await.unwrap();
        assert!(action.is_some());
    }

    #[tokio::test]
    async fn failed_online_write_falls_back_to_the_queue() {
        let f = fixture(true).await;
        f.gateway.fail_writes(true);

        let response = f.client.queue_bill_payment(bill_payment_request()).await.unwrap();

        assert_eq!(response.source, DataSource::Offline);
        assert!(response.data.queued().is_some());
        assert_eq!(
            f.client.offline_status().await.unwrap().pending_bill_payments,
            1
        );
    }

    #[tokio::test]
    async fn online_write_is_confirmed_and_not_queued() {
        let f = fixture(true).await;

        let response = f.client.prepare_transfer(transfer_request()).await.unwrap();

        assert_eq!(response.source, DataSource::Network);
        assert!(response.data.confirmed().is_some());
        assert_eq!(f.client.offline_status().await.unwrap().pending_transfers, 0);
    }

    #[tokio::test]
    async fn execute_transfer_offline_fails_hard_and_is_never_queued() {
        let f = fixture(false).await;

        let err = f
            .client
            .execute_transfer("tr-1", &TransferConfirmation {
                confirmation_code: "000000".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "TRANSFER_EXECUTION_FAILED");
        let status = f.client.offline_status().await.unwrap();
        assert_eq!(status.pending_transfers, 0);
        assert_eq!(status.pending_bill_payments, 0);
    }

    #[tokio::test]
    async fn force_sync_fails_fast_while_offline() {
        let f = fixture(false).await;
        let err = f.client.force_sync_now().await.unwrap_err();
        assert_eq!(err.code(), "SYNC_OFFLINE");
    }

    #[tokio::test]
    async fn clear_offline_data_empties_everything() {
        let f = fixture(false).await;
        f.client
            .store()
            .store_account(&account("acc-1", 1_000))
            .await
            .unwrap();
        f.client.prepare_transfer(transfer_request()).await.unwrap();

        f.client.clear_offline_data().await.unwrap();

        let err = f.client.accounts().await.unwrap_err();
        assert_eq!(err.code(), "OFFLINE_NO_DATA");
        let status = f.client.offline_status().await.unwrap();
        assert_eq!(status.pending_transfers, 0);
        let stats = f.client.store().storage_stats().await.unwrap();
        assert_eq!(stats.accounts, 0);
    }
}
