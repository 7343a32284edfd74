//! Seam between the offline core and the banking backend.
//!
//! The core never talks to the network directly; it goes through
//! [`BankGateway`], implemented for the real [`starbank_api::ApiClient`]
//! and by scripted fakes in tests.

use std::future::Future;

use starbank_api::{
    Account, ApiClient, BillPaymentRequest, PaymentReceipt, Transaction, TransferConfirmation,
    TransferPreparation, TransferReceipt, TransferRequest,
};

/// Result alias for gateway calls; errors carry the transport's
/// retryability classification.
pub type GatewayResult<T> = std::result::Result<T, starbank_api::Error>;

/// Network operations the offline core depends on.
///
/// Futures are `Send` because background refreshes and the drain loop run
/// on spawned tasks.
pub trait BankGateway: Send + Sync + 'static {
    /// Fetches all accounts.
    fn fetch_accounts(&self) -> impl Future<Output = GatewayResult<Vec<Account>>> + Send;

    /// Fetches one account.
    fn fetch_account(&self, account_id: &str)
    -> impl Future<Output = GatewayResult<Account>> + Send;

    /// Fetches the most recent transactions for an account.
    fn fetch_transactions(
        &self,
        account_id: &str,
        limit: u32,
    ) -> impl Future<Output = GatewayResult<Vec<Transaction>>> + Send;

    /// Prepares a transfer.
    fn prepare_transfer(
        &self,
        request: &TransferRequest,
    ) -> impl Future<Output = GatewayResult<TransferPreparation>> + Send;

    /// Executes a previously prepared transfer.
    fn execute_transfer(
        &self,
        transfer_id: &str,
        confirmation: &TransferConfirmation,
    ) -> impl Future<Output = GatewayResult<TransferReceipt>> + Send;

    /// Submits a bill payment.
    fn pay_bill(
        &self,
        request: &BillPaymentRequest,
    ) -> impl Future<Output = GatewayResult<PaymentReceipt>> + Send;
}

impl BankGateway for ApiClient {
    async fn fetch_accounts(&self) -> GatewayResult<Vec<Account>> {
        ApiClient::fetch_accounts(self).await
    }

    async fn fetch_account(&self, account_id: &str) -> GatewayResult<Account> {
        ApiClient::fetch_account(self, account_id).await
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        limit: u32,
    ) -> GatewayResult<Vec<Transaction>> {
        ApiClient::fetch_transactions(self, account_id, limit).await
    }

    async fn prepare_transfer(&self, request: &TransferRequest) -> GatewayResult<TransferPreparation> {
        ApiClient::prepare_transfer(self, request).await
    }

    async fn execute_transfer(
        &self,
        transfer_id: &str,
        confirmation: &TransferConfirmation,
    ) -> GatewayResult<TransferReceipt> {
        ApiClient::execute_transfer(self, transfer_id, confirmation).await
    }

    async fn pay_bill(&self, request: &BillPaymentRequest) -> GatewayResult<PaymentReceipt> {
        ApiClient::pay_bill(self, request).await
    }
}
