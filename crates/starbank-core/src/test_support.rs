//! Shared fakes and fixture builders for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use starbank_api::{
    Account, BillPaymentRequest, PaymentReceipt, Transaction, TransactionKind,
    TransferConfirmation, TransferPreparation, TransferReceipt, TransferRequest,
};

use crate::gateway::{BankGateway, GatewayResult};
use crate::security::{SecurityStatus, SecurityValidator};

/// Scripted in-memory stand-in for the banking backend.
///
/// Reads serve whatever was loaded with [`set_accounts`] /
/// [`set_transactions`]; writes succeed with canned receipts unless
/// [`fail_writes`] flips them to HTTP 503. Every call bumps a counter so
/// tests can assert on network traffic.
///
/// [`set_accounts`]: MockGateway::set_accounts
/// [`set_transactions`]: MockGateway::set_transactions
/// [`fail_writes`]: MockGateway::fail_writes
#[derive(Default)]
pub(crate) struct MockGateway {
    accounts: Mutex<Vec<Account>>,
    transactions: Mutex<Vec<Transaction>>,
    fail_writes: AtomicBool,
    latency: Mutex<Duration>,
    fetch_calls: AtomicUsize,
    prepare_calls: AtomicUsize,
    pay_calls: AtomicUsize,
}

impl MockGateway {
    pub(crate) fn set_accounts(&self, accounts: Vec<Account>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    #[allow(dead_code)]
    pub(crate) fn set_transactions(&self, transactions: Vec<Transaction>) {
        *self.transactions.lock().unwrap() = transactions;
    }

    /// Makes every subsequent write call fail with a retryable 503.
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Adds an artificial delay before every response.
    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prepare_calls(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn pay_calls(&self) -> usize {
        self.pay_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn write_gate(&self) -> GatewayResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(starbank_api::Error::Status {
                status: 503,
                message: "service unavailable".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl BankGateway for MockGateway {
    async fn fetch_accounts(&self) -> GatewayResult<Vec<Account>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn fetch_account(&self, account_id: &str) -> GatewayResult<Account> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| starbank_api::Error::Status {
                status: 404,
                message: format!("account {account_id} not found"),
            })
    }

    async fn fetch_transactions(
        &self,
        account_id: &str,
        limit: u32,
    ) -> GatewayResult<Vec<Transaction>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        let transactions = self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.account_id == account_id)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(transactions)
    }

    async fn prepare_transfer(
        &self,
        request: &TransferRequest,
    ) -> GatewayResult<TransferPreparation> {
        let call = self.prepare_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;
        self.write_gate()?;
        let _ = request;
        Ok(TransferPreparation {
            transfer_id: format!("tr-{call}"),
            status: "prepared".into(),
            fee_minor: 0,
        })
    }

    async fn execute_transfer(
        &self,
        transfer_id: &str,
        _confirmation: &TransferConfirmation,
    ) -> GatewayResult<TransferReceipt> {
        self.simulate_latency().await;
        self.write_gate()?;
        Ok(TransferReceipt {
            transfer_id: transfer_id.to_owned(),
            status: "completed".into(),
            executed_at: Utc::now(),
        })
    }

    async fn pay_bill(&self, request: &BillPaymentRequest) -> GatewayResult<PaymentReceipt> {
        let call = self.pay_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_latency().await;
        self.write_gate()?;
        let _ = request;
        Ok(PaymentReceipt {
            payment_id: format!("pay-{call}"),
            status: "accepted".into(),
            paid_at: Utc::now(),
        })
    }
}

/// Security validator whose answers are fixed at construction.
#[derive(Default)]
pub(crate) struct MockSecurity {
    keys_initialized: bool,
}

impl MockSecurity {
    pub(crate) fn with_keys_initialized() -> Self {
        Self {
            keys_initialized: true,
        }
    }
}

impl SecurityValidator for MockSecurity {
    fn security_status(&self) -> SecurityStatus {
        SecurityStatus {
            keys_initialized: self.keys_initialized,
            ..SecurityStatus::default()
        }
    }

    async fn validate_session(&self) -> bool {
        true
    }

    async fn enable_biometric_auth(&self) -> bool {
        true
    }

    async fn rotate_keys(&self) -> bool {
        true
    }
}

pub(crate) fn account(id: &str, balance_minor: i64) -> Account {
    Account {
        id: id.to_owned(),
        name: format!("Account {id}"),
        account_number: format!("110-{id}"),
        balance_minor,
        updated_at: Utc::now(),
    }
}

pub(crate) fn transaction(account_id: &str, id: &str) -> Transaction {
    Transaction {
        id: id.to_owned(),
        account_id: account_id.to_owned(),
        amount_minor: -2_500,
        balance_after_minor: 97_500,
        description: "Coffee".into(),
        kind: TransactionKind::Debit,
        timestamp: Utc::now(),
    }
}

pub(crate) fn transfer_request() -> TransferRequest {
    TransferRequest {
        from_account_id: "acc-1".into(),
        to_account_number: "110-222-333".into(),
        amount_minor: 50_000,
        memo: Some("rent".into()),
    }
}

pub(crate) fn bill_payment_request() -> BillPaymentRequest {
    BillPaymentRequest {
        account_id: "acc-1".into(),
        biller: "electric-co".into(),
        amount_minor: 12_000,
        reference: Some("INV-2024-0042".into()),
    }
}
