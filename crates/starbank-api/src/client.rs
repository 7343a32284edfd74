//! JSON-over-HTTPS client for the StarBank backend.

use std::sync::Arc;

use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    Account, BillPaymentRequest, PaymentReceipt, Transaction, TransferConfirmation,
    TransferPreparation, TransferReceipt, TransferRequest,
};

/// Source of the bearer credential attached to each request.
///
/// The session store lives outside this crate; the client only needs the
/// current token, read fresh per request so rotation takes effect without
/// rebuilding the client.
pub trait TokenProvider: Send + Sync {
    /// Returns the current bearer token, or `None` when no session exists.
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, useful for tests and short-lived tools.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// HTTP client for the StarBank backend.
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    /// Fetches all accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not 2xx.
    pub async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        self.get("/accounts").await
    }

    /// Fetches a single account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not 2xx.
    pub async fn fetch_account(&self, account_id: &str) -> Result<Account> {
        self.get(&format!("/accounts/{account_id}")).await
    }

    /// Fetches the most recent transactions for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not 2xx.
    pub async fn fetch_transactions(
        &self,
        account_id: &str,
        limit: u32,
    ) -> Result<Vec<Transaction>> {
        let url = self
            .config
            .endpoint(&format!("/accounts/{account_id}/transactions"))?;
        let request = self.http.get(url).query(&[("limit", limit)]);
        self.execute(request).await
    }

    /// Prepares a transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not 2xx.
    pub async fn prepare_transfer(&self, request: &TransferRequest) -> Result<TransferPreparation> {
        self.post("/transfer/prepare", request).await
    }

    /// Executes a previously prepared transfer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not 2xx.
    pub async fn execute_transfer(
        &self,
        transfer_id: &str,
        confirmation: &TransferConfirmation,
    ) -> Result<TransferReceipt> {
        self.post(&format!("/transfer/{transfer_id}/execute"), confirmation)
            .await
    }

    /// Submits a bill payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not 2xx.
    pub async fn pay_bill(&self, request: &BillPaymentRequest) -> Result<PaymentReceipt> {
        self.post("/bills/pay", request).await
    }

    // === Private helpers ===

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.endpoint(path)?;
        self.execute(self.http.get(url)).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.config.endpoint(path)?;
        self.execute(self.http.post(url).json(body)).await
    }

    async fn execute<T: DeserializeOwned>(&self, mut request: RequestBuilder) -> Result<T> {
        if let Some(token) = self.tokens.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.request_timeout)
            } else {
                Error::Http(e)
            }
        })?;

        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        debug!(status = status.as_u16(), "backend returned error status");
        let message = match response.text().await {
            Ok(body) if !body.is_empty() => body,
            _ => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
