//! # starbank-api
//!
//! HTTP transport client for the StarBank backend.
//!
//! This crate provides:
//! - Typed wire models (accounts, transactions, transfers, bill payments)
//! - A JSON-over-HTTPS client with bearer-credential injection
//! - Per-request timeouts
//! - An error taxonomy with retryability classification
//!
//! Non-2xx responses are surfaced as [`Error::Status`] with the status code
//! available, so callers can classify failures via [`Error::is_retryable`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
pub mod model;

pub use client::{ApiClient, StaticToken, TokenProvider};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use model::{
    Account, BillPaymentRequest, PaymentReceipt, Transaction, TransactionKind, TransferConfirmation,
    TransferPreparation, TransferReceipt, TransferRequest,
};
