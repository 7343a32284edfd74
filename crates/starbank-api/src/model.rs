//! Wire data models.
//!
//! All monetary amounts are signed integers in minor units (e.g. cents).
//! Floating point is never used for money.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bank account snapshot as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable account number.
    pub account_number: String,
    /// Current balance in minor units.
    pub balance_minor: i64,
    /// When the snapshot was produced.
    pub updated_at: DateTime<Utc>,
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money in.
    Credit,
    /// Money out.
    Debit,
}

impl TransactionKind {
    /// Stable string form used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

/// One ledger entry. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier, unique within the owning account.
    pub id: String,
    /// Owning account identifier.
    pub account_id: String,
    /// Signed amount in minor units.
    pub amount_minor: i64,
    /// Running balance after this entry, in minor units.
    pub balance_after_minor: i64,
    /// Free-text description.
    pub description: String,
    /// Credit or debit.
    pub kind: TransactionKind,
    /// When the entry was posted.
    pub timestamp: DateTime<Utc>,
}

/// A transfer to be prepared against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Source account identifier.
    pub from_account_id: String,
    /// Destination account number.
    pub to_account_number: String,
    /// Amount in minor units. Always positive.
    pub amount_minor: i64,
    /// Optional memo shown to the recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Backend acknowledgment of a prepared transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPreparation {
    /// Backend-assigned transfer identifier, required for execution.
    pub transfer_id: String,
    /// Preparation status reported by the backend.
    pub status: String,
    /// Fee in minor units, if the backend charges one.
    #[serde(default)]
    pub fee_minor: i64,
}

/// Confirmation payload for executing a prepared transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfirmation {
    /// Second-factor confirmation code.
    pub confirmation_code: String,
}

/// Backend acknowledgment of an executed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Backend transfer identifier.
    pub transfer_id: String,
    /// Final status reported by the backend.
    pub status: String,
    /// When the transfer settled.
    pub executed_at: DateTime<Utc>,
}

/// A bill payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPaymentRequest {
    /// Paying account identifier.
    pub account_id: String,
    /// Biller code.
    pub biller: String,
    /// Amount in minor units. Always positive.
    pub amount_minor: i64,
    /// Biller-side reference (invoice or customer number).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Backend acknowledgment of a bill payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Backend payment identifier.
    pub payment_id: String,
    /// Final status reported by the backend.
    pub status: String,
    /// When the payment was accepted.
    pub paid_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transaction_kind_round_trips_lowercase() {
        let json = serde_json::to_string(&TransactionKind::Credit).unwrap();
        assert_eq!(json, "\"credit\"");
        let kind: TransactionKind = serde_json::from_str("\"debit\"").unwrap();
        assert_eq!(kind, TransactionKind::Debit);
    }

    #[test]
    fn transfer_request_omits_empty_memo() {
        let req = TransferRequest {
            from_account_id: "acc-1".into(),
            to_account_number: "110-222-333".into(),
            amount_minor: 50_000,
            memo: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("memo"));
    }

    #[test]
    fn preparation_defaults_missing_fee_to_zero() {
        let prep: TransferPreparation =
            serde_json::from_str(r#"{"transfer_id":"tr-1","status":"prepared"}"#).unwrap();
        assert_eq!(prep.fee_minor, 0);
    }
}
