//! Transaction data structures consumed by the scoring core
//!
//! Transactions are produced by the caller before scoring and are never
//! mutated here. The wire format uses camelCase keys, matching the records
//! the submission layer persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Maximum number of prior transactions considered by sequence analysis
pub const MAX_HISTORY_LEN: usize = 10;

/// Snapshot of the sender's linked bank profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub routing_number: String,
    /// Originating IP recorded when the account was linked
    #[serde(default)]
    pub ip: String,
}

/// A transaction submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    /// Accepted as a JSON number or string, written back as a number
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    /// Payment method, e.g. "UPI", "CreditCard", "online"
    pub payment_method: String,
    #[serde(default)]
    pub ip_address: String,
    /// User-agent or device description
    #[serde(default)]
    pub device_info: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub sender_details: SenderDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a transaction with the required fields; the rest default to empty
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Decimal,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            payment_method: payment_method.into(),
            ip_address: String::new(),
            device_info: String::new(),
            remarks: String::new(),
            sender_details: SenderDetails::default(),
            timestamp: None,
        }
    }

    pub fn with_network(mut self, ip_address: impl Into<String>, device_info: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self.device_info = device_info.into();
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn with_sender_details(mut self, details: SenderDetails) -> Self {
        self.sender_details = details;
        self
    }

    /// Amount without trailing zeros ("1500" rather than "1500.00")
    pub fn display_amount(&self) -> String {
        self.amount.normalize().to_string()
    }

    /// Sender profile as compact JSON
    pub fn sender_json(&self) -> String {
        serde_json::to_string(&self.sender_details).unwrap_or_default()
    }

    /// Whole transaction as compact JSON, used in narrative prompts
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Single-line description fed to the anomaly classifier
    pub fn anomaly_text(&self) -> String {
        format!(
            "Amount: {}, Method: {}, IP: {}, Device: {}, Remarks: {}, Sender: {}",
            self.display_amount(),
            self.payment_method,
            self.ip_address,
            self.device_info,
            self.remarks,
            self.sender_json()
        )
    }
}

/// A previously scored transaction from the same sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Verdict recorded when this transaction was scored
    #[serde(default)]
    pub is_fraudulent: bool,
}

impl PriorTransaction {
    pub fn new(transaction: Transaction, is_fraudulent: bool) -> Self {
        Self {
            transaction,
            is_fraudulent,
        }
    }
}

/// Most-recent-first history of prior transactions, capped at [`MAX_HISTORY_LEN`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PriorTransaction>", into = "Vec<PriorTransaction>")]
pub struct TransactionHistory {
    entries: Vec<PriorTransaction>,
}

impl TransactionHistory {
    /// Build a history, keeping only the most recent [`MAX_HISTORY_LEN`] entries.
    ///
    /// `entries` must already be ordered most-recent-first.
    pub fn new(mut entries: Vec<PriorTransaction>) -> Self {
        entries.truncate(MAX_HISTORY_LEN);
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PriorTransaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize history plus the current transaction, one line each,
    /// current transaction last.
    pub fn sequence_text(&self, current: &Transaction) -> String {
        let mut text = String::new();
        for prior in &self.entries {
            let tx = &prior.transaction;
            let _ = writeln!(
                text,
                "Amount: {}, Method: {}, Fraud: {}, Sender: {}",
                tx.display_amount(),
                tx.payment_method,
                prior.is_fraudulent,
                tx.sender_json()
            );
        }
        let _ = write!(
            text,
            "Amount: {}, Method: {}, Sender: {}",
            current.display_amount(),
            current.payment_method,
            current.sender_json()
        );
        text
    }
}

impl From<Vec<PriorTransaction>> for TransactionHistory {
    fn from(entries: Vec<PriorTransaction>) -> Self {
        Self::new(entries)
    }
}

impl From<TransactionHistory> for Vec<PriorTransaction> {
    fn from(history: TransactionHistory) -> Self {
        history.entries
    }
}
