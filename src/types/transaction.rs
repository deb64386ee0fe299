//! Transaction data structures for fraud evaluation

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of money movement being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Payment,
    Transfer,
    CashOut,
    Deposit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "PAYMENT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Deposit => "DEPOSIT",
        }
    }

    /// Types through which funds leave the platform quickly
    pub fn is_high_risk(&self) -> bool {
        matches!(self, TransactionType::Transfer | TransactionType::CashOut)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PAYMENT" => Ok(TransactionType::Payment),
            "TRANSFER" => Ok(TransactionType::Transfer),
            "CASH_OUT" => Ok(TransactionType::CashOut),
            "DEPOSIT" => Ok(TransactionType::Deposit),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

/// A single transaction submitted for evaluation.
///
/// Immutable value object; balances are before/after snapshots of the sender
/// and receiver accounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,

    pub amount: f64,

    /// Sender balance before the transaction
    #[serde(alias = "oldbalanceOrg")]
    pub old_balance_sender: f64,

    /// Sender balance after the transaction
    #[serde(alias = "newbalanceOrig")]
    pub new_balance_sender: f64,

    /// Receiver balance before the transaction
    #[serde(alias = "oldbalanceDest")]
    pub old_balance_receiver: f64,

    /// Receiver balance after the transaction
    #[serde(alias = "newbalanceDest")]
    pub new_balance_receiver: f64,
}

impl TransactionRecord {
    /// Create a transaction; call [`validate`](Self::validate) before evaluating.
    pub fn new(
        tx_type: TransactionType,
        amount: f64,
        old_balance_sender: f64,
        new_balance_sender: f64,
        old_balance_receiver: f64,
        new_balance_receiver: f64,
    ) -> Self {
        Self {
            tx_type,
            amount,
            old_balance_sender,
            new_balance_sender,
            old_balance_receiver,
            new_balance_receiver,
        }
    }

    /// Reject negative or non-finite monetary fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("amount", self.amount),
            ("old_balance_sender", self.old_balance_sender),
            ("new_balance_sender", self.new_balance_sender),
            ("old_balance_receiver", self.old_balance_receiver),
            ("new_balance_receiver", self.new_balance_receiver),
        ];

        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(ValidationError::NegativeValue { field, value });
            }
        }
        Ok(())
    }

    /// How far the sender's balance movement deviates from the amount
    pub fn sender_balance_discrepancy(&self) -> f64 {
        ((self.old_balance_sender - self.new_balance_sender) - self.amount).abs()
    }

    /// Sender had funds and was left with exactly zero
    pub fn drains_sender(&self) -> bool {
        self.old_balance_sender > 0.0 && self.new_balance_sender == 0.0
    }
}
