//! Rule-based explanation of a transaction.
//!
//! Every rule is checked, in a fixed order, and each one that holds
//! contributes its reason. The order of [`Rule::ALL`] is the order reasons
//! appear in a [`Decision`](crate::types::Decision); it is never re-sorted.

use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Amount limits used by the explanation rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleThresholds {
    /// Any transaction above this amount is flagged
    #[serde(default = "default_high_amount")]
    pub high_amount: f64,
    /// TRANSFER / CASH_OUT above this amount is flagged
    #[serde(default = "default_risky_type_amount")]
    pub risky_type_amount: f64,
}

fn default_high_amount() -> f64 {
    200_000.0
}

fn default_risky_type_amount() -> f64 {
    100_000.0
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            high_amount: default_high_amount(),
            risky_type_amount: default_risky_type_amount(),
        }
    }
}

/// Individual explanation rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    HighAmount,
    SenderDrained,
    ReceiverPreviouslyEmpty,
    HighRiskTypeLargeAmount,
    InconsistentBalance,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::HighAmount,
        Rule::SenderDrained,
        Rule::ReceiverPreviouslyEmpty,
        Rule::HighRiskTypeLargeAmount,
        Rule::InconsistentBalance,
    ];

    /// Human-readable explanation attached to a decision
    pub fn reason(&self) -> &'static str {
        match self {
            Rule::HighAmount => "Unusually high transaction amount",
            Rule::SenderDrained => "Sender balance completely drained",
            Rule::ReceiverPreviouslyEmpty => "Receiver account had zero balance before transaction",
            Rule::HighRiskTypeLargeAmount => "High-risk transaction type with large amount",
            Rule::InconsistentBalance => "Inconsistent balance change detected",
        }
    }
}

/// Evaluates the explanation rules against a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEvaluator {
    thresholds: RuleThresholds,
    balance_tolerance: f64,
}

impl RuleEvaluator {
    pub fn new(thresholds: RuleThresholds, balance_tolerance: f64) -> Self {
        Self {
            thresholds,
            balance_tolerance,
        }
    }

    /// Check whether a single rule holds for `tx`.
    pub fn holds(&self, rule: Rule, tx: &TransactionRecord) -> bool {
        match rule {
            Rule::HighAmount => tx.amount > self.thresholds.high_amount,
            Rule::SenderDrained => tx.drains_sender(),
            Rule::ReceiverPreviouslyEmpty => {
                tx.old_balance_receiver == 0.0 && tx.new_balance_receiver > 0.0
            }
            Rule::HighRiskTypeLargeAmount => {
                tx.tx_type.is_high_risk() && tx.amount > self.thresholds.risky_type_amount
            }
            Rule::InconsistentBalance => tx.sender_balance_discrepancy() > self.balance_tolerance,
        }
    }

    /// Rules that hold for `tx`, in evaluation order.
    pub fn triggered(&self, tx: &TransactionRecord) -> Vec<Rule> {
        Rule::ALL
            .iter()
            .copied()
            .filter(|rule| self.holds(*rule, tx))
            .collect()
    }

    /// Explanation reasons for `tx`. Empty when no rule holds.
    pub fn evaluate(&self, tx: &TransactionRecord) -> Vec<String> {
        self.triggered(tx)
            .into_iter()
            .map(|rule| rule.reason().to_string())
            .collect()
    }

    pub fn thresholds(&self) -> &RuleThresholds {
        &self.thresholds
    }

    pub fn balance_tolerance(&self) -> f64 {
        self.balance_tolerance
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(RuleThresholds::default(), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::TransactionType;

    fn tx(
        tx_type: TransactionType,
        amount: f64,
        old_sender: f64,
        new_sender: f64,
        old_receiver: f64,
        new_receiver: f64,
    ) -> TransactionRecord {
        TransactionRecord::new(tx_type, amount, old_sender, new_sender, old_receiver, new_receiver)
    }

    #[test]
    fn test_consistent_payment_has_no_reasons() {
        let evaluator = RuleEvaluator::default();
        let reasons = evaluator.evaluate(&tx(TransactionType::Payment, 1000.0, 10000.0, 9000.0, 0.0, 0.0));
        assert!(reasons.is_empty());
    }

    #[test]
    fn test_all_rules_in_fixed_order() {
        let evaluator = RuleEvaluator::default();
        // Drained sender, empty receiver, large CASH_OUT, and the balance moved
        // by less than the amount.
        let reasons = evaluator.evaluate(&tx(TransactionType::CashOut, 300000.0, 250000.0, 0.0, 0.0, 300000.0));

        let expected: Vec<String> = Rule::ALL.iter().map(|r| r.reason().to_string()).collect();
        assert_eq!(reasons, expected);
    }

    #[test]
    fn test_rules_are_not_short_circuited() {
        let evaluator = RuleEvaluator::default();
        let triggered = evaluator.triggered(&tx(TransactionType::Transfer, 150000.0, 150000.0, 0.0, 0.0, 150000.0));
        assert_eq!(
            triggered,
            vec![
                Rule::SenderDrained,
                Rule::ReceiverPreviouslyEmpty,
                Rule::HighRiskTypeLargeAmount
            ]
        );
    }

    #[test]
    fn test_risky_type_requires_transfer_or_cash_out() {
        let evaluator = RuleEvaluator::default();
        let payment = tx(TransactionType::Payment, 150000.0, 200000.0, 50000.0, 10.0, 10.0);
        assert!(!evaluator.holds(Rule::HighRiskTypeLargeAmount, &payment));
        assert!(evaluator.evaluate(&payment).is_empty());
    }

    #[test]
    fn test_balance_tolerance_boundary() {
        let evaluator = RuleEvaluator::default();
        // Off by exactly the tolerance: not flagged
        let within = tx(TransactionType::Payment, 100.0, 1000.0, 901.0, 5.0, 5.0);
        assert!(!evaluator.holds(Rule::InconsistentBalance, &within));

        let beyond = tx(TransactionType::Payment, 100.0, 1000.0, 902.0, 5.0, 5.0);
        assert!(evaluator.holds(Rule::InconsistentBalance, &beyond));

        let strict = RuleEvaluator::new(RuleThresholds::default(), 0.0);
        assert!(strict.holds(Rule::InconsistentBalance, &within));
    }

    #[test]
    fn test_amount_thresholds_are_strict() {
        let evaluator = RuleEvaluator::default();
        let at_limit = tx(TransactionType::Deposit, 200000.0, 200000.0, 0.0, 1.0, 1.0);
        assert!(!evaluator.holds(Rule::HighAmount, &at_limit));
        let above = tx(TransactionType::Deposit, 200000.5, 200000.5, 0.0, 1.0, 1.0);
        assert!(evaluator.holds(Rule::HighAmount, &above));
    }
}
