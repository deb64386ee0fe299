//! Fusion of rule overrides and model probability into a final decision.
//!
//! A strict priority chain: the first matching step decides, later steps are
//! never consulted. Deterministic overrides come before the model so an
//! obviously anomalous transaction is flagged even when the model under-scores it.

use crate::types::decision::{FinalDecision, RiskBand};
use crate::types::scoring::ScoringResult;
use crate::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};

/// Thresholds for the fusion chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionThresholds {
    /// Amounts strictly above this are Fraud regardless of the model
    pub override_amount: f64,
    /// Probability at or above which the model alone decides Fraud
    pub fraud_probability: f64,
    /// Probability at or above which the transaction goes to manual review
    pub review_probability: f64,
}

impl Default for FusionThresholds {
    fn default() -> Self {
        Self {
            override_amount: 500_000.0,
            fraud_probability: 75.0,
            review_probability: 40.0,
        }
    }
}

/// Which step of the chain produced the decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBasis {
    AmountOverride,
    BalanceDrainOverride,
    BalanceMismatchOverride,
    ModelFraud,
    ModelReview,
    Clear,
}

impl DecisionBasis {
    pub fn is_override(&self) -> bool {
        matches!(
            self,
            DecisionBasis::AmountOverride
                | DecisionBasis::BalanceDrainOverride
                | DecisionBasis::BalanceMismatchOverride
        )
    }

    pub fn decision(&self) -> FinalDecision {
        match self {
            DecisionBasis::AmountOverride
            | DecisionBasis::BalanceDrainOverride
            | DecisionBasis::BalanceMismatchOverride
            | DecisionBasis::ModelFraud => FinalDecision::Fraud,
            DecisionBasis::ModelReview => FinalDecision::Suspicious,
            DecisionBasis::Clear => FinalDecision::Safe,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionFusion {
    thresholds: FusionThresholds,
    balance_tolerance: f64,
}

impl DecisionFusion {
    pub fn new(thresholds: FusionThresholds, balance_tolerance: f64) -> Self {
        Self {
            thresholds,
            balance_tolerance,
        }
    }

    /// Walk the chain and report the step that matched.
    ///
    /// The risk band is derived from the same probability and does not
    /// change the outcome; it is accepted so callers hand over the full
    /// classification context.
    pub fn resolve(
        &self,
        tx: &TransactionRecord,
        scoring: &ScoringResult,
        _risk_band: RiskBand,
    ) -> DecisionBasis {
        if tx.amount > self.thresholds.override_amount {
            DecisionBasis::AmountOverride
        } else if tx.drains_sender() {
            DecisionBasis::BalanceDrainOverride
        } else if tx.sender_balance_discrepancy() > self.balance_tolerance {
            DecisionBasis::BalanceMismatchOverride
        } else if scoring.probability >= self.thresholds.fraud_probability {
            DecisionBasis::ModelFraud
        } else if scoring.probability >= self.thresholds.review_probability {
            DecisionBasis::ModelReview
        } else {
            DecisionBasis::Clear
        }
    }

    /// Final decision for a validated transaction and score.
    pub fn fuse(
        &self,
        tx: &TransactionRecord,
        scoring: &ScoringResult,
        risk_band: RiskBand,
    ) -> FinalDecision {
        self.resolve(tx, scoring, risk_band).decision()
    }

    pub fn thresholds(&self) -> &FusionThresholds {
        &self.thresholds
    }
}

impl Default for DecisionFusion {
    fn default() -> Self {
        Self::new(FusionThresholds::default(), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::TransactionType;

    fn consistent(amount: f64) -> TransactionRecord {
        TransactionRecord::new(TransactionType::Payment, amount, amount * 2.0, amount, 0.0, 0.0)
    }

    #[test]
    fn test_amount_override_beats_any_probability() {
        let fusion = DecisionFusion::default();
        let tx = TransactionRecord::new(TransactionType::Payment, 600000.0, 1_000_000.0, 400000.0, 0.0, 0.0);

        for p in [0.0, 10.0, 50.0, 99.0] {
            let basis = fusion.resolve(&tx, &ScoringResult::new(false, p), RiskBand::Low);
            assert_eq!(basis, DecisionBasis::AmountOverride);
            assert_eq!(basis.decision(), FinalDecision::Fraud);
        }
    }

    #[test]
    fn test_drain_override() {
        let fusion = DecisionFusion::default();
        let tx = TransactionRecord::new(TransactionType::Transfer, 5000.0, 5000.0, 0.0, 0.0, 5000.0);
        let basis = fusion.resolve(&tx, &ScoringResult::new(false, 1.0), RiskBand::Low);
        assert_eq!(basis, DecisionBasis::BalanceDrainOverride);
        assert!(basis.is_override());
    }

    #[test]
    fn test_mismatch_override_precedes_model() {
        let fusion = DecisionFusion::default();
        let tx = TransactionRecord::new(TransactionType::Transfer, 50000.0, 50000.0, 50000.0, 0.0, 0.0);
        let basis = fusion.resolve(&tx, &ScoringResult::new(false, 50.0), RiskBand::Medium);
        assert_eq!(basis, DecisionBasis::BalanceMismatchOverride);
    }

    #[test]
    fn test_model_driven_steps() {
        let fusion = DecisionFusion::default();
        let tx = consistent(1000.0);

        let decide = |p: f64| fusion.fuse(&tx, &ScoringResult::new(p >= 50.0, p), RiskBand::Low);

        assert_eq!(decide(75.0), FinalDecision::Fraud);
        assert_eq!(decide(74.99), FinalDecision::Suspicious);
        assert_eq!(decide(40.0), FinalDecision::Suspicious);
        assert_eq!(decide(39.99), FinalDecision::Safe);
        assert_eq!(decide(0.0), FinalDecision::Safe);
    }

    #[test]
    fn test_override_amount_is_strict() {
        let fusion = DecisionFusion::default();
        let tx = consistent(500000.0);
        let basis = fusion.resolve(&tx, &ScoringResult::new(false, 5.0), RiskBand::Low);
        assert_eq!(basis, DecisionBasis::Clear);
    }
}
