//! Audit trail record

use crate::types::decision::Decision;
use crate::types::scoring::ScoringResult;
use crate::types::transaction::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record pairing a transaction, its model score and its decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Moment of evaluation; sort/filter key for analytics
    timestamp: DateTime<Utc>,
    transaction: TransactionRecord,
    scoring: ScoringResult,
    decision: Decision,
}

impl AuditEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        transaction: TransactionRecord,
        scoring: ScoringResult,
        decision: Decision,
    ) -> Self {
        Self {
            timestamp,
            transaction,
            scoring,
            decision,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn transaction(&self) -> &TransactionRecord {
        &self.transaction
    }

    pub fn scoring(&self) -> &ScoringResult {
        &self.scoring
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    pub fn probability(&self) -> f64 {
        self.scoring.probability
    }

    /// Same entry, stamped no earlier than `floor`.
    pub(crate) fn not_before(&self, floor: Option<DateTime<Utc>>) -> Self {
        let mut entry = self.clone();
        if let Some(floor) = floor {
            entry.timestamp = entry.timestamp.max(floor);
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::{FinalDecision, RiskBand};
    use crate::types::transaction::TransactionType;

    #[test]
    fn test_audit_entry_serialization() {
        let entry = AuditEntry::new(
            Utc::now(),
            TransactionRecord::new(TransactionType::Transfer, 250000.0, 250000.0, 0.0, 0.0, 250000.0),
            ScoringResult::new(true, 97.25),
            Decision::new(
                RiskBand::High,
                FinalDecision::Fraud,
                vec!["Sender balance completely drained".to_string()],
            ),
        );

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(entry, deserialized);
        assert_eq!(deserialized.probability(), 97.25);
    }
}
