//! Hybrid decision engine: rules, risk bands and fusion, with audit logging

pub mod classifier;
pub mod fusion;
pub mod rules;

pub use classifier::{ProbabilityClassifier, RiskBandThresholds};
pub use fusion::{DecisionBasis, DecisionFusion, FusionThresholds};
pub use rules::{Rule, RuleEvaluator, RuleThresholds};

use crate::config::{AppConfig, DetectionConfig};
use crate::error::{EngineError, ValidationError};
use crate::metrics::EngineMetrics;
use crate::scorer::FraudScorer;
use crate::store::{AuditLogStore, CsvAuditLog};
use crate::types::audit::AuditEntry;
use crate::types::decision::Decision;
use crate::types::scoring::ScoringResult;
use crate::types::transaction::TransactionRecord;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Outcome of one evaluation request
#[derive(Debug)]
pub struct Evaluation {
    pub decision: Decision,
    /// Which step of the fusion chain decided
    pub basis: DecisionBasis,
    pub entry: AuditEntry,
    /// Set when the decision could not be durably logged
    pub persistence_warning: Option<EngineError>,
}

impl Evaluation {
    pub fn is_persisted(&self) -> bool {
        self.persistence_warning.is_none()
    }
}

/// Combines rule overrides, the model probability and its risk band into a
/// final decision, and records every evaluation in the audit log.
pub struct HybridEngine {
    rules: RuleEvaluator,
    classifier: ProbabilityClassifier,
    fusion: DecisionFusion,
    scorer: Box<dyn FraudScorer>,
    store: Arc<dyn AuditLogStore>,
    metrics: Arc<EngineMetrics>,
}

impl HybridEngine {
    /// Build an engine over `store`.
    ///
    /// Fails with [`EngineError::PolicyMismatch`] when the store re-derives
    /// reasons with rules other than the ones built from `detection`.
    pub fn new(
        detection: &DetectionConfig,
        scorer: Box<dyn FraudScorer>,
        store: Arc<dyn AuditLogStore>,
    ) -> Result<Self, EngineError> {
        let rules = RuleEvaluator::new(detection.rules, detection.balance_tolerance);
        if let Some(stored) = store.rule_policy() {
            if *stored != rules {
                return Err(EngineError::PolicyMismatch(format!(
                    "store uses {:?}, engine uses {:?}",
                    stored, rules
                )));
            }
        }

        Ok(Self {
            rules,
            classifier: ProbabilityClassifier::new(detection.risk_bands),
            fusion: DecisionFusion::new(detection.fusion, detection.balance_tolerance),
            scorer,
            store,
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    /// Build an engine backed by the CSV audit log named in `config`.
    pub fn from_config(config: &AppConfig, scorer: Box<dyn FraudScorer>) -> Result<Self, EngineError> {
        let detection = &config.detection;
        let store = CsvAuditLog::open(
            &config.audit.path,
            RuleEvaluator::new(detection.rules, detection.balance_tolerance),
            config.audit.retry.clone(),
        )?;

        info!(
            audit_path = %config.audit.path,
            medium_band = detection.risk_bands.medium,
            high_band = detection.risk_bands.high,
            fraud_probability = detection.fusion.fraud_probability,
            override_amount = detection.fusion.override_amount,
            balance_tolerance = detection.balance_tolerance,
            "Decision engine initialized"
        );

        Self::new(detection, scorer, Arc::new(store))
    }

    /// Share a metrics collector with the caller.
    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn rules(&self) -> &RuleEvaluator {
        &self.rules
    }

    pub fn store(&self) -> &Arc<dyn AuditLogStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    /// Pure decision step: no scoring call, no logging to the audit store.
    pub fn decide(
        &self,
        tx: &TransactionRecord,
        scoring: &ScoringResult,
    ) -> Result<(Decision, DecisionBasis), ValidationError> {
        tx.validate()?;
        scoring.validate()?;

        let reasons = self.rules.evaluate(tx);
        let risk_band = self.classifier.classify(scoring.probability)?;
        let basis = self.fusion.resolve(tx, scoring, risk_band);

        Ok((Decision::new(risk_band, basis.decision(), reasons), basis))
    }

    /// Score `tx` with the attached model, then decide and log.
    ///
    /// Validation and model failures abort the request before anything is
    /// written.
    pub fn evaluate(&self, tx: &TransactionRecord) -> Result<Evaluation, EngineError> {
        if let Err(e) = tx.validate() {
            self.metrics.record_validation_failure();
            return Err(e.into());
        }

        let scoring = match self.scorer.score(tx) {
            Ok(scoring) => scoring,
            Err(EngineError::Validation(e)) => {
                self.metrics.record_validation_failure();
                warn!(error = %e, tx_type = %tx.tx_type, "Scorer rejected transaction");
                return Err(e.into());
            }
            Err(e) => {
                self.metrics.record_model_failure();
                error!(error = %e, tx_type = %tx.tx_type, amount = tx.amount, "Scoring failed");
                return Err(match e {
                    EngineError::ModelUnavailable(_) => e,
                    other => EngineError::ModelUnavailable(other.to_string()),
                });
            }
        };

        self.evaluate_scored(tx, &scoring)
    }

    /// Decide and log using a score obtained upstream.
    ///
    /// A failed append is reported in [`Evaluation::persistence_warning`];
    /// the decision is still returned. On success the returned entry is the
    /// stored one, stamped by the store in append order.
    pub fn evaluate_scored(
        &self,
        tx: &TransactionRecord,
        scoring: &ScoringResult,
    ) -> Result<Evaluation, EngineError> {
        let evaluation_id = Uuid::new_v4();
        let span = info_span!("evaluate", %evaluation_id);
        let _guard = span.enter();

        let start = Instant::now();
        let (decision, basis) = match self.decide(tx, scoring) {
            Ok(result) => result,
            Err(e) => {
                self.metrics.record_validation_failure();
                warn!(error = %e, "Rejected evaluation request");
                return Err(e.into());
            }
        };
        let elapsed = start.elapsed();

        self.metrics.record_evaluation(
            elapsed,
            scoring.probability,
            decision.final_decision(),
            basis.is_override(),
        );

        let candidate = AuditEntry::new(Utc::now(), *tx, *scoring, decision.clone());

        let (entry, persistence_warning) = match self.store.append(&candidate) {
            Ok(stored) => (stored, None),
            Err(e) => {
                self.metrics.record_persistence_failure();
                error!(error = %e, "Audit append failed; decision delivered unlogged");
                (candidate, Some(e))
            }
        };

        if decision.is_fraud() {
            info!(
                tx_type = %tx.tx_type,
                amount = tx.amount,
                probability = scoring.probability,
                risk_band = %decision.risk_band(),
                basis = ?basis,
                reasons = decision.reasons().len(),
                "Transaction flagged as fraud"
            );
        } else {
            debug!(
                tx_type = %tx.tx_type,
                amount = tx.amount,
                probability = scoring.probability,
                risk_band = %decision.risk_band(),
                decision = %decision.final_decision(),
                elapsed_us = elapsed.as_micros() as u64,
                "Transaction evaluated"
            );
        }

        Ok(Evaluation {
            decision,
            basis,
            entry,
            persistence_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{FixedScorer, UnavailableScorer};
    use crate::store::MemoryAuditLog;
    use crate::types::decision::{FinalDecision, RiskBand};
    use crate::types::transaction::TransactionType;
    use std::io;
    use std::sync::atomic::Ordering;

    struct FailingStore;

    impl AuditLogStore for FailingStore {
        fn append(&self, _entry: &AuditEntry) -> Result<AuditEntry, EngineError> {
            Err(EngineError::PersistenceFailure {
                attempts: 3,
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            })
        }

        fn snapshot(&self) -> Result<Vec<AuditEntry>, EngineError> {
            Ok(Vec::new())
        }
    }

    fn engine_with(scorer: Box<dyn FraudScorer>, store: Arc<dyn AuditLogStore>) -> HybridEngine {
        HybridEngine::new(&DetectionConfig::default(), scorer, store).unwrap()
    }

    fn payment() -> TransactionRecord {
        TransactionRecord::new(TransactionType::Payment, 1000.0, 10000.0, 9000.0, 0.0, 0.0)
    }

    #[test]
    fn test_evaluate_appends_entry() {
        let store = Arc::new(MemoryAuditLog::new());
        let engine = engine_with(Box::new(FixedScorer::new(ScoringResult::new(false, 5.0))), store.clone());

        let evaluation = engine.evaluate(&payment()).unwrap();

        assert!(evaluation.is_persisted());
        assert_eq!(evaluation.decision.final_decision(), FinalDecision::Safe);
        assert_eq!(evaluation.decision.risk_band(), RiskBand::Low);
        assert_eq!(evaluation.basis, DecisionBasis::Clear);
        assert_eq!(store.snapshot().unwrap(), vec![evaluation.entry]);
    }

    #[test]
    fn test_model_failure_writes_nothing() {
        let store = Arc::new(MemoryAuditLog::new());
        let engine = engine_with(Box::new(UnavailableScorer), store.clone());

        let err = engine.evaluate(&payment()).unwrap_err();
        assert!(matches!(err, EngineError::ModelUnavailable(_)));
        assert!(store.is_empty().unwrap());
        assert_eq!(engine.metrics().model_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_validation_failure_writes_nothing() {
        let store = Arc::new(MemoryAuditLog::new());
        let engine = engine_with(Box::new(FixedScorer::new(ScoringResult::new(true, 150.0))), store.clone());

        let err = engine.evaluate(&payment()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::InvalidProbability(_))
        ));

        let negative = TransactionRecord::new(TransactionType::Payment, -1.0, 0.0, 0.0, 0.0, 0.0);
        assert!(engine.evaluate(&negative).unwrap_err().is_fatal());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_persistence_failure_still_returns_decision() {
        let engine = engine_with(
            Box::new(FixedScorer::new(ScoringResult::new(true, 90.0))),
            Arc::new(FailingStore),
        );

        let evaluation = engine.evaluate(&payment()).unwrap();
        assert_eq!(evaluation.decision.final_decision(), FinalDecision::Fraud);
        assert!(matches!(
            evaluation.persistence_warning,
            Some(EngineError::PersistenceFailure { attempts: 3, .. })
        ));
        assert_eq!(engine.metrics().persistence_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_scorer_validation_error_counts_as_validation() {
        let store = Arc::new(MemoryAuditLog::new());
        let scorer = |_: &TransactionRecord| -> Result<ScoringResult, EngineError> {
            Err(ValidationError::InvalidProbability(-3.0).into())
        };
        let engine = engine_with(Box::new(scorer), store.clone());

        let err = engine.evaluate(&payment()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(engine.metrics().validation_failures.load(Ordering::Relaxed), 1);
        assert_eq!(engine.metrics().model_failures.load(Ordering::Relaxed), 0);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let store = Arc::new(MemoryAuditLog::new());
        let engine = engine_with(Box::new(FixedScorer::new(ScoringResult::new(false, 1.0))), store.clone());

        for _ in 0..50 {
            engine.evaluate(&payment()).unwrap();
        }

        let stamps: Vec<_> = store.snapshot().unwrap().iter().map(|e| e.timestamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_decide_is_pure() {
        let store = Arc::new(MemoryAuditLog::new());
        let engine = engine_with(Box::new(UnavailableScorer), store.clone());

        let (decision, basis) = engine
            .decide(&payment(), &ScoringResult::new(true, 60.0))
            .unwrap();
        assert_eq!(decision.final_decision(), FinalDecision::Suspicious);
        assert_eq!(decision.risk_band(), RiskBand::Medium);
        assert_eq!(basis, DecisionBasis::ModelReview);
        assert!(store.is_empty().unwrap());
    }
}
