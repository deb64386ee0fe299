//! Seam to the external fraud model

use crate::error::EngineError;
use crate::types::scoring::ScoringResult;
use crate::types::transaction::TransactionRecord;

/// The ML collaborator: turns a transaction into a fraud probability.
///
/// Implementations report any model-side failure as
/// [`EngineError::ModelUnavailable`].
pub trait FraudScorer: Send + Sync {
    fn score(&self, tx: &TransactionRecord) -> Result<ScoringResult, EngineError>;
}

impl<F> FraudScorer for F
where
    F: Fn(&TransactionRecord) -> Result<ScoringResult, EngineError> + Send + Sync,
{
    fn score(&self, tx: &TransactionRecord) -> Result<ScoringResult, EngineError> {
        self(tx)
    }
}

/// Scorer that returns a result computed upstream
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer {
    result: ScoringResult,
}

impl FixedScorer {
    pub fn new(result: ScoringResult) -> Self {
        Self { result }
    }
}

impl FraudScorer for FixedScorer {
    fn score(&self, _tx: &TransactionRecord) -> Result<ScoringResult, EngineError> {
        Ok(self.result)
    }
}

/// Scorer for deployments with no model attached; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableScorer;

impl FraudScorer for UnavailableScorer {
    fn score(&self, _tx: &TransactionRecord) -> Result<ScoringResult, EngineError> {
        Err(EngineError::ModelUnavailable("no scoring model configured".to_string()))
    }
}
