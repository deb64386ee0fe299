//! Error taxonomy for the decision engine

use thiserror::Error;

/// Input rejected before any evaluation work is done.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be non-negative, got {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("probability must be within [0, 100], got {0}")]
    InvalidProbability(f64),
}

/// Errors surfaced by the engine, the scorer seam and the audit store.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fatal to the request; nothing is evaluated or written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The external scoring model failed; nothing is written.
    #[error("scoring model unavailable: {0}")]
    ModelUnavailable(String),

    /// Append could not be committed within the retry budget.
    #[error("audit append failed after {attempts} attempt(s): {source}")]
    PersistenceFailure {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// A stored row could not be parsed back into an entry.
    #[error("corrupt audit record at row {row}: {reason}")]
    CorruptRecord { row: u64, reason: String },

    /// The store re-derives reasons with rules that differ from the engine's.
    #[error("audit log rule policy does not match the engine: {0}")]
    PolicyMismatch(String),

    #[error("audit storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serialization(#[from] csv::Error),
}

impl EngineError {
    /// Persistence and corrupt-record errors degrade gracefully; the rest
    /// abort the request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_) | EngineError::ModelUnavailable(_)
        )
    }
}
