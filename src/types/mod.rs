//! Type definitions for the decision engine

pub mod audit;
pub mod decision;
pub mod scoring;
pub mod transaction;

pub use audit::AuditEntry;
pub use decision::{Decision, FinalDecision, RiskBand};
pub use scoring::ScoringResult;
pub use transaction::{TransactionRecord, TransactionType};
