//! Hybrid Fraud Decision Engine
//!
//! Fuses an externally supplied fraud probability with deterministic
//! business rules into a Safe / Suspicious / Fraud decision, explains it,
//! and keeps a durable append-only audit log with trend analytics on top.

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod scorer;
pub mod store;
pub mod types;

pub use analytics::{AnalyticsAggregator, AnalyticsSummary, YearMonth};
pub use config::AppConfig;
pub use engine::{Evaluation, HybridEngine};
pub use error::{EngineError, ValidationError};
pub use scorer::{FixedScorer, FraudScorer};
pub use store::{AuditFilter, AuditLogStore, CsvAuditLog, MemoryAuditLog};
pub use types::{
    AuditEntry, Decision, FinalDecision, RiskBand, ScoringResult, TransactionRecord,
    TransactionType,
};
