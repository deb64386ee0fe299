//! Append-only audit log of every evaluated transaction

pub mod csv_log;
pub mod memory;
pub mod schema;

pub use csv_log::CsvAuditLog;
pub use memory::MemoryAuditLog;
pub use schema::{export_csv, read_entries, ScanReport, COLUMNS};

use crate::engine::rules::RuleEvaluator;
use crate::error::EngineError;
use crate::types::audit::AuditEntry;
use crate::types::decision::FinalDecision;

/// Append-only store of audit entries.
///
/// Entries are never updated or deleted. Reads may run concurrently with
/// appends and may miss an append that is still in flight. Timestamps are
/// non-decreasing in append order: each backend clamps an entry's timestamp
/// to the previous append's under the same lock as the write.
///
/// File-backed stores such as [`CsvAuditLog`] are durable across restarts;
/// [`MemoryAuditLog`] lives only as long as the process.
pub trait AuditLogStore: Send + Sync {
    /// Record `entry` and return it as stored, with its timestamp clamped to
    /// append order. Durable backends return only once the entry would
    /// survive a restart.
    fn append(&self, entry: &AuditEntry) -> Result<AuditEntry, EngineError>;

    /// Every readable entry, in append order. Unreadable rows are skipped.
    fn snapshot(&self) -> Result<Vec<AuditEntry>, EngineError>;

    /// Entries matching `filter`, highest fraud probability first.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, EngineError> {
        let mut entries: Vec<AuditEntry> = self
            .snapshot()?
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect();
        sort_by_probability_desc(&mut entries);
        Ok(entries)
    }

    /// Rules used to re-derive reasons on read, for backends that do not
    /// persist them.
    fn rule_policy(&self) -> Option<&RuleEvaluator> {
        None
    }
}

/// Query filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AuditFilter {
    pub decision: Option<FinalDecision>,
    /// Inclusive lower bound on the fraud probability
    pub min_probability: Option<f64>,
}

impl AuditFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_decision(mut self, decision: FinalDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_min_probability(mut self, min_probability: f64) -> Self {
        self.min_probability = Some(min_probability);
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        let decision_ok = self
            .decision
            .map_or(true, |d| entry.decision().final_decision() == d);
        let probability_ok = self
            .min_probability
            .map_or(true, |min| entry.probability() >= min);
        decision_ok && probability_ok
    }
}

/// Stable sort, so equal probabilities keep append order.
pub fn sort_by_probability_desc(entries: &mut [AuditEntry]) {
    entries.sort_by(|a, b| b.probability().total_cmp(&a.probability()));
}
