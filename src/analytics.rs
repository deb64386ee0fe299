//! Trend analytics over the audit log.
//!
//! Every projection re-reads the store; nothing is cached between calls.
//! Time buckets use the UTC calendar date of the entry timestamp.

use crate::error::EngineError;
use crate::store::AuditLogStore;
use crate::types::audit::AuditEntry;
use crate::types::decision::{FinalDecision, RiskBand};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Calendar month bucket, displayed as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Monitoring view over the whole log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: u64,
    pub fraud: u64,
    /// Fraud share of all entries, in percent
    pub fraud_rate: f64,
    pub daily_fraud: BTreeMap<NaiveDate, u64>,
    pub monthly_fraud: BTreeMap<YearMonth, u64>,
    pub decisions: BTreeMap<FinalDecision, u64>,
    pub risk_bands: BTreeMap<RiskBand, u64>,
}

/// Read-side projections of an [`AuditLogStore`].
pub struct AnalyticsAggregator<'a> {
    store: &'a dyn AuditLogStore,
}

impl<'a> AnalyticsAggregator<'a> {
    pub fn new(store: &'a dyn AuditLogStore) -> Self {
        Self { store }
    }

    /// Fraud decisions per calendar day
    pub fn daily_fraud_counts(&self) -> Result<BTreeMap<NaiveDate, u64>, EngineError> {
        Ok(daily_fraud(&self.store.snapshot()?))
    }

    /// Fraud decisions per calendar month
    pub fn monthly_fraud_counts(&self) -> Result<BTreeMap<YearMonth, u64>, EngineError> {
        Ok(monthly_fraud(&self.store.snapshot()?))
    }

    /// Entries per final decision
    pub fn decision_distribution(&self) -> Result<BTreeMap<FinalDecision, u64>, EngineError> {
        Ok(count_by(&self.store.snapshot()?, |e| e.decision().final_decision()))
    }

    /// Entries per risk band
    pub fn risk_band_distribution(&self) -> Result<BTreeMap<RiskBand, u64>, EngineError> {
        Ok(count_by(&self.store.snapshot()?, |e| e.decision().risk_band()))
    }

    /// All projections computed from one snapshot.
    pub fn summary(&self) -> Result<AnalyticsSummary, EngineError> {
        let entries = self.store.snapshot()?;

        let total = entries.len() as u64;
        let fraud = entries.iter().filter(|e| e.decision().is_fraud()).count() as u64;
        let fraud_rate = if total > 0 {
            (fraud as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Ok(AnalyticsSummary {
            total,
            fraud,
            fraud_rate,
            daily_fraud: daily_fraud(&entries),
            monthly_fraud: monthly_fraud(&entries),
            decisions: count_by(&entries, |e| e.decision().final_decision()),
            risk_bands: count_by(&entries, |e| e.decision().risk_band()),
        })
    }
}

fn count_by<K, F>(entries: &[AuditEntry], key: F) -> BTreeMap<K, u64>
where
    K: Ord,
    F: Fn(&AuditEntry) -> K,
{
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(key(entry)).or_insert(0) += 1;
    }
    counts
}

fn fraud_entries(entries: &[AuditEntry]) -> impl Iterator<Item = &AuditEntry> {
    entries.iter().filter(|e| e.decision().is_fraud())
}

fn daily_fraud(entries: &[AuditEntry]) -> BTreeMap<NaiveDate, u64> {
    let mut counts = BTreeMap::new();
    for entry in fraud_entries(entries) {
        *counts.entry(entry.timestamp().date_naive()).or_insert(0) += 1;
    }
    counts
}

fn monthly_fraud(entries: &[AuditEntry]) -> BTreeMap<YearMonth, u64> {
    let mut counts = BTreeMap::new();
    for entry in fraud_entries(entries) {
        *counts
            .entry(YearMonth::of(entry.timestamp().date_naive()))
            .or_insert(0) += 1;
    }
    counts
}
