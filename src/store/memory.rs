//! In-process audit log backend

use crate::error::EngineError;
use crate::store::AuditLogStore;
use crate::types::audit::AuditEntry;
use std::io;
use std::sync::RwLock;

/// Audit log kept in memory; not durable across restarts. Used for tests
/// and for callers that only need analytics over the current process.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, EngineError> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool, EngineError> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> EngineError {
    EngineError::Storage(io::Error::new(
        io::ErrorKind::Other,
        "audit log lock poisoned",
    ))
}

impl AuditLogStore for MemoryAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<AuditEntry, EngineError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let stored = entry.not_before(entries.last().map(|e| e.timestamp()));
        entries.push(stored.clone());
        Ok(stored)
    }

    fn snapshot(&self) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(self.entries.read().map_err(|_| poisoned())?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::{Decision, FinalDecision, RiskBand};
    use crate::types::scoring::ScoringResult;
    use crate::types::transaction::{TransactionRecord, TransactionType};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use std::thread;

    fn entry_at(timestamp: chrono::DateTime<Utc>) -> AuditEntry {
        AuditEntry::new(
            timestamp,
            TransactionRecord::new(TransactionType::Deposit, 1.0, 2.0, 1.0, 0.0, 0.0),
            ScoringResult::new(false, 3.0),
            Decision::new(RiskBand::Low, FinalDecision::Safe, Vec::new()),
        )
    }

    #[test]
    fn test_concurrent_appends() {
        let log = Arc::new(MemoryAuditLog::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        let entry = AuditEntry::new(
                            Utc::now(),
                            TransactionRecord::new(TransactionType::Deposit, 1.0, 2.0, 1.0, 0.0, 0.0),
                            ScoringResult::new(false, i as f64),
                            Decision::new(RiskBand::Low, FinalDecision::Safe, Vec::new()),
                        );
                        log.append(&entry).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len().unwrap(), 200);
        let entries = log.snapshot().unwrap();
        assert_eq!(entries.len(), 200);
        assert!(entries.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
    }

    #[test]
    fn test_late_timestamp_is_clamped_to_append_order() {
        let log = MemoryAuditLog::new();
        let noon = Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap();

        let first = log.append(&entry_at(noon)).unwrap();
        assert_eq!(first.timestamp(), noon);

        let stale = log.append(&entry_at(noon - Duration::seconds(5))).unwrap();
        assert_eq!(stale.timestamp(), noon);

        let later = log.append(&entry_at(noon + Duration::seconds(1))).unwrap();
        assert_eq!(later.timestamp(), noon + Duration::seconds(1));
        assert_eq!(log.snapshot().unwrap(), vec![first, stale, later]);
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let log = Arc::new(MemoryAuditLog::new());
        let poisoner = log.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("writer died");
        })
        .join();

        assert!(matches!(log.is_empty(), Err(EngineError::Storage(_))));
        assert!(log.append(&entry_at(Utc::now())).is_err());
    }
}
