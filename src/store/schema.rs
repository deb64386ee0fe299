//! Tabular audit log layout.
//!
//! Column order is fixed and shared by the persisted log and by exports:
//! `Timestamp, TransactionType, Amount, OldBalanceSender, NewBalanceSender,
//! OldBalanceReceiver, NewBalanceReceiver, FraudProbability, RiskLevel,
//! MLPrediction, FinalDecision`.

use crate::engine::rules::RuleEvaluator;
use crate::error::EngineError;
use crate::types::audit::AuditEntry;
use crate::types::decision::{Decision, FinalDecision, RiskBand};
use crate::types::scoring::ScoringResult;
use crate::types::transaction::{TransactionRecord, TransactionType};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::warn;

/// Header row, in persisted order
pub const COLUMNS: [&str; 11] = [
    "Timestamp",
    "TransactionType",
    "Amount",
    "OldBalanceSender",
    "NewBalanceSender",
    "OldBalanceReceiver",
    "NewBalanceReceiver",
    "FraudProbability",
    "RiskLevel",
    "MLPrediction",
    "FinalDecision",
];

/// One data row. Field order must match [`COLUMNS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuditRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "TransactionType")]
    transaction_type: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "OldBalanceSender")]
    old_balance_sender: f64,
    #[serde(rename = "NewBalanceSender")]
    new_balance_sender: f64,
    #[serde(rename = "OldBalanceReceiver")]
    old_balance_receiver: f64,
    #[serde(rename = "NewBalanceReceiver")]
    new_balance_receiver: f64,
    #[serde(rename = "FraudProbability")]
    fraud_probability: f64,
    #[serde(rename = "RiskLevel")]
    risk_level: String,
    #[serde(rename = "MLPrediction")]
    ml_prediction: String,
    #[serde(rename = "FinalDecision")]
    final_decision: String,
}

impl AuditRow {
    fn from_entry(entry: &AuditEntry) -> Self {
        let tx = entry.transaction();
        let scoring = entry.scoring();
        let decision = entry.decision();

        Self {
            timestamp: format_timestamp(entry.timestamp()),
            transaction_type: tx.tx_type.as_str().to_string(),
            amount: tx.amount,
            old_balance_sender: tx.old_balance_sender,
            new_balance_sender: tx.new_balance_sender,
            old_balance_receiver: tx.old_balance_receiver,
            new_balance_receiver: tx.new_balance_receiver,
            fraud_probability: scoring.probability,
            risk_level: decision.risk_band().as_str().to_string(),
            ml_prediction: scoring.prediction_label().to_string(),
            final_decision: decision.final_decision().as_str().to_string(),
        }
    }

    /// Rebuild the entry; reasons are re-derived from the stored transaction.
    fn into_entry(self, rules: &RuleEvaluator) -> Result<AuditEntry, String> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let tx_type: TransactionType = self.transaction_type.parse()?;

        let transaction = TransactionRecord::new(
            tx_type,
            self.amount,
            self.old_balance_sender,
            self.new_balance_sender,
            self.old_balance_receiver,
            self.new_balance_receiver,
        );
        transaction.validate().map_err(|e| e.to_string())?;

        let prediction = match self.ml_prediction.trim() {
            "Fraud" | "1" => true,
            "Not Fraud" | "0" => false,
            other => return Err(format!("unknown ML prediction '{}'", other)),
        };
        let scoring = ScoringResult::new(prediction, self.fraud_probability);
        scoring.validate().map_err(|e| e.to_string())?;

        let risk_band: RiskBand = self.risk_level.parse()?;
        let final_decision: FinalDecision = self.final_decision.parse()?;
        let decision = Decision::new(risk_band, final_decision, rules.evaluate(&transaction));

        Ok(AuditEntry::new(timestamp, transaction, scoring, decision))
    }
}

/// RFC 3339 in UTC, keeping sub-second precision so entries round-trip.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Accepts RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS[.f]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

/// Header line bytes, including the trailing newline.
pub(crate) fn encode_header() -> Result<Vec<u8>, EngineError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    into_bytes(writer)
}

/// One data row, including the trailing newline.
pub(crate) fn encode_row(entry: &AuditEntry) -> Result<Vec<u8>, EngineError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(AuditRow::from_entry(entry))?;
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, EngineError> {
    writer
        .into_inner()
        .map_err(|e| EngineError::Storage(e.into_error()))
}

/// Write `entries` with the persisted header and column order.
pub fn export_csv<'a, W, I>(entries: I, mut out: W) -> Result<usize, EngineError>
where
    W: Write,
    I: IntoIterator<Item = &'a AuditEntry>,
{
    out.write_all(&encode_header()?)?;
    let mut count = 0;
    for entry in entries {
        out.write_all(&encode_row(entry)?)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Result of reading a log: the entries that parsed plus the rows skipped.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub entries: Vec<AuditEntry>,
    /// One [`EngineError::CorruptRecord`] per skipped row
    pub corrupt: Vec<EngineError>,
}

/// Parse a log in the persisted layout, skipping rows that fail to parse.
pub fn read_entries<R: Read>(source: R, rules: &RuleEvaluator) -> Result<ScanReport, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    if !headers.is_empty() && headers.iter().ne(COLUMNS.iter().copied()) {
        warn!(header = ?headers, "Audit log header does not match expected columns");
    }

    let mut report = ScanReport::default();
    let mut record = csv::StringRecord::new();
    let mut row: u64 = 1;

    loop {
        row += 1;
        let parsed = match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                row = record.position().map_or(row, |p| p.line());
                if record.len() == 1 && record.get(0).map_or(false, |f| f.trim().is_empty()) {
                    continue;
                }
                record
                    .deserialize::<AuditRow>(None)
                    .map_err(|e| e.to_string())
                    .and_then(|r| r.into_entry(rules))
            }
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(entry) => report.entries.push(entry),
            Err(reason) => {
                warn!(row, reason = %reason, "Skipping corrupt audit record");
                report.corrupt.push(EngineError::CorruptRecord { row, reason });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry() -> AuditEntry {
        let rules = RuleEvaluator::default();
        let tx = TransactionRecord::new(TransactionType::CashOut, 181.0, 181.0, 0.0, 0.0, 0.0);
        AuditEntry::new(
            Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap() + chrono::Duration::microseconds(123456),
            tx,
            ScoringResult::new(true, 93.5),
            Decision::new(RiskBand::High, FinalDecision::Fraud, rules.evaluate(&tx)),
        )
    }

    #[test]
    fn test_header_and_row_layout() {
        let header = String::from_utf8(encode_header().unwrap()).unwrap();
        assert_eq!(
            header,
            "Timestamp,TransactionType,Amount,OldBalanceSender,NewBalanceSender,\
             OldBalanceReceiver,NewBalanceReceiver,FraudProbability,RiskLevel,MLPrediction,FinalDecision\n"
        );

        let row = String::from_utf8(encode_row(&sample_entry()).unwrap()).unwrap();
        assert_eq!(
            row,
            "2024-05-17T09:30:00.123456Z,CASH_OUT,181.0,181.0,0.0,0.0,0.0,93.5,High,Fraud,Fraud\n"
        );
    }

    #[test]
    fn test_export_then_read_back() {
        let entry = sample_entry();
        let mut buf = Vec::new();
        let written = export_csv([&entry], &mut buf).unwrap();
        assert_eq!(written, 1);

        let report = read_entries(buf.as_slice(), &RuleEvaluator::default()).unwrap();
        assert!(report.corrupt.is_empty());
        assert_eq!(report.entries, vec![entry]);
    }

    #[test]
    fn test_corrupt_rows_are_skipped() {
        let mut log = String::from_utf8(encode_header().unwrap()).unwrap();
        log.push_str("2024-05-17T09:30:00Z,PAYMENT,10.0,20.0,10.0,0.0,0.0,12.0,Low,Not Fraud,Safe\n");
        log.push_str("2024-05-17T09:31:00Z,PAYMENT,10.0,20.0\n");
        log.push_str("not-a-date,PAYMENT,10.0,20.0,10.0,0.0,0.0,12.0,Low,Not Fraud,Safe\n");
        log.push_str("2024-05-17T09:32:00Z,PAYMENT,10.0,20.0,10.0,0.0,0.0,150.0,High,Fraud,Fraud\n");
        log.push_str("2024-05-17T09:33:00Z,TRANSFER,10.0,20.0,10.0,0.0,0.0,60.0,Medium,Fraud,Suspicious\n");

        let report = read_entries(log.as_bytes(), &RuleEvaluator::default()).unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.corrupt.len(), 3);
        assert!(matches!(report.corrupt[0], EngineError::CorruptRecord { row: 3, .. }));
        assert_eq!(
            report.entries[1].decision().final_decision(),
            FinalDecision::Suspicious
        );
    }

    #[test]
    fn test_legacy_row_formats() {
        let mut log = String::from_utf8(encode_header().unwrap()).unwrap();
        log.push_str("2024-05-17 09:30:00.250000,TRANSFER,5.0,5.0,0.0,0.0,5.0,81.2,High Risk,1,Fraud\n");

        let report = read_entries(log.as_bytes(), &RuleEvaluator::default()).unwrap();
        assert_eq!(report.entries.len(), 1);
        let entry = &report.entries[0];
        assert_eq!(entry.decision().risk_band(), RiskBand::High);
        assert!(entry.scoring().prediction);
        assert_eq!(
            entry.timestamp(),
            Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap() + chrono::Duration::milliseconds(250)
        );
        assert_eq!(
            entry.decision().reasons(),
            &[
                "Sender balance completely drained".to_string(),
                "Receiver account had zero balance before transaction".to_string()
            ]
        );
    }

    #[test]
    fn test_empty_log_reads_as_empty() {
        let header = encode_header().unwrap();
        let report = read_entries(header.as_slice(), &RuleEvaluator::default()).unwrap();
        assert!(report.entries.is_empty());
        let report = read_entries(&b""[..], &RuleEvaluator::default()).unwrap();
        assert!(report.entries.is_empty());
    }
}
