//! File-backed audit log in the tabular layout

use crate::engine::rules::RuleEvaluator;
use crate::error::EngineError;
use crate::retry::RetryPolicy;
use crate::store::schema::{self, ScanReport};
use crate::store::AuditLogStore;
use crate::types::audit::AuditEntry;
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Append target that can be flushed to stable storage and rolled back.
pub(crate) trait DurableSink: Write {
    fn committed_len(&mut self) -> io::Result<u64>;
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl DurableSink for File {
    fn committed_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Writer half of the log; the last stamp is guarded with the file.
struct LogWriter {
    file: File,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Append-only CSV audit log.
///
/// Appends are serialized through a mutex and each row is written with one
/// `write_all` followed by `sync_data`. A failed attempt truncates the file
/// back to its previous length before retrying, so a retried row never lands
/// after a torn fragment of itself.
pub struct CsvAuditLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    rules: RuleEvaluator,
    retry: RetryPolicy,
}

impl CsvAuditLog {
    /// Open or create the log at `path`.
    ///
    /// The header is written only when the file is new or empty. A trailing
    /// line without a newline (torn write from a crash) is terminated so the
    /// next row starts on its own line; the torn row is skipped on read.
    /// `rules` re-derive reasons on read and must match the engine's.
    pub fn open<P: AsRef<Path>>(
        path: P,
        rules: RuleEvaluator,
        retry: RetryPolicy,
    ) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        let mut last_timestamp = None;
        if len == 0 {
            file.write_all(&schema::encode_header()?)?;
            file.sync_all()?;
            info!(path = %path.display(), "Created audit log");
        } else {
            file.seek(SeekFrom::Start(len - 1))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                warn!(path = %path.display(), "Audit log ends with a partial row, terminating it");
                file.write_all(b"\n")?;
                file.sync_data()?;
            }

            let existing = schema::read_entries(io::BufReader::new(File::open(&path)?), &rules)?;
            last_timestamp = existing.entries.iter().map(|e| e.timestamp()).max();
            info!(
                path = %path.display(),
                bytes = len,
                entries = existing.entries.len(),
                "Opened existing audit log"
            );
        }

        Ok(Self {
            path,
            writer: Mutex::new(LogWriter {
                file,
                last_timestamp,
            }),
            rules,
            retry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole log, reporting skipped rows alongside the entries.
    pub fn scan(&self) -> Result<ScanReport, EngineError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ScanReport::default()),
            Err(e) => return Err(e.into()),
        };

        let report = schema::read_entries(io::BufReader::new(file), &self.rules)?;
        debug!(
            path = %self.path.display(),
            entries = report.entries.len(),
            skipped = report.corrupt.len(),
            "Scanned audit log"
        );
        Ok(report)
    }
}

fn write_durably<S: DurableSink>(sink: &mut S, bytes: &[u8]) -> io::Result<()> {
    let start = sink.committed_len()?;

    let result = sink.write_all(bytes).and_then(|_| sink.sync());
    if let Err(e) = result {
        if let Err(truncate_err) = sink.truncate(start) {
            error!(error = %truncate_err, "Failed to roll back partial audit row");
        }
        return Err(e);
    }
    Ok(())
}

/// Write one row within the retry budget.
pub(crate) fn append_row<S: DurableSink>(
    sink: &mut S,
    bytes: &[u8],
    retry: &RetryPolicy,
) -> Result<(), EngineError> {
    retry
        .run("audit_append", |_| write_durably(sink, bytes))
        .map_err(|(attempts, source)| EngineError::PersistenceFailure { attempts, source })
}

impl AuditLogStore for CsvAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<AuditEntry, EngineError> {
        let mut writer = self.writer.lock().map_err(|_| {
            EngineError::Storage(io::Error::new(
                io::ErrorKind::Other,
                "audit log writer lock poisoned",
            ))
        })?;

        let stored = entry.not_before(writer.last_timestamp);
        let bytes = schema::encode_row(&stored)?;
        append_row(&mut writer.file, &bytes, &self.retry)?;

        writer.last_timestamp = Some(stored.timestamp());
        Ok(stored)
    }

    fn snapshot(&self) -> Result<Vec<AuditEntry>, EngineError> {
        self.scan().map(|report| report.entries)
    }

    fn rule_policy(&self) -> Option<&RuleEvaluator> {
        Some(&self.rules)
    }
}
