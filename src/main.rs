//! Fraud Decision Engine - Command Line Entry Point
//!
//! Evaluates scored transactions, queries and exports the audit log, and
//! prints trend analytics.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hybrid_fraud_engine::{
    config::{AppConfig, LoggingConfig},
    scorer::UnavailableScorer,
    store::export_csv,
    AnalyticsAggregator, AuditFilter, FinalDecision, HybridEngine, ScoringResult,
    TransactionRecord,
};
use serde::Deserialize;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fraud-engine", version, about = "Hybrid rule + ML fraud decision engine")]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "FRAUD_ENGINE_CONFIG", default_value = "config/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate JSON-lines requests `{"transaction": {..}, "scoring": {..}}`
    Evaluate {
        /// Request file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Print matching audit entries as JSON lines, highest probability first
    Query(FilterArgs),
    /// Export matching audit entries as CSV in the audit log layout
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print daily/monthly fraud counts and decision distribution
    Report,
}

#[derive(Args)]
struct FilterArgs {
    /// Only entries with this final decision (safe, suspicious, fraud)
    #[arg(long)]
    decision: Option<FinalDecision>,
    /// Only entries with at least this fraud probability (0-100)
    #[arg(long)]
    min_probability: Option<f64>,
}

impl From<&FilterArgs> for AuditFilter {
    fn from(args: &FilterArgs) -> Self {
        AuditFilter {
            decision: args.decision,
            min_probability: args.min_probability,
        }
    }
}

/// One evaluation request line
#[derive(Deserialize)]
struct EvaluationRequest {
    transaction: TransactionRecord,
    scoring: ScoringResult,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.logging)?;
    info!(config = %cli.config.display(), "Starting fraud decision engine");

    // Scores arrive with each request, so no model is attached.
    let engine = HybridEngine::from_config(&config, Box::new(UnavailableScorer))
        .context("Failed to open audit log")?;

    match &cli.command {
        Command::Evaluate { input } => {
            let reader: Box<dyn BufRead> = match input {
                Some(path) => Box::new(BufReader::new(
                    File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
                )),
                None => Box::new(BufReader::new(io::stdin())),
            };
            evaluate(&engine, reader)?;
            engine.metrics().print_summary();
        }
        Command::Query(filter) => {
            let entries = engine.store().query(&filter.into())?;
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for entry in &entries {
                serde_json::to_writer(&mut out, entry)?;
                writeln!(out)?;
            }
            out.flush()?;
            info!(count = entries.len(), "Query complete");
        }
        Command::Export { filter, output } => {
            let entries = engine.store().query(&filter.into())?;
            let count = match output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    export_csv(&entries, BufWriter::new(file))?
                }
                None => export_csv(&entries, io::stdout().lock())?,
            };
            info!(count, "Export complete");
        }
        Command::Report => {
            let summary = AnalyticsAggregator::new(engine.store().as_ref()).summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load_from_path(path)
    } else {
        eprintln!(
            "config file {} not found, using built-in defaults",
            path.display()
        );
        Ok(AppConfig::default())
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("hybrid_fraud_engine={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Evaluate every request line; bad lines are reported and skipped.
fn evaluate(engine: &HybridEngine, reader: Box<dyn BufRead>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<EvaluationRequest>(&line) {
            Ok(request) => match engine.evaluate_scored(&request.transaction, &request.scoring) {
                Ok(evaluation) => json!({
                    "line": line_no,
                    "timestamp": evaluation.entry.timestamp(),
                    "decision": evaluation.decision,
                    "basis": evaluation.basis,
                    "persisted": evaluation.persistence_warning.is_none(),
                    "warning": evaluation.persistence_warning.as_ref().map(|e| e.to_string()),
                }),
                Err(e) => json!({ "line": line_no, "error": e.to_string() }),
            },
            Err(e) => {
                warn!(line = line_no, error = %e, "Malformed evaluation request");
                json!({ "line": line_no, "error": format!("malformed request: {}", e) })
            }
        };

        serde_json::to_writer(&mut out, &result)?;
        writeln!(out)?;
    }

    out.flush()?;
    Ok(())
}
