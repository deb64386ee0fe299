//! Sample Traffic Generator
//!
//! Generates legitimate and anomalous transactions, scores them with a
//! synthetic model and drives them through the decision engine against the
//! configured audit log. With `--dry-run` it prints evaluation requests as
//! JSON lines instead (input for `fraud-engine evaluate`).

use anyhow::Result;
use clap::Parser;
use hybrid_fraud_engine::{
    AppConfig, EngineError, HybridEngine, ScoringResult, TransactionRecord, TransactionType,
};
use rand::Rng;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sample-traffic", about = "Drive synthetic transactions through the engine")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,
    /// Number of transactions
    #[arg(short = 'n', long, default_value_t = 100)]
    count: u64,
    /// Share of anomalous transactions (0.0 - 1.0)
    #[arg(long, default_value_t = 0.1)]
    fraud_rate: f64,
    /// Print requests instead of evaluating them
    #[arg(long)]
    dry_run: bool,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Ordinary payment or deposit whose balances move consistently
    fn generate_legitimate(&mut self) -> TransactionRecord {
        let tx_type = self.random_choice(&[
            TransactionType::Payment,
            TransactionType::Payment,
            TransactionType::Deposit,
            TransactionType::Transfer,
        ]);
        let amount = self.rng.gen_range(10.0..5000.0_f64).round();
        let old_sender = amount + self.rng.gen_range(100.0..50000.0_f64).round();
        let old_receiver = self.rng.gen_range(0.0..20000.0_f64).round();

        TransactionRecord::new(
            tx_type,
            amount,
            old_sender,
            old_sender - amount,
            old_receiver,
            old_receiver + amount,
        )
    }

    /// Large TRANSFER / CASH_OUT that drains the sender or leaves the
    /// balances inconsistent
    fn generate_suspicious(&mut self) -> TransactionRecord {
        let tx_type = self.random_choice(&[TransactionType::Transfer, TransactionType::CashOut]);
        let amount = self.rng.gen_range(100_000.0..800_000.0_f64).round();

        let (old_sender, new_sender) = if self.rng.gen_bool(0.6) {
            (amount, 0.0) // drained
        } else {
            (amount * 2.0, amount * 2.0) // balance never moved
        };

        TransactionRecord::new(tx_type, amount, old_sender, new_sender, 0.0, amount)
    }

    fn random_choice<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Stand-in for the ML model: leans on the same signals, plus noise.
fn synthetic_score(tx: &TransactionRecord) -> Result<ScoringResult, EngineError> {
    let mut rng = rand::thread_rng();
    let mut p: f64 = rng.gen_range(0.0..25.0);
    if tx.tx_type.is_high_risk() {
        p += 15.0;
    }
    if tx.drains_sender() {
        p += 35.0;
    }
    if tx.amount > 100_000.0 {
        p += 20.0;
    }
    let p = p.min(100.0);
    Ok(ScoringResult::new(p >= 50.0, p))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_traffic=info".parse()?)
                .add_directive("hybrid_fraud_engine=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let fraud_rate = args.fraud_rate.clamp(0.0, 1.0);

    let config = if args.config.exists() {
        AppConfig::load_from_path(&args.config)?
    } else {
        warn!(config = %args.config.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    info!(
        count = args.count,
        fraud_rate,
        dry_run = args.dry_run,
        "Starting sample traffic"
    );

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    if args.dry_run {
        for _ in 0..args.count {
            let tx = if rng.gen_bool(fraud_rate) {
                generator.generate_suspicious()
            } else {
                generator.generate_legitimate()
            };
            let scoring = synthetic_score(&tx)?;
            println!("{}", json!({ "transaction": tx, "scoring": scoring }));
        }
        return Ok(());
    }

    let engine = HybridEngine::from_config(&config, Box::new(synthetic_score))?;

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;
    let mut unlogged = 0;

    for i in 0..args.count {
        let tx = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };

        let evaluation = engine.evaluate(&tx)?;
        if !evaluation.is_persisted() {
            unlogged += 1;
        }

        if (i + 1) % 25 == 0 {
            info!(
                "Evaluated {}/{} transactions ({} legitimate, {} suspicious)",
                i + 1,
                args.count,
                legitimate_count,
                suspicious_count
            );
        }
    }

    info!(
        legitimate = legitimate_count,
        suspicious = suspicious_count,
        unlogged,
        audit_path = %config.audit.path,
        "Completed"
    );
    engine.metrics().print_summary();

    Ok(())
}
