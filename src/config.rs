//! Configuration management for the decision engine

use crate::engine::classifier::RiskBandThresholds;
use crate::engine::fusion::FusionThresholds;
use crate::engine::rules::RuleThresholds;
use crate::retry::RetryPolicy;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    pub audit: AuditConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Decision policy: every threshold used by rules, bands and fusion
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Allowed deviation (currency units) between the sender's balance
    /// movement and the amount
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: f64,
    #[serde(default)]
    pub rules: RuleThresholds,
    #[serde(default)]
    pub risk_bands: RiskBandThresholds,
    #[serde(default)]
    pub fusion: FusionThresholds,
}

fn default_balance_tolerance() -> f64 {
    1.0
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
            rules: RuleThresholds::default(),
            risk_bands: RiskBandThresholds::default(),
            fusion: FusionThresholds::default(),
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// CSV file holding the audit trail
    pub path: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `FRAUD_ENGINE__*`
    /// environment overrides (e.g. `FRAUD_ENGINE__AUDIT__PATH`).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD_ENGINE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent thresholds instead of mixing cut-point schemes.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;

        ensure!(
            d.balance_tolerance.is_finite() && d.balance_tolerance >= 0.0,
            "detection.balance_tolerance must be a non-negative number"
        );
        for (name, amount) in [
            ("detection.rules.high_amount", d.rules.high_amount),
            ("detection.rules.risky_type_amount", d.rules.risky_type_amount),
            ("detection.fusion.override_amount", d.fusion.override_amount),
        ] {
            ensure!(
                amount.is_finite() && amount >= 0.0,
                "{} must be a non-negative number",
                name
            );
        }

        let bands = &d.risk_bands;
        ensure!(
            (0.0..=100.0).contains(&bands.medium)
                && (0.0..=100.0).contains(&bands.high)
                && bands.medium <= bands.high,
            "detection.risk_bands must satisfy 0 <= medium ({}) <= high ({}) <= 100",
            bands.medium,
            bands.high
        );

        let fusion = &d.fusion;
        ensure!(
            (0.0..=100.0).contains(&fusion.review_probability)
                && (0.0..=100.0).contains(&fusion.fraud_probability)
                && fusion.review_probability <= fusion.fraud_probability,
            "detection.fusion must satisfy 0 <= review_probability ({}) <= fraud_probability ({}) <= 100",
            fusion.review_probability,
            fusion.fraud_probability
        );

        ensure!(
            self.audit.retry.max_attempts >= 1,
            "audit.retry.max_attempts must be at least 1"
        );
        ensure!(
            self.audit.retry.jitter_factor.is_finite()
                && (0.0..=1.0).contains(&self.audit.retry.jitter_factor),
            "audit.retry.jitter_factor must be within [0, 1]"
        );

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            audit: AuditConfig {
                path: "data/audit_log.csv".to_string(),
                retry: RetryPolicy::default(),
            },
            logging: LoggingConfig::default(),
        }
    }
}
