//! Decision data structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse bucket derived solely from the model probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskBand {
    type Err = String;

    /// Accepts both `High` and the dashboard label `High Risk`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix(" Risk").unwrap_or(s);
        match s {
            "Low" => Ok(RiskBand::Low),
            "Medium" => Ok(RiskBand::Medium),
            "High" => Ok(RiskBand::High),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// Authoritative outcome after rule overrides and model score are fused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FinalDecision {
    Safe,
    Suspicious,
    Fraud,
}

impl FinalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalDecision::Safe => "Safe",
            FinalDecision::Suspicious => "Suspicious",
            FinalDecision::Fraud => "Fraud",
        }
    }
}

impl fmt::Display for FinalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinalDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(FinalDecision::Safe),
            "suspicious" => Ok(FinalDecision::Suspicious),
            "fraud" => Ok(FinalDecision::Fraud),
            other => Err(format!("unknown decision '{}'", other)),
        }
    }
}

/// Result of evaluating one transaction.
///
/// Built by the engine; fields are read-only to everyone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    risk_band: RiskBand,
    final_decision: FinalDecision,
    /// Explanations in fixed rule order
    reasons: Vec<String>,
}

impl Decision {
    pub(crate) fn new(risk_band: RiskBand, final_decision: FinalDecision, reasons: Vec<String>) -> Self {
        Self {
            risk_band,
            final_decision,
            reasons,
        }
    }

    pub fn risk_band(&self) -> RiskBand {
        self.risk_band
    }

    pub fn final_decision(&self) -> FinalDecision {
        self.final_decision
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn is_fraud(&self) -> bool {
        self.final_decision == FinalDecision::Fraud
    }
}
