//! Probability to risk band classification

use crate::error::ValidationError;
use crate::types::decision::RiskBand;
use serde::{Deserialize, Serialize};

/// Lower bounds (inclusive) of the Medium and High bands, on the 0..=100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBandThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskBandThresholds {
    fn default() -> Self {
        Self {
            medium: 40.0,
            high: 80.0,
        }
    }
}

/// Maps a model probability to a [`RiskBand`].
#[derive(Debug, Clone, Default)]
pub struct ProbabilityClassifier {
    thresholds: RiskBandThresholds,
}

impl ProbabilityClassifier {
    pub fn new(thresholds: RiskBandThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify `probability`; fails when it lies outside `[0, 100]`.
    pub fn classify(&self, probability: f64) -> Result<RiskBand, ValidationError> {
        if !probability.is_finite() || !(0.0..=100.0).contains(&probability) {
            return Err(ValidationError::InvalidProbability(probability));
        }

        let band = if probability >= self.thresholds.high {
            RiskBand::High
        } else if probability >= self.thresholds.medium {
            RiskBand::Medium
        } else {
            RiskBand::Low
        };
        Ok(band)
    }

    pub fn thresholds(&self) -> &RiskBandThresholds {
        &self.thresholds
    }
}
