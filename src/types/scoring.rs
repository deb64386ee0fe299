//! Output of the external fraud model

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize};

/// Model verdict for one transaction.
///
/// `probability` is the fraud-class probability on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Model's own binary call (accepts `true`/`false` or `1`/`0`)
    #[serde(deserialize_with = "bool_or_flag")]
    pub prediction: bool,

    pub probability: f64,
}

impl ScoringResult {
    pub fn new(prediction: bool, probability: f64) -> Self {
        Self {
            prediction,
            probability,
        }
    }

    /// Build from a raw classifier output where probability is in 0..=1.
    pub fn from_unit_probability(prediction: bool, probability: f64) -> Self {
        Self::new(prediction, probability * 100.0)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.probability.is_finite() || !(0.0..=100.0).contains(&self.probability) {
            return Err(ValidationError::InvalidProbability(self.probability));
        }
        Ok(())
    }

    /// Label persisted in the `MLPrediction` column
    pub fn prediction_label(&self) -> &'static str {
        if self.prediction {
            "Fraud"
        } else {
            "Not Fraud"
        }
    }
}

fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u8),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(other) => Err(serde::de::Error::custom(format!(
            "prediction must be 0 or 1, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_range() {
        assert!(ScoringResult::new(false, 0.0).validate().is_ok());
        assert!(ScoringResult::new(true, 100.0).validate().is_ok());
        assert_eq!(
            ScoringResult::new(true, 100.5).validate(),
            Err(ValidationError::InvalidProbability(100.5))
        );
        assert!(ScoringResult::new(false, -0.1).validate().is_err());
        assert!(ScoringResult::new(false, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_prediction_accepts_flags() {
        let s: ScoringResult = serde_json::from_str(r#"{"prediction": 1, "probability": 91.5}"#).unwrap();
        assert!(s.prediction);
        let s: ScoringResult =
            serde_json::from_str(r#"{"prediction": false, "probability": 3.0}"#).unwrap();
        assert!(!s.prediction);
        assert!(serde_json::from_str::<ScoringResult>(r#"{"prediction": 2, "probability": 3.0}"#).is_err());
    }

    #[test]
    fn test_unit_probability_and_label() {
        let s = ScoringResult::from_unit_probability(true, 0.25);
        assert_eq!(s.probability, 25.0);
        assert_eq!(s.prediction_label(), "Fraud");
        assert_eq!(ScoringResult::new(false, 1.0).prediction_label(), "Not Fraud");
    }
}
