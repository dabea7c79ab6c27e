//! Result assembly - one prediction record per input row

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Risk tier derived from the churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    /// Serialized lower-case
    #[serde(rename = "low")]
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "low",
        }
    }
}

/// Tier boundaries. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { high: 0.7, medium: 0.4 }
    }
}

impl RiskThresholds {
    pub fn from_config(config: &Config) -> Self {
        Self {
            high: config.high_risk_threshold,
            medium: config.medium_risk_threshold,
        }
    }

    /// Classify the unrounded probability.
    pub fn classify(&self, probability: f64) -> RiskLevel {
        if probability > self.high {
            RiskLevel::High
        } else if probability > self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "CustomerID")]
    pub customer_id: String,

    #[serde(rename = "ChurnStatus")]
    pub churn_status: u8,

    /// Rounded to 3 decimals
    #[serde(rename = "ChurnProbability")]
    pub churn_probability: f64,

    #[serde(rename = "Risk_Level")]
    pub risk_level: RiskLevel,
}

/// Field names in output order
pub const RECORD_FIELDS: [&str; 4] = ["CustomerID", "ChurnStatus", "ChurnProbability", "Risk_Level"];

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Zip identifiers, labels and probabilities into records, preserving order.
pub fn assemble(
    customer_ids: Vec<String>,
    labels: &[u8],
    probabilities: &[f64],
    thresholds: &RiskThresholds,
) -> Vec<PredictionRecord> {
    debug_assert_eq!(customer_ids.len(), labels.len());
    debug_assert_eq!(customer_ids.len(), probabilities.len());

    customer_ids
        .into_iter()
        .zip(labels)
        .zip(probabilities)
        .map(|((customer_id, &label), &proba)| PredictionRecord {
            customer_id,
            churn_status: label,
            churn_probability: round3(proba),
            risk_level: thresholds.classify(proba),
        })
        .collect()
}

/// Number of records in the High tier
pub fn high_risk_count(records: &[PredictionRecord]) -> usize {
    records.iter().filter(|r| r.risk_level == RiskLevel::High).count()
}
