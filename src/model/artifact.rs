//! Model artifact - stacking ensemble serialized as JSON
//!
//! ```text
//!  raw cells ──► encode (numeric / categorical) ──► scaler
//!                                                     │
//!              ┌──────────────┬──────────────┬────────┘
//!              ▼              ▼              ▼
//!          estimator 0    estimator 1 ...  (passthrough)
//!              │ P(1)         │ P(1)         │ x
//!              └──────────────┴──────┬───────┘
//!                                    ▼
//!                           final logistic ──► P(1)
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::estimators::{BaseEstimator, LogisticRegression, StandardScaler};
use super::{ChurnModel, FeatureMatrix, InferenceError, ModelInfo};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model artifact is inconsistent: {0}")]
    Invalid(String),
}

fn default_decision_threshold() -> f64 {
    0.5
}

/// On-disk form of the trained classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,

    /// Input columns, in the order the estimators index them
    pub features: Vec<String>,

    /// column -> category -> numeric code
    #[serde(default)]
    pub categorical: BTreeMap<String, BTreeMap<String, f64>>,

    #[serde(default)]
    pub scaler: Option<StandardScaler>,

    pub estimators: Vec<BaseEstimator>,

    pub final_estimator: LogisticRegression,

    /// Feed the scaled features to the final estimator after the base probabilities
    #[serde(default)]
    pub passthrough: bool,

    /// `predict` returns 1 when P(1) is strictly above this value
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
}

impl ModelArtifact {
    /// Reject artifacts whose parts disagree on dimensions.
    pub fn check(&self) -> Result<(), ModelError> {
        let n_features = self.features.len();
        if n_features == 0 {
            return Err(ModelError::Invalid("no features declared".to_string()));
        }
        if self.estimators.is_empty() {
            return Err(ModelError::Invalid("no base estimators".to_string()));
        }

        for column in self.categorical.keys() {
            if !self.features.contains(column) {
                return Err(ModelError::Invalid(format!(
                    "categorical encoding for unknown feature {:?}",
                    column
                )));
            }
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                return Err(ModelError::Invalid(format!(
                    "scaler has {} means and {} scales for {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n_features
                )));
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(ModelError::Invalid("scaler contains a zero or non-finite scale".to_string()));
            }
        }

        for (i, estimator) in self.estimators.iter().enumerate() {
            estimator
                .check(n_features)
                .map_err(|e| ModelError::Invalid(format!("estimator {}: {}", i, e)))?;
        }

        let meta_inputs = self.estimators.len() + if self.passthrough { n_features } else { 0 };
        if self.final_estimator.n_inputs() != meta_inputs {
            return Err(ModelError::Invalid(format!(
                "final estimator has {} coefficients, expected {}",
                self.final_estimator.n_inputs(),
                meta_inputs
            )));
        }

        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(ModelError::Invalid(format!(
                "decision threshold {} outside [0, 1]",
                self.decision_threshold
            )));
        }

        Ok(())
    }
}

/// Loaded, validated stacking classifier
#[derive(Debug)]
pub struct StackingModel {
    artifact: ModelArtifact,
    info: ModelInfo,
}

impl StackingModel {
    /// Read and validate the artifact at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        tracing::info!("Loading model artifact from: {}", path.display());

        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let model = Self::from_slice(&bytes, &path.display().to_string())?;

        tracing::info!(
            name = %model.info.name,
            estimators = model.info.estimators,
            sha256 = %model.info.sha256,
            "Model artifact loaded"
        );

        Ok(model)
    }

    /// Parse an artifact held in memory; `origin` is reported as its path.
    pub fn from_slice(bytes: &[u8], origin: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_slice(bytes)?;
        artifact.check()?;

        let info = ModelInfo {
            name: artifact.name.clone(),
            path: origin.to_string(),
            sha256: hex::encode(Sha256::digest(bytes)),
            features: artifact.features.clone(),
            estimators: artifact.estimators.len(),
            loaded_at: Utc::now(),
        };

        Ok(Self { artifact, info })
    }

    /// Turn the raw cells into numeric rows in artifact feature order.
    fn encode(&self, features: &FeatureMatrix) -> Result<Vec<Vec<f64>>, InferenceError> {
        let positions = self
            .artifact
            .features
            .iter()
            .map(|name| {
                features.column_index(name).ok_or_else(|| {
                    InferenceError(format!(
                        "Feature {:?} expected by the model is missing from the input",
                        name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        features
            .rows()
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                self.artifact
                    .features
                    .iter()
                    .zip(&positions)
                    .map(|(name, &pos)| self.encode_cell(row_idx, name, &row[pos]))
                    .collect::<Result<Vec<f64>, _>>()
            })
            .collect()
    }

    fn encode_cell(&self, row: usize, column: &str, cell: &str) -> Result<f64, InferenceError> {
        let cell = cell.trim();

        if let Some(codes) = self.artifact.categorical.get(column) {
            return codes.get(cell).copied().ok_or_else(|| {
                InferenceError(format!(
                    "Row {}: unknown category {:?} in column {:?}",
                    row, cell, column
                ))
            });
        }

        if cell.is_empty() {
            return Err(InferenceError(format!(
                "Row {}: missing value in column {:?}",
                row, column
            )));
        }

        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(InferenceError(format!(
                "Row {}: could not convert {:?} in column {:?} to a number",
                row, cell, column
            ))),
        }
    }

    fn score_row(&self, mut x: Vec<f64>) -> f64 {
        if let Some(scaler) = &self.artifact.scaler {
            scaler.transform(&mut x);
        }

        let mut meta: Vec<f64> = self.artifact.estimators.iter().map(|e| e.proba(&x)).collect();
        if self.artifact.passthrough {
            meta.extend_from_slice(&x);
        }

        self.artifact.final_estimator.proba(&meta).clamp(0.0, 1.0)
    }
}

impl ChurnModel for StackingModel {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<[f64; 2]>, InferenceError> {
        Ok(self
            .encode(features)?
            .into_iter()
            .map(|x| {
                let p1 = self.score_row(x);
                [1.0 - p1, p1]
            })
            .collect())
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u8>, InferenceError> {
        let threshold = self.artifact.decision_threshold;
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|[_, p1]| u8::from(p1 > threshold))
            .collect())
    }
}
