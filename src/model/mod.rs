//! Model Module - churn classifier behind a trait
//!
//! The service only ever sees `dyn ChurnModel`; the concrete stacking
//! ensemble lives in `artifact` and is loaded once at startup.

pub mod artifact;
pub mod estimators;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use artifact::{ModelArtifact, ModelError, StackingModel};

/// Failure inside a model call. The message names the offending row/column.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct InferenceError(pub String);

/// Row-major table of raw feature cells with named columns.
///
/// Cells stay as text so the model decides how each column is encoded
/// (numeric parse or categorical lookup).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl FeatureMatrix {
    /// Every row must have exactly `columns.len()` cells.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Metadata reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub features: Vec<String>,
    pub estimators: usize,
    pub loaded_at: DateTime<Utc>,
}

/// A trained binary churn classifier.
///
/// Implementations are immutable after construction and safe to share
/// across request handlers.
pub trait ChurnModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    /// `[P(class 0), P(class 1)]` per row, row-aligned with the input.
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<[f64; 2]>, InferenceError>;

    /// Class decision (0 or 1) per row, row-aligned with the input.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u8>, InferenceError>;
}
