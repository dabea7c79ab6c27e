//! Inference adapter - labels and class-1 probabilities for a batch

use crate::model::{ChurnModel, FeatureMatrix, InferenceError};

/// Model output for a batch, row-aligned with the feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInference {
    pub labels: Vec<u8>,
    pub probabilities: Vec<f64>,
}

/// Run both model calls over `features`.
///
/// Fails when the model errors or returns a different number of rows
/// than it was given.
pub fn infer(model: &dyn ChurnModel, features: &FeatureMatrix) -> Result<BatchInference, InferenceError> {
    let expected = features.n_rows();

    let labels = model.predict(features)?;
    let probabilities: Vec<f64> = model
        .predict_proba(features)?
        .into_iter()
        .map(|[_, p1]| p1)
        .collect();

    if labels.len() != expected || probabilities.len() != expected {
        return Err(InferenceError(format!(
            "Model returned {} labels and {} probabilities for {} rows",
            labels.len(),
            probabilities.len(),
            expected
        )));
    }

    if let Some(row) = labels.iter().position(|l| *l > 1) {
        return Err(InferenceError(format!(
            "Model returned non-binary label {} for row {}",
            labels[row], row
        )));
    }

    if let Some(row) = probabilities.iter().position(|p| !(0.0..=1.0).contains(p)) {
        return Err(InferenceError(format!(
            "Model returned probability {} outside [0, 1] for row {}",
            probabilities[row], row
        )));
    }

    Ok(BatchInference { labels, probabilities })
}
