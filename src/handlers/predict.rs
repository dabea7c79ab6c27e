//! Prediction handlers

use axum::{
    extract::{multipart::{Multipart, MultipartError, MultipartRejection}, State},
    http::StatusCode,
    Json,
};

use crate::{AppState, AppResult, AppError};
use crate::format::{self, CsvDownload, PredictionsResponse};
use crate::inference::infer;
use crate::results::{assemble, high_risk_count, PredictionRecord};
use crate::schema::UploadTable;

/// Score an uploaded CSV and return the records as JSON
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<PredictionsResponse>> {
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let records = score(state, upload).await?;
    Ok(Json(format::to_json(records)))
}

/// Score an uploaded CSV and return `predictions.csv` as an attachment
pub async fn predict_csv(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<CsvDownload> {
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let records = score(state, upload).await?;
    Ok(CsvDownload(format::to_csv(&records)?))
}

/// Read the uploaded file: the first field carrying a filename, or named `file`.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    limit: usize,
) -> AppResult<Vec<u8>> {
    let mut multipart = multipart.map_err(|rejection| {
        AppError::Malformed(format!("Expected a multipart file upload: {}", rejection.body_text()))
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            let name = field.file_name().unwrap_or("<unnamed>").to_string();
            let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
            tracing::debug!(file = %name, bytes = bytes.len(), "Received upload");
            return Ok(bytes.to_vec());
        }
    }

    Err(AppError::Malformed("No file field found in the upload".to_string()))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::Malformed(format!("Invalid multipart upload: {}", err.body_text()))
    }
}

/// Parse, validate, infer and assemble on the blocking pool.
async fn score(state: AppState, upload: Vec<u8>) -> AppResult<Vec<PredictionRecord>> {
    tokio::task::spawn_blocking(move || score_upload(&state, &upload))
        .await
        .map_err(|e| AppError::Internal(format!("Scoring task failed: {}", e)))?
}

pub fn score_upload(state: &AppState, upload: &[u8]) -> AppResult<Vec<PredictionRecord>> {
    let table = UploadTable::from_csv_bytes(upload)?;
    let batch = state.schema.validate(&table)?;

    let output = infer(state.model.as_ref(), &batch.features)?;
    let records = assemble(
        batch.customer_ids,
        &output.labels,
        &output.probabilities,
        &state.thresholds,
    );

    tracing::info!(
        rows = records.len(),
        high_risk = high_risk_count(&records),
        "Scored upload"
    );

    Ok(records)
}
