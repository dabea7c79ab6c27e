//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::model::InferenceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Upload is not UTF-8 text or not parseable as delimited data
    #[error("{0}")]
    Malformed(String),

    /// Required columns absent, listed in check order
    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    /// The model rejected the feature matrix
    #[error("{0}")]
    Inference(String),

    /// Upload parsed but carried no data rows
    #[error("Uploaded file contains no data rows")]
    EmptyResult,

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Malformed(_) | AppError::EmptyResult => StatusCode::BAD_REQUEST,
            AppError::MissingColumns(_) | AppError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Malformed(_) => "malformed",
            AppError::MissingColumns(_) => "schema_error",
            AppError::Inference(_) => "inference_error",
            AppError::EmptyResult => "empty_result",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "Request failed: {}", message);
        } else {
            tracing::warn!(kind = self.kind(), "Request rejected: {}", message);
        }

        let mut body = json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16()
        });

        if let AppError::MissingColumns(columns) = &self {
            body["missing_columns"] = json!(columns);
        }

        (status, Json(body)).into_response()
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::Inference(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Malformed(format!("Could not parse CSV: {}", err))
    }
}
