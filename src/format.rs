//! Response formatters - JSON body or CSV attachment

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::results::{PredictionRecord, RECORD_FIELDS};

pub const CSV_FILENAME: &str = "predictions.csv";

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionRecord>,
}

pub fn to_json(records: Vec<PredictionRecord>) -> PredictionsResponse {
    PredictionsResponse { predictions: records }
}

/// Header row followed by one row per record. An empty slice yields the header alone.
pub fn to_csv(records: &[PredictionRecord]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(RECORD_FIELDS)?;
    for record in records {
        writer.serialize(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV output: {}", e)))
}

/// `text/csv` attachment response
pub struct CsvDownload(pub Vec<u8>);

impl IntoResponse for CsvDownload {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", CSV_FILENAME),
                ),
            ],
            self.0,
        )
            .into_response()
    }
}
