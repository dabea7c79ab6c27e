//! Liveness and health handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::model::ModelInfo;
use crate::AppState;

pub const LIVENESS_MESSAGE: &str = "Customer churn prediction API is running.";

#[derive(Serialize)]
pub struct RootResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: ModelInfo,
    timestamp: i64,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse { message: LIVENESS_MESSAGE })
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model.info().clone(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
