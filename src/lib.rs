//! Customer Churn Prediction API
//!
//! Batch scoring of uploaded customer CSVs against a pre-trained
//! stacking classifier.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐
//! │  upload  │──►│  schema  │──►│ inference │──►│ results  │──►│  format    │
//! │ (CSV)    │   │ validate │   │ (model)   │   │ assemble │   │ JSON / CSV │
//! └──────────┘   └──────────┘   └───────────┘   └──────────┘   └────────────┘
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod inference;
pub mod model;
pub mod results;
pub mod schema;


use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use config::Config;
use model::ChurnModel;
use results::RiskThresholds;
use schema::Schema;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup, read-only afterwards
    pub model: Arc<dyn ChurnModel>,
    pub schema: Arc<Schema>,
    pub thresholds: RiskThresholds,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, model: Arc<dyn ChurnModel>) -> Self {
        Self {
            model,
            schema: Arc::new(Schema::from_config(&config)),
            thresholds: RiskThresholds::from_config(&config),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route("/predict/", post(handlers::predict::predict))
        .route("/predict", post(handlers::predict::predict))
        .route("/predict_csv/", post(handlers::predict::predict_csv))
        .route("/predict_csv", post(handlers::predict::predict_csv))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .merge(upload_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
