//! Customer Churn Prediction API server
//!
//! Loads the trained classifier once, then serves batch scoring over HTTP.
//!
//! ```text
//! GET  /              liveness message
//! GET  /health        version + loaded model
//! POST /predict/      CSV upload -> {"predictions": [...]}
//! POST /predict_csv/  CSV upload -> predictions.csv
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use churn_api::config::{Config, LogFormat};
use churn_api::model::{ChurnModel, StackingModel};
use churn_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    init_tracing(config.log_format);

    tracing::info!("Churn prediction API starting...");
    config.validate().context("Invalid configuration")?;

    // The service must not accept traffic without a model
    let model = StackingModel::load(&config.model_path)
        .with_context(|| format!("Failed to load model from {}", config.model_path.display()))?;

    let model_features = &model.info().features;
    if *model_features != config.feature_columns {
        tracing::warn!(
            configured = ?config.feature_columns,
            model = ?model_features,
            "Configured feature columns differ from the model's features"
        );
    }

    // Build application state
    let state = AppState::new(config.clone(), Arc::new(model));

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "churn_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
