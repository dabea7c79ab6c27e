//! Configuration module

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Feature columns the churn model was trained on, in training order.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 7] = [
    "AmountSpent",
    "ProductCategory",
    "LoginFrequency",
    "ServiceUsage",
    "Days_Since_Last_Transaction",
    "Days_Since_last_Interaction",
    "Days_Since_Last_Login",
];

pub const DEFAULT_ID_COLUMN: &str = "CustomerID";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("MEDIUM_RISK_THRESHOLD ({medium}) must be below HIGH_RISK_THRESHOLD ({high})")]
    ThresholdOrder { medium: f64, high: f64 },

    #[error("FEATURE_COLUMNS must name at least one column")]
    NoFeatures,

    #[error("feature column {0:?} is listed more than once")]
    DuplicateFeature(String),

    #[error("identifier column {0:?} cannot also be a feature column")]
    IdColumnAsFeature(String),

    #[error("MAX_UPLOAD_BYTES must be greater than zero")]
    ZeroUploadLimit,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Path of the serialized model artifact
    pub model_path: PathBuf,

    /// Upper bound on an uploaded request body
    pub max_upload_bytes: usize,

    /// Probability above which a customer is High risk
    pub high_risk_threshold: f64,

    /// Probability above which a customer is Medium risk
    pub medium_risk_threshold: f64,

    /// Identifier column expected in every upload
    pub id_column: String,

    /// Feature columns handed to the model, in order
    pub feature_columns: Vec<String>,

    pub log_format: LogFormat,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from("models/stacking_model.json"),
            max_upload_bytes: 10 * 1024 * 1024,
            high_risk_threshold: 0.7,
            medium_risk_threshold: 0.4,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            feature_columns: DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            log_format: LogFormat::Text,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),

            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),

            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),

            high_risk_threshold: lookup("HIGH_RISK_THRESHOLD")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.high_risk_threshold),

            medium_risk_threshold: lookup("MEDIUM_RISK_THRESHOLD")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.medium_risk_threshold),

            id_column: lookup("ID_COLUMN")
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.id_column),

            feature_columns: lookup("FEATURE_COLUMNS")
                .map(|list| {
                    list.split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.feature_columns),

            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },

            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Reject configurations the scoring pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("HIGH_RISK_THRESHOLD", self.high_risk_threshold),
            ("MEDIUM_RISK_THRESHOLD", self.medium_risk_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        if self.medium_risk_threshold >= self.high_risk_threshold {
            return Err(ConfigError::ThresholdOrder {
                medium: self.medium_risk_threshold,
                high: self.high_risk_threshold,
            });
        }

        if self.feature_columns.is_empty() {
            return Err(ConfigError::NoFeatures);
        }

        for (i, column) in self.feature_columns.iter().enumerate() {
            if *column == self.id_column {
                return Err(ConfigError::IdColumnAsFeature(column.clone()));
            }
            if self.feature_columns[..i].contains(column) {
                return Err(ConfigError::DuplicateFeature(column.clone()));
            }
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }

        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
