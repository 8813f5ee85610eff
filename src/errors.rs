// src/errors.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid candle at {timestamp}: {reason}")]
    InvalidCandle { timestamp: String, reason: String },

    #[error("Invalid zone {zone_id}: {reason}")]
    InvalidZone { zone_id: String, reason: String },

    #[error("Insufficient data: required {required}, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("Invalid preference {name}: {reason}")]
    InvalidPreference { name: String, reason: String },

    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Alert store error: {0}")]
    Store(String),

    #[error("Alert dispatch error: {0}")]
    Dispatch(String),

    #[error("Analysis task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
