//! Error types for glucowatch

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Thresholds out of order: {min_critical} < {min_acceptable} < {min_normal} < {max_normal} < {max_acceptable} < {max_critical} does not hold"
    )]
    InvalidThresholds {
        min_critical: f64,
        min_acceptable: f64,
        min_normal: f64,
        max_normal: f64,
        max_acceptable: f64,
        max_critical: f64,
    },

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("No glucose data available")]
    NoData,
}
