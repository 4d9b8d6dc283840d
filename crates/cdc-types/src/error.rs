//! Error types for cdc-types crate.

use thiserror::Error;

/// Errors that can occur while rendering values or loading normalizer rules.
#[derive(Error, Debug)]
pub enum CdcTypesError {
    #[error("JSON rendering error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timestamp rules: {0}")]
    TimestampRules(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cdc-types operations.
pub type Result<T> = std::result::Result<T, CdcTypesError>;
