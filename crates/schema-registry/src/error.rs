use crate::document::SchemaCoordinate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Registry unreachable, artifact missing, or body not a valid schema.
    #[error("Failed to fetch schema for {coordinate}: {reason}")]
    SchemaFetch {
        coordinate: SchemaCoordinate,
        reason: String,
    },

    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid registry URL '{0}'")]
    InvalidUrl(String),

    #[error("Input folder not found: {0}")]
    MissingInput(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
