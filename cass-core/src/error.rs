//! Error types for the CASS database manager

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for CASS operations
#[derive(Error, Debug)]
pub enum CassError {
    /// Configuration file does not exist
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// A non-comment, non-blank line without a `=` separator
    #[error("Malformed line {line} in {path}: no '=' separator in {text:?}")]
    ConfigParse {
        path: PathBuf,
        line: usize,
        text: String,
    },

    /// Expected configuration key is absent
    #[error("Missing key '{key}' in {path}")]
    MissingKey { key: String, path: PathBuf },

    /// A key is present but its value cannot be used
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// A raw instrument file that cannot be ingested
    #[error("Malformed data file {path}: {reason}")]
    MalformedFile { path: PathBuf, reason: String },

    /// Database errors (surfaced from the storage layer)
    #[error("Database error: {0}")]
    Database(String),

    /// Requested analysis range is unusable
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// The AE33 and TCA tables share no date range
    #[error("No overlapping date range between the AE33 and TCA tables")]
    NoOverlap,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CASS operations
pub type Result<T> = std::result::Result<T, CassError>;

impl CassError {
    /// Build a `MalformedFile` error for the given path.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CassError::MalformedFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
