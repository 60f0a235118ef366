//! Error types for field loading and export.

use thiserror::Error;

/// Result type for field I/O operations.
pub type FieldIoResult<T> = Result<T, FieldIoError>;

/// Error types for field I/O.
#[derive(Error, Debug)]
pub enum FieldIoError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested data variable is not in the dataset
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    /// No latitude or longitude coordinate could be found
    #[error("Missing coordinate: {0}")]
    MissingCoordinate(String),

    /// Data does not have the expected layout
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Time or spatial selection could not be applied
    #[error("Selection failed: {0}")]
    Selection(String),
}

impl FieldIoError {
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::Selection(msg.into())
    }
}
