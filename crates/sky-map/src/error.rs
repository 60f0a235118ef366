//! Error types for sky-map construction and combination.

use pixelization::PixelizationError;
use sky_common::{CoordinateError, WindowError};
use thiserror::Error;

/// Errors that can occur while building or combining sky maps.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkyMapError {
    /// Bad statistic, empty required list, malformed window, bad resolution.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Maps of different nside cannot be combined cell-wise.
    #[error("resolution mismatch: expected nside {expected}, found {found}")]
    ResolutionMismatch { expected: u32, found: u32 },

    /// Coordinate/value array lengths or dimensionality disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An input needed for this construction path was not supplied.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// The field-loading collaborator failed.
    #[error("failed to load {path}: {message}")]
    Source { path: String, message: String },
}

impl SkyMapError {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create a MissingPrerequisite error.
    pub fn missing_prerequisite(msg: impl Into<String>) -> Self {
        Self::MissingPrerequisite(msg.into())
    }

    /// Create a Source error for a failed load.
    pub fn load_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<PixelizationError> for SkyMapError {
    fn from(err: PixelizationError) -> Self {
        match err {
            PixelizationError::ShapeMismatch { .. } => Self::ShapeMismatch(err.to_string()),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

impl From<WindowError> for SkyMapError {
    fn from(err: WindowError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<CoordinateError> for SkyMapError {
    fn from(err: CoordinateError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}

/// Result type for sky-map operations.
pub type Result<T> = std::result::Result<T, SkyMapError>;
