//! Error types for pixelization.

use thiserror::Error;

/// Result type for pixelization operations.
pub type PixelResult<T> = Result<T, PixelizationError>;

/// Errors raised while selecting a resolution or indexing cells.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PixelizationError {
    /// nside is zero, not a power of two, or above the supported ceiling.
    #[error("invalid nside {0}: must be a power of two in [1, 2^29]")]
    InvalidNside(u64),

    /// A latitude/longitude pair that cannot be indexed.
    #[error("invalid coordinate (lat={lat}, lon={lon}): {reason}")]
    InvalidCoordinate { lat: f64, lon: f64, reason: String },

    /// A cell identifier outside `[0, npix)`.
    #[error("cell {cell} out of range for nside {nside} (npix={npix})")]
    CellOutOfRange { cell: u64, nside: u32, npix: u64 },

    /// A target size or coordinate spacing that yields no usable resolution.
    #[error("cannot derive resolution: {0}")]
    DegenerateSpacing(String),

    /// Parallel coordinate arrays of different lengths.
    #[error("coordinate length mismatch: lat={lat}, lon={lon}")]
    ShapeMismatch { lat: usize, lon: usize },
}

impl PixelizationError {
    /// Create an InvalidCoordinate error.
    pub fn invalid_coordinate(lat: f64, lon: f64, reason: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            lat,
            lon,
            reason: reason.into(),
        }
    }

    /// Create a DegenerateSpacing error.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateSpacing(msg.into())
    }
}
