//! Coordinate layouts for input scalar fields.

use serde::{Deserialize, Serialize};

/// Coordinates attached to an input field.
///
/// Values are stored row-major with latitude as the slow axis, so for
/// `OneDimensional` the sample at `(row, col)` is at `(lat[row], lon[col])`
/// and lives at flat index `row * lon.len() + col`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Coordinates {
    /// Separable grid: 1-D latitude × 1-D longitude.
    OneDimensional { lat: Vec<f64>, lon: Vec<f64> },
    /// Full 2-D latitude and longitude arrays of shape `(rows, cols)`,
    /// as delivered for satellite swaths.
    Curvilinear {
        lat: Vec<f64>,
        lon: Vec<f64>,
        shape: (usize, usize),
    },
}

impl Coordinates {
    /// Shape `(rows, cols)` of the value array these coordinates describe.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::OneDimensional { lat, lon } => (lat.len(), lon.len()),
            Self::Curvilinear { shape, .. } => *shape,
        }
    }

    /// Number of samples described.
    pub fn n_points(&self) -> usize {
        let (rows, cols) = self.shape();
        rows * cols
    }

    pub fn is_curvilinear(&self) -> bool {
        matches!(self, Self::Curvilinear { .. })
    }

    /// The 1-D latitude axis, if the layout is separable.
    pub fn latitude_axis(&self) -> Option<&[f64]> {
        match self {
            Self::OneDimensional { lat, .. } => Some(lat),
            Self::Curvilinear { .. } => None,
        }
    }

    /// Check internal consistency of a curvilinear layout.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if let Self::Curvilinear { lat, lon, shape } = self {
            let expected = shape.0 * shape.1;
            if lat.len() != expected || lon.len() != expected {
                return Err(CoordinateError::ShapeMismatch {
                    expected,
                    lat: lat.len(),
                    lon: lon.len(),
                });
            }
        }
        Ok(())
    }

    /// Dense per-sample `(lats, lons)`, expanding separable axes by outer product.
    pub fn expand(&self) -> (Vec<f64>, Vec<f64>) {
        match self {
            Self::OneDimensional { lat, lon } => {
                let n = lat.len() * lon.len();
                let mut lats = Vec::with_capacity(n);
                let mut lons = Vec::with_capacity(n);
                for &la in lat {
                    for &lo in lon {
                        lats.push(la);
                        lons.push(lo);
                    }
                }
                (lats, lons)
            }
            Self::Curvilinear { lat, lon, .. } => (lat.clone(), lon.clone()),
        }
    }

    /// Return a copy with coordinate sentinels (values below `threshold`)
    /// replaced by NaN. Only curvilinear coordinates carry sentinels; a
    /// separable layout is returned unchanged.
    pub fn with_sentinels_as_nan(&self, threshold: f64) -> Self {
        match self {
            Self::OneDimensional { .. } => self.clone(),
            Self::Curvilinear { lat, lon, shape } => {
                let clean = |v: &f64| if *v < threshold { f64::NAN } else { *v };
                Self::Curvilinear {
                    lat: lat.iter().map(clean).collect(),
                    lon: lon.iter().map(clean).collect(),
                    shape: *shape,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("curvilinear coordinates expect {expected} points, got lat={lat} lon={lon}")]
    ShapeMismatch {
        expected: usize,
        lat: usize,
        lon: usize,
    },
}
