//! HEALPix resolution (nside) selection.
//!
//! A HEALPix grid at resolution `nside` splits the sphere into
//! `12 · nside²` equal-area cells of `4π / (12 · nside²)` steradians each.
//! The nominal cell size used throughout is the square root of that area.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PixelResult, PixelizationError};

/// Deepest supported hierarchy level (nside = 2^29 keeps cell ids in u64).
pub const MAX_DEPTH: u8 = 29;

/// Largest supported nside.
pub const MAX_NSIDE: u32 = 1 << MAX_DEPTH;

/// A validated HEALPix resolution parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Nside(u32);

impl Nside {
    /// Validate an nside value.
    pub fn new(nside: u32) -> PixelResult<Self> {
        if nside == 0 || !nside.is_power_of_two() || nside > MAX_NSIDE {
            return Err(PixelizationError::InvalidNside(nside as u64));
        }
        Ok(Self(nside))
    }

    /// nside for a hierarchy depth (`nside = 2^depth`).
    pub fn from_depth(depth: u8) -> PixelResult<Self> {
        if depth > MAX_DEPTH {
            return Err(PixelizationError::InvalidNside(1u64 << depth.min(63)));
        }
        Ok(Self(1 << depth))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Hierarchy depth, `log2(nside)`.
    pub fn depth(self) -> u8 {
        self.0.trailing_zeros() as u8
    }

    /// Number of cells on the sphere.
    pub fn npix(self) -> u64 {
        12 * (self.0 as u64) * (self.0 as u64)
    }

    /// Cell area in steradians.
    pub fn pixel_area_sr(self) -> f64 {
        4.0 * PI / self.npix() as f64
    }

    /// Cell area in square degrees.
    pub fn pixel_area_deg2(self) -> f64 {
        self.pixel_area_sr() * (180.0 / PI).powi(2)
    }

    /// Nominal cell size in degrees (square root of the cell area).
    pub fn pixel_size_deg(self) -> f64 {
        self.pixel_area_sr().sqrt().to_degrees()
    }
}

impl TryFrom<u32> for Nside {
    type Error = PixelizationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Nside> for u32 {
    fn from(nside: Nside) -> Self {
        nside.0
    }
}

impl fmt::Display for Nside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pick the coarsest nside whose cell size does not exceed `target_deg`.
///
/// Solves `sqrt(4π / (12 · n²)) = target` for `n`, rounds up to the next
/// power of two and returns that nside with its actual cell size.
pub fn resolution_for_angular_size(target_deg: f64) -> PixelResult<(Nside, f64)> {
    if !target_deg.is_finite() || target_deg <= 0.0 {
        return Err(PixelizationError::degenerate(format!(
            "target angular size must be positive and finite, got {}",
            target_deg
        )));
    }

    let target_rad = target_deg.to_radians();
    let nside_exact = (PI / 3.0).sqrt() / target_rad;

    // Small tolerance so an exact power of two is not bumped a level.
    let exponent = (nside_exact.log2() - 1e-9).ceil().max(0.0);
    if exponent > MAX_DEPTH as f64 {
        return Err(PixelizationError::degenerate(format!(
            "target {}° needs nside above 2^{}",
            target_deg, MAX_DEPTH
        )));
    }

    let nside = Nside::from_depth(exponent as u8)?;
    let actual = nside.pixel_size_deg();
    debug!(target_deg, nside = nside.get(), actual_deg = actual, "Selected resolution");
    Ok((nside, actual))
}

/// Pick an nside from a 1-D coordinate axis.
///
/// The target size is the median absolute spacing between successive
/// coordinates; non-finite differences are ignored.
pub fn resolution_for_dataset(coordinate: &[f64]) -> PixelResult<(Nside, f64)> {
    if coordinate.len() < 2 {
        return Err(PixelizationError::degenerate(format!(
            "need at least 2 coordinates to measure spacing, got {}",
            coordinate.len()
        )));
    }

    let mut diffs: Vec<f64> = coordinate
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| d.is_finite())
        .collect();

    let spacing = median(&mut diffs).ok_or_else(|| {
        PixelizationError::degenerate("coordinate axis has no finite spacing")
    })?;

    if spacing <= 0.0 {
        return Err(PixelizationError::degenerate(
            "median coordinate spacing is zero",
        ));
    }

    resolution_for_angular_size(spacing)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nside_validation() {
        assert!(Nside::new(1).is_ok());
        assert!(Nside::new(1024).is_ok());
        assert!(Nside::new(0).is_err());
        assert!(Nside::new(3).is_err());
        assert!(Nside::new(1 << 30).is_err());
    }

    #[test]
    fn test_npix_and_depth() {
        let nside = Nside::new(16).unwrap();
        assert_eq!(nside.npix(), 3072);
        assert_eq!(nside.depth(), 4);
        assert_eq!(Nside::from_depth(4).unwrap(), nside);
    }

    #[test]
    fn test_pixel_area_sums_to_sphere() {
        let nside = Nside::new(8).unwrap();
        let total = nside.pixel_area_deg2() * nside.npix() as f64;
        assert!((total - 41252.96).abs() < 0.1);
    }

    #[test]
    fn test_two_degree_target() {
        let (nside, size) = resolution_for_angular_size(2.0).unwrap();
        assert_eq!(nside.get(), 32);
        assert!(size <= 2.0);
        // one level coarser would be too big
        assert!(Nside::new(16).unwrap().pixel_size_deg() > 2.0);
    }

    #[test]
    fn test_exact_pixel_size_keeps_level() {
        let n64 = Nside::new(64).unwrap();
        let (nside, _) = resolution_for_angular_size(n64.pixel_size_deg()).unwrap();
        assert_eq!(nside, n64);
    }

    #[test]
    fn test_huge_target_clamps_to_nside_one() {
        let (nside, size) = resolution_for_angular_size(90.0).unwrap();
        assert_eq!(nside.get(), 1);
        assert!(size < 90.0);
    }

    #[test]
    fn test_bad_targets() {
        assert!(resolution_for_angular_size(0.0).is_err());
        assert!(resolution_for_angular_size(-1.0).is_err());
        assert!(resolution_for_angular_size(f64::NAN).is_err());
        assert!(resolution_for_angular_size(1e-12).is_err());
    }

    #[test]
    fn test_dataset_spacing() {
        let lat: Vec<f64> = (0..20).map(|i| -10.0 + 0.25 * i as f64).collect();
        let (nside, size) = resolution_for_dataset(&lat).unwrap();
        assert!(size <= 0.25);
        assert_eq!(nside, resolution_for_angular_size(0.25).unwrap().0);
    }

    #[test]
    fn test_dataset_descending_axis_and_nan() {
        let lat = vec![10.0, 9.0, f64::NAN, 7.0, 6.0, 5.0];
        let (nside, _) = resolution_for_dataset(&lat).unwrap();
        assert_eq!(nside, resolution_for_angular_size(1.0).unwrap().0);
    }

    #[test]
    fn test_dataset_degenerate() {
        assert!(resolution_for_dataset(&[1.0]).is_err());
        assert!(resolution_for_dataset(&[1.0, 1.0, 1.0]).is_err());
        assert!(resolution_for_dataset(&[f64::NAN, f64::NAN]).is_err());
    }
}
