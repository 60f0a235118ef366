//! Latitude/longitude ⇄ HEALPix cell mapping.
//!
//! # Conventions
//!
//! - Public coordinates are degrees: latitude in `[-90, 90]`, longitude on
//!   any branch (it is wrapped), centers are returned with longitude in
//!   `[0, 360)`.
//! - Cell ids use the HEALPix RING ordering, the default of healpy, so
//!   `cell_of` agrees with `ang2pix(nside, theta, phi)` for
//!   `theta = 90° - lat`, `phi = lon` and `center_of` agrees with
//!   `pix2ang(nside, id, lonlat=True)`.
//! - Internally the pixelization works in the NESTED scheme in radians
//!   (longitude, latitude) and converts to RING at the boundary.

use cdshealpix::nested::{self, Layer};

use crate::error::{PixelResult, PixelizationError};
use crate::resolution::Nside;

/// Maps coordinates to cells for a single resolution.
#[derive(Clone, Copy)]
pub struct CellIndexer {
    nside: Nside,
    layer: &'static Layer,
}

impl std::fmt::Debug for CellIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellIndexer")
            .field("nside", &self.nside)
            .finish()
    }
}

impl CellIndexer {
    pub fn new(nside: Nside) -> Self {
        Self {
            nside,
            layer: nested::get(nside.depth()),
        }
    }

    pub fn nside(&self) -> Nside {
        self.nside
    }

    pub fn npix(&self) -> u64 {
        self.nside.npix()
    }

    /// Cell containing `(lat, lon)`.
    ///
    /// Non-finite input and latitudes outside `[-90, 90]` are rejected
    /// before they reach the pixelization.
    pub fn cell_of(&self, lat: f64, lon: f64) -> PixelResult<u64> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(PixelizationError::invalid_coordinate(lat, lon, "non-finite"));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(PixelizationError::invalid_coordinate(
                lat,
                lon,
                "latitude outside [-90, 90]",
            ));
        }
        Ok(self.ring_hash(lat, lon))
    }

    /// Vectorized `cell_of`: `None` for samples that cannot be indexed.
    pub fn cells_of(&self, lats: &[f64], lons: &[f64]) -> PixelResult<Vec<Option<u64>>> {
        if lats.len() != lons.len() {
            return Err(PixelizationError::ShapeMismatch {
                lat: lats.len(),
                lon: lons.len(),
            });
        }
        Ok(lats
            .iter()
            .zip(lons)
            .map(|(&lat, &lon)| self.cell_of(lat, lon).ok())
            .collect())
    }

    /// Center `(lon, lat)` of a cell, in degrees.
    pub fn center_of(&self, cell: u64) -> PixelResult<(f64, f64)> {
        if cell >= self.npix() {
            return Err(PixelizationError::CellOutOfRange {
                cell,
                nside: self.nside.get(),
                npix: self.npix(),
            });
        }
        Ok(self.center_unchecked(cell))
    }

    /// Centers of every cell, as parallel `(lons, lats)` in cell-id order.
    pub fn centers(&self) -> (Vec<f64>, Vec<f64>) {
        let npix = self.npix() as usize;
        let mut lons = Vec::with_capacity(npix);
        let mut lats = Vec::with_capacity(npix);
        for cell in 0..npix as u64 {
            let (lon, lat) = self.center_unchecked(cell);
            lons.push(lon);
            lats.push(lat);
        }
        (lons, lats)
    }

    /// Bilinear interpolation stencil at `(lat, lon)`: four `(cell, weight)`
    /// pairs whose weights sum to one. Cells may repeat near the poles.
    pub fn interpolation_weights(&self, lat: f64, lon: f64) -> PixelResult<[(u64, f64); 4]> {
        // validates the coordinate
        self.cell_of(lat, lon)?;
        let stencil = self
            .layer
            .bilinear_interpolation(lon.to_radians(), lat.to_radians());
        Ok(stencil.map(|(nested_hash, w)| (self.layer.to_ring(nested_hash), w)))
    }

    fn ring_hash(&self, lat: f64, lon: f64) -> u64 {
        let nested_hash = self.layer.hash(lon.to_radians(), lat.to_radians());
        self.layer.to_ring(nested_hash)
    }

    fn center_unchecked(&self, cell: u64) -> (f64, f64) {
        let (lon, lat) = self.layer.center(self.layer.from_ring(cell));
        (sky_lon(lon.to_degrees()), lat.to_degrees())
    }
}

/// Cell containing `(lat, lon)` at `nside`.
pub fn cell_of(nside: Nside, lat: f64, lon: f64) -> PixelResult<u64> {
    CellIndexer::new(nside).cell_of(lat, lon)
}

/// Center `(lon, lat)` in degrees of `cell` at `nside`.
pub fn center_of(nside: Nside, cell: u64) -> PixelResult<(f64, f64)> {
    CellIndexer::new(nside).center_of(cell)
}

fn sky_lon(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexer(nside: u32) -> CellIndexer {
        CellIndexer::new(Nside::new(nside).unwrap())
    }

    #[test]
    fn test_ring_ordering_starts_at_north_pole() {
        // RING cells 0..4 form the first ring around the north pole.
        let idx = indexer(1);
        for cell in 0..4 {
            let (_, lat) = idx.center_of(cell).unwrap();
            assert!(lat > 40.0, "cell {} lat {}", cell, lat);
        }
        for cell in 8..12 {
            let (_, lat) = idx.center_of(cell).unwrap();
            assert!(lat < -40.0, "cell {} lat {}", cell, lat);
        }
    }

    #[test]
    fn test_poles_map_to_first_and_last_rings() {
        let idx = indexer(4);
        assert!(idx.cell_of(90.0, 0.0).unwrap() < 4);
        assert!(idx.cell_of(-90.0, 0.0).unwrap() >= idx.npix() - 4);
    }

    #[test]
    fn test_longitude_branches_agree() {
        let idx = indexer(32);
        assert_eq!(
            idx.cell_of(12.5, -45.0).unwrap(),
            idx.cell_of(12.5, 315.0).unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let idx = indexer(8);
        assert!(idx.cell_of(f64::NAN, 0.0).is_err());
        assert!(idx.cell_of(0.0, f64::INFINITY).is_err());
        assert!(idx.cell_of(91.0, 0.0).is_err());
        assert!(matches!(
            idx.center_of(idx.npix()),
            Err(PixelizationError::CellOutOfRange { .. })
        ));
    }

    #[test]
    fn test_vectorized_cells_flag_unusable_samples() {
        let idx = indexer(8);
        let cells = idx
            .cells_of(&[0.0, f64::NAN, 45.0], &[10.0, 10.0, f64::NAN])
            .unwrap();
        assert!(cells[0].is_some());
        assert!(cells[1].is_none());
        assert!(cells[2].is_none());
        assert!(idx.cells_of(&[0.0], &[]).is_err());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let idx = indexer(16);
        let stencil = idx.interpolation_weights(20.3, 131.7).unwrap();
        let total: f64 = stencil.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
        for (cell, _) in stencil {
            assert!(cell < idx.npix());
        }
    }
}
