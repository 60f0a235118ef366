//! The sky-map container.

use std::path::Path;

use chrono::{DateTime, Utc};
use pixelization::{resolution_for_angular_size, resolution_for_dataset, CellIndexer, Nside};
use serde::{Deserialize, Serialize};
use sky_common::{Coordinates, LonLatWindow};
use tracing::{debug, info, warn};

use crate::binning::{bin_with_threshold, BinnedCells, Stat};
use crate::config::SkyMapConfig;
use crate::error::{Result, SkyMapError};
use crate::source::{FieldRequest, FieldSource, SourceField};
use crate::units;

/// Kilometres per degree of arc on a sphere of radius 6371 km.
pub const KM_PER_DEGREE: f64 = 2.0 * std::f64::consts::PI * 6371.0 / 360.0;

/// Where a map's data came from. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source file or derived label.
    pub source: Option<String>,
    /// Data variable name.
    pub variable: Option<String>,
    /// Observation time of the source field.
    pub time: Option<DateTime<Utc>>,
}

impl Provenance {
    pub fn new(source: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            variable: Some(variable.into()),
            time: None,
        }
    }

    pub fn with_time(mut self, time: Option<DateTime<Utc>>) -> Self {
        self.time = time;
        self
    }

    /// Short label: the source's file name, or "unknown".
    pub fn label(&self) -> String {
        self.source
            .as_deref()
            .map(|s| {
                Path::new(s)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| s.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Derived provenance for a stack running from `first` to `last`.
    pub fn spanning(first: &Provenance, last: &Provenance, n_maps: usize) -> Self {
        let variable = if first.variable == last.variable {
            first.variable.clone()
        } else {
            None
        };
        Self {
            source: Some(format!(
                "stack[{}]:{}..{}",
                n_maps,
                first.label(),
                last.label()
            )),
            variable,
            time: last.time.or(first.time),
        }
    }
}

/// A scalar field binned onto a HEALPix grid.
///
/// Values, mask, counts and cell centers are index-aligned and in the RING
/// order of [`CellIndexer`] for this map's nside. A masked cell's stored
/// value is meaningless; read values through [`SkyMap::value`] or check
/// [`SkyMap::mask`] first.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyMap {
    pub(crate) nside: Nside,
    pub(crate) values: Vec<f64>,
    pub(crate) mask: Vec<bool>,
    pub(crate) counts: Vec<u32>,
    pub(crate) lons: Vec<f64>,
    pub(crate) lats: Vec<f64>,
    pub(crate) provenance: Option<Provenance>,
}

impl SkyMap {
    /// Wrap binned cells, computing cell centers for `nside`.
    pub fn from_binned(nside: Nside, binned: BinnedCells, provenance: Option<Provenance>) -> Self {
        let (lons, lats) = CellIndexer::new(nside).centers();
        Self {
            nside,
            values: binned.values,
            mask: binned.mask,
            counts: binned.counts,
            lons,
            lats,
            provenance,
        }
    }

    /// Build a map from explicit per-cell arrays.
    pub fn from_parts(
        nside: Nside,
        values: Vec<f64>,
        mask: Vec<bool>,
        counts: Vec<u32>,
        provenance: Option<Provenance>,
    ) -> Result<Self> {
        let npix = nside.npix() as usize;
        if values.len() != npix || mask.len() != npix || counts.len() != npix {
            return Err(SkyMapError::shape_mismatch(format!(
                "nside {} needs {} cells, got values={} mask={} counts={}",
                nside,
                npix,
                values.len(),
                mask.len(),
                counts.len()
            )));
        }
        Ok(Self::from_binned(
            nside,
            BinnedCells {
                values,
                counts,
                mask,
            },
            provenance,
        ))
    }

    /// Bin a raw field with the default configuration.
    pub fn from_raw(
        coords: &Coordinates,
        values: &[f64],
        nside: Option<Nside>,
        stat: Stat,
    ) -> Result<Self> {
        Self::from_raw_with_config(coords, values, nside, stat, &SkyMapConfig::default())
    }

    /// Bin a raw field.
    ///
    /// Separable coordinates are expanded by outer product. When `nside` is
    /// `None` it is derived from the latitude spacing, which requires a
    /// separable layout.
    pub fn from_raw_with_config(
        coords: &Coordinates,
        values: &[f64],
        nside: Option<Nside>,
        stat: Stat,
        config: &SkyMapConfig,
    ) -> Result<Self> {
        coords.validate()?;
        if values.len() != coords.n_points() {
            let (rows, cols) = coords.shape();
            return Err(SkyMapError::shape_mismatch(format!(
                "coordinates describe {}x{}={} samples, got {} values",
                rows,
                cols,
                coords.n_points(),
                values.len()
            )));
        }

        let nside = match nside {
            Some(n) => check_explicit_nside(n, config)?,
            None => {
                let lat = coords.latitude_axis().ok_or_else(|| {
                    SkyMapError::missing_prerequisite(
                        "curvilinear coordinates need an explicit nside or resolution hint",
                    )
                })?;
                let (derived, _) = resolution_for_dataset(lat)?;
                cap_nside(derived, config)?
            }
        };

        let (lats, lons) = coords.expand();
        let binned =
            bin_with_threshold(nside, &lats, &lons, values, stat, config.parallel_min_samples)?;
        let map = Self::from_binned(nside, binned, None);
        info!(
            nside = nside.get(),
            samples = values.len(),
            valid_cells = map.n_valid(),
            "Built sky map"
        );
        Ok(map)
    }

    /// Stack maps of identical nside with the any-available mean rule.
    pub fn from_list(maps: &[SkyMap]) -> Result<Self> {
        crate::combine::combine(maps)
    }

    /// Load a field through a collaborator and bin it.
    ///
    /// The quality mask is applied (masked samples become NaN), Kelvin
    /// values are converted when the request asks for Celsius, and 2-D
    /// coordinate fill values are replaced by NaN in a copy.
    pub fn from_source<S>(source: &S, request: &FieldRequest, config: &SkyMapConfig) -> Result<Self>
    where
        S: FieldSource + ?Sized,
    {
        let path = request.path.display().to_string();
        let SourceField {
            coordinates,
            mut values,
            quality_mask,
            units: field_units,
            time,
        } = source
            .load(request)
            .map_err(|e| SkyMapError::load_failed(&path, e.to_string()))?;

        if let Some(mask) = &quality_mask {
            if mask.len() != values.len() {
                return Err(SkyMapError::shape_mismatch(format!(
                    "quality mask has {} entries for {} values",
                    mask.len(),
                    values.len()
                )));
            }
            let mut rejected = 0usize;
            for (v, &bad) in values.iter_mut().zip(mask) {
                if bad {
                    *v = f64::NAN;
                    rejected += 1;
                }
            }
            debug!(rejected, total = values.len(), "Applied quality mask");
        }

        if request.to_celsius {
            match field_units.as_deref() {
                Some(u) if !units::is_kelvin(u) => {
                    warn!(units = u, "Celsius requested but field is not in Kelvin; leaving values")
                }
                _ => values = units::kelvin_to_celsius(&values),
            }
        }

        let coordinates = coordinates.with_sentinels_as_nan(config.coord_sentinel);

        let nside = match (request.nside, request.resolution_hint_km) {
            (Some(n), _) => Some(n),
            (None, Some(km)) => Some(nside_for_km(km, config)?),
            (None, None) if coordinates.is_curvilinear() => {
                return Err(SkyMapError::missing_prerequisite(format!(
                    "{}: curvilinear field '{}' needs resolution_hint_km",
                    path, request.variable
                )));
            }
            (None, None) => None,
        };

        let stat = request.stat.unwrap_or(config.default_stat);
        let map = Self::from_raw_with_config(&coordinates, &values, nside, stat, config)?;
        Ok(map.with_provenance(Provenance::new(path, request.variable.clone()).with_time(time)))
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn nside(&self) -> Nside {
        self.nside
    }

    pub fn npix(&self) -> u64 {
        self.nside.npix()
    }

    /// Nominal cell size in degrees.
    pub fn pix_resol_deg(&self) -> f64 {
        self.nside.pixel_size_deg()
    }

    /// Cell area in square degrees.
    pub fn pix_area_deg2(&self) -> f64 {
        self.nside.pixel_area_deg2()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    /// Value of `cell`, or `None` when masked or out of range.
    pub fn value(&self, cell: u64) -> Option<f64> {
        let i = usize::try_from(cell).ok()?;
        match self.mask.get(i) {
            Some(false) => self.values.get(i).copied(),
            _ => None,
        }
    }

    /// Number of unmasked cells.
    pub fn n_valid(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    /// Masked cells whose center lies inside `window`.
    pub fn masked_in_window(&self, window: &LonLatWindow) -> Result<Vec<u64>> {
        window.validate()?;
        Ok(self
            .mask
            .iter()
            .enumerate()
            .filter(|&(i, &masked)| masked && window.contains(self.lons[i], self.lats[i]))
            .map(|(i, _)| i as u64)
            .collect())
    }

    /// Fill masked cells inside `window` from `reference`. See [`crate::fill::fill_gaps`].
    pub fn fill_gaps(&mut self, reference: &SkyMap, window: &LonLatWindow) -> Result<usize> {
        crate::fill::fill_gaps(self, reference, window)
    }
}

/// nside for an along-track spacing in kilometres.
fn nside_for_km(km: f64, config: &SkyMapConfig) -> Result<Nside> {
    if !km.is_finite() || km <= 0.0 {
        return Err(SkyMapError::invalid_argument(format!(
            "resolution hint must be positive, got {} km",
            km
        )));
    }
    let (nside, _) = resolution_for_angular_size(km / KM_PER_DEGREE)?;
    cap_nside(nside, config)
}

fn check_explicit_nside(nside: Nside, config: &SkyMapConfig) -> Result<Nside> {
    let max = config.max_nside().map_err(SkyMapError::InvalidArgument)?;
    if nside > max {
        return Err(SkyMapError::invalid_argument(format!(
            "nside {} exceeds the configured maximum {}",
            nside, max
        )));
    }
    Ok(nside)
}

fn cap_nside(nside: Nside, config: &SkyMapConfig) -> Result<Nside> {
    let max = config.max_nside().map_err(SkyMapError::InvalidArgument)?;
    if nside > max {
        warn!(
            derived = nside.get(),
            max = max.get(),
            "Derived nside above configured maximum; capping"
        );
        Ok(max)
    } else {
        Ok(nside)
    }
}
