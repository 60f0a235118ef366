//! Per-cell aggregation of scattered samples.
//!
//! Samples are usable only when latitude, longitude and value are all
//! finite (and the latitude lies on the sphere). Usable samples are keyed by
//! cell, stably sorted so each group keeps input order, and reduced group by
//! group. The rayon path shards both the keying and the reduction but forms
//! the same groups in the same order, so it matches the sequential result
//! bit for bit.

use std::fmt;
use std::str::FromStr;

use pixelization::{CellIndexer, Nside};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_PARALLEL_MIN_SAMPLES;
use crate::error::{Result, SkyMapError};

/// Statistic applied to the samples falling in one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    /// Arithmetic mean.
    #[default]
    Mean,
    /// Median; even-sized groups take the mean of the two middle values.
    Median,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
        }
    }

    fn reduce(self, group: &[(u64, f64)]) -> f64 {
        match self {
            Self::Mean => group.iter().map(|&(_, v)| v).sum::<f64>() / group.len() as f64,
            Self::Median => {
                let mut vals: Vec<f64> = group.iter().map(|&(_, v)| v).collect();
                vals.sort_by(f64::total_cmp);
                let mid = vals.len() / 2;
                if vals.len() % 2 == 0 {
                    (vals[mid - 1] + vals[mid]) / 2.0
                } else {
                    vals[mid]
                }
            }
        }
    }
}

impl FromStr for Stat {
    type Err = SkyMapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(SkyMapError::invalid_argument(format!(
                "unsupported stat '{}': expected 'mean' or 'median'",
                other
            ))),
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of [`bin`]: one entry per cell, in RING order.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedCells {
    /// Aggregated value; 0.0 where masked.
    pub values: Vec<f64>,
    /// Number of usable samples per cell.
    pub counts: Vec<u32>,
    /// `true` where the cell received no usable sample.
    pub mask: Vec<bool>,
}

impl BinnedCells {
    fn empty(npix: usize) -> Self {
        Self {
            values: vec![0.0; npix],
            counts: vec![0; npix],
            mask: vec![true; npix],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of unmasked cells.
    pub fn n_valid(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }
}

/// Bin parallel `lats`/`lons`/`values` arrays onto the grid at `nside`.
///
/// An input with no usable sample yields a fully masked result, not an error.
pub fn bin(
    nside: Nside,
    lats: &[f64],
    lons: &[f64],
    values: &[f64],
    stat: Stat,
) -> Result<BinnedCells> {
    bin_with_threshold(nside, lats, lons, values, stat, DEFAULT_PARALLEL_MIN_SAMPLES)
}

/// [`bin`] with an explicit sample count above which rayon is used.
pub fn bin_with_threshold(
    nside: Nside,
    lats: &[f64],
    lons: &[f64],
    values: &[f64],
    stat: Stat,
    parallel_min_samples: usize,
) -> Result<BinnedCells> {
    if lats.len() != values.len() || lons.len() != values.len() {
        return Err(SkyMapError::shape_mismatch(format!(
            "lat={}, lon={}, values={}",
            lats.len(),
            lons.len(),
            values.len()
        )));
    }

    let indexer = CellIndexer::new(nside);
    let npix = indexer.npix() as usize;
    let parallel = values.len() >= parallel_min_samples;

    let mut keyed = usable_samples(&indexer, lats, lons, values, parallel);
    debug!(
        nside = nside.get(),
        samples = values.len(),
        usable = keyed.len(),
        parallel,
        %stat,
        "Binning samples"
    );

    let mut binned = BinnedCells::empty(npix);
    if keyed.is_empty() {
        warn!(
            nside = nside.get(),
            samples = values.len(),
            "No usable samples; map is fully masked"
        );
        return Ok(binned);
    }

    // Both sorts are stable.
    if parallel {
        keyed.par_sort_by_key(|&(cell, _)| cell);
    } else {
        keyed.sort_by_key(|&(cell, _)| cell);
    }

    let groups = group_bounds(&keyed);
    let reduce = |&(start, end): &(usize, usize)| {
        let group = &keyed[start..end];
        (group[0].0, group.len(), stat.reduce(group))
    };
    let reduced: Vec<(u64, usize, f64)> = if parallel {
        groups.par_iter().map(reduce).collect()
    } else {
        groups.iter().map(reduce).collect()
    };

    for (cell, count, value) in reduced {
        let i = cell as usize;
        binned.values[i] = value;
        binned.counts[i] = count.min(u32::MAX as usize) as u32;
        binned.mask[i] = false;
    }

    debug!(cells = groups.len(), "Binned cells");
    Ok(binned)
}

fn usable_samples(
    indexer: &CellIndexer,
    lats: &[f64],
    lons: &[f64],
    values: &[f64],
    parallel: bool,
) -> Vec<(u64, f64)> {
    let keep = |i: usize| -> Option<(u64, f64)> {
        let v = values[i];
        if !v.is_finite() {
            return None;
        }
        // cell_of rejects non-finite and off-sphere coordinates
        indexer.cell_of(lats[i], lons[i]).ok().map(|cell| (cell, v))
    };

    if parallel {
        (0..values.len()).into_par_iter().filter_map(keep).collect()
    } else {
        (0..values.len()).filter_map(keep).collect()
    }
}

/// Half-open index ranges of equal-cell runs in a cell-sorted slice.
fn group_bounds(sorted: &[(u64, f64)]) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut start = 0;
    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i].0 != sorted[start].0 {
            bounds.push((start, i));
            start = i;
        }
    }
    bounds
}
