//! Cell-wise stacking of maps with the any-available rule.

use tracing::{debug, info};

use crate::error::{Result, SkyMapError};
use crate::map::{Provenance, SkyMap};

/// Stack `maps` cell by cell.
///
/// A cell is valid in the result when at least one input has it unmasked;
/// its value is the unweighted mean over those inputs and its count the sum
/// of their counts. Cells masked everywhere stay masked. All inputs must
/// share one nside.
pub fn combine(maps: &[SkyMap]) -> Result<SkyMap> {
    let first = maps
        .first()
        .ok_or_else(|| SkyMapError::invalid_argument("cannot combine an empty list of maps"))?;

    if let Some(other) = maps.iter().find(|m| m.nside != first.nside) {
        return Err(SkyMapError::ResolutionMismatch {
            expected: first.nside.get(),
            found: other.nside.get(),
        });
    }

    let npix = first.values.len();
    let mut sums = vec![0.0f64; npix];
    let mut hits = vec![0u32; npix];
    let mut counts = vec![0u32; npix];

    for map in maps {
        for i in 0..npix {
            if !map.mask[i] {
                sums[i] += map.values[i];
                hits[i] += 1;
                counts[i] = counts[i].saturating_add(map.counts[i]);
            }
        }
    }

    let mut values = vec![0.0f64; npix];
    let mut mask = vec![true; npix];
    for i in 0..npix {
        if hits[i] > 0 {
            values[i] = sums[i] / hits[i] as f64;
            mask[i] = false;
        }
    }

    let last = maps.last().and_then(|m| m.provenance());
    let provenance = match (maps.len(), first.provenance(), last) {
        (1, p, _) => p.cloned(),
        (n, Some(a), Some(b)) => Some(Provenance::spanning(a, b, n)),
        _ => None,
    };

    let combined = SkyMap {
        nside: first.nside,
        values,
        mask,
        counts,
        lons: first.lons.clone(),
        lats: first.lats.clone(),
        provenance,
    };

    debug!(inputs = maps.len(), nside = first.nside.get(), "Combined maps");
    info!(
        valid_cells = combined.n_valid(),
        npix,
        "Stacked {} maps",
        maps.len()
    );
    Ok(combined)
}
