//! Gap filling from a reference map.

use pixelization::CellIndexer;
use sky_common::LonLatWindow;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::map::SkyMap;

/// Weight sums at or below this are treated as "no valid neighbour".
const MIN_WEIGHT_SUM: f64 = 1e-12;

/// Fill masked cells of `target` whose centers lie in `window`.
///
/// Each candidate takes the bilinear interpolation of `reference` at the
/// candidate's center. Stencil cells masked in the reference are dropped and
/// the remaining weights renormalised; a candidate whose whole stencil is
/// masked is left untouched. Filled cells are unmasked but keep a count of
/// zero. The two maps may differ in nside.
///
/// Returns the number of cells filled. Only a malformed window is an error.
pub fn fill_gaps(target: &mut SkyMap, reference: &SkyMap, window: &LonLatWindow) -> Result<usize> {
    let candidates = target.masked_in_window(window)?;
    if candidates.is_empty() {
        debug!("No masked cells inside window");
        return Ok(0);
    }

    let indexer = CellIndexer::new(reference.nside);
    let mut filled = 0usize;
    let mut skipped = 0usize;

    for cell in candidates {
        let i = cell as usize;
        let stencil = indexer.interpolation_weights(target.lats[i], target.lons[i])?;

        let mut acc = 0.0;
        let mut weight = 0.0;
        for (ref_cell, w) in stencil {
            let j = ref_cell as usize;
            if !reference.mask[j] {
                acc += w * reference.values[j];
                weight += w;
            }
        }

        if weight <= MIN_WEIGHT_SUM {
            skipped += 1;
            continue;
        }

        target.values[i] = acc / weight;
        target.mask[i] = false;
        filled += 1;
    }

    if skipped > 0 {
        warn!(
            skipped,
            "Reference map is masked around some gap cells; they stay masked"
        );
    }
    info!(
        filled,
        target_nside = target.nside.get(),
        reference_nside = reference.nside.get(),
        "Filled gaps from reference"
    );
    Ok(filled)
}
