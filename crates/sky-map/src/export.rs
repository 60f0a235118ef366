//! Views of a sky map for tabular export and plotting.

use serde::{Deserialize, Serialize};

use crate::map::{Provenance, SkyMap};

/// One unmasked cell of a reduced table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub cell_index: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
}

/// The unmasked cells of a map plus enough metadata to reopen it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTable {
    pub nside: u32,
    pub npix: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    pub cells: Vec<CellRecord>,
}

impl CellTable {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Borrowed arrays handed to a plotting collaborator.
#[derive(Debug, Clone, Copy)]
pub struct PlotInput<'a> {
    pub lons: &'a [f64],
    pub lats: &'a [f64],
    pub values: &'a [f64],
    pub mask: &'a [bool],
}

impl<'a> PlotInput<'a> {
    /// `(lon, lat, value)` of every unmasked cell.
    pub fn valid_points(&self) -> impl Iterator<Item = (f64, f64, f64)> + 'a {
        let PlotInput {
            lons,
            lats,
            values,
            mask,
        } = *self;
        mask.iter()
            .enumerate()
            .filter(|&(_, &m)| !m)
            .map(move |(i, _)| (lons[i], lats[i], values[i]))
    }
}

impl SkyMap {
    /// Unmasked cells in RING order.
    pub fn to_cell_records(&self) -> Vec<CellRecord> {
        self.mask
            .iter()
            .enumerate()
            .filter(|&(_, &m)| !m)
            .map(|(i, _)| CellRecord {
                cell_index: i as u64,
                latitude: self.lats[i],
                longitude: self.lons[i],
                value: self.values[i],
            })
            .collect()
    }

    pub fn to_cell_table(&self) -> CellTable {
        CellTable {
            nside: self.nside.get(),
            npix: self.npix(),
            provenance: self.provenance.clone(),
            cells: self.to_cell_records(),
        }
    }

    pub fn plot_input(&self) -> PlotInput<'_> {
        PlotInput {
            lons: &self.lons,
            lats: &self.lats,
            values: &self.values,
            mask: &self.mask,
        }
    }
}
