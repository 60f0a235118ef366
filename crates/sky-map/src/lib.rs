//! HEALPix Sky Maps for Satellite Ocean Fields
//!
//! This crate re-bins latitude/longitude scalar fields (SST, SSH anomaly)
//! onto an equal-area HEALPix grid and works with the result:
//!
//! - **Binning**: mean or median of every sample falling in a cell
//! - **Stacking**: any-available mean of several maps at one nside
//! - **Gap filling**: bilinear estimates from a reference map inside a window
//!
//! # Architecture
//!
//! ```text
//! FieldSource::load(request)     raw Coordinates + values
//!      │                               │
//!      ▼                               ▼
//! quality mask, K → °C,        SkyMap::from_raw
//! coordinate sentinels → NaN           │
//!      │                               ├─► nside from spacing (pixelization)
//!      └──────────────►────────────────┤
//!                                      ├─► bin(): key → sort → reduce
//!                                      ▼
//!                                   SkyMap ──► combine(&[SkyMap]) ──► SkyMap
//!                                      │                                │
//!                                      ▼                                ▼
//!                          to_cell_table / plot_input        fill_gaps(reference, window)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sky_map::{SkyMap, Stat};
//! use sky_common::{Coordinates, LonLatWindow};
//!
//! let coords = Coordinates::OneDimensional { lat, lon };
//! let daily = SkyMap::from_raw(&coords, &sst, None, Stat::Mean)?;
//!
//! let mut stacked = SkyMap::from_list(&[day1, day2, day3])?;
//! let window = LonLatWindow::new(127.0, 134.0, 18.0, 23.0)?;
//! let filled = stacked.fill_gaps(&climatology, &window)?;
//! ```

pub mod binning;
pub mod combine;
pub mod config;
pub mod error;
pub mod export;
pub mod fill;
pub mod map;
pub mod source;
pub mod units;

// Re-export commonly used types at crate root
pub use binning::{bin, bin_with_threshold, BinnedCells, Stat};
pub use combine::combine;
pub use config::SkyMapConfig;
pub use error::{Result, SkyMapError};
pub use export::{CellRecord, CellTable, PlotInput};
pub use fill::fill_gaps;
pub use map::{Provenance, SkyMap, KM_PER_DEGREE};
pub use source::{FieldRequest, FieldSource, SourceField};

pub use pixelization::{resolution_for_angular_size, resolution_for_dataset, CellIndexer, Nside};
pub use sky_common::{Coordinates, LonLatWindow};
