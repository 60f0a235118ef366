//! HEALPix pixelization for sky maps.
//!
//! Two pieces live here:
//!
//! - [`resolution`]: choosing an nside from a target cell size or from the
//!   spacing of a coordinate axis.
//! - [`indexer`]: mapping degrees to RING cell ids and back, plus the
//!   bilinear stencil used for interpolation.
//!
//! The hierarchical arithmetic itself is delegated to `cdshealpix`.

pub mod error;
pub mod indexer;
pub mod resolution;

pub use error::{PixelResult, PixelizationError};
pub use indexer::{cell_of, center_of, CellIndexer};
pub use resolution::{
    resolution_for_angular_size, resolution_for_dataset, Nside, MAX_DEPTH, MAX_NSIDE,
};
