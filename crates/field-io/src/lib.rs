//! Field loading and export for sky maps.
//!
//! This crate is the file-format side of the pipeline. It reads labeled
//! fields (one data variable plus named lat/lon coordinates and an optional
//! time axis), applies time and window selection, builds quality-control
//! masks, and hands the result to [`sky_map::SkyMap::from_source`] through
//! the [`sky_map::FieldSource`] trait.
//!
//! # Formats
//!
//! - **JSON**: always available. [`JsonFieldSource`] reads [`FieldDataset`]
//!   documents; [`write_cells_json`] writes the unmasked-cell table.
//! - **NetCDF**: behind the `netcdf` feature (needs libnetcdf and libhdf5).
//!   Adds `NetCdfFieldSource` and `write_cells_netcdf`.

pub mod cftime;
pub mod error;
pub mod field;
pub mod json;
#[cfg(feature = "netcdf")]
pub mod native;
pub mod quality;

pub use error::{FieldIoError, FieldIoResult};
pub use field::{CoordinateVariable, DataVariable, FieldDataset, LabeledField, LAT_NAMES, LON_NAMES};
pub use json::{
    read_cells_json, read_dataset_json, write_cells_json, write_dataset_json, JsonFieldSource,
    QualityPolicy,
};
#[cfg(feature = "netcdf")]
pub use native::{read_dataset_netcdf, write_cells_netcdf, NetCdfFieldSource};
pub use quality::{QualityControl, QUALITY_VARIABLE};
