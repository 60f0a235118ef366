//! The seam between sky-map construction and field storage.
//!
//! [`SkyMap::from_source`](crate::SkyMap::from_source) asks a
//! [`FieldSource`] for one variable of one file, already subset and
//! reduced to a single time step. Storage formats live behind this trait.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pixelization::Nside;
use serde::{Deserialize, Serialize};
use sky_common::{Coordinates, LonLatWindow};

use crate::binning::Stat;

/// Describes the field a [`FieldSource`] should load and how to bin it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRequest {
    pub path: PathBuf,
    pub variable: String,
    /// Restrict loading to this window.
    pub spatial_subset: Option<LonLatWindow>,
    /// Time step to select when the variable has a time axis.
    pub time_index: Option<usize>,
    /// Along-track sample spacing in km, for curvilinear fields.
    pub resolution_hint_km: Option<f64>,
    /// Explicit nside; wins over the hint and spacing estimate.
    pub nside: Option<Nside>,
    /// Falls back to the configured default.
    pub stat: Option<Stat>,
    /// Convert Kelvin values to °C.
    pub to_celsius: bool,
}

impl FieldRequest {
    pub fn new(path: impl Into<PathBuf>, variable: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            variable: variable.into(),
            spatial_subset: None,
            time_index: None,
            resolution_hint_km: None,
            nside: None,
            stat: None,
            to_celsius: false,
        }
    }

    pub fn with_subset(mut self, window: LonLatWindow) -> Self {
        self.spatial_subset = Some(window);
        self
    }

    pub fn with_time_index(mut self, index: usize) -> Self {
        self.time_index = Some(index);
        self
    }

    pub fn with_resolution_hint_km(mut self, km: f64) -> Self {
        self.resolution_hint_km = Some(km);
        self
    }

    pub fn with_nside(mut self, nside: Nside) -> Self {
        self.nside = Some(nside);
        self
    }

    pub fn with_stat(mut self, stat: Stat) -> Self {
        self.stat = Some(stat);
        self
    }

    pub fn to_celsius(mut self, convert: bool) -> Self {
        self.to_celsius = convert;
        self
    }
}

/// A field as returned by a [`FieldSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceField {
    pub coordinates: Coordinates,
    /// Row-major values matching `coordinates.shape()`.
    pub values: Vec<f64>,
    /// `true` where a sample failed quality control.
    pub quality_mask: Option<Vec<bool>>,
    /// CF `units` attribute of the variable.
    pub units: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

impl SourceField {
    pub fn new(coordinates: Coordinates, values: Vec<f64>) -> Self {
        Self {
            coordinates,
            values,
            quality_mask: None,
            units: None,
            time: None,
        }
    }

    pub fn with_quality_mask(mut self, mask: Vec<bool>) -> Self {
        self.quality_mask = Some(mask);
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// Loads labeled fields for sky-map construction.
pub trait FieldSource {
    type Error: std::error::Error;

    /// Load the field described by `request`.
    fn load(&self, request: &FieldRequest) -> Result<SourceField, Self::Error>;
}
