//! Labeled multi-dimensional fields with named lat/lon coordinates.
//!
//! A [`FieldDataset`] mirrors one NetCDF-style file: global attributes, an
//! optional time coordinate, named coordinate variables and data variables.
//! [`FieldDataset::field`] pulls one variable out together with its
//! latitude and longitude as a [`LabeledField`], which then goes through
//! time selection, spatial subsetting and conversion into a
//! [`SourceField`] for binning.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sky_common::{Coordinates, LonLatWindow};
use sky_map::{units, SourceField};
use tracing::debug;

use crate::error::{FieldIoError, FieldIoResult};

/// Names tried, in order, when looking for the latitude coordinate.
pub const LAT_NAMES: [&str; 2] = ["lat", "latitude"];

/// Names tried, in order, when looking for the longitude coordinate.
pub const LON_NAMES: [&str; 2] = ["lon", "longitude"];

/// Dimension name of the time axis.
pub const TIME_DIM: &str = "time";

/// A coordinate variable: dimension names and flat row-major values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateVariable {
    pub dims: Vec<String>,
    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl CoordinateVariable {
    pub fn new(dims: &[&str], values: Vec<f64>) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values,
            attrs: BTreeMap::new(),
        }
    }
}

/// A data variable with its dimensions and flat row-major values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataVariable {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
}

impl DataVariable {
    pub fn new(dims: &[&str], shape: &[usize], values: Vec<f64>) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            values,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }
}

/// An in-memory dataset: the content of one field file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDataset {
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Values of the `time` coordinate.
    #[serde(default)]
    pub time: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub coords: BTreeMap<String, CoordinateVariable>,
    #[serde(default)]
    pub variables: BTreeMap<String, DataVariable>,
}

impl FieldDataset {
    /// First of `candidates` present as a coordinate.
    pub fn find_coord<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates
            .iter()
            .find(|name| self.coords.contains_key(**name))
            .copied()
    }

    /// The `sensor` global attribute, when present.
    pub fn sensor(&self) -> Option<&str> {
        self.attrs.get("sensor").map(String::as_str)
    }

    /// Extract `variable` with its discovered lat/lon coordinates.
    pub fn field(&self, variable: &str) -> FieldIoResult<LabeledField> {
        let var = self
            .variables
            .get(variable)
            .ok_or_else(|| FieldIoError::MissingVariable(variable.to_string()))?;

        if var.dims.len() != var.shape.len() {
            return Err(FieldIoError::invalid_format(format!(
                "{}: {} dims but shape {:?}",
                variable,
                var.dims.len(),
                var.shape
            )));
        }
        let expected: usize = var.shape.iter().product();
        if var.values.len() != expected {
            return Err(FieldIoError::invalid_format(format!(
                "{}: shape {:?} needs {} values, got {}",
                variable,
                var.shape,
                expected,
                var.values.len()
            )));
        }

        let lat_name = self
            .find_coord(&LAT_NAMES)
            .ok_or_else(|| FieldIoError::MissingCoordinate(format!("latitude for {}", variable)))?;
        let lon_name = self
            .find_coord(&LON_NAMES)
            .ok_or_else(|| FieldIoError::MissingCoordinate(format!("longitude for {}", variable)))?;

        let lat = &self.coords[lat_name];
        let lon = &self.coords[lon_name];
        check_coordinate(variable, lat_name, lat, var)?;
        check_coordinate(variable, lon_name, lon, var)?;

        if let Some(axis) = var.dims.iter().position(|d| d == TIME_DIM) {
            if self.time.len() != var.shape[axis] {
                return Err(FieldIoError::invalid_format(format!(
                    "{}: time axis has {} steps but time coordinate has {}",
                    variable,
                    var.shape[axis],
                    self.time.len()
                )));
            }
        }

        Ok(LabeledField {
            name: variable.to_string(),
            dims: var.dims.clone(),
            shape: var.shape.clone(),
            values: var.values.clone(),
            attrs: var.attrs.clone(),
            lat_name: lat_name.to_string(),
            lat: lat.clone(),
            lon_name: lon_name.to_string(),
            lon: lon.clone(),
            time: self.time.clone(),
        })
    }
}

/// Check that `coord` can place every spatial sample of `var`.
///
/// A 1-D coordinate must name one of the variable's dimensions and match its
/// size; a 2-D coordinate must hold one value per spatial sample.
fn check_coordinate(
    variable: &str,
    name: &str,
    coord: &CoordinateVariable,
    var: &DataVariable,
) -> FieldIoResult<()> {
    let expected = match coord.dims.as_slice() {
        [dim] => match var.dims.iter().position(|d| d == dim) {
            Some(axis) => var.shape[axis],
            None => {
                return Err(FieldIoError::invalid_format(format!(
                    "{}: coordinate {} is on dimension {} which {:?} lacks",
                    variable, name, dim, var.dims
                )))
            }
        },
        _ => var
            .dims
            .iter()
            .zip(&var.shape)
            .filter(|(d, _)| d.as_str() != TIME_DIM)
            .map(|(_, n)| *n)
            .product(),
    };
    if coord.values.len() != expected {
        return Err(FieldIoError::invalid_format(format!(
            "{}: coordinate {} has {} values, expected {}",
            variable,
            name,
            coord.values.len(),
            expected
        )));
    }
    Ok(())
}

/// One data variable plus the coordinates needed to place its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledField {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    pub lat_name: String,
    pub lat: CoordinateVariable,
    pub lon_name: String,
    pub lon: CoordinateVariable,
    #[serde(default)]
    pub time: Vec<DateTime<Utc>>,
}

impl LabeledField {
    /// The CF `units` attribute.
    pub fn units(&self) -> Option<&str> {
        self.attrs.get("units").map(String::as_str)
    }

    pub fn is_kelvin(&self) -> bool {
        self.units().map(units::is_kelvin).unwrap_or(false)
    }

    fn time_axis(&self) -> Option<usize> {
        self.dims.iter().position(|d| d == TIME_DIM)
    }

    /// Observation time once the time axis has been reduced.
    pub fn observation_time(&self) -> Option<DateTime<Utc>> {
        match self.time_axis() {
            Some(_) => None,
            None => self.time.first().copied(),
        }
    }

    /// Reduce the time axis to one step.
    ///
    /// Without an index a single-step axis is squeezed and a multi-step
    /// axis is an error. Fields without a time axis accept only index 0.
    pub fn select_time(mut self, index: Option<usize>) -> FieldIoResult<Self> {
        let axis = match self.time_axis() {
            Some(axis) => axis,
            None => {
                return match index {
                    Some(i) if i > 0 => Err(FieldIoError::selection(format!(
                        "{} has no time axis; cannot select step {}",
                        self.name, i
                    ))),
                    _ => Ok(self),
                };
            }
        };
        if axis != 0 {
            return Err(FieldIoError::invalid_format(format!(
                "{}: time must be the leading dimension, found at {}",
                self.name, axis
            )));
        }

        let steps = self.shape[0];
        let idx = match index {
            Some(i) => i,
            None if steps == 1 => 0,
            None => {
                return Err(FieldIoError::selection(format!(
                    "{} has {} time steps; pass a time index",
                    self.name, steps
                )))
            }
        };
        if idx >= steps {
            return Err(FieldIoError::selection(format!(
                "time index {} out of range for {} steps",
                idx, steps
            )));
        }

        let stride = self.values.len() / steps;
        self.values = self.values[idx * stride..(idx + 1) * stride].to_vec();
        self.dims.remove(0);
        self.shape.remove(0);
        self.time = self.time.get(idx).copied().into_iter().collect();
        debug!(variable = %self.name, step = idx, "Selected time step");
        Ok(self)
    }

    fn spatial_shape(&self) -> FieldIoResult<(usize, usize)> {
        match self.shape.as_slice() {
            &[rows, cols] => Ok((rows, cols)),
            other => Err(FieldIoError::invalid_format(format!(
                "{} must be 2-D after time selection, has shape {:?}",
                self.name, other
            ))),
        }
    }

    fn is_separable(&self) -> bool {
        self.lat.dims.len() == 1 && self.lon.dims.len() == 1
    }

    /// Put a separable field in latitude-major order, transposing a
    /// `(lon, lat)` layout.
    pub fn lat_major(mut self) -> FieldIoResult<Self> {
        if !self.is_separable() {
            return Ok(self);
        }
        let (rows, cols) = self.spatial_shape()?;
        let lat_dim = &self.lat.dims[0];
        let lon_dim = &self.lon.dims[0];
        if self.dims[0] == *lat_dim && self.dims[1] == *lon_dim {
            return Ok(self);
        }
        if self.dims[0] != *lon_dim || self.dims[1] != *lat_dim {
            return Err(FieldIoError::invalid_format(format!(
                "{}: dims {:?} do not match coordinates ({}, {})",
                self.name, self.dims, lat_dim, lon_dim
            )));
        }

        let mut transposed = Vec::with_capacity(self.values.len());
        for c in 0..cols {
            for r in 0..rows {
                transposed.push(self.values[r * cols + c]);
            }
        }
        self.values = transposed;
        self.dims.swap(0, 1);
        self.shape.swap(0, 1);
        Ok(self)
    }

    /// Coordinates matching the current 2-D values.
    pub fn coordinates(&self) -> FieldIoResult<Coordinates> {
        let (rows, cols) = self.spatial_shape()?;
        let coords = match (self.lat.dims.len(), self.lon.dims.len()) {
            (1, 1) => Coordinates::OneDimensional {
                lat: self.lat.values.clone(),
                lon: self.lon.values.clone(),
            },
            (2, 2) => Coordinates::Curvilinear {
                lat: self.lat.values.clone(),
                lon: self.lon.values.clone(),
                shape: (rows, cols),
            },
            (a, b) => {
                return Err(FieldIoError::invalid_format(format!(
                    "{}: unsupported coordinate layout lat {}-D, lon {}-D",
                    self.name, a, b
                )))
            }
        };
        coords
            .validate()
            .map_err(|e| FieldIoError::invalid_format(format!("{}: {}", self.name, e)))?;
        Ok(coords)
    }

    /// Restrict to `window`.
    ///
    /// Separable fields are sliced to the rows and columns inside the
    /// window; curvilinear fields keep their shape and samples outside
    /// become NaN.
    pub fn subset(mut self, window: &LonLatWindow) -> FieldIoResult<Self> {
        window
            .validate()
            .map_err(|e| FieldIoError::selection(e.to_string()))?;
        let (rows, cols) = self.spatial_shape()?;

        if self.is_separable() {
            if self.lat.values.len() != rows || self.lon.values.len() != cols {
                return Err(FieldIoError::invalid_format(format!(
                    "{}: axes of {} x {} do not match shape ({}, {})",
                    self.name,
                    self.lat.values.len(),
                    self.lon.values.len(),
                    rows,
                    cols
                )));
            }
            let rows_in: Vec<usize> = (0..rows)
                .filter(|&r| window.contains_lat(self.lat.values[r]))
                .collect();
            let cols_in: Vec<usize> = (0..cols)
                .filter(|&c| window.contains_lon(self.lon.values[c]))
                .collect();
            if rows_in.is_empty() || cols_in.is_empty() {
                return Err(FieldIoError::selection(format!(
                    "window {:?} selects no samples of {}",
                    window, self.name
                )));
            }

            let mut values = Vec::with_capacity(rows_in.len() * cols_in.len());
            for &r in &rows_in {
                for &c in &cols_in {
                    values.push(self.values[r * cols + c]);
                }
            }
            self.values = values;
            self.lat.values = rows_in.iter().map(|&r| self.lat.values[r]).collect();
            self.lon.values = cols_in.iter().map(|&c| self.lon.values[c]).collect();
            self.shape = vec![rows_in.len(), cols_in.len()];
        } else {
            if self.lat.values.len() != self.values.len()
                || self.lon.values.len() != self.values.len()
            {
                return Err(FieldIoError::invalid_format(format!(
                    "{}: coordinates do not cover {} samples",
                    self.name,
                    self.values.len()
                )));
            }
            let mut kept = 0usize;
            for i in 0..self.values.len() {
                if window.contains(self.lon.values[i], self.lat.values[i]) {
                    kept += 1;
                } else {
                    self.values[i] = f64::NAN;
                }
            }
            debug!(variable = %self.name, kept, total = self.values.len(), "Subset swath");
        }
        Ok(self)
    }

    /// Convert Kelvin values to °C in place, updating attributes.
    ///
    /// Returns `false` and changes nothing when the field is not in Kelvin.
    pub fn to_celsius(&mut self) -> bool {
        if !self.is_kelvin() {
            return false;
        }
        self.values = units::kelvin_to_celsius(&self.values);
        let long_name = self
            .attrs
            .get("long_name")
            .cloned()
            .unwrap_or_else(|| "Temperature".to_string());
        self.attrs.insert("units".to_string(), "celsius".to_string());
        self.attrs
            .insert("long_name".to_string(), format!("{} in Celsius", long_name));
        true
    }

    /// Hand the field to sky-map construction.
    pub fn into_source_field(self, quality_mask: Option<Vec<bool>>) -> FieldIoResult<SourceField> {
        let coordinates = self.coordinates()?;
        let time = self.observation_time();
        let units = self.units().map(str::to_string);
        Ok(SourceField {
            coordinates,
            values: self.values,
            quality_mask,
            units,
            time,
        })
    }
}

/// Serde adapter writing non-finite floats as `null` and reading `null` as NaN.
pub(crate) mod nan_as_null {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            if v.is_finite() {
                seq.serialize_element(v)?;
            } else {
                seq.serialize_element(&None::<f64>)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn regular_dataset() -> FieldDataset {
        // 2 time steps x 2 lat x 3 lon
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let mut ds = FieldDataset::default();
        ds.time = vec![
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap(),
        ];
        ds.coords.insert(
            "latitude".into(),
            CoordinateVariable::new(&["latitude"], vec![10.0, 20.0]),
        );
        ds.coords.insert(
            "longitude".into(),
            CoordinateVariable::new(&["longitude"], vec![355.0, 0.0, 5.0]),
        );
        ds.variables.insert(
            "sla".into(),
            DataVariable::new(&["time", "latitude", "longitude"], &[2, 2, 3], values)
                .with_attr("units", "m"),
        );
        ds
    }

    #[test]
    fn test_coordinate_discovery() {
        let ds = regular_dataset();
        assert_eq!(ds.find_coord(&LAT_NAMES), Some("latitude"));
        assert_eq!(ds.find_coord(&LON_NAMES), Some("longitude"));
        let field = ds.field("sla").unwrap();
        assert_eq!(field.lat_name, "latitude");
        assert!(matches!(ds.field("sst"), Err(FieldIoError::MissingVariable(_))));
    }

    #[test]
    fn test_missing_coordinate() {
        let mut ds = regular_dataset();
        ds.coords.remove("longitude");
        assert!(matches!(ds.field("sla"), Err(FieldIoError::MissingCoordinate(_))));
    }

    #[test]
    fn test_time_selection() {
        let ds = regular_dataset();
        let err = ds.field("sla").unwrap().select_time(None).unwrap_err();
        assert!(matches!(err, FieldIoError::Selection(_)));
        assert!(ds.field("sla").unwrap().select_time(Some(2)).is_err());

        let day2 = ds.field("sla").unwrap().select_time(Some(1)).unwrap();
        assert_eq!(day2.shape, vec![2, 3]);
        assert_eq!(day2.values, vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(day2.observation_time(), Some(ds.time[1]));
    }

    #[test]
    fn test_subset_across_seam() {
        let ds = regular_dataset();
        let field = ds.field("sla").unwrap().select_time(Some(0)).unwrap();
        let window = LonLatWindow::new(350.0, 2.0, 15.0, 25.0).unwrap();
        let sub = field.subset(&window).unwrap();
        assert_eq!(sub.shape, vec![1, 2]);
        assert_eq!(sub.lon.values, vec![355.0, 0.0]);
        assert_eq!(sub.values, vec![3.0, 4.0]);
    }

    #[test]
    fn test_empty_subset_is_an_error() {
        let field = regular_dataset().field("sla").unwrap().select_time(Some(0)).unwrap();
        let window = LonLatWindow::new(100.0, 110.0, -5.0, 5.0).unwrap();
        assert!(matches!(field.subset(&window), Err(FieldIoError::Selection(_))));
    }

    #[test]
    fn test_lat_major_transposes() {
        let mut ds = regular_dataset();
        ds.variables.insert(
            "t".into(),
            DataVariable::new(
                &["longitude", "latitude"],
                &[3, 2],
                vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0],
            ),
        );
        let field = ds.field("t").unwrap().lat_major().unwrap();
        assert_eq!(field.dims, vec!["latitude", "longitude"]);
        assert_eq!(field.values, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_short_coordinate_is_rejected() {
        let mut ds = regular_dataset();
        ds.coords.insert(
            "longitude".into(),
            CoordinateVariable::new(&["longitude"], vec![0.0, 5.0]),
        );
        let err = ds.field("sla").unwrap_err();
        assert!(matches!(err, FieldIoError::InvalidFormat(_)));

        // the same file with a window set must fail the same way, not index past the axis
        let window = LonLatWindow::new(90.0, 110.0, 0.0, 20.0).unwrap();
        let result = ds
            .field("sla")
            .and_then(|f| f.select_time(Some(0)))
            .and_then(|f| f.subset(&window));
        assert!(matches!(result, Err(FieldIoError::InvalidFormat(_))));
    }

    #[test]
    fn test_coordinate_on_foreign_dimension_is_rejected() {
        let mut ds = regular_dataset();
        ds.coords.insert(
            "latitude".into(),
            CoordinateVariable::new(&["y"], vec![10.0, 20.0]),
        );
        assert!(matches!(ds.field("sla"), Err(FieldIoError::InvalidFormat(_))));
    }

    #[test]
    fn test_curvilinear_coordinate_length_checked() {
        let mut ds = FieldDataset::default();
        ds.coords.insert(
            "lat".into(),
            CoordinateVariable::new(&["y", "x"], vec![1.0; 6]),
        );
        ds.coords.insert(
            "lon".into(),
            CoordinateVariable::new(&["y", "x"], vec![2.0; 5]),
        );
        ds.variables.insert(
            "ssha".into(),
            DataVariable::new(&["y", "x"], &[2, 3], vec![0.1; 6]),
        );
        assert!(matches!(ds.field("ssha"), Err(FieldIoError::InvalidFormat(_))));

        ds.coords.insert(
            "lon".into(),
            CoordinateVariable::new(&["y", "x"], vec![2.0; 6]),
        );
        assert!(ds.field("ssha").is_ok());
    }

    #[test]
    fn test_to_celsius_updates_attrs() {
        let mut ds = regular_dataset();
        ds.variables.insert(
            "sst".into(),
            DataVariable::new(&["latitude", "longitude"], &[2, 3], vec![300.0; 6])
                .with_attr("units", "kelvin")
                .with_attr("long_name", "sea surface temperature"),
        );
        let mut field = ds.field("sst").unwrap();
        assert!(field.to_celsius());
        assert!((field.values[0] - 26.85).abs() < 1e-9);
        assert_eq!(field.units(), Some("celsius"));
        assert_eq!(
            field.attrs["long_name"],
            "sea surface temperature in Celsius"
        );
        assert!(!field.to_celsius());
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let var = DataVariable::new(&["x"], &[3], vec![1.0, f64::NAN, 2.5]);
        let json = serde_json::to_string(&var).unwrap();
        assert!(json.contains("[1.0,null,2.5]"));
        let back: DataVariable = serde_json::from_str(&json).unwrap();
        assert!(back.values[1].is_nan());
        assert_eq!(back.values[2], 2.5);
    }
}
