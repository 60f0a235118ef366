//! Native NetCDF reading and writing using the netcdf library.
//!
//! Only the variables a request needs are read: the data variable, the
//! discovered lat/lon coordinates, `time`, and the quality flags when the
//! policy names them. Packed integers are unpacked with `scale_factor` and
//! `add_offset`; `_FillValue` becomes NaN.

use std::collections::BTreeMap;
use std::path::Path;

use sky_map::{CellTable, FieldRequest, FieldSource, SourceField};
use tracing::{debug, info};

use crate::cftime;
use crate::error::{FieldIoError, FieldIoResult};
use crate::field::{CoordinateVariable, DataVariable, FieldDataset, LAT_NAMES, LON_NAMES, TIME_DIM};
use crate::json::{load_from_dataset, QualityPolicy};
use crate::quality::QUALITY_VARIABLE;

fn nc_err(context: &str, e: netcdf::Error) -> FieldIoError {
    FieldIoError::invalid_format(format!("{}: {}", context, e))
}

/// Check if a variable has an attribute with the given name.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn string_attrs<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> BTreeMap<String, String> {
    attrs
        .filter_map(|attr| match attr.value() {
            Ok(netcdf::AttributeValue::Str(s)) => Some((attr.name().to_string(), s)),
            _ => None,
        })
        .collect()
}

/// Read and unpack a variable as `f64`.
fn read_values(var: &netcdf::Variable) -> FieldIoResult<Vec<f64>> {
    let name = var.name();
    let raw: Vec<f64> = var
        .get_values(..)
        .map_err(|e| nc_err(&format!("failed to read {}", name), e))?;

    let fill = get_f64_attr(var, "_FillValue");
    let scale = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);

    Ok(raw
        .into_iter()
        .map(|v| match fill {
            Some(f) if v == f => f64::NAN,
            _ => v * scale + offset,
        })
        .collect())
}

fn dims_of(var: &netcdf::Variable) -> (Vec<String>, Vec<usize>) {
    var.dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .unzip()
}

/// Read the parts of `path` needed for `variable` into a [`FieldDataset`].
pub fn read_dataset_netcdf<P: AsRef<Path>>(
    path: P,
    variable: &str,
    flag_variable: Option<&str>,
) -> FieldIoResult<FieldDataset> {
    let path = path.as_ref();
    let file = netcdf::open(path)
        .map_err(|e| nc_err(&format!("failed to open {}", path.display()), e))?;

    let mut dataset = FieldDataset {
        attrs: string_attrs(file.attributes()),
        ..Default::default()
    };

    for name in [variable].into_iter().chain(flag_variable) {
        let Some(var) = file.variable(name) else {
            if name == variable {
                return Err(FieldIoError::MissingVariable(name.to_string()));
            }
            continue;
        };
        let (dims, shape) = dims_of(&var);
        dataset.variables.insert(
            name.to_string(),
            DataVariable {
                dims,
                shape,
                values: read_values(&var)?,
                attrs: string_attrs(var.attributes()),
            },
        );
    }

    for name in LAT_NAMES.iter().chain(LON_NAMES.iter()) {
        if let Some(var) = file.variable(name) {
            let (dims, _) = dims_of(&var);
            dataset.coords.insert(
                name.to_string(),
                CoordinateVariable {
                    dims,
                    values: read_values(&var)?,
                    attrs: string_attrs(var.attributes()),
                },
            );
        }
    }

    if let Some(var) = file.variable(TIME_DIM) {
        let units = match var.attribute_value("units") {
            Some(Ok(netcdf::AttributeValue::Str(u))) => u,
            _ => return Err(FieldIoError::invalid_format("time variable has no units")),
        };
        let raw: Vec<f64> = var
            .get_values(..)
            .map_err(|e| nc_err("failed to read time", e))?;
        dataset.time = raw
            .into_iter()
            .map(|t| {
                cftime::decode(t, &units).ok_or_else(|| {
                    FieldIoError::invalid_format(format!("cannot decode time {} '{}'", t, units))
                })
            })
            .collect::<FieldIoResult<_>>()?;
    }

    debug!(
        path = %path.display(),
        variables = dataset.variables.len(),
        coords = dataset.coords.len(),
        times = dataset.time.len(),
        "Read NetCDF dataset"
    );
    Ok(dataset)
}

/// Loads fields directly from NetCDF files.
#[derive(Debug, Clone, Default)]
pub struct NetCdfFieldSource {
    policy: QualityPolicy,
}

impl NetCdfFieldSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, policy: QualityPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl FieldSource for NetCdfFieldSource {
    type Error = FieldIoError;

    fn load(&self, request: &FieldRequest) -> FieldIoResult<SourceField> {
        let flag_variable = match &self.policy {
            QualityPolicy::None => None,
            QualityPolicy::Fixed(qc) => Some(qc.flag_variable.as_str()),
            QualityPolicy::BySensor => Some(QUALITY_VARIABLE),
        };
        let dataset = read_dataset_netcdf(&request.path, &request.variable, flag_variable)?;
        load_from_dataset(&dataset, request, &self.policy)
    }
}

/// Write the unmasked cells of a map as a NetCDF file with one `cell` dimension.
pub fn write_cells_netcdf<P: AsRef<Path>>(path: P, table: &CellTable) -> FieldIoResult<()> {
    let path = path.as_ref();
    let mut file = netcdf::create(path)
        .map_err(|e| nc_err(&format!("failed to create {}", path.display()), e))?;

    file.add_attribute("nside", table.nside as i32)
        .map_err(|e| nc_err("nside attribute", e))?;
    file.add_attribute("npix", table.npix as i64)
        .map_err(|e| nc_err("npix attribute", e))?;
    if let Some(source) = table.provenance.as_ref().and_then(|p| p.source.as_deref()) {
        file.add_attribute("source", source)
            .map_err(|e| nc_err("source attribute", e))?;
    }
    file.add_dimension("cell", table.len())
        .map_err(|e| nc_err("cell dimension", e))?;

    let index: Vec<i64> = table.cells.iter().map(|c| c.cell_index as i64).collect();
    let mut var = file
        .add_variable::<i64>("cell_index", &["cell"])
        .map_err(|e| nc_err("cell_index", e))?;
    var.put_values(&index, ..)
        .map_err(|e| nc_err("cell_index", e))?;

    let columns: [(&str, &str, Vec<f64>); 3] = [
        ("latitude", "degrees_north", table.cells.iter().map(|c| c.latitude).collect()),
        ("longitude", "degrees_east", table.cells.iter().map(|c| c.longitude).collect()),
        ("value", "", table.cells.iter().map(|c| c.value).collect()),
    ];
    for (name, units, data) in columns {
        let mut var = file
            .add_variable::<f64>(name, &["cell"])
            .map_err(|e| nc_err(name, e))?;
        var.put_values(&data, ..).map_err(|e| nc_err(name, e))?;
        if !units.is_empty() {
            var.put_attribute("units", units)
                .map_err(|e| nc_err(name, e))?;
        }
    }

    info!(path = %path.display(), cells = table.len(), "Wrote NetCDF cell table");
    Ok(())
}
