//! Format dispatch by file extension.

use std::path::Path;

use field_io::{FieldIoError, FieldIoResult, JsonFieldSource, QualityPolicy};
use sky_map::{CellTable, FieldRequest, FieldSource, SourceField};

/// Input/output format of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    NetCdf,
}

impl Format {
    pub fn of(path: &Path) -> FieldIoResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("nc") | Some("nc4") | Some("netcdf") => Ok(Self::NetCdf),
            _ => Err(FieldIoError::invalid_format(format!(
                "unrecognised file type: {}",
                path.display()
            ))),
        }
    }
}

/// A source reading whichever format the request path names.
pub struct AnySource {
    json: JsonFieldSource,
    #[cfg(feature = "netcdf")]
    netcdf: field_io::NetCdfFieldSource,
}

impl AnySource {
    pub fn new(policy: QualityPolicy) -> Self {
        Self {
            #[cfg(feature = "netcdf")]
            netcdf: field_io::NetCdfFieldSource::new().with_quality(policy.clone()),
            json: JsonFieldSource::new().with_quality(policy),
        }
    }
}

impl FieldSource for AnySource {
    type Error = FieldIoError;

    fn load(&self, request: &FieldRequest) -> FieldIoResult<SourceField> {
        match Format::of(&request.path)? {
            Format::Json => self.json.load(request),
            #[cfg(feature = "netcdf")]
            Format::NetCdf => self.netcdf.load(request),
            #[cfg(not(feature = "netcdf"))]
            Format::NetCdf => Err(netcdf_disabled()),
        }
    }
}

/// Write a cell table in the format its path names.
pub fn write_table(path: &Path, table: &CellTable) -> FieldIoResult<()> {
    match Format::of(path)? {
        Format::Json => field_io::write_cells_json(path, table),
        #[cfg(feature = "netcdf")]
        Format::NetCdf => field_io::write_cells_netcdf(path, table),
        #[cfg(not(feature = "netcdf"))]
        Format::NetCdf => Err(netcdf_disabled()),
    }
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_disabled() -> FieldIoError {
    FieldIoError::invalid_format("NetCDF support not compiled in; rebuild with --features netcdf")
}
