//! JSON field documents and cell-table export.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use sky_map::{CellTable, FieldRequest, FieldSource, SourceField};
use tracing::{debug, info};

use crate::error::{FieldIoError, FieldIoResult};
use crate::field::{FieldDataset, LabeledField};
use crate::quality::QualityControl;

/// How a source decides which quality policy applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QualityPolicy {
    /// Only NaN samples are masked.
    #[default]
    None,
    /// Always use this policy.
    Fixed(QualityControl),
    /// Pick a preset from the dataset's `sensor` attribute.
    BySensor,
}

/// Read a [`FieldDataset`] JSON document.
pub fn read_dataset_json<P: AsRef<Path>>(path: P) -> FieldIoResult<FieldDataset> {
    let file = File::open(path.as_ref())?;
    let dataset = serde_json::from_reader(BufReader::new(file))?;
    Ok(dataset)
}

/// Write a [`FieldDataset`] JSON document.
pub fn write_dataset_json<P: AsRef<Path>>(path: P, dataset: &FieldDataset) -> FieldIoResult<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer(BufWriter::new(file), dataset)?;
    Ok(())
}

/// Write the unmasked cells of a map.
pub fn write_cells_json<P: AsRef<Path>>(path: P, table: &CellTable) -> FieldIoResult<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), table)?;
    info!(path = %path.display(), cells = table.len(), "Wrote cell table");
    Ok(())
}

/// Read a cell table written by [`write_cells_json`].
pub fn read_cells_json<P: AsRef<Path>>(path: P) -> FieldIoResult<CellTable> {
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Apply a request's time and spatial selection to one field.
pub(crate) fn select(field: LabeledField, request: &FieldRequest) -> FieldIoResult<LabeledField> {
    let field = field.select_time(request.time_index)?.lat_major()?;
    match &request.spatial_subset {
        Some(window) => field.subset(window),
        None => Ok(field),
    }
}

/// Turn a dataset into the field a request asks for, with its QC mask.
pub(crate) fn load_from_dataset(
    dataset: &FieldDataset,
    request: &FieldRequest,
    policy: &QualityPolicy,
) -> FieldIoResult<SourceField> {
    let field = select(dataset.field(&request.variable)?, request)?;

    let qc = match policy {
        QualityPolicy::None => None,
        QualityPolicy::Fixed(qc) => Some(qc.clone()),
        QualityPolicy::BySensor => dataset.sensor().and_then(QualityControl::for_sensor),
    };

    let mask = match qc {
        Some(qc) => {
            let flags = if dataset.variables.contains_key(&qc.flag_variable) {
                Some(select(dataset.field(&qc.flag_variable)?, request)?.values)
            } else {
                debug!(flag_variable = %qc.flag_variable, "Quality flags not in dataset");
                None
            };
            Some(qc.build_mask(&field.values, flags.as_deref())?)
        }
        None => None,
    };

    field.into_source_field(mask)
}

/// Loads fields from [`FieldDataset`] JSON documents.
#[derive(Debug, Clone, Default)]
pub struct JsonFieldSource {
    policy: QualityPolicy,
}

impl JsonFieldSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(mut self, policy: QualityPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl FieldSource for JsonFieldSource {
    type Error = FieldIoError;

    fn load(&self, request: &FieldRequest) -> FieldIoResult<SourceField> {
        let dataset = read_dataset_json(&request.path)?;
        debug!(
            path = %request.path.display(),
            variables = dataset.variables.len(),
            "Read JSON dataset"
        );
        load_from_dataset(&dataset, request, &self.policy)
    }
}
