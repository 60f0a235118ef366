//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use field_io::{QualityControl, QualityPolicy};
use sky_common::LonLatWindow;
use sky_map::{resolution_for_angular_size, FieldRequest, Nside, SkyMap, SkyMapConfig, Stat};
use tracing::{info, warn};

use crate::sources::{write_table, AnySource};
use crate::{FieldArgs, QcPreset};

/// Reference field and window for gap filling.
#[derive(Debug, Clone)]
pub struct FillSpec {
    pub path: PathBuf,
    pub variable: String,
    pub window: String,
}

pub fn nside(pixel_deg: f64) -> Result<()> {
    let (nside, actual) = resolution_for_angular_size(pixel_deg)
        .with_context(|| format!("no nside for {} degrees", pixel_deg))?;
    println!(
        "nside={} npix={} pixel_deg={:.6}",
        nside,
        nside.npix(),
        actual
    );
    Ok(())
}

fn quality_policy(preset: QcPreset) -> QualityPolicy {
    match preset {
        QcPreset::None => QualityPolicy::None,
        QcPreset::Sensor => QualityPolicy::BySensor,
        QcPreset::SstCelsius => QualityPolicy::Fixed(QualityControl::sst_celsius()),
        QcPreset::SstKelvin => QualityPolicy::Fixed(QualityControl::sst_kelvin()),
    }
}

fn requested_nside(field: &FieldArgs) -> Result<Option<Nside>> {
    match (field.nside, field.pixel_deg) {
        (Some(n), _) => Ok(Some(Nside::new(n).context("invalid --nside")?)),
        (None, Some(deg)) => Ok(Some(
            resolution_for_angular_size(deg)
                .context("invalid --pixel-deg")?
                .0,
        )),
        (None, None) => Ok(None),
    }
}

fn build_request(path: &Path, field: &FieldArgs, nside: Option<Nside>) -> Result<FieldRequest> {
    let mut request = FieldRequest::new(path, field.variable.clone()).to_celsius(field.kelvin);
    request.nside = nside;
    request.time_index = field.time_index;
    request.resolution_hint_km = field.hint_km;
    if let Some(stat) = &field.stat {
        request.stat = Some(stat.parse::<Stat>()?);
    }
    if let Some(subset) = &field.subset {
        request.spatial_subset =
            Some(LonLatWindow::from_arg_string(subset).context("invalid --subset")?);
    }
    Ok(request)
}

fn load(source: &AnySource, request: &FieldRequest, config: &SkyMapConfig) -> Result<SkyMap> {
    SkyMap::from_source(source, request, config)
        .with_context(|| format!("failed to build map from {}", request.path.display()))
}

fn finish(map: &SkyMap, output: Option<&Path>) -> Result<()> {
    let label = map
        .provenance()
        .map(|p| p.label())
        .unwrap_or_else(|| "unknown".to_string());
    println!(
        "{}: nside={} npix={} valid={} pixel_deg={:.4}",
        label,
        map.nside(),
        map.npix(),
        map.n_valid(),
        map.pix_resol_deg()
    );

    if let Some(path) = output {
        write_table(path, &map.to_cell_table())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

pub fn bin(
    config: &SkyMapConfig,
    input: &Path,
    field: &FieldArgs,
    output: Option<&Path>,
) -> Result<()> {
    let source = AnySource::new(quality_policy(field.qc));
    let request = build_request(input, field, requested_nside(field)?)?;
    let map = load(&source, &request, config)?;
    finish(&map, output)
}

pub fn stack(
    config: &SkyMapConfig,
    inputs: &[PathBuf],
    field: &FieldArgs,
    fill: Option<&FillSpec>,
    output: Option<&Path>,
) -> Result<()> {
    let Some((first_path, rest)) = inputs.split_first() else {
        bail!("stack needs at least one input");
    };
    let source = AnySource::new(quality_policy(field.qc));

    // Every input is binned at the first map's nside.
    let first = load(&source, &build_request(first_path, field, requested_nside(field)?)?, config)?;
    let nside = first.nside();

    let mut maps = vec![first];
    for path in rest {
        maps.push(load(&source, &build_request(path, field, Some(nside))?, config)?);
    }
    info!(inputs = maps.len(), nside = nside.get(), "Binned all inputs");

    let mut stacked = SkyMap::from_list(&maps).context("failed to stack maps")?;

    if let Some(fill) = fill {
        let window = LonLatWindow::from_arg_string(&fill.window).context("invalid --window")?;
        let reference_args = FieldArgs {
            variable: fill.variable.clone(),
            subset: None,
            ..field.clone()
        };
        let reference = load(
            &source,
            &build_request(&fill.path, &reference_args, requested_nside(field)?.or(Some(nside)))?,
            config,
        )?;
        let filled = stacked.fill_gaps(&reference, &window)?;
        if filled == 0 {
            warn!(window = %fill.window, "No gaps filled");
        }
    }

    finish(&stacked, output)
}
