//! Sky-map command-line driver.
//!
//! Bins satellite SST / SSH fields onto HEALPix, stacks several passes or
//! days into one map, and optionally fills gaps from a reference product.

mod commands;
mod sources;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sky_map::SkyMapConfig;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "skymap")]
#[command(about = "Re-bin satellite ocean fields onto HEALPix sky maps")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the nside for a target pixel size
    Nside {
        /// Target pixel size in degrees
        #[arg(long)]
        pixel_deg: f64,
    },

    /// Bin one field into a sky map
    Bin {
        /// Input field file (.json, or .nc with the netcdf feature)
        input: PathBuf,

        #[command(flatten)]
        field: FieldArgs,

        /// Output cell table (.json or .nc)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bin several fields and stack them into one map
    Stack {
        /// Input field files, oldest first
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        field: FieldArgs,

        /// Fill gaps from this reference field
        #[arg(long, requires = "window")]
        fill_from: Option<PathBuf>,

        /// Variable of the reference field (default: --variable)
        #[arg(long)]
        reference_variable: Option<String>,

        /// Gap-filling window as lon_min,lon_max,lat_min,lat_max
        #[arg(long, allow_hyphen_values = true, requires = "fill_from")]
        window: Option<String>,

        /// Output cell table (.json or .nc)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Quality-control preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QcPreset {
    /// Mask NaN samples only
    None,
    /// Preset chosen from the file's sensor attribute
    Sensor,
    /// SST in °C: quality > 2 or outside (−2, 33] masked
    SstCelsius,
    /// SST in K with the same rule
    SstKelvin,
}

/// Options shared by every command that loads a field.
#[derive(Args, Debug, Clone)]
pub struct FieldArgs {
    /// Data variable to bin
    #[arg(short, long)]
    pub variable: String,

    /// Per-cell statistic: mean or median (default from SKYMAP_DEFAULT_STAT)
    #[arg(long)]
    pub stat: Option<String>,

    /// Explicit nside (power of two)
    #[arg(long, conflicts_with = "pixel_deg")]
    pub nside: Option<u32>,

    /// Target pixel size in degrees
    #[arg(long)]
    pub pixel_deg: Option<f64>,

    /// Along-track spacing in km (required for swath files without --nside)
    #[arg(long)]
    pub hint_km: Option<f64>,

    /// Time step to select
    #[arg(long)]
    pub time_index: Option<usize>,

    /// Convert Kelvin to °C
    #[arg(long)]
    pub kelvin: bool,

    /// Only load samples in lon_min,lon_max,lat_min,lat_max
    #[arg(long, allow_hyphen_values = true)]
    pub subset: Option<String>,

    /// Quality-control preset
    #[arg(long, value_enum, default_value = "none")]
    pub qc: QcPreset,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs)?;

    let config = SkyMapConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        default_stat = %config.default_stat,
        parallel_min_samples = config.parallel_min_samples,
        max_nside = config.max_nside,
        "Loaded configuration"
    );

    match cli.command {
        Command::Nside { pixel_deg } => commands::nside(pixel_deg),
        Command::Bin {
            input,
            field,
            output,
        } => commands::bin(&config, &input, &field, output.as_deref()),
        Command::Stack {
            inputs,
            field,
            fill_from,
            reference_variable,
            window,
            output,
        } => {
            let fill = match (fill_from, window) {
                (Some(path), Some(window)) => Some(commands::FillSpec {
                    path,
                    variable: reference_variable.unwrap_or_else(|| field.variable.clone()),
                    window,
                }),
                _ => None,
            };
            commands::stack(&config, &inputs, &field, fill.as_ref(), output.as_deref())
        }
    }
}
