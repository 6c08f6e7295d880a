//! Configuration management for regrid.
//!
//! Precedence, highest first: command-line arguments, optional JSON tuning
//! file, built-in defaults. The grid options take three or four values:
//! grid file, longitude variable, latitude variable, and optionally the
//! valid-layer-count variable.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RegridError, Result};
use crate::fill::FillPolicy;
use crate::projection::DEFAULT_POLE_MERGE_RADIUS;

/// Command-line arguments for regrid
#[derive(Parser, Debug)]
#[command(name = "regrid")]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Args {
    /// Source data file
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Destination data file (clobbered)
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Variable to interpolate
    #[arg(short = 'v', long = "var")]
    pub varname: String,

    /// Source grid: <FILE> <LONVAR> <LATVAR> [COUNTSVAR]
    #[arg(long = "grid-in", num_args = 3..=4, required = true, value_names = ["FILE", "LONVAR", "LATVAR", "COUNTSVAR"])]
    pub grid_in: Vec<String>,

    /// Destination grid: <FILE> <LONVAR> <LATVAR> [COUNTSVAR]
    #[arg(long = "grid-out", num_args = 3..=4, required = true, value_names = ["FILE", "LONVAR", "LATVAR", "COUNTSVAR"])]
    pub grid_out: Vec<String>,

    /// Deflate (compression) level for the destination variable, 0-9
    #[arg(short = 'd', long, default_value = "0")]
    pub deflate: u32,

    /// Fill uncovered destination points with NaN instead of zero
    #[arg(short = 'm', long, conflicts_with = "propagate_down")]
    pub nan_fill: bool,

    /// Fill uncovered destination points with the deepest valid value
    /// carried down the column
    #[arg(short = 'n', long)]
    pub propagate_down: bool,

    /// Do not use the first and last columns of the source field
    /// (e.g. with NEMO on ORCA grids)
    #[arg(short = 's', long)]
    pub skip_first_last: bool,

    /// Interpolate the source valid-layer counts onto the destination grid
    #[arg(short = 't', long)]
    pub transfer_mask: bool,

    /// Verbosity: 0 (quiet), 1 (progress), 2 (per-layer statistics)
    #[arg(short = 'V', long, default_value = "1")]
    pub verbosity: u8,

    /// Path to JSON tuning file
    #[arg(short = 'c', long, env = "REGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides verbosity
    #[arg(long, env = "REGRID_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// One side's grid specification.
#[derive(Debug, Clone)]
pub struct GridSpec {
    /// Grid file path
    pub path: PathBuf,
    /// Longitude coordinate variable name
    pub lon: String,
    /// Latitude coordinate variable name
    pub lat: String,
    /// Optional valid-layer-count variable name
    pub layer_counts: Option<String>,
}

impl GridSpec {
    fn from_values(option: &str, values: &[String]) -> Result<Self> {
        if !(3..=4).contains(&values.len()) {
            return Err(RegridError::config(format!(
                "{} expects <FILE> <LONVAR> <LATVAR> [COUNTSVAR]",
                option
            )));
        }
        Ok(Self {
            path: PathBuf::from(&values[0]),
            lon: values[1].clone(),
            lat: values[2].clone(),
            layer_counts: values.get(3).cloned(),
        })
    }
}

/// Optional JSON tuning file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Merge radius around the projection poles
    #[serde(default)]
    pub pole_merge_radius: Option<f64>,

    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Complete run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source data file
    pub input: PathBuf,
    /// Destination data file
    pub output: PathBuf,
    /// Variable to interpolate
    pub varname: String,
    /// Source grid
    pub grid_in: GridSpec,
    /// Destination grid
    pub grid_out: GridSpec,
    /// Fill policy for uncovered destination points
    pub fill: FillPolicy,
    /// Skip the source field's first and last columns
    pub skip_first_last: bool,
    /// Run mask transfer before the layer loop
    pub transfer_mask: bool,
    /// Deflate level for the destination variable
    pub deflate: u32,
    /// Verbosity level 0..=2
    pub verbosity: u8,
    /// Log level
    pub log_level: String,
    /// Merge radius around the projection poles
    pub pole_merge_radius: f64,
}

impl Config {
    /// Load configuration from the command line and the optional tuning
    /// file.
    pub fn load() -> Result<Self> {
        let args = Args::parse();
        Self::from_args(args)
    }

    /// Build a configuration from parsed arguments.
    pub fn from_args(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => Self::load_file(path)?,
            None => FileConfig::default(),
        };

        let fill = if args.nan_fill {
            FillPolicy::Missing
        } else if args.propagate_down {
            FillPolicy::PropagateDown
        } else {
            FillPolicy::Zero
        };

        let log_level = args
            .log_level
            .or(file.log_level)
            .unwrap_or_else(|| default_level_for_verbosity(args.verbosity).to_string());

        let config = Self {
            input: args.input,
            output: args.output,
            varname: args.varname,
            grid_in: GridSpec::from_values("--grid-in", &args.grid_in)?,
            grid_out: GridSpec::from_values("--grid-out", &args.grid_out)?,
            fill,
            skip_first_last: args.skip_first_last,
            transfer_mask: args.transfer_mask,
            deflate: args.deflate,
            verbosity: args.verbosity,
            log_level,
            pole_merge_radius: file.pole_merge_radius.unwrap_or(DEFAULT_POLE_MERGE_RADIUS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the tuning file.
    fn load_file(path: &PathBuf) -> Result<FileConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: FileConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.deflate > 9 {
            return Err(RegridError::config(format!(
                "Invalid deflate level: {}. Must be 0-9",
                self.deflate
            )));
        }

        if self.verbosity > 2 {
            return Err(RegridError::config(format!(
                "Invalid verbosity: {}. Must be 0, 1 or 2",
                self.verbosity
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(RegridError::config(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )));
            }
        }

        if !(self.pole_merge_radius > 0.0) {
            return Err(RegridError::config(
                "pole_merge_radius must be positive".to_string(),
            ));
        }

        if self.transfer_mask {
            if self.grid_out.layer_counts.is_some() {
                return Err(RegridError::config(
                    "cannot both specify destination mask and request mask transfer",
                ));
            }
            if self.grid_in.layer_counts.is_none() {
                return Err(RegridError::config(
                    "mask transfer requested but the source grid carries no valid-layer-count variable",
                ));
            }
        }

        Ok(())
    }
}

/// Map the CLI verbosity switch onto a log level.
fn default_level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
