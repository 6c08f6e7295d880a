//! regrid - horizontal regridding of layered fields between lat/lon grids
//!
//! This is the main entry point for the regrid command-line tool.

use tracing::error;

use regrid::{init_tracing, Config, RegridPipeline, Result};

fn main() {
    if run().is_err() {
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Load configuration
    let config = Config::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_tracing(&config.log_level);

    let pipeline = RegridPipeline::new(config);
    pipeline.run().map_err(|e| {
        error!("Regrid failed: {}", e);
        e
    })
}
