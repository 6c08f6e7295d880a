//! Logging utilities for regrid.
//!
//! Structured logging via `tracing`. The CLI verbosity switch selects a
//! default level (0 = warn, 1 = info, 2 = debug); `RUST_LOG` always wins.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::layer::LayerStats;

/// Initialize the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Log the start of a significant operation.
pub fn log_operation_start(operation: &str, details: &str) {
    info!(operation = operation, details = details, "Starting operation");
}

/// Log the completion of a significant operation.
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Log per-layer interpolation statistics.
pub fn log_layer_stats(k: usize, stats: &LayerStats) {
    debug!(
        layer = k,
        points_in = stats.points_in,
        points_out = stats.points_out,
        filled = stats.filled,
        degenerate = stats.degenerate,
        "Layer interpolated"
    );
}
