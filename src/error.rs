//! Error types for the regrid application.
//!
//! Fatal errors belong to one of two families: configuration problems
//! (grid/field dimension mismatches, conflicting options) and I/O failures.
//! Interpolation degeneracies (empty point sets, destination points outside
//! every hull) are not errors; they are absorbed by the fill policy and
//! surfaced as diagnostic counters.

use thiserror::Error;

/// The main error type for regrid operations.
#[derive(Error, Debug)]
pub enum RegridError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegridError {
    /// Shorthand for a configuration error with an owned message.
    pub fn config(message: impl Into<String>) -> Self {
        RegridError::Config {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results with RegridError
pub type Result<T> = std::result::Result<T, RegridError>;
