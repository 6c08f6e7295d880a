//! # regrid
//!
//! Horizontal regridding of layered geophysical fields between lat/lon
//! grids.
//!
//! A field stored on one horizontal grid (curvilinear, rectangular or
//! unstructured) is interpolated layer by layer onto another grid. Each
//! layer's valid source points are projected onto two stereographic planes,
//! one serving each destination hemisphere, triangulated with a Delaunay
//! triangulation, and evaluated piecewise linearly at the destination
//! points. Destination points outside the source hull fall back to a
//! configurable vertical fill policy.
//!
//! ## Architecture
//!
//! - **Grid layer**: classification of coordinate arrays into grid
//!   topologies, valid-layer-count handling
//! - **Geometry**: dual stereographic projection, incremental Delaunay
//!   triangulation, piecewise-linear interpolants
//! - **Pipeline**: per-layer NetCDF read, interpolate, write, with an
//!   atomic rename of the finished destination file

pub mod config;
pub mod error;
pub mod fill;
pub mod grid;
pub mod interpolation;
pub mod layer;
pub mod logging;
pub mod mask;
#[cfg(feature = "netcdf")]
pub mod ncio;
#[cfg(feature = "netcdf")]
pub mod pipeline;
pub mod projection;

pub use config::Config;
pub use error::{RegridError, Result};
pub use fill::FillPolicy;
pub use grid::{GridDescriptor, GridTopology};
pub use layer::{LayerInterpolator, LayerOptions, LayerStats};
pub use logging::{init_tracing, log_operation_end, log_operation_start};
#[cfg(feature = "netcdf")]
pub use pipeline::RegridPipeline;
pub use projection::{Hemisphere, ProjectedGrid};
