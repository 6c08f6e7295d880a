//! Planar interpolation machinery.
//!
//! The regridding engine works in the two stereographic planes produced by
//! [`crate::projection`]: each vertical layer triangulates its valid source
//! points and evaluates a piecewise-linear interpolant at the destination
//! points. Triangulations are rebuilt from scratch every layer because the
//! valid point set can change layer-to-layer.

pub mod delaunay;
pub mod linear;

pub use delaunay::Triangulation;
pub use linear::LinearInterpolant;
