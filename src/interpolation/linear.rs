//! Piecewise-linear interpolation over a Delaunay triangulation.
//!
//! The interpolant holds one scalar value per triangulation vertex and
//! evaluates queries by barycentric combination of the enclosing triangle's
//! vertex values. Queries outside the hull (or against an empty
//! triangulation) yield `None`.

use crate::interpolation::delaunay::Triangulation;
use crate::projection::PlanePoint;

/// A piecewise-linear scalar field over a triangulated planar point set.
#[derive(Debug)]
pub struct LinearInterpolant {
    tri: Option<Triangulation>,
    values: Vec<f64>,
}

impl LinearInterpolant {
    /// Build from valued points. `points` and `values` must have the same
    /// length. A degenerate point set produces an interpolant that covers
    /// nothing.
    pub fn build(points: &[PlanePoint], values: &[f64]) -> Self {
        debug_assert_eq!(points.len(), values.len());
        match Triangulation::build(points) {
            Some(tri) => {
                let values = tri.kept_indices().iter().map(|&i| values[i]).collect();
                Self {
                    tri: Some(tri),
                    values,
                }
            }
            None => Self {
                tri: None,
                values: Vec::new(),
            },
        }
    }

    /// An interpolant over the empty set.
    pub fn empty() -> Self {
        Self {
            tri: None,
            values: Vec::new(),
        }
    }

    /// Whether any query at all can succeed.
    pub fn covers_nothing(&self) -> bool {
        self.tri.is_none()
    }

    /// Evaluate at a plane point; `None` outside the hull.
    pub fn evaluate(&self, p: PlanePoint) -> Option<f64> {
        let tri = self.tri.as_ref()?;
        let (t, w) = tri.locate(p)?;
        Some(w[0] * self.values[t[0]] + w[1] * self.values[t[1]] + w[2] * self.values[t[2]])
    }
}
