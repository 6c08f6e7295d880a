//! Per-layer interpolation between the source and destination grids.
//!
//! For every vertical layer the valid source points are collected twice,
//! once per stereographic plane, triangulated, and the destination points
//! are evaluated in the plane matching their own hemisphere. The candidate
//! set can change from layer to layer (validity masks, NaN samples), so
//! both triangulations are rebuilt for every layer and torn down afterwards.

use tracing::debug;

use crate::fill::FillState;
use crate::grid::GridDescriptor;
use crate::interpolation::LinearInterpolant;
use crate::projection::{hemisphere_of, Hemisphere, ProjectedGrid};

/// Options affecting candidate selection.
#[derive(Debug, Clone, Copy)]
pub struct LayerOptions {
    /// Drop the first and last column of the source field (seam duplicate
    /// columns in some structured conventions, e.g. NEMO on ORCA grids)
    pub skip_first_last: bool,
    /// Merge radius around each plane's origin; past the first, points
    /// projecting within this radius of the pole are dropped
    pub pole_merge_radius: f64,
}

/// Diagnostic counters for one interpolated layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayerStats {
    /// Source points admitted as interpolation input
    pub points_in: usize,
    /// Destination points evaluated
    pub points_out: usize,
    /// Destination points that required a fill value
    pub filled: usize,
    /// Whether the layer had no input at all and degraded entirely to fill
    pub degenerate: bool,
}

/// One hemisphere's candidate set for a layer.
struct Candidates {
    points: Vec<crate::projection::PlanePoint>,
    values: Vec<f64>,
}

/// Interpolates single vertical layers from a source grid onto a
/// destination grid using both grids' precomputed projections.
pub struct LayerInterpolator<'a> {
    src: &'a GridDescriptor,
    src_proj: &'a ProjectedGrid,
    dst: &'a GridDescriptor,
    dst_proj: &'a ProjectedGrid,
    opts: LayerOptions,
}

impl<'a> LayerInterpolator<'a> {
    pub fn new(
        src: &'a GridDescriptor,
        src_proj: &'a ProjectedGrid,
        dst: &'a GridDescriptor,
        dst_proj: &'a ProjectedGrid,
        opts: LayerOptions,
    ) -> Self {
        Self {
            src,
            src_proj,
            dst,
            dst_proj,
            opts,
        }
    }

    /// Number of destination points.
    pub fn dst_npoints(&self) -> usize {
        self.dst.npoints()
    }

    /// Whether source point `i` sits in a seam column to be skipped.
    fn in_skipped_column(&self, i: usize) -> bool {
        let ni = self.src.ni;
        self.opts.skip_first_last && (i % ni == 0 || i % ni == ni - 1)
    }

    /// Collect the candidate sets for both hemispheres.
    ///
    /// `admit` expresses the layer-dependent part of admissibility (validity
    /// mask, finite sample). On top of it, each hemisphere independently
    /// rejects points whose projection is non-finite in its plane and keeps
    /// only the first point landing within the pole merge radius of the
    /// plane origin.
    fn collect_candidates(
        &self,
        values: &[f64],
        admit: &dyn Fn(usize) -> bool,
    ) -> (Candidates, Candidates, usize) {
        let n = self.src.npoints();
        let r2 = self.opts.pole_merge_radius * self.opts.pole_merge_radius;
        let mut north = Candidates {
            points: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
        };
        let mut south = Candidates {
            points: Vec::with_capacity(n),
            values: Vec::with_capacity(n),
        };
        let mut admitted = 0usize;
        let mut north_has_pole = false;
        let mut south_has_pole = false;

        for i in 0..n {
            if self.in_skipped_column(i) || !admit(i) {
                continue;
            }
            admitted += 1;

            let pn = self.src_proj.north[i];
            if pn.x.is_finite() && pn.y.is_finite() {
                let near_pole = pn.dist_sq_origin() <= r2;
                if !(near_pole && north_has_pole) {
                    north_has_pole |= near_pole;
                    north.points.push(pn);
                    north.values.push(values[i]);
                }
            }

            let ps = self.src_proj.south[i];
            if ps.x.is_finite() && ps.y.is_finite() {
                let near_pole = ps.dist_sq_origin() <= r2;
                if !(near_pole && south_has_pole) {
                    south_has_pole |= near_pole;
                    south.points.push(ps);
                    south.values.push(values[i]);
                }
            }
        }

        (north, south, admitted)
    }

    /// Build both hemisphere interpolants for the given per-point values.
    /// Empty or degenerate candidate sets yield interpolants covering
    /// nothing. Returns the interpolants and the admitted-point count.
    pub fn build_interpolants(
        &self,
        values: &[f64],
        admit: &dyn Fn(usize) -> bool,
    ) -> (LinearInterpolant, LinearInterpolant, usize) {
        let (north, south, admitted) = self.collect_candidates(values, admit);
        let build = |c: &Candidates| {
            if c.points.is_empty() {
                LinearInterpolant::empty()
            } else {
                LinearInterpolant::build(&c.points, &c.values)
            }
        };
        (build(&north), build(&south), admitted)
    }

    /// The interpolant branch and plane point for destination point `i`.
    pub fn dst_query(&self, i: usize) -> (Hemisphere, crate::projection::PlanePoint) {
        let hemi = hemisphere_of(self.dst.lat[i]);
        (hemi, self.dst_proj.plane_point(hemi, i))
    }

    /// Interpolate one vertical layer.
    ///
    /// `src_layer` holds the source samples for layer `k` (NaN = invalid);
    /// `out` receives the destination layer. Destination columns masked out
    /// by a destination valid-layer count are written as 0 and not counted
    /// as evaluated. An empty candidate set is not an error: the whole layer
    /// degrades to fill values.
    pub fn interpolate_layer(
        &self,
        k: usize,
        src_layer: &[f32],
        fill: &mut FillState,
        out: &mut [f32],
    ) -> LayerStats {
        debug_assert_eq!(src_layer.len(), self.src.npoints());
        debug_assert_eq!(out.len(), self.dst.npoints());

        let src_counts = self.src.layer_counts.as_deref();
        let values: Vec<f64> = src_layer.iter().map(|&v| v as f64).collect();
        let admit = |i: usize| -> bool {
            if let Some(counts) = src_counts {
                if (k as i32) >= counts[i] {
                    return false;
                }
            }
            src_layer[i].is_finite()
        };
        let (north, south, admitted) = self.build_interpolants(&values, &admit);

        let mut stats = LayerStats {
            points_in: admitted,
            degenerate: north.covers_nothing() && south.covers_nothing(),
            ..LayerStats::default()
        };
        if stats.degenerate {
            debug!(layer = k, "no valid source points, layer degrades to fill values");
        }

        let dst_counts = self.dst.layer_counts.as_deref();
        out.fill(0.0);
        for i in 0..out.len() {
            if let Some(counts) = dst_counts {
                if (k as i32) >= counts[i] {
                    // Masked-out destination column, stays 0.
                    continue;
                }
            }
            stats.points_out += 1;

            let (hemi, p) = self.dst_query(i);
            let interp = match hemi {
                Hemisphere::North => &north,
                Hemisphere::South => &south,
            };
            match interp.evaluate(p) {
                Some(v) if v.is_finite() => {
                    out[i] = v as f32;
                    fill.record(i, v as f32);
                }
                _ => {
                    stats.filled += 1;
                    out[i] = fill.fill_value(i);
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::FillPolicy;
    use crate::grid::GridTopology;
    use crate::projection::DEFAULT_POLE_MERGE_RADIUS;

    fn opts() -> LayerOptions {
        LayerOptions {
            skip_first_last: false,
            pole_merge_radius: DEFAULT_POLE_MERGE_RADIUS,
        }
    }

    fn unstructured(lon: Vec<f64>, lat: Vec<f64>) -> GridDescriptor {
        GridDescriptor {
            topology: GridTopology::Unstructured,
            ni: lon.len(),
            nj: 0,
            lon,
            lat,
            layer_counts: None,
        }
    }

    fn curvilinear(nj: usize, ni: usize, lon: Vec<f64>, lat: Vec<f64>) -> GridDescriptor {
        GridDescriptor {
            topology: GridTopology::Curvilinear,
            ni,
            nj,
            lon,
            lat,
            layer_counts: None,
        }
    }

    /// Source spanning both hemispheres: three equator points and the north
    /// pole. In the north-serving plane these project to (0,1), (1,0),
    /// (0,-1) and the origin; in the south-serving plane the pole is
    /// singular and gets dropped, leaving the equator triangle.
    fn dual_hemisphere_fixture() -> (GridDescriptor, GridDescriptor) {
        let src = curvilinear(
            2,
            2,
            vec![0.0, 90.0, 180.0, 0.0],
            vec![0.0, 0.0, 0.0, 90.0],
        );
        // One destination point per hemisphere, at +/-45 latitude.
        let dst = unstructured(vec![45.0, 45.0], vec![45.0, -45.0]);
        (src, dst)
    }

    #[test]
    fn test_dual_hemisphere_barycentric_values() {
        let (src, dst) = dual_hemisphere_fixture();
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, opts());

        let layer = [10.0f32, 20.0, 30.0, 40.0];
        let mut out = [0.0f32; 2];
        let mut fill = FillState::new(FillPolicy::Zero, 2, 1);
        let stats = interp.interpolate_layer(0, &layer, &mut fill, &mut out);

        assert_eq!(stats.points_in, 4);
        assert_eq!(stats.points_out, 2);
        assert_eq!(stats.filled, 0);

        // Hand-computed barycentric combinations. Both destination points
        // project to (q, q) with q = 1 - sqrt(2)/2 in their plane.
        //
        // North: triangle {(0,1)=10, (1,0)=20, origin=40},
        //   weights (q, q, 1 - 2q), value 40 - 50 q = 25 sqrt(2) - 10.
        // South: triangle {(0,1)=10, (1,0)=20, (0,-1)=30},
        //   weights (1/2, q, 1/2 - q), value 20 - 10 q = 10 + 5 sqrt(2).
        let q = 1.0 - std::f64::consts::SQRT_2 / 2.0;
        let expect_north = 40.0 - 50.0 * q;
        let expect_south = 20.0 - 10.0 * q;
        assert!(
            (out[0] as f64 - expect_north).abs() < 1e-5,
            "north: got {}, want {}",
            out[0],
            expect_north
        );
        assert!(
            (out[1] as f64 - expect_south).abs() < 1e-5,
            "south: got {}, want {}",
            out[1],
            expect_south
        );
    }

    #[test]
    fn test_identity_regrid_reproduces_source() {
        let src = curvilinear(
            2,
            2,
            vec![10.0, 80.0, 10.0, 80.0],
            vec![20.0, 20.0, 60.0, 60.0],
        );
        let dst = unstructured(vec![10.0, 80.0, 80.0], vec![20.0, 20.0, 60.0]);
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, opts());

        let layer = [1.5f32, -2.5, 3.5, 4.5];
        let mut out = [0.0f32; 3];
        let mut fill = FillState::new(FillPolicy::Zero, 3, 1);
        interp.interpolate_layer(0, &layer, &mut fill, &mut out);

        assert!((out[0] - 1.5).abs() < 1e-5);
        assert!((out[1] - -2.5).abs() < 1e-5);
        assert!((out[2] - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_source_mask_excludes_points_per_layer() {
        let mut src = curvilinear(
            2,
            2,
            vec![10.0, 80.0, 10.0, 80.0],
            vec![20.0, 20.0, 60.0, 60.0],
        );
        // Column 0 is valid on layer 0 only.
        src.layer_counts = Some(vec![1, 2, 2, 2]);
        let dst = unstructured(vec![10.0], vec![20.0]);
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, opts());

        let mut out = [0.0f32; 1];
        let mut fill = FillState::new(FillPolicy::Missing, 1, 2);

        let layer0 = [7.0f32, 8.0, 9.0, 10.0];
        let s0 = interp.interpolate_layer(0, &layer0, &mut fill, &mut out);
        assert_eq!(s0.points_in, 4);
        assert!((out[0] - 7.0).abs() < 1e-5);

        // On layer 1 the destination point sits on the hull corner that
        // just lost its source point; it is no longer enclosed.
        let s1 = interp.interpolate_layer(1, &layer0, &mut fill, &mut out);
        assert_eq!(s1.points_in, 3);
    }

    #[test]
    fn test_empty_layer_degrades_to_fill() {
        let src = unstructured(vec![0.0, 10.0, 20.0], vec![5.0, 5.0, 15.0]);
        let dst = unstructured(vec![5.0], vec![8.0]);
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, opts());

        let layer = [f32::NAN, f32::NAN, f32::NAN];
        let mut out = [99.0f32; 1];
        let mut fill = FillState::new(FillPolicy::Zero, 1, 1);
        let stats = interp.interpolate_layer(0, &layer, &mut fill, &mut out);

        assert!(stats.degenerate);
        assert_eq!(stats.points_in, 0);
        assert_eq!(stats.filled, 1);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_skip_first_last_columns() {
        // 2x4 grid; columns 0 and 3 duplicate the seam.
        let src = curvilinear(
            2,
            4,
            vec![0.0, 10.0, 20.0, 0.0, 0.0, 10.0, 20.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 30.0, 30.0, 30.0, 30.0],
        );
        let dst = unstructured(vec![10.0], vec![15.0]);
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let mut o = opts();
        o.skip_first_last = true;
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, o);

        let layer = [1.0f32; 8];
        let mut out = [0.0f32; 1];
        let mut fill = FillState::new(FillPolicy::Zero, 1, 1);
        let stats = interp.interpolate_layer(0, &layer, &mut fill, &mut out);
        assert_eq!(stats.points_in, 4);
    }

    #[test]
    fn test_pole_duplicates_collapse_to_first() {
        // A curvilinear top row collapsed onto the north pole: several
        // nodes project to the plane origin; only the first one may enter
        // the triangulation.
        let src = curvilinear(
            2,
            3,
            vec![0.0, 120.0, 240.0, 0.0, 120.0, 240.0],
            vec![20.0, 20.0, 20.0, 90.0, 90.0, 90.0],
        );
        let dst = unstructured(vec![60.0], vec![70.0]);
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, opts());

        let layer = [1.0f32, 2.0, 3.0, 50.0, 60.0, 70.0];
        let values: Vec<f64> = layer.iter().map(|&v| v as f64).collect();
        let (north, _, admitted) = interp.build_interpolants(&values, &|_| true);
        assert_eq!(admitted, 6);
        assert!(!north.covers_nothing());

        // The value at the pole must be the first pole node's, 50.
        let pole = crate::projection::PlanePoint { x: 0.0, y: 0.0 };
        let got = north.evaluate(pole).unwrap();
        assert!((got - 50.0).abs() < 1e-9, "got {}", got);
    }

    #[test]
    fn test_masked_destination_columns_stay_zero() {
        let src = curvilinear(
            2,
            2,
            vec![10.0, 80.0, 10.0, 80.0],
            vec![20.0, 20.0, 60.0, 60.0],
        );
        let mut dst = unstructured(vec![10.0, 80.0], vec![20.0, 20.0]);
        dst.layer_counts = Some(vec![0, 1]);
        let src_proj = ProjectedGrid::project(&src);
        let dst_proj = ProjectedGrid::project(&dst);
        let interp = LayerInterpolator::new(&src, &src_proj, &dst, &dst_proj, opts());

        let layer = [1.0f32, 2.0, 3.0, 4.0];
        let mut out = [9.0f32; 2];
        let mut fill = FillState::new(FillPolicy::Missing, 2, 1);
        let stats = interp.interpolate_layer(0, &layer, &mut fill, &mut out);

        assert_eq!(stats.points_out, 1);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 2.0).abs() < 1e-5);
    }
}
