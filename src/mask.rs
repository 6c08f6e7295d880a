//! One-shot transfer of the valid-layer-count mask between grids.
//!
//! Runs once before the layer loop when requested. The source per-column
//! counts are treated as a single synthetic scalar field and pushed through
//! the same dual-hemisphere machinery as an ordinary layer; the interpolated
//! real values are rounded to the nearest non-negative integer. Destination
//! points outside every hull receive count 0 (fully invalid column).

use tracing::info;

use crate::layer::LayerInterpolator;
use crate::projection::Hemisphere;

/// Interpolate the source grid's valid-layer counts onto the destination.
///
/// `counts` are the source per-column counts. Results are clamped into
/// `[0, nk]`; slight interpolation undershoot below zero never yields a
/// negative count.
pub fn transfer_layer_counts(interp: &LayerInterpolator<'_>, counts: &[i32], nk: usize) -> Vec<i32> {
    let values: Vec<f64> = counts.iter().map(|&c| c as f64).collect();

    // No layer-count filtering for the synthetic field; counts are always
    // finite.
    let (north, south, admitted) = interp.build_interpolants(&values, &|_| true);

    let n = interp.dst_npoints();
    let mut out = Vec::with_capacity(n);
    let mut uncovered = 0usize;
    for i in 0..n {
        let (hemi, p) = interp.dst_query(i);
        let branch = match hemi {
            Hemisphere::North => &north,
            Hemisphere::South => &south,
        };
        let count = match branch.evaluate(p) {
            Some(v) if v.is_finite() => (v.round() as i64).clamp(0, nk as i64) as i32,
            _ => {
                uncovered += 1;
                0
            }
        };
        out.push(count);
    }

    info!(
        points_in = admitted,
        points_out = n,
        uncovered,
        "transferred valid-layer counts onto destination grid"
    );
    out
}
