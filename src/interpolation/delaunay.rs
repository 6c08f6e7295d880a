//! Incremental Delaunay triangulation of a planar point set.
//!
//! Bowyer-Watson insertion into a super-triangle enclosing the whole set.
//! Exact duplicates (within a snapping tolerance relative to the point
//! cloud's extent) are dropped, first occurrence wins. After construction a
//! uniform bucket index over triangle bounding boxes supports point-location
//! queries returning barycentric coordinates.

use std::collections::HashMap;

use crate::projection::PlanePoint;

/// Barycentric coordinates below this value count as outside the triangle.
const BARY_TOL: f64 = 1e-9;

/// Relative snapping tolerance for coincident input points.
const SNAP_REL: f64 = 1e-12;

/// A Delaunay triangulation supporting point-location queries.
#[derive(Debug)]
pub struct Triangulation {
    /// Kept vertices (deduplicated input points)
    verts: Vec<PlanePoint>,
    /// For each kept vertex, its index in the original input slice
    kept: Vec<usize>,
    /// Triangles as CCW vertex index triples into `verts`
    triangles: Vec<[usize; 3]>,
    index: BucketIndex,
}

impl Triangulation {
    /// Triangulate a point set. Returns `None` when the set is too small or
    /// degenerate (fewer than three distinct points, or all collinear): such
    /// a triangulation covers nothing.
    pub fn build(points: &[PlanePoint]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }

        let (min_x, min_y, max_x, max_y) = bounding_box(points)?;
        let span = (max_x - min_x).max(max_y - min_y);
        if span == 0.0 {
            return None;
        }

        // Snap-deduplicate; the first occurrence of a coincident pair wins.
        let snap = span * SNAP_REL;
        let mut seen: HashMap<(i64, i64), ()> = HashMap::with_capacity(points.len());
        let mut verts: Vec<PlanePoint> = Vec::with_capacity(points.len());
        let mut kept: Vec<usize> = Vec::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            let key = (
                ((p.x - min_x) / snap).round() as i64,
                ((p.y - min_y) / snap).round() as i64,
            );
            if seen.insert(key, ()).is_none() {
                verts.push(*p);
                kept.push(i);
            }
        }
        if verts.len() < 3 {
            return None;
        }

        let n = verts.len();
        // Super-triangle comfortably enclosing every point and every relevant
        // circumcircle.
        let cx = 0.5 * (min_x + max_x);
        let cy = 0.5 * (min_y + max_y);
        let m = 20.0 * (span + 1.0);
        verts.push(PlanePoint { x: cx, y: cy + 2.0 * m });
        verts.push(PlanePoint { x: cx - 2.0 * m, y: cy - m });
        verts.push(PlanePoint { x: cx + 2.0 * m, y: cy - m });

        let mut triangles: Vec<[usize; 3]> = vec![make_ccw(&verts, [n, n + 1, n + 2])];

        for vi in 0..n {
            let p = verts[vi];

            // Cavity: all triangles whose circumcircle strictly contains p.
            let mut bad = vec![false; triangles.len()];
            let mut any_bad = false;
            for (ti, t) in triangles.iter().enumerate() {
                if in_circumcircle(verts[t[0]], verts[t[1]], verts[t[2]], p) {
                    bad[ti] = true;
                    any_bad = true;
                }
            }
            if !any_bad {
                // p coincides with a kept vertex up to rounding; drop it.
                continue;
            }

            // Boundary of the cavity: directed edges of bad triangles whose
            // reverse does not belong to another bad triangle.
            let mut edges: Vec<(usize, usize)> = Vec::new();
            for (ti, t) in triangles.iter().enumerate() {
                if !bad[ti] {
                    continue;
                }
                for e in 0..3 {
                    edges.push((t[e], t[(e + 1) % 3]));
                }
            }
            let boundary: Vec<(usize, usize)> = edges
                .iter()
                .copied()
                .filter(|&(a, b)| !edges.contains(&(b, a)))
                .collect();

            let mut next: Vec<[usize; 3]> = triangles
                .iter()
                .zip(bad.iter())
                .filter(|&(_, &b)| !b)
                .map(|(t, _)| *t)
                .collect();
            for (a, b) in boundary {
                if orient2d(verts[a], verts[b], p) != 0.0 {
                    next.push(make_ccw(&verts, [a, b, vi]));
                }
            }
            triangles = next;
        }

        // Strip every triangle touching the super-triangle.
        triangles.retain(|t| t.iter().all(|&v| v < n));
        if triangles.is_empty() {
            return None;
        }

        verts.truncate(n);
        let index = BucketIndex::build(&verts, &triangles, min_x, min_y, max_x, max_y);

        Some(Self {
            verts,
            kept,
            triangles,
            index,
        })
    }

    /// Original input indices of the vertices that survived deduplication.
    pub fn kept_indices(&self) -> &[usize] {
        &self.kept
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Locate the triangle containing `p`. Returns the triangle's vertex
    /// indices (into the kept-vertex numbering) and the barycentric weights
    /// of `p` within it, or `None` when `p` is outside the hull.
    pub fn locate(&self, p: PlanePoint) -> Option<([usize; 3], [f64; 3])> {
        for &ti in self.index.candidates(p)? {
            let t = self.triangles[ti as usize];
            let (a, b, c) = (self.verts[t[0]], self.verts[t[1]], self.verts[t[2]]);
            if let Some(w) = barycentric(a, b, c, p) {
                return Some((t, w));
            }
        }
        None
    }
}

fn bounding_box(points: &[PlanePoint]) -> Option<(f64, f64, f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some((min_x, min_y, max_x, max_y))
}

/// Twice the signed area of triangle abc; positive when CCW.
fn orient2d(a: PlanePoint, b: PlanePoint, c: PlanePoint) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn make_ccw(verts: &[PlanePoint], mut t: [usize; 3]) -> [usize; 3] {
    if orient2d(verts[t[0]], verts[t[1]], verts[t[2]]) < 0.0 {
        t.swap(1, 2);
    }
    t
}

/// Strict in-circumcircle test for a CCW triangle abc.
fn in_circumcircle(a: PlanePoint, b: PlanePoint, c: PlanePoint, p: PlanePoint) -> bool {
    let (ax, ay) = (a.x - p.x, a.y - p.y);
    let (bx, by) = (b.x - p.x, b.y - p.y);
    let (cx, cy) = (c.x - p.x, c.y - p.y);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det > 0.0
}

/// Barycentric coordinates of p in triangle abc, or `None` when p lies
/// outside (with a small tolerance so shared edges belong to both sides).
fn barycentric(a: PlanePoint, b: PlanePoint, c: PlanePoint, p: PlanePoint) -> Option<[f64; 3]> {
    let d = orient2d(a, b, c);
    if d == 0.0 {
        return None;
    }
    let wa = orient2d(p, b, c) / d;
    let wb = orient2d(a, p, c) / d;
    let wc = 1.0 - wa - wb;
    if wa >= -BARY_TOL && wb >= -BARY_TOL && wc >= -BARY_TOL {
        Some([wa, wb, wc])
    } else {
        None
    }
}

/// Uniform grid over the point cloud's bounding box mapping cells to the
/// triangles whose bounding boxes overlap them.
#[derive(Debug)]
struct BucketIndex {
    x0: f64,
    y0: f64,
    inv_dx: f64,
    inv_dy: f64,
    nx: usize,
    ny: usize,
    cells: Vec<Vec<u32>>,
}

impl BucketIndex {
    fn build(
        verts: &[PlanePoint],
        triangles: &[[usize; 3]],
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Self {
        let side = ((triangles.len() as f64).sqrt().ceil() as usize).clamp(1, 256);
        let (nx, ny) = (side, side);
        let w = (max_x - min_x).max(f64::MIN_POSITIVE);
        let h = (max_y - min_y).max(f64::MIN_POSITIVE);
        let mut cells = vec![Vec::new(); nx * ny];

        let clamp_cell = |v: f64, inv: f64, n: usize| -> usize {
            ((v * inv) as isize).clamp(0, n as isize - 1) as usize
        };
        let inv_dx = nx as f64 / w;
        let inv_dy = ny as f64 / h;

        for (ti, t) in triangles.iter().enumerate() {
            let xs = [verts[t[0]].x, verts[t[1]].x, verts[t[2]].x];
            let ys = [verts[t[0]].y, verts[t[1]].y, verts[t[2]].y];
            let (tx0, tx1) = (
                xs.iter().cloned().fold(f64::INFINITY, f64::min),
                xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            );
            let (ty0, ty1) = (
                ys.iter().cloned().fold(f64::INFINITY, f64::min),
                ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            );
            let i0 = clamp_cell(tx0 - min_x, inv_dx, nx);
            let i1 = clamp_cell(tx1 - min_x, inv_dx, nx);
            let j0 = clamp_cell(ty0 - min_y, inv_dy, ny);
            let j1 = clamp_cell(ty1 - min_y, inv_dy, ny);
            for j in j0..=j1 {
                for i in i0..=i1 {
                    cells[j * nx + i].push(ti as u32);
                }
            }
        }

        Self {
            x0: min_x,
            y0: min_y,
            inv_dx,
            inv_dy,
            nx,
            ny,
            cells,
        }
    }

    /// Candidate triangles for a query point, `None` when the point falls
    /// outside the indexed bounding box.
    fn candidates(&self, p: PlanePoint) -> Option<&[u32]> {
        let fx = (p.x - self.x0) * self.inv_dx;
        let fy = (p.y - self.y0) * self.inv_dy;
        if !(0.0..=self.nx as f64).contains(&fx) || !(0.0..=self.ny as f64).contains(&fy) {
            return None;
        }
        let i = (fx as usize).min(self.nx - 1);
        let j = (fy as usize).min(self.ny - 1);
        Some(&self.cells[j * self.nx + i])
    }
}
