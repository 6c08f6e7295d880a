//! Dual stereographic projection of geographic grids.
//!
//! A single stereographic projection is singular at its own pole and badly
//! distorted near it, so every point is projected twice: once with latitude
//! negated (singular at the south pole, used for destination points with
//! latitude >= 0) and once as-is (singular at the north pole, used for
//! southern destination points). Whichever plane a destination point is
//! evaluated in, the plane's singular pole lies in the opposite hemisphere.

use crate::grid::GridDescriptor;

/// Default merge radius around a plane's origin. Multiple grid nodes landing
/// within this radius of the pole at the plane center (common on curvilinear
/// grids where an entire row collapses onto the pole) destabilize the
/// triangulation; only the first such node is kept per hemisphere per layer.
pub const DEFAULT_POLE_MERGE_RADIUS: f64 = 1e-8;

/// A point in one of the two projection planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    /// Squared distance to the plane origin (the projection center).
    pub fn dist_sq_origin(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

/// Which interpolation branch a destination point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    /// Latitude >= 0
    North,
    /// Latitude < 0
    South,
}

/// Deterministic branch selection: the equator belongs to the north.
pub fn hemisphere_of(lat: f64) -> Hemisphere {
    if lat >= 0.0 {
        Hemisphere::North
    } else {
        Hemisphere::South
    }
}

/// Both planar projections of every node of a grid.
///
/// Derived once per grid, never per layer.
#[derive(Debug, Clone)]
pub struct ProjectedGrid {
    /// Plane serving northern destination points (latitude-reflected
    /// projection, singular at the south pole)
    pub north: Vec<PlanePoint>,
    /// Plane serving southern destination points (singular at the north pole)
    pub south: Vec<PlanePoint>,
}

impl ProjectedGrid {
    /// Project every node of a grid into both planes.
    pub fn project(grid: &GridDescriptor) -> Self {
        let n = grid.npoints();
        let mut north = Vec::with_capacity(n);
        let mut south = Vec::with_capacity(n);
        for i in 0..n {
            let (pn, ps) = stereographic_pair(grid.lon[i], grid.lat[i]);
            north.push(pn);
            south.push(ps);
        }
        Self { north, south }
    }

    /// The projected position of node `i` in the plane serving `hemi`.
    pub fn plane_point(&self, hemi: Hemisphere, i: usize) -> PlanePoint {
        match hemi {
            Hemisphere::North => self.north[i],
            Hemisphere::South => self.south[i],
        }
    }
}

/// Geographic (degrees) to unit-sphere Cartesian coordinates.
fn ll_to_xyz(lon_deg: f64, lat_deg: f64) -> [f64; 3] {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    let coslat = lat.cos();
    [lon.sin() * coslat, lon.cos() * coslat, lat.sin()]
}

/// Stereographic projection from the unit sphere, singular at z = 1.
fn stereographic(xyz: [f64; 3]) -> PlanePoint {
    PlanePoint {
        x: xyz[0] / (1.0 - xyz[2]),
        y: xyz[1] / (1.0 - xyz[2]),
    }
}

/// Project a geographic point into both planes: (north-serving,
/// south-serving). The north-serving plane reflects latitude through the
/// equator before projecting.
pub fn stereographic_pair(lon: f64, lat: f64) -> (PlanePoint, PlanePoint) {
    let north = stereographic(ll_to_xyz(lon, -lat));
    let south = stereographic(ll_to_xyz(lon, lat));
    (north, south)
}
