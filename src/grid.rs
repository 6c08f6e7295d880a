//! Horizontal grid classification and storage.
//!
//! A grid is described by its lon/lat node coordinates and a topology tag.
//! Structured grids are either curvilinear (2D coordinate arrays) or
//! rectangular (1D axes expanded by outer product); unstructured grids are a
//! flat list of scattered nodes. A grid may additionally carry a per-column
//! valid-layer count giving how many vertical layers (from the first layer
//! down) hold physically meaningful data.

use ndarray::ArrayD;

use crate::error::{RegridError, Result};

/// Horizontal grid topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridTopology {
    /// 2D coordinate arrays, one (lon, lat) pair per cell
    Curvilinear,
    /// Separable 1D axes, expanded to the full node set
    Rectangular,
    /// Scattered nodes, no (j, i) structure
    Unstructured,
}

/// A classified horizontal grid with flattened node coordinates.
///
/// Immutable once constructed (apart from the one-shot attachment of layer
/// counts during configuration). `nj == 0` denotes an unstructured grid, in
/// which case `ni` is the total number of nodes.
#[derive(Debug, Clone)]
pub struct GridDescriptor {
    /// Topology tag
    pub topology: GridTopology,
    /// Fastest-varying horizontal extent (or node count when unstructured)
    pub ni: usize,
    /// Slow horizontal extent; 0 for unstructured grids
    pub nj: usize,
    /// Node longitudes in degrees, flattened row-major
    pub lon: Vec<f64>,
    /// Node latitudes in degrees, flattened row-major
    pub lat: Vec<f64>,
    /// Optional per-column valid-layer counts, same length as `lon`/`lat`
    pub layer_counts: Option<Vec<i32>>,
}

impl GridDescriptor {
    /// Total number of horizontal nodes.
    pub fn npoints(&self) -> usize {
        if self.nj == 0 {
            self.ni
        } else {
            self.ni * self.nj
        }
    }

    /// Classify and build the source grid from its coordinate arrays and the
    /// shape of the field being regridded.
    ///
    /// Classification, in order:
    /// - both arrays 2D with shape equal to the field's trailing two
    ///   dimensions: curvilinear;
    /// - both arrays 1D with lengths equal to the field's last and
    ///   second-to-last dimensions: rectangular (outer-product expansion);
    /// - both arrays 1D of equal length equal to the field's last dimension:
    ///   unstructured;
    /// - anything else fails.
    pub fn from_coords(lon: &ArrayD<f64>, lat: &ArrayD<f64>, field_shape: &[usize]) -> Result<Self> {
        if field_shape.is_empty() {
            return Err(RegridError::config("field has no dimensions"));
        }
        let last = field_shape[field_shape.len() - 1];
        let second_last = if field_shape.len() >= 2 {
            Some(field_shape[field_shape.len() - 2])
        } else {
            None
        };

        if lon.ndim() == 2 && lat.ndim() == 2 {
            let shape = lon.shape();
            if lat.shape() != shape {
                return Err(RegridError::config(
                    "2D lon and lat coordinate arrays have different shapes",
                ));
            }
            if Some(shape[0]) != second_last || shape[1] != last {
                return Err(RegridError::config(
                    "coordinate dimensions do not match field dimensions",
                ));
            }
            let (nj, ni) = (shape[0], shape[1]);
            return Ok(Self {
                topology: GridTopology::Curvilinear,
                ni,
                nj,
                lon: lon.iter().copied().collect(),
                lat: lat.iter().copied().collect(),
                layer_counts: None,
            });
        }

        if lon.ndim() == 1 && lat.ndim() == 1 {
            let (nx, ny) = (lon.len(), lat.len());
            if nx == last && Some(ny) == second_last {
                let lon_axis: Vec<f64> = lon.iter().copied().collect();
                let lat_axis: Vec<f64> = lat.iter().copied().collect();
                let (lon, lat) = expand_axes(&lon_axis, &lat_axis);
                return Ok(Self {
                    topology: GridTopology::Rectangular,
                    ni: nx,
                    nj: ny,
                    lon,
                    lat,
                    layer_counts: None,
                });
            }
            if nx == ny && nx == last {
                return Ok(Self {
                    topology: GridTopology::Unstructured,
                    ni: nx,
                    nj: 0,
                    lon: lon.iter().copied().collect(),
                    lat: lat.iter().copied().collect(),
                    layer_counts: None,
                });
            }
            return Err(RegridError::config(
                "coordinate dimensions do not match field dimensions",
            ));
        }

        Err(RegridError::config(
            "coordinate dimensions do not match field dimensions",
        ))
    }

    /// Classify and build the destination grid.
    ///
    /// The destination carries no field to match against, so classification
    /// follows the coordinate rank and the source topology: 2D coordinates
    /// are curvilinear; 1D coordinates are unstructured if and only if the
    /// source is unstructured (lengths must then agree), otherwise a
    /// rectangular pair of axes.
    pub fn for_destination(
        lon: &ArrayD<f64>,
        lat: &ArrayD<f64>,
        source_topology: GridTopology,
    ) -> Result<Self> {
        if lon.ndim() == 2 && lat.ndim() == 2 {
            let shape = lon.shape();
            if lat.shape() != shape {
                return Err(RegridError::config(
                    "2D lon and lat coordinate arrays have different shapes",
                ));
            }
            let (nj, ni) = (shape[0], shape[1]);
            return Ok(Self {
                topology: GridTopology::Curvilinear,
                ni,
                nj,
                lon: lon.iter().copied().collect(),
                lat: lat.iter().copied().collect(),
                layer_counts: None,
            });
        }

        if lon.ndim() == 1 && lat.ndim() == 1 {
            if source_topology == GridTopology::Unstructured {
                if lon.len() != lat.len() {
                    return Err(RegridError::config(
                        "source grid is unstructured; destination lon and lat have different lengths",
                    ));
                }
                return Ok(Self {
                    topology: GridTopology::Unstructured,
                    ni: lon.len(),
                    nj: 0,
                    lon: lon.iter().copied().collect(),
                    lat: lat.iter().copied().collect(),
                    layer_counts: None,
                });
            }
            let lon_axis: Vec<f64> = lon.iter().copied().collect();
            let lat_axis: Vec<f64> = lat.iter().copied().collect();
            let (ni, nj) = (lon_axis.len(), lat_axis.len());
            let (lon, lat) = expand_axes(&lon_axis, &lat_axis);
            return Ok(Self {
                topology: GridTopology::Rectangular,
                ni,
                nj,
                lon,
                lat,
                layer_counts: None,
            });
        }

        Err(RegridError::config(
            "destination coordinates must both be 1D or both be 2D",
        ))
    }

    /// Attach a per-column valid-layer count array read alongside the grid.
    ///
    /// The array shape must be `(nj, ni)` for structured grids or `(ni,)`
    /// for unstructured ones. A purely binary (0/1) array carries land-mask
    /// semantics and is normalized by replacing every 1 with `nk` ("fully
    /// valid column"). Entries must end up in `[0, nk]`.
    pub fn attach_layer_counts(&mut self, counts: &ArrayD<i32>, nk: usize) -> Result<()> {
        let shape_ok = if self.nj > 0 {
            counts.ndim() == 2 && counts.shape() == [self.nj, self.ni]
        } else {
            counts.ndim() == 1 && counts.len() == self.ni
        };
        if !shape_ok {
            return Err(RegridError::config(format!(
                "valid-layer-count array shape {:?} does not match grid dimensions (ni = {}, nj = {})",
                counts.shape(),
                self.ni,
                self.nj
            )));
        }

        let mut counts: Vec<i32> = counts.iter().copied().collect();
        let binary = counts.iter().all(|&c| c == 0 || c == 1);
        if binary {
            for c in counts.iter_mut() {
                if *c == 1 {
                    *c = nk as i32;
                }
            }
        }
        if let Some(&bad) = counts.iter().find(|&&c| c < 0 || c > nk as i32) {
            return Err(RegridError::config(format!(
                "valid-layer count {} outside [0, {}]",
                bad, nk
            )));
        }

        self.layer_counts = Some(counts);
        Ok(())
    }
}

/// Expand separable 1D axes to a full row-major node set.
fn expand_axes(lon_axis: &[f64], lat_axis: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let (ni, nj) = (lon_axis.len(), lat_axis.len());
    let mut lon = Vec::with_capacity(ni * nj);
    let mut lat = Vec::with_capacity(ni * nj);
    for &y in lat_axis {
        for &x in lon_axis {
            lon.push(x);
            lat.push(y);
        }
    }
    (lon, lat)
}
