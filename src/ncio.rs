//! NetCDF data access for the regrid pipeline.
//!
//! The engine only ever addresses one vertical slice at a time: coordinates
//! and valid-layer counts are read whole (they are 2D at most), field data
//! moves through `read_layer`/`write_layer` hyperslabs. Source samples are
//! unpacked on read: values matching `_FillValue` or `missing_value` (or
//! violating `valid_min`/`valid_max`/`valid_range`) become NaN, then
//! `scale_factor` and `add_offset` are applied. The destination variable is written unpacked
//! as f32 with NaN as its fill value.

use ndarray::{ArrayD, IxDyn};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{RegridError, Result};
use crate::grid::GridDescriptor;

/// Attributes describing packing/validity of the source variable; they must
/// not be copied onto the unpacked destination variable.
const PACKING_ATTRIBUTES: &[&str] = &[
    "_FillValue",
    "missing_value",
    "scale_factor",
    "add_offset",
    "valid_min",
    "valid_max",
    "valid_range",
];

/// Open a NetCDF file for reading.
pub fn open(path: &Path) -> Result<netcdf::File> {
    if !path.exists() {
        return Err(RegridError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    let file = netcdf::open(path)?;
    debug!("Opened NetCDF file: {}", path.display());
    Ok(file)
}

/// Read a coordinate variable as a dynamic-dimensional f64 array.
pub fn read_coord(file: &netcdf::File, name: &str) -> Result<ArrayD<f64>> {
    let var = file.variable(name).ok_or_else(|| {
        RegridError::config(format!("coordinate variable \"{}\" not found", name))
    })?;
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let values: Vec<f64> = var.get_values::<f64, _>(&[] as &[netcdf::Extent])?;
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| {
        RegridError::config(format!("coordinate variable \"{}\": {}", name, e))
    })
}

/// Read an integer field (the valid-layer-count variable).
pub fn read_int_field(file: &netcdf::File, name: &str) -> Result<ArrayD<i32>> {
    let var = file.variable(name).ok_or_else(|| {
        RegridError::config(format!("variable \"{}\" not found", name))
    })?;
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let values: Vec<i32> = var.get_values::<i32, _>(&[] as &[netcdf::Extent])?;
    ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| RegridError::config(format!("variable \"{}\": {}", name, e)))
}

/// The raw dimension lengths of a variable, outermost first.
pub fn field_shape(file: &netcdf::File, varname: &str) -> Result<Vec<usize>> {
    let var = file.variable(varname).ok_or_else(|| {
        RegridError::config(format!("variable \"{}\" not found", varname))
    })?;
    Ok(var.dimensions().iter().map(|d| d.len()).collect())
}

/// Resolved layout of the field variable against its horizontal grid.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    /// Dimension names, outermost first
    pub dims: Vec<String>,
    /// Dimension lengths in the source file
    pub sizes: Vec<usize>,
    /// Whether the outermost dimension is the record dimension
    pub has_record: bool,
    /// Index of the vertical dimension, if any
    pub vertical_dim: Option<usize>,
    /// Vertical extent; 1 when the field has no vertical dimension
    pub nk: usize,
}

impl FieldLayout {
    /// Number of horizontal (trailing) dimensions.
    fn horizontal_ndims(&self) -> usize {
        self.dims.len() - self.leading_ndims()
    }

    fn leading_ndims(&self) -> usize {
        usize::from(self.has_record) + usize::from(self.vertical_dim.is_some())
    }

    /// Dimension lengths for the destination file: horizontal sizes come
    /// from the destination grid, the record dimension collapses to 1.
    pub fn destination_sizes(&self, dst: &GridDescriptor) -> Vec<usize> {
        let n = self.dims.len();
        let mut sizes = self.sizes.clone();
        if self.has_record {
            sizes[0] = 1;
        }
        sizes[n - 1] = dst.ni;
        if self.horizontal_ndims() == 2 {
            sizes[n - 2] = dst.nj;
        }
        sizes
    }
}

/// Resolve the field variable's layout against the source grid: the
/// trailing dimensions must match the grid's horizontal extents, an
/// optional vertical dimension supplies `nk`, and an optional leading
/// record dimension must have length 1.
pub fn inspect_field(
    file: &netcdf::File,
    varname: &str,
    grid: &GridDescriptor,
) -> Result<FieldLayout> {
    let var = file.variable(varname).ok_or_else(|| {
        RegridError::config(format!("variable \"{}\" not found", varname))
    })?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let sizes: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let unlimited: Vec<bool> = var.dimensions().iter().map(|d| d.is_unlimited()).collect();
    let n = dims.len();

    let horizontal = if grid.nj > 0 { 2 } else { 1 };
    if n < horizontal {
        return Err(RegridError::config(format!(
            "variable \"{}\" has {} dimensions, expected at least {}",
            varname, n, horizontal
        )));
    }
    if sizes[n - 1] != grid.ni || (horizontal == 2 && sizes[n - 2] != grid.nj) {
        return Err(RegridError::config(format!(
            "horizontal dimensions of variable \"{}\" do not match grid dimensions (ni = {}, nj = {})",
            varname, grid.ni, grid.nj
        )));
    }

    let mut has_record = false;
    let mut vertical_dim = None;
    let mut nk = 1usize;
    for d in 0..n - horizontal {
        if unlimited[d] {
            if d != 0 || has_record {
                return Err(RegridError::config(format!(
                    "variable \"{}\": record dimension must be outermost",
                    varname
                )));
            }
            if sizes[d] != 1 {
                return Err(RegridError::config(format!(
                    "variable \"{}\": can not handle more than one record yet",
                    varname
                )));
            }
            has_record = true;
        } else if vertical_dim.is_none() {
            vertical_dim = Some(d);
            nk = sizes[d];
        } else {
            return Err(RegridError::config(format!(
                "variable \"{}\": too many non-horizontal dimensions",
                varname
            )));
        }
    }

    Ok(FieldLayout {
        dims,
        sizes,
        has_record,
        vertical_dim,
        nk,
    })
}

/// Hyperslab extents addressing vertical slice `k` of a variable with the
/// given dimension lengths.
fn layer_extents(layout: &FieldLayout, sizes: &[usize], k: usize) -> Vec<netcdf::Extent> {
    sizes
        .iter()
        .enumerate()
        .map(|(d, &len)| {
            if layout.vertical_dim == Some(d) {
                (k..k + 1).into()
            } else {
                (0..len).into()
            }
        })
        .collect()
}

/// Numeric scalar attribute of a variable, if present.
fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    use netcdf::AttributeValue::*;

    let value = var.attribute(name)?.value().ok()?;
    match value {
        Uchar(v) => Some(v as f64),
        Schar(v) => Some(v as f64),
        Short(v) => Some(v as f64),
        Int(v) => Some(v as f64),
        Float(v) => Some(v as f64),
        Double(v) => Some(v),
        _ => None,
    }
}

/// Two-element numeric attribute of a variable, if present.
fn attr_f64_pair(var: &netcdf::Variable, name: &str) -> Option<(f64, f64)> {
    use netcdf::AttributeValue::*;

    let value = var.attribute(name)?.value().ok()?;
    match value {
        Uchars(v) if v.len() == 2 => Some((v[0] as f64, v[1] as f64)),
        Schars(v) if v.len() == 2 => Some((v[0] as f64, v[1] as f64)),
        Shorts(v) if v.len() == 2 => Some((v[0] as f64, v[1] as f64)),
        Ints(v) if v.len() == 2 => Some((v[0] as f64, v[1] as f64)),
        Floats(v) if v.len() == 2 => Some((v[0] as f64, v[1] as f64)),
        Doubles(v) if v.len() == 2 => Some((v[0], v[1])),
        _ => None,
    }
}

/// Read one vertical slice of the source variable, unpacked to f32 with
/// NaN marking invalid samples.
pub fn read_layer(
    file: &netcdf::File,
    varname: &str,
    layout: &FieldLayout,
    k: usize,
) -> Result<Vec<f32>> {
    let var = file.variable(varname).ok_or_else(|| {
        RegridError::config(format!("variable \"{}\" not found", varname))
    })?;

    let extents = layer_extents(layout, &layout.sizes, k);
    let mut values: Vec<f32> = var.get_values::<f32, _>(extents.as_slice())?;

    if let Some(fill) = attr_f64(&var, "_FillValue") {
        let fill = fill as f32;
        for v in values.iter_mut() {
            if *v == fill {
                *v = f32::NAN;
            }
        }
    }
    if let Some(missing) = attr_f64(&var, "missing_value") {
        let missing = missing as f32;
        for v in values.iter_mut() {
            if *v == missing {
                *v = f32::NAN;
            }
        }
    }
    if let Some(min) = attr_f64(&var, "valid_min") {
        let min = min as f32;
        for v in values.iter_mut() {
            if *v < min {
                *v = f32::NAN;
            }
        }
    }
    if let Some(max) = attr_f64(&var, "valid_max") {
        let max = max as f32;
        for v in values.iter_mut() {
            if *v > max {
                *v = f32::NAN;
            }
        }
    }
    if let Some((lo, hi)) = attr_f64_pair(&var, "valid_range") {
        let (lo, hi) = (lo as f32, hi as f32);
        for v in values.iter_mut() {
            if *v < lo || *v > hi {
                *v = f32::NAN;
            }
        }
    }

    let scale = attr_f64(&var, "scale_factor");
    let offset = attr_f64(&var, "add_offset");
    if scale.is_some() || offset.is_some() {
        let scale = scale.unwrap_or(1.0) as f32;
        let offset = offset.unwrap_or(0.0) as f32;
        for v in values.iter_mut() {
            if v.is_finite() {
                *v = *v * scale + offset;
            }
        }
    }

    Ok(values)
}

/// Create the destination file (at its temporary path): global attributes
/// and the variable's non-packing attributes are copied from the source,
/// dimensions take the destination grid's horizontal sizes, and provenance
/// attributes record the command line and working directory.
pub fn create_destination(
    src: &netcdf::File,
    varname: &str,
    dst_path: &Path,
    dst_grid: &GridDescriptor,
    layout: &FieldLayout,
    deflate: u32,
    command: &str,
) -> Result<netcdf::FileMut> {
    let mut file = netcdf::create(dst_path)?;

    for attr in src.attributes() {
        file.add_attribute(attr.name(), attr.value()?)?;
    }
    file.add_attribute("regrid: command", command)?;
    if let Ok(cwd) = std::env::current_dir() {
        file.add_attribute("regrid: wdir", cwd.display().to_string())?;
    }

    let sizes = layout.destination_sizes(dst_grid);
    for (name, &len) in layout.dims.iter().zip(sizes.iter()) {
        file.add_dimension(name, len)?;
    }

    let dim_names: Vec<&str> = layout.dims.iter().map(|s| s.as_str()).collect();
    let mut var = file.add_variable::<f32>(varname, &dim_names)?;
    if deflate > 0 {
        var.set_compression(deflate as i32, true)?;
    }

    if let Some(src_var) = src.variable(varname) {
        for attr in src_var.attributes() {
            let name = attr.name();
            if PACKING_ATTRIBUTES.contains(&name) {
                continue;
            }
            var.put_attribute(name, attr.value()?)?;
        }
    }
    var.put_attribute("_FillValue", f32::NAN)?;

    info!(
        path = %dst_path.display(),
        dims = ?sizes,
        "created destination file"
    );
    Ok(file)
}

/// Write one vertical slice of the destination variable.
pub fn write_layer(
    file: &mut netcdf::FileMut,
    varname: &str,
    layout: &FieldLayout,
    dst_grid: &GridDescriptor,
    k: usize,
    values: &[f32],
) -> Result<()> {
    let sizes = layout.destination_sizes(dst_grid);
    let extents = layer_extents(layout, &sizes, k);
    let mut var = file.variable_mut(varname).ok_or_else(|| {
        RegridError::config(format!("variable \"{}\" not found in destination", varname))
    })?;
    var.put_values(values, extents.as_slice())?;
    Ok(())
}
