//! Test data generation utilities.
//!
//! Builders for small NetCDF files with known grids and data patterns,
//! used by the integration tests that drive the full pipeline.

use std::path::Path;

use netcdf::Error;
type Result<T> = std::result::Result<T, Error>;

/// The data pattern written into source fields. Strictly positive so a
/// zero in the output always means a fill value or a masked column.
pub fn sample_value(k: usize, j: usize, i: usize) -> f32 {
    1.0 + i as f32 + 10.0 * j as f32 + 100.0 * k as f32
}

/// Creates a source file holding a rectangular grid (1D `lon`/`lat`
/// coordinate variables) and a `temp(k, lat, lon)` field filled with
/// [`sample_value`].
pub fn create_rect_source(path: &Path, lon: &[f64], lat: &[f64], nk: usize) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("k", nk)?;
    file.add_dimension("lat", lat.len())?;
    file.add_dimension("lon", lon.len())?;
    file.add_attribute("title", "regrid test source")?;

    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(lon, &[..])?;
    }
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(lat, &[..])?;
    }

    let mut data = Vec::with_capacity(nk * lat.len() * lon.len());
    for k in 0..nk {
        for j in 0..lat.len() {
            for i in 0..lon.len() {
                data.push(sample_value(k, j, i));
            }
        }
    }
    {
        let mut var = file.add_variable::<f32>("temp", &["k", "lat", "lon"])?;
        var.put_attribute("units", "K")?;
        var.put_attribute("long_name", "test temperature")?;
        var.put_values(&data, &[.., .., ..])?;
    }

    Ok(())
}

/// Adds a `nlayers(lat, lon)` valid-layer-count variable to a source file
/// created by [`create_rect_source`]; `counts` is row-major `(lat, lon)`.
pub fn create_rect_source_with_counts(
    path: &Path,
    lon: &[f64],
    lat: &[f64],
    nk: usize,
    counts: &[i32],
) -> Result<()> {
    create_rect_source(path, lon, lat, nk)?;

    let mut file = netcdf::append(path)?;
    let mut var = file.add_variable::<i32>("nlayers", &["lat", "lon"])?;
    var.put_attribute("long_name", "number of valid layers")?;
    var.put_values(counts, &[.., ..])?;
    Ok(())
}

/// Creates a grid-only file: 1D `lon`/`lat` coordinate variables and
/// nothing else.
pub fn create_grid_file(path: &Path, lon: &[f64], lat: &[f64]) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_dimension("lat", lat.len())?;
    file.add_dimension("lon", lon.len())?;

    {
        let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(lon, &[..])?;
    }
    {
        let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(lat, &[..])?;
    }
    Ok(())
}

/// Reads a whole f32 variable from a file, flattened row-major.
pub fn read_var_f32(path: &Path, name: &str) -> Result<Vec<f32>> {
    let file = netcdf::open(path)?;
    let var = file
        .variable(name)
        .unwrap_or_else(|| panic!("variable {} missing from {}", name, path.display()));
    var.get_values::<f32, _>(&[] as &[netcdf::Extent])
}

/// Shape of a variable, outermost dimension first.
pub fn var_shape(path: &Path, name: &str) -> Result<Vec<usize>> {
    let file = netcdf::open(path)?;
    let var = file
        .variable(name)
        .unwrap_or_else(|| panic!("variable {} missing from {}", name, path.display()));
    Ok(var.dimensions().iter().map(|d| d.len()).collect())
}
