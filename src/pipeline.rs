//! End-to-end regrid pipeline.
//!
//! Orchestrates one run: load and classify both grids, project them onto
//! the stereographic planes, optionally transfer the source valid-layer
//! counts, then interpolate the field layer by layer into a temporary
//! destination file which is renamed over the final path only after every
//! layer has been written. A failed run never leaves a partial destination
//! behind.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{RegridError, Result};
use crate::fill::FillState;
use crate::grid::GridDescriptor;
use crate::layer::{LayerInterpolator, LayerOptions};
use crate::logging::{log_layer_stats, log_operation_end, log_operation_start};
use crate::mask::transfer_layer_counts;
use crate::ncio::{self, FieldLayout};
use crate::projection::ProjectedGrid;

/// A configured regrid run.
pub struct RegridPipeline {
    config: Config,
}

impl RegridPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Execute the run.
    pub fn run(&self) -> Result<()> {
        let start = Instant::now();
        log_operation_start(
            "regrid",
            &format!(
                "{} -> {} ({})",
                self.config.input.display(),
                self.config.output.display(),
                self.config.varname
            ),
        );
        let result = self.run_inner();
        log_operation_end("regrid", start, result.is_ok());
        result
    }

    fn run_inner(&self) -> Result<()> {
        let varname = &self.config.varname;
        let src_file = ncio::open(&self.config.input)?;
        let field_shape = ncio::field_shape(&src_file, varname)?;

        // Source grid, classified against the field's shape.
        let grid_in_file = ncio::open(&self.config.grid_in.path)?;
        let lon = ncio::read_coord(&grid_in_file, &self.config.grid_in.lon)?;
        let lat = ncio::read_coord(&grid_in_file, &self.config.grid_in.lat)?;
        let mut src_grid = GridDescriptor::from_coords(&lon, &lat, &field_shape)?;

        let layout = ncio::inspect_field(&src_file, varname, &src_grid)?;
        let nk = layout.nk;
        info!(
            topology = ?src_grid.topology,
            ni = src_grid.ni,
            nj = src_grid.nj,
            nk,
            "source grid"
        );

        if let Some(name) = &self.config.grid_in.layer_counts {
            let counts = ncio::read_int_field(&grid_in_file, name)?;
            src_grid.attach_layer_counts(&counts, nk)?;
        }

        // Destination grid.
        let grid_out_file = ncio::open(&self.config.grid_out.path)?;
        let lon = ncio::read_coord(&grid_out_file, &self.config.grid_out.lon)?;
        let lat = ncio::read_coord(&grid_out_file, &self.config.grid_out.lat)?;
        let mut dst_grid = GridDescriptor::for_destination(&lon, &lat, src_grid.topology)?;
        if (src_grid.nj == 0) != (dst_grid.nj == 0) {
            return Err(RegridError::config(
                "cannot regrid an unstructured source onto a structured destination grid",
            ));
        }
        info!(
            topology = ?dst_grid.topology,
            ni = dst_grid.ni,
            nj = dst_grid.nj,
            "destination grid"
        );

        if let Some(name) = &self.config.grid_out.layer_counts {
            let counts = ncio::read_int_field(&grid_out_file, name)?;
            dst_grid.attach_layer_counts(&counts, nk)?;
        }

        let src_proj = ProjectedGrid::project(&src_grid);
        let dst_proj = ProjectedGrid::project(&dst_grid);
        let opts = LayerOptions {
            skip_first_last: self.config.skip_first_last,
            pole_merge_radius: self.config.pole_merge_radius,
        };

        if self.config.transfer_mask {
            let counts = match &src_grid.layer_counts {
                Some(c) => c.clone(),
                None => {
                    return Err(RegridError::config(
                        "mask transfer requested but the source grid carries no valid-layer counts",
                    ))
                }
            };
            let transferred = {
                let interp =
                    LayerInterpolator::new(&src_grid, &src_proj, &dst_grid, &dst_proj, opts);
                transfer_layer_counts(&interp, &counts, nk)
            };
            dst_grid.layer_counts = Some(transferred);
        }

        // All layers go to a temporary file first.
        let tmp_path = tmp_path_for(&self.config.output);
        let command: String = std::env::args().collect::<Vec<_>>().join(" ");
        let mut dst_file = ncio::create_destination(
            &src_file,
            varname,
            &tmp_path,
            &dst_grid,
            &layout,
            self.config.deflate,
            &command,
        )?;

        let interp = LayerInterpolator::new(&src_grid, &src_proj, &dst_grid, &dst_proj, opts);
        let outcome = interpolate_layers(
            &src_file,
            varname,
            &layout,
            &interp,
            &self.config,
            &mut |k, values| ncio::write_layer(&mut dst_file, varname, &layout, &dst_grid, k, values),
        );

        drop(dst_file);
        // The final name is only touched once every layer is on disk; any
        // failure up to and including the rename removes the temporary file.
        let outcome = outcome.and_then(|filled_total| {
            std::fs::rename(&tmp_path, &self.config.output)?;
            Ok(filled_total)
        });
        match outcome {
            Ok(filled_total) => {
                info!(
                    path = %self.config.output.display(),
                    filled_total,
                    "destination file complete"
                );
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&tmp_path) {
                    warn!(
                        path = %tmp_path.display(),
                        error = %rm,
                        "failed to remove temporary file"
                    );
                }
                Err(e)
            }
        }
    }
}

/// Read and interpolate every vertical layer, handing each finished layer
/// to `sink`. Returns the total number of destination cells that received
/// a fill value across all layers.
fn interpolate_layers(
    src_file: &netcdf::File,
    varname: &str,
    layout: &FieldLayout,
    interp: &LayerInterpolator<'_>,
    config: &Config,
    sink: &mut dyn FnMut(usize, &[f32]) -> Result<()>,
) -> Result<usize> {
    let nk = layout.nk;
    let mut fill = FillState::new(config.fill, interp.dst_npoints(), nk);
    let mut out = vec![0.0f32; interp.dst_npoints()];
    let mut filled_total = 0usize;

    for k in 0..nk {
        let src_layer = ncio::read_layer(src_file, varname, layout, k)?;
        let stats = interp.interpolate_layer(k, &src_layer, &mut fill, &mut out);
        log_layer_stats(k, &stats);
        filled_total += stats.filled;
        sink(k, &out)?;
    }
    Ok(filled_total)
}

/// Temporary path the destination is assembled at before the final rename.
fn tmp_path_for(output: &Path) -> PathBuf {
    let mut os = output.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
