//! Per-cell values onto a regular grid.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use hl_core::{BoundingBox, CancelToken, Point2, Real};
use hl_mesh::{CellHit, CellLocator, MeshGeometry};
use hl_terrain::{GeoTransform, write_geotiff};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::job::{ExportJob, ExportSelection, TargetKind};
use crate::writer::write_atomic;

pub const DEFAULT_NODATA: Real = -9999.0;
const MAX_SUPERSAMPLE: u32 = 16;
const MAX_PIXELS: usize = 100_000_000;

/// How pixels pick up cell values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RasterPolicy {
    /// The pixel takes the value of the cell containing its centre.
    #[default]
    PixelCenter,
    /// Mean over `factor x factor` sub-pixel samples, approximating area
    /// weighting where cells straddle pixels.
    Supersample { factor: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterSpec {
    pub resolution: Real,
    #[serde(default)]
    pub policy: RasterPolicy,
    #[serde(default = "default_nodata")]
    pub nodata: Real,
}

fn default_nodata() -> Real {
    DEFAULT_NODATA
}

impl RasterSpec {
    pub fn new(resolution: Real) -> Self {
        Self {
            resolution,
            policy: RasterPolicy::PixelCenter,
            nodata: DEFAULT_NODATA,
        }
    }

    pub fn with_policy(mut self, policy: RasterPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    /// Row-major, north row first.
    pub data: Vec<Real>,
    pub nodata: Real,
    /// Cells no sample fell into.
    pub unassigned_cells: usize,
}

impl RasterGrid {
    pub fn get(&self, col: usize, row: usize) -> Option<Real> {
        let v = *self.data.get(row * self.width + col)?;
        (v != self.nodata).then_some(v)
    }
}

/// Extent to rasterize: facepoints when the mesh has polygons, otherwise
/// cell centres padded by half the largest cell size.
fn extent(mesh: &MeshGeometry) -> BoundingBox {
    mesh.topology
        .as_ref()
        .and_then(|t| BoundingBox::from_points(&t.facepoints))
        .unwrap_or_else(|| mesh.bounding_box.expanded(mesh.cell_size.max / 2.0))
}

/// Cell under `p`. Without topology a nearest centre only counts within
/// half a cell diagonal (`sqrt(area / 2)`).
fn cell_at(locator: &CellLocator<'_>, mesh: &MeshGeometry, p: Point2) -> Option<usize> {
    match locator.locate(p)? {
        CellHit::Inside(cell) => Some(cell),
        CellHit::Nearest { cell, distance } if mesh.topology.is_none() => {
            let reach = (mesh.cell_areas[cell] / 2.0).sqrt();
            (distance <= reach + 1e-9).then_some(cell)
        }
        CellHit::Nearest { .. } => None,
    }
}

pub fn rasterize(
    mesh: &MeshGeometry,
    values: &[Real],
    spec: &RasterSpec,
    cancel: &CancelToken,
) -> ExportResult<RasterGrid> {
    if values.len() != mesh.cell_count {
        return Err(ExportError::FieldLength {
            field: "raster values".to_string(),
            expected: mesh.cell_count,
            actual: values.len(),
        });
    }
    let res = spec.resolution;
    if !(res > 0.0 && res.is_finite()) {
        return Err(ExportError::InvalidRequest(format!("raster resolution {res}")));
    }
    let factor: usize = match spec.policy {
        RasterPolicy::PixelCenter => 1,
        RasterPolicy::Supersample { factor } if (1..=MAX_SUPERSAMPLE).contains(&factor) => factor as usize,
        RasterPolicy::Supersample { factor } => {
            return Err(ExportError::InvalidRequest(format!(
                "supersample factor {factor} outside 1..={MAX_SUPERSAMPLE}"
            )));
        }
    };

    let bounds = extent(mesh);
    let width = ((bounds.width() / res).ceil() as usize).max(1);
    let height = ((bounds.height() / res).ceil() as usize).max(1);
    if width.saturating_mul(height) > MAX_PIXELS {
        return Err(ExportError::InvalidRequest(format!(
            "{width}x{height} raster exceeds {MAX_PIXELS} pixels"
        )));
    }
    let transform = GeoTransform::new(bounds.min_x, bounds.max_y, res, -res);
    let locator = CellLocator::new(mesh);

    let rows: Vec<Option<(Vec<Real>, Vec<usize>)>> = (0..height)
        .into_par_iter()
        .map(|row| {
            if cancel.is_cancelled() {
                return None;
            }
            let mut out = Vec::with_capacity(width);
            let mut touched = Vec::new();
            for col in 0..width {
                let mut sum = 0.0;
                let mut n = 0usize;
                for sy in 0..factor {
                    for sx in 0..factor {
                        let u = col as Real + (sx as Real + 0.5) / factor as Real;
                        let v = row as Real + (sy as Real + 0.5) / factor as Real;
                        let Some(cell) = cell_at(&locator, mesh, transform.pixel_to_world(u, v)) else {
                            continue;
                        };
                        touched.push(cell);
                        let value = values[cell];
                        if value.is_finite() {
                            sum += value;
                            n += 1;
                        }
                    }
                }
                out.push(if n > 0 { sum / n as Real } else { spec.nodata });
            }
            Some((out, touched))
        })
        .collect();
    cancel.check()?;

    let mut data = Vec::with_capacity(width * height);
    let mut hit = vec![false; mesh.cell_count];
    for (row_values, touched) in rows.into_iter().flatten() {
        data.extend(row_values);
        for cell in touched {
            hit[cell] = true;
        }
    }
    let unassigned_cells = hit.iter().filter(|h| !**h).count();
    if unassigned_cells > 0 {
        warn!(unassigned_cells, resolution = res, "cells smaller than the raster resolution received no pixel");
    }
    debug!(width, height, factor, "mesh rasterized");
    Ok(RasterGrid {
        width,
        height,
        transform,
        data,
        nodata: spec.nodata,
        unassigned_cells,
    })
}

fn write_ascii_grid(path: &Path, grid: &RasterGrid) -> ExportResult<()> {
    let file = File::create(path).map_err(ExportError::io(path))?;
    let mut w = BufWriter::new(file);
    let t = &grid.transform;
    let yll = t.origin_y + grid.height as Real * t.pixel_height;
    let header = format!(
        "ncols {}\nnrows {}\nxllcorner {}\nyllcorner {}\ncellsize {}\nNODATA_value {}\n",
        grid.width, grid.height, t.origin_x, yll, t.pixel_width, grid.nodata
    );
    w.write_all(header.as_bytes()).map_err(ExportError::io(path))?;
    for row in grid.data.chunks(grid.width) {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(w, "{}", line.join(" ")).map_err(ExportError::io(path))?;
    }
    w.flush().map_err(ExportError::io(path))
}

/// Rasterize `values` and write an ESRI ASCII grid (`.asc`) or float
/// GeoTIFF (`.tif`/`.tiff`), chosen by the output extension.
pub fn export_raster(
    mesh: &MeshGeometry,
    field: &str,
    values: &[Real],
    spec: &RasterSpec,
    output: &Path,
    cancel: &CancelToken,
) -> ExportResult<ExportJob> {
    let selection = ExportSelection {
        variables: vec![field.to_string()],
        ..ExportSelection::default()
    };
    ExportJob::new(TargetKind::Raster, selection, output).run(|job| {
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !matches!(ext.as_str(), "asc" | "tif" | "tiff") {
            return Err(ExportError::UnsupportedTarget {
                path: output.to_path_buf(),
                reason: "rasters are written as .asc, .tif or .tiff".to_string(),
            });
        }
        let grid = rasterize(mesh, values, spec, cancel)?;
        job.unassigned_cells = Some(grid.unassigned_cells);
        write_atomic(output, cancel, |tmp| {
            if ext == "asc" {
                write_ascii_grid(tmp, &grid)
            } else {
                write_geotiff(tmp, grid.width, grid.height, &grid.transform, &grid.data, Some(grid.nodata))
                    .map_err(ExportError::from)
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_mesh::MeshTopology;

    /// Two 10 x 10 squares side by side.
    fn two_squares() -> MeshGeometry {
        let topo = MeshTopology {
            facepoints: vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(20.0, 0.0),
                Point2::new(20.0, 10.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            cell_offsets: vec![0, 4, 8],
            cell_nodes: vec![0, 1, 4, 5, 1, 2, 3, 4],
        };
        MeshGeometry::from_cells(
            "squares",
            vec![Point2::new(5.0, 5.0), Point2::new(15.0, 5.0)],
            vec![100.0, 100.0],
        )
        .unwrap()
        .with_topology(topo)
        .unwrap()
    }

    #[test]
    fn pixel_center_assignment() {
        let mesh = two_squares();
        let grid = rasterize(&mesh, &[1.0, 2.0], &RasterSpec::new(5.0), &CancelToken::new()).unwrap();
        assert_eq!((grid.width, grid.height), (4, 2));
        assert_eq!(grid.get(0, 0), Some(1.0));
        assert_eq!(grid.get(1, 1), Some(1.0));
        assert_eq!(grid.get(2, 0), Some(2.0));
        assert_eq!(grid.get(3, 1), Some(2.0));
        assert_eq!(grid.unassigned_cells, 0);
    }

    #[test]
    fn coarse_pixels_report_missed_cells() {
        let mesh = two_squares();
        // One 40 m pixel: its centre (20, -10) lies outside both squares.
        let grid = rasterize(&mesh, &[1.0, 2.0], &RasterSpec::new(40.0), &CancelToken::new()).unwrap();
        assert_eq!((grid.width, grid.height), (1, 1));
        assert_eq!(grid.get(0, 0), None);
        assert_eq!(grid.unassigned_cells, 2);
    }

    #[test]
    fn supersampling_averages_straddled_cells() {
        let mesh = two_squares();
        let spec = RasterSpec::new(20.0).with_policy(RasterPolicy::Supersample { factor: 2 });
        let grid = rasterize(&mesh, &[1.0, 3.0], &spec, &CancelToken::new()).unwrap();
        assert_eq!((grid.width, grid.height), (1, 1));
        // Sub-samples at y = 5 hit both cells; those at y = -5 miss.
        assert_eq!(grid.get(0, 0), Some(2.0));
        assert_eq!(grid.unassigned_cells, 0);
    }

    #[test]
    fn wrong_length_and_bad_policy() {
        let mesh = two_squares();
        let cancel = CancelToken::new();
        let err = rasterize(&mesh, &[1.0], &RasterSpec::new(5.0), &cancel).unwrap_err();
        assert_eq!(err.kind(), hl_core::ErrorKind::ComputationError);
        let spec = RasterSpec::new(5.0).with_policy(RasterPolicy::Supersample { factor: 0 });
        assert!(rasterize(&mesh, &[1.0, 2.0], &spec, &cancel).is_err());
    }
}
