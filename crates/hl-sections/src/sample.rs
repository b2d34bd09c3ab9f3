//! Where section sample values come from.

use hl_core::{Point2, Real, ensure_same_len};
use hl_mesh::{CellLocator, MeshGeometry};
use hl_terrain::TerrainRaster;
use serde::{Deserialize, Serialize};

use crate::error::SectionResult;

/// Values observed at one planar point. Missing values stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointSample {
    pub elevation: Option<Real>,
    pub depth: Option<Real>,
    pub velocity: Option<Real>,
}

/// Provider of elevation and hydraulic values at arbitrary points.
pub trait SampleSource: Sync {
    fn sample(&self, p: Point2) -> PointSample;
}

impl<F> SampleSource for F
where
    F: Fn(Point2) -> PointSample + Sync,
{
    fn sample(&self, p: Point2) -> PointSample {
        self(p)
    }
}

/// Optional per-cell arrays, each parallel to the mesh cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellFields<'a> {
    pub elevation: Option<&'a [Real]>,
    pub depth: Option<&'a [Real]>,
    pub velocity: Option<&'a [Real]>,
}

/// Samples the cell containing (or nearest to) each point.
#[derive(Debug)]
pub struct MeshSampler<'a> {
    locator: CellLocator<'a>,
    elevation: Option<&'a [Real]>,
    depth: Option<&'a [Real]>,
    velocity: Option<&'a [Real]>,
}

impl<'a> MeshSampler<'a> {
    /// Elevation falls back to the mesh's stored cell minimum elevations.
    pub fn new(mesh: &'a MeshGeometry, fields: CellFields<'a>) -> SectionResult<Self> {
        let elevation = fields.elevation.or(mesh.min_elevations.as_deref());
        for (what, values) in [
            ("cell elevation", elevation),
            ("cell depth", fields.depth),
            ("cell velocity", fields.velocity),
        ] {
            if let Some(values) = values {
                ensure_same_len(what, mesh.cell_count, values.len())?;
            }
        }
        Ok(Self {
            locator: CellLocator::new(mesh),
            elevation,
            depth: fields.depth,
            velocity: fields.velocity,
        })
    }
}

impl SampleSource for MeshSampler<'_> {
    fn sample(&self, p: Point2) -> PointSample {
        let Some(hit) = self.locator.locate(p) else {
            return PointSample::default();
        };
        let cell = hit.cell();
        let pick = |values: Option<&[Real]>| values.and_then(|v| v.get(cell).copied());
        PointSample {
            elevation: pick(self.elevation),
            depth: pick(self.depth),
            velocity: pick(self.velocity),
        }
    }
}

/// Elevation from a terrain raster; depth and velocity from mesh cells when
/// available.
#[derive(Debug)]
pub struct TerrainSampler<'a> {
    terrain: &'a TerrainRaster,
    cells: Option<MeshSampler<'a>>,
}

impl<'a> TerrainSampler<'a> {
    pub fn new(terrain: &'a TerrainRaster, cells: Option<MeshSampler<'a>>) -> Self {
        Self { terrain, cells }
    }
}

impl SampleSource for TerrainSampler<'_> {
    fn sample(&self, p: Point2) -> PointSample {
        let from_cells = self
            .cells
            .as_ref()
            .map(|c| c.sample(p))
            .unwrap_or_default();
        PointSample {
            elevation: self.terrain.sample_bilinear(p),
            ..from_cells
        }
    }
}
