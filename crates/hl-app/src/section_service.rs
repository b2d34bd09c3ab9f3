use hl_core::CancelToken;
use hl_sections::{CellFields, CrossSection, SectionParams, TerrainSampler, generate, generate_on_mesh};
use hl_terrain::{TerrainRaster, load_geotiff};
use tracing::info;

use crate::error::AppResult;
use crate::pipeline::{Pipeline, invalid};
use crate::progress::{PipelineStage, Progress};
use crate::query::cell_step;
use crate::request::{DEFAULT_DEPTH_VARIABLE, SectionRequest};

impl Pipeline {
    pub(crate) fn cross_sections(
        &self,
        req: &SectionRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<Vec<CrossSection>> {
        Ok(self.sections_with_crs(req, cancel, progress)?.0)
    }

    /// Sections plus the mesh coordinate system, when a model was read and
    /// names one.
    pub(crate) fn sections_with_crs(
        &self,
        req: &SectionRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<(Vec<CrossSection>, Option<String>)> {
        let mut params = SectionParams::new(req.spacing, req.width);
        params.intervals = req.intervals.unwrap_or(self.config().section_intervals);
        if let Some(step) = req.sample_step {
            params = params.with_sample_step(step);
        }

        let terrain: Option<TerrainRaster> = match &req.terrain {
            Some(path) => {
                progress.emit(PipelineStage::LoadingTerrain, Some(path.display().to_string()));
                Some(load_geotiff(path)?)
            }
            None => None,
        };

        let mut crs = None;
        let sections = match &req.path {
            Some(path) => {
                let handle = self.open(path, cancel, progress)?;
                let mesh = self.mesh(&handle, req.mesh_name.as_deref(), cancel, progress)?;
                if mesh.coordinate_system != "unknown" {
                    crs = Some(mesh.coordinate_system.clone());
                }
                let (depth, velocity) = match req.time_step {
                    Some(t) => {
                        let depth_variable = req.depth_variable.as_deref().unwrap_or(DEFAULT_DEPTH_VARIABLE);
                        let depth = cell_step(&handle, &mesh, depth_variable, Some(t), cancel)?;
                        let velocity = match &req.velocity_variable {
                            Some(v) => Some(cell_step(&handle, &mesh, v, Some(t), cancel)?),
                            None => None,
                        };
                        (Some(depth), velocity)
                    }
                    None => (None, None),
                };
                progress.stage(PipelineStage::GeneratingSections);
                let fields = CellFields {
                    elevation: None,
                    depth: depth.as_deref(),
                    velocity: velocity.as_deref(),
                };
                generate_on_mesh(&req.alignment, &params, &mesh, fields, terrain.as_ref(), cancel)?
            }
            None => {
                let raster = terrain
                    .as_ref()
                    .ok_or_else(|| invalid("cross-sections need a model path or a terrain raster"))?;
                progress.stage(PipelineStage::GeneratingSections);
                generate(&req.alignment, &params, &TerrainSampler::new(raster, None), cancel)?
            }
        };
        info!(sections = sections.len(), spacing = req.spacing, width = req.width, "cross-sections generated");
        Ok((sections, crs))
    }
}
