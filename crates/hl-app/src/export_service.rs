//! Export requests: read what the artifact needs, then hand it to hl-export.

use hl_core::CancelToken;
use hl_export::{
    ExportJob, MeshField, RasterSpec, TabularData, TabularFormat, export_mesh_field, export_raster,
    export_sections_geojson, export_tabular,
};

use crate::error::AppResult;
use crate::pipeline::{Pipeline, invalid};
use crate::progress::{PipelineStage, Progress};
use crate::query::{cell_step, cell_steps, result_times};
use crate::request::{
    MeshFieldExportRequest, RasterExportRequest, Request, SectionsGeoJsonRequest, TabularExportRequest,
};

impl Pipeline {
    pub(crate) fn export_mesh_field(
        &self,
        req: &MeshFieldExportRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<ExportJob> {
        if req.variables.is_empty() {
            return Err(invalid("no variables to export"));
        }
        let handle = self.open(&req.path, cancel, progress)?;
        let mesh = self.mesh(&handle, req.mesh_name.as_deref(), cancel, progress)?;
        let fields = req
            .variables
            .iter()
            .map(|v| {
                let steps = cell_steps(
                    &handle,
                    &mesh,
                    v,
                    &req.time_steps,
                    self.config().chunk_rows,
                    cancel,
                )?;
                Ok(MeshField::new(v.clone(), steps))
            })
            .collect::<AppResult<Vec<_>>>()?;
        let times = result_times(&handle)?;

        progress.emit(PipelineStage::Exporting, Some(req.output.display().to_string()));
        Ok(export_mesh_field(
            &mesh,
            &fields,
            &req.time_steps,
            times.as_deref(),
            &req.output,
            cancel,
        )?)
    }

    pub(crate) fn export_raster(
        &self,
        req: &RasterExportRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<ExportJob> {
        let handle = self.open(&req.path, cancel, progress)?;
        let mesh = self.mesh(&handle, req.mesh_name.as_deref(), cancel, progress)?;
        let values = cell_step(&handle, &mesh, &req.variable, req.time_step, cancel)?;
        let spec = RasterSpec {
            resolution: req.resolution,
            policy: req.policy.unwrap_or(self.config().raster_policy),
            nodata: self.config().raster_nodata,
        };

        progress.emit(PipelineStage::Exporting, Some(req.output.display().to_string()));
        Ok(export_raster(&mesh, &req.variable, &values, &spec, &req.output, cancel)?)
    }

    pub(crate) fn export_tabular(
        &self,
        req: &TabularExportRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<ExportJob> {
        let format = match req.format {
            Some(f) => f,
            None => TabularFormat::from_path(&req.output)
                .ok_or_else(|| invalid(format!("cannot tell table format of {}", req.output.display())))?,
        };
        let data = match req.request.as_ref() {
            Request::TimeSeries(r) => TabularData::TimeSeries(self.time_series(r, cancel, progress)?),
            Request::Hydrograph(r) => TabularData::Hydrograph(self.hydrograph(r, cancel, progress)?),
            Request::CrossSections(r) => TabularData::CrossSections(self.cross_sections(r, cancel, progress)?),
            Request::Manning(r) => TabularData::ManningZones(self.manning(r, cancel, progress)?.zones),
            other => {
                return Err(invalid(format!("'{}' results cannot be written as a table", other.op())));
            }
        };

        progress.emit(PipelineStage::Exporting, Some(req.output.display().to_string()));
        Ok(export_tabular(&data, format, &req.output, cancel)?)
    }

    pub(crate) fn export_sections_geojson(
        &self,
        req: &SectionsGeoJsonRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<ExportJob> {
        let (sections, mesh_crs) = self.sections_with_crs(&req.sections, cancel, progress)?;
        let crs = req.crs.clone().or(mesh_crs);

        progress.emit(PipelineStage::Exporting, Some(req.output.display().to_string()));
        Ok(export_sections_geojson(
            &req.sections.alignment,
            &sections,
            crs.as_deref(),
            &req.output,
            cancel,
        )?)
    }
}
