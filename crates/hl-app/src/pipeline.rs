//! Request dispatch over the stage crates.

use std::path::Path;

use hl_catalog::{CatalogHandle, HandleCache};
use hl_core::CancelToken;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::envelope::ResultEnvelope;
use crate::error::{AppError, AppResult};
use crate::progress::{PipelineStage, Progress, ProgressEvent};
use crate::request::Request;

/// Runs requests synchronously, one call per request. The only state kept
/// between calls is the handle cache.
#[derive(Debug, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    cache: HandleCache,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let cache = HandleCache::new().with_capacity(config.cache_capacity);
        Self::with_cache(config, cache)
    }

    /// Use a prepared cache, e.g. one with a custom opener.
    pub fn with_cache(config: PipelineConfig, cache: HandleCache) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &HandleCache {
        &self.cache
    }

    /// Run `request`; never fails, errors are folded into the envelope.
    pub fn dispatch(&self, request: &Request, cancel: &CancelToken) -> ResultEnvelope {
        self.dispatch_with_progress(request, cancel, None)
    }

    pub fn dispatch_with_progress(
        &self,
        request: &Request,
        cancel: &CancelToken,
        progress_cb: Option<&mut dyn FnMut(ProgressEvent)>,
    ) -> ResultEnvelope {
        let mut progress = Progress::new(request.op(), progress_cb);
        let result = self.execute(request, cancel, &mut progress);
        if result.is_ok() {
            progress.stage(PipelineStage::Completed);
            info!(op = request.op(), elapsed_s = progress.elapsed_s(), "request completed");
        }
        ResultEnvelope::from_result(result)
    }

    /// Run `request` and return its payload as JSON.
    pub fn execute_value(&self, request: &Request, cancel: &CancelToken) -> AppResult<Value> {
        let mut progress = Progress::new(request.op(), None);
        self.execute(request, cancel, &mut progress)
    }

    fn execute(&self, request: &Request, cancel: &CancelToken, progress: &mut Progress<'_>) -> AppResult<Value> {
        cancel.check()?;
        debug!(op = request.op(), "dispatching request");
        match request {
            Request::FileInfo { path } => encode(self.file_info(path)?),
            Request::Structure {
                path,
                group,
                recursive,
            } => encode(self.structure(path, group.as_deref(), *recursive, cancel, progress)?),
            Request::Summary { path } => encode(self.summary(path, cancel, progress)?),
            Request::Mesh { path, mesh_name } => {
                let handle = self.open(path, cancel, progress)?;
                encode(self.mesh(&handle, mesh_name.as_deref(), cancel, progress)?)
            }
            Request::Manning(req) => encode(self.manning(req, cancel, progress)?),
            Request::CrossSections(req) => encode(self.cross_sections(req, cancel, progress)?),
            Request::ChannelAnalysis(req) => encode(self.channel_analysis(req, cancel)?),
            Request::TimeSeries(req) => encode(self.time_series(req, cancel, progress)?),
            Request::Hydrograph(req) => encode(self.hydrograph(req, cancel, progress)?),
            Request::BoundaryConditions { path } => encode(self.boundary_conditions(path, cancel, progress)?),
            Request::ExportMeshField(req) => encode(self.export_mesh_field(req, cancel, progress)?),
            Request::ExportRaster(req) => encode(self.export_raster(req, cancel, progress)?),
            Request::ExportTabular(req) => encode(self.export_tabular(req, cancel, progress)?),
            Request::ExportSectionsGeoJson(req) => encode(self.export_sections_geojson(req, cancel, progress)?),
        }
    }

    /// Open (or reuse) the container at `path`.
    pub(crate) fn open(
        &self,
        path: &Path,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<CatalogHandle> {
        progress.emit(PipelineStage::OpeningContainer, Some(path.display().to_string()));
        let handle = if self.config.cache_handles {
            self.cache.get_or_open(path, cancel)?
        } else {
            self.cache.open_uncached(path, cancel)?
        };
        Ok(handle)
    }
}

fn encode<T: Serialize>(payload: T) -> AppResult<Value> {
    Ok(serde_json::to_value(payload)?)
}

pub(crate) fn invalid(reason: impl Into<String>) -> AppError {
    AppError::InvalidRequest(reason.into())
}
