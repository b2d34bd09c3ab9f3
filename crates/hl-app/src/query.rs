//! Read-only requests: catalog listings, mesh geometry and time series.

use std::path::Path;

use hl_catalog::{
    CatalogHandle, CatalogNode, ContainerSummary, FileInfo, HydraulicDatasets, Selection,
    classify_hydraulic_datasets, file_info, summarize,
};
use hl_core::{CancelToken, CoreError, Real};
use hl_mesh::MeshGeometry;
use hl_series::layout as series_layout;
use hl_series::{BoundaryCondition, Hydrograph, SeriesSource, TimeSeries, extract_series, list_boundary_conditions, to_hydrograph};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppResult;
use crate::pipeline::{Pipeline, invalid};
use crate::progress::{PipelineStage, Progress};
use crate::request::{DEFAULT_DEPTH_VARIABLE, HydrographRequest, SeriesRequest};

/// Payload of a `summary` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub file: FileInfo,
    pub format: String,
    pub node_count: usize,
    pub summary: ContainerSummary,
    pub hydraulic_datasets: HydraulicDatasets,
}

impl Pipeline {
    pub(crate) fn file_info(&self, path: &Path) -> AppResult<FileInfo> {
        Ok(file_info(path)?)
    }

    pub(crate) fn structure(
        &self,
        path: &Path,
        group: Option<&str>,
        recursive: bool,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<Vec<CatalogNode>> {
        let handle = self.open(path, cancel, progress)?;
        progress.stage(PipelineStage::ReadingCatalog);
        let group = group.unwrap_or("/");
        let nodes = if recursive {
            handle.catalog().descendants(group)?.into_iter().cloned().collect()
        } else {
            handle.list(group)?.to_vec()
        };
        Ok(nodes)
    }

    pub(crate) fn summary(
        &self,
        path: &Path,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<ModelSummary> {
        let file = file_info(path)?;
        let handle = self.open(path, cancel, progress)?;
        progress.stage(PipelineStage::ReadingCatalog);
        let catalog = handle.catalog();
        Ok(ModelSummary {
            file,
            format: handle.format_name().to_string(),
            node_count: catalog.len(),
            summary: summarize(catalog),
            hydraulic_datasets: classify_hydraulic_datasets(catalog),
        })
    }

    pub(crate) fn mesh(
        &self,
        handle: &CatalogHandle,
        mesh_name: Option<&str>,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<MeshGeometry> {
        progress.emit(PipelineStage::ExtractingMesh, mesh_name.map(str::to_string));
        Ok(hl_mesh::extract(handle, mesh_name, cancel)?)
    }

    pub(crate) fn time_series(
        &self,
        req: &SeriesRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<TimeSeries> {
        let handle = self.open(&req.path, cancel, progress)?;
        read_series(&handle, &req.source, req.variable.as_deref(), cancel, progress)
    }

    pub(crate) fn hydrograph(
        &self,
        req: &HydrographRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<Hydrograph> {
        let handle = self.open(&req.path, cancel, progress)?;
        let series = read_series(&handle, &req.source, req.variable.as_deref(), cancel, progress)?;
        let policy = req.base_flow.unwrap_or(self.config().base_flow_policy);
        Ok(to_hydrograph(&series, policy)?)
    }

    pub(crate) fn boundary_conditions(
        &self,
        path: &Path,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<Vec<BoundaryCondition>> {
        let handle = self.open(path, cancel, progress)?;
        progress.stage(PipelineStage::ReadingCatalog);
        Ok(list_boundary_conditions(&handle))
    }
}

fn read_series(
    handle: &CatalogHandle,
    source: &str,
    variable: Option<&str>,
    cancel: &CancelToken,
    progress: &mut Progress<'_>,
) -> AppResult<TimeSeries> {
    progress.emit(PipelineStage::ExtractingSeries, Some(source.to_string()));
    // Cell columns need a variable to locate the result array.
    let variable = match (variable, source.parse::<SeriesSource>()) {
        (Some(v), _) => v,
        (None, Ok(SeriesSource::Cell { .. })) => DEFAULT_DEPTH_VARIABLE,
        (None, _) => "",
    };
    Ok(extract_series(handle, source, variable, cancel)?)
}

/// `[time, cell]` result array of `variable` for one flow area.
fn result_shape(handle: &CatalogHandle, area: &str, variable: &str) -> AppResult<(String, usize, usize)> {
    let path = series_layout::cell_results(area, variable);
    let node = handle.dataset(&path)?;
    match node.shape.as_slice() {
        [steps, cells] => Ok((path, *steps, *cells)),
        other => Err(invalid(format!("{path} has shape {other:?}, expected [time, cell]"))),
    }
}

/// Values of `variable` at one result step for every mesh cell, area by
/// area. `None` selects the last stored step.
pub(crate) fn cell_step(
    handle: &CatalogHandle,
    mesh: &MeshGeometry,
    variable: &str,
    step: Option<usize>,
    cancel: &CancelToken,
) -> AppResult<Vec<Real>> {
    let mut out = Vec::with_capacity(mesh.cell_count);
    for span in &mesh.areas {
        cancel.check()?;
        let (path, steps, cells) = result_shape(handle, &span.name, variable)?;
        ensure_cells(&path, span.cell_count, cells)?;
        let t = match step {
            Some(t) if t < steps => t,
            Some(t) => return Err(invalid(format!("{path} has {steps} steps, step {t} requested"))),
            None => steps
                .checked_sub(1)
                .ok_or_else(|| invalid(format!("{path} has no stored steps")))?,
        };
        let block = Selection::Block {
            rows: t..t + 1,
            cols: 0..span.cell_count,
        };
        out.extend(handle.read_array(&path, Some(&block))?.data);
    }
    debug!(variable, cells = out.len(), "cell values read");
    Ok(out)
}

/// Steps of `variable` over all mesh cells, indexed by step: `steps[t][cell]`.
///
/// An empty `requested` reads every stored step in bulk chunks. Otherwise
/// only the requested rows are read and the other steps stay empty.
pub(crate) fn cell_steps(
    handle: &CatalogHandle,
    mesh: &MeshGeometry,
    variable: &str,
    requested: &[usize],
    chunk_rows: usize,
    cancel: &CancelToken,
) -> AppResult<Vec<Vec<Real>>> {
    let mut steps: Vec<Vec<Real>> = Vec::new();
    for (i, span) in mesh.areas.iter().enumerate() {
        let (path, n_steps, cells) = result_shape(handle, &span.name, variable)?;
        ensure_cells(&path, span.cell_count, cells)?;
        if i == 0 {
            steps = vec![Vec::new(); n_steps];
        } else if n_steps != steps.len() {
            return Err(invalid(format!(
                "{path} has {n_steps} steps, other areas have {}",
                steps.len()
            )));
        }

        if requested.is_empty() {
            let block = handle
                .chunks(&path, chunk_rows, cancel)?
                .columns(0..span.cell_count)
                .collect_all()?;
            for (t, row) in steps.iter_mut().enumerate() {
                let values = block.row(t).ok_or_else(|| invalid(format!("{path} is missing step {t}")))?;
                row.extend_from_slice(values);
            }
            continue;
        }

        let filled: usize = mesh.areas[..i].iter().map(|a| a.cell_count).sum();
        for &t in requested {
            cancel.check()?;
            let row = steps
                .get_mut(t)
                .ok_or_else(|| invalid(format!("{path} has {n_steps} steps, step {t} requested")))?;
            // Repeated step numbers are read once.
            if row.len() > filled {
                continue;
            }
            let block = Selection::Block {
                rows: t..t + 1,
                cols: 0..span.cell_count,
            };
            row.extend(handle.read_array(&path, Some(&block))?.data);
        }
    }
    debug!(variable, steps = requested.len(), "cell steps read");
    Ok(steps)
}

/// Result time axis, when stored.
pub(crate) fn result_times(handle: &CatalogHandle) -> AppResult<Option<Vec<Real>>> {
    let path = format!("{}/{}", series_layout::UNSTEADY_TIME_SERIES, series_layout::TIME);
    if !handle.exists(&path) {
        return Ok(None);
    }
    Ok(Some(handle.read_array(&path, None)?.data))
}

fn ensure_cells(path: &str, expected: usize, stored: usize) -> AppResult<()> {
    if stored < expected {
        return Err(CoreError::LengthMismatch {
            what: format!("cells in {path}"),
            expected,
            actual: stored,
        }
        .into());
    }
    Ok(())
}
