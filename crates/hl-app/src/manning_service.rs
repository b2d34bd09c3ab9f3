//! Manning zone resolution, including the land-cover sidecar fallback.

use std::collections::BTreeMap;
use std::path::Path;

use hl_catalog::CatalogHandle;
use hl_core::{CancelToken, CoreError, ErrorKind, Real};
use hl_manning::{
    BaseEntry, BaseTable, CalibrationOverride, CalibrationOverrides, ManningError, ManningResolution,
    RoughnessArray, UNASSIGNED, landcover_sidecars, read_cell_roughness, read_landcover_roughness,
    resolve, zones_from_cell_values,
};
use hl_mesh::MeshGeometry;
use hl_mesh::layout as mesh_layout;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::pipeline::{Pipeline, invalid};
use crate::progress::{PipelineStage, Progress};
use crate::request::{ManningRequest, ZoneDefinition};

const GEOMETRY_GROUP: &str = "/Geometry";

impl Pipeline {
    pub(crate) fn manning(
        &self,
        req: &ManningRequest,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<ManningResolution> {
        let handle = self.open(&req.path, cancel, progress)?;
        let mesh = self.mesh(&handle, req.mesh_name.as_deref(), cancel, progress)?;
        progress.stage(PipelineStage::ResolvingManning);
        let range = self.config().manning_range;

        let (assignment, base_table) = match &req.zones {
            Some(zones) => (zones.assignment.clone(), base_table(&zones.base_table)?),
            None => {
                let values = self.cell_roughness(&handle, &req.path, &mesh, cancel, progress)?;
                let derived = zones_from_cell_values(&values, range)?;
                if derived.rejected_cells > 0 {
                    warn!(cells = derived.rejected_cells, "cells with implausible roughness left unassigned");
                }
                (derived.assignment, derived.base_table)
            }
        };
        let overrides = calibration_overrides(&req.calibration, &base_table)?;
        let resolution = resolve(&mesh, &assignment, &base_table, overrides.as_ref(), range)?;
        info!(
            mesh = %mesh.name,
            zones = resolution.zones.len(),
            unresolved = resolution.unresolved.len(),
            "manning zones resolved"
        );
        Ok(resolution)
    }

    /// Per-cell roughness from the model, else from the first land-cover
    /// sidecar that yields an array.
    fn cell_roughness(
        &self,
        handle: &CatalogHandle,
        model_path: &Path,
        mesh: &MeshGeometry,
        cancel: &CancelToken,
        progress: &mut Progress<'_>,
    ) -> AppResult<Vec<Real>> {
        let range = self.config().manning_range;
        // Per-area arrays only identify a single area unambiguously.
        let area = match mesh.areas.as_slice() {
            [only] => Some(only.name.as_str()),
            _ => None,
        };
        let not_found = match read_cell_roughness(handle, area, range, cancel) {
            Ok(found) => return fit_to_mesh(found, handle, mesh),
            Err(e @ ManningError::NoRoughnessData { .. }) => e,
            Err(e) => return Err(e.into()),
        };

        let attrs = handle
            .catalog()
            .get(GEOMETRY_GROUP)
            .map(|n| n.attributes.clone())
            .unwrap_or_default();
        for sidecar in landcover_sidecars(model_path, &attrs) {
            cancel.check()?;
            let side = match self.open(&sidecar, cancel, progress) {
                Ok(h) => h,
                Err(e) if e.kind() == ErrorKind::Cancelled => return Err(e),
                Err(e) => {
                    warn!(path = %sidecar.display(), error = %e, "land-cover sidecar not readable");
                    continue;
                }
            };
            match read_landcover_roughness(&side, range, cancel) {
                Ok(found) => {
                    info!(path = %sidecar.display(), dataset = %found.path, "roughness taken from land-cover sidecar");
                    return fit_to_mesh(found, handle, mesh);
                }
                Err(e) if e.kind() == ErrorKind::Cancelled => return Err(e.into()),
                Err(e) => warn!(path = %sidecar.display(), error = %e, "land-cover sidecar has no roughness"),
            }
        }
        Err(not_found.into())
    }
}

/// Keep one value per real mesh cell.
///
/// Arrays are accepted at the real cell count or at the stored row count
/// of the cell centres, where each area's rows past its real cells are
/// virtual boundary cells. Any other length is an error.
fn fit_to_mesh(found: RoughnessArray, handle: &CatalogHandle, mesh: &MeshGeometry) -> AppResult<Vec<Real>> {
    let values = found.values;
    if values.len() == mesh.cell_count {
        return Ok(values);
    }
    let stored = mesh
        .areas
        .iter()
        .map(|span| {
            let centers = mesh_layout::area_dataset(&span.name, mesh_layout::CELL_CENTERS);
            let rows = handle.dataset(&centers)?.shape.first().copied().unwrap_or(0);
            Ok(rows.max(span.cell_count))
        })
        .collect::<AppResult<Vec<usize>>>()?;
    let stored_total: usize = stored.iter().sum();
    if values.len() != stored_total {
        return Err(CoreError::LengthMismatch {
            what: format!("roughness values in {}", found.path),
            expected: mesh.cell_count,
            actual: values.len(),
        }
        .into());
    }

    let mut out = Vec::with_capacity(mesh.cell_count);
    let mut offset = 0;
    for (span, rows) in mesh.areas.iter().zip(&stored) {
        out.extend_from_slice(&values[offset..offset + span.cell_count]);
        offset += rows;
    }
    debug!(
        path = %found.path,
        dropped = stored_total - mesh.cell_count,
        "virtual cell roughness dropped"
    );
    Ok(out)
}

fn base_table(defs: &[ZoneDefinition]) -> AppResult<BaseTable> {
    let mut table = BaseTable::new();
    for def in defs {
        if def.id == UNASSIGNED {
            return Err(invalid(format!("zone id {UNASSIGNED} is reserved for unassigned cells")));
        }
        if table.insert(def.id, BaseEntry::new(def.name.clone(), def.value)).is_some() {
            return Err(invalid(format!("zone {} defined twice", def.id)));
        }
    }
    Ok(table)
}

/// Map overrides keyed by zone id or zone name onto zone ids.
///
/// Names match case-insensitively and must pick out exactly one zone; a
/// zone addressed by two keys is rejected.
fn calibration_overrides(
    by_key: &BTreeMap<String, CalibrationOverride>,
    table: &BaseTable,
) -> AppResult<Option<CalibrationOverrides>> {
    if by_key.is_empty() {
        return Ok(None);
    }
    let mut out = CalibrationOverrides::new();
    for (key, ov) in by_key {
        let name = key.trim();
        let id = match name.parse::<u32>() {
            Ok(id) => id,
            Err(_) => {
                let matches: Vec<u32> = table
                    .iter()
                    .filter(|(_, entry)| entry.name.eq_ignore_ascii_case(name))
                    .map(|(id, _)| *id)
                    .collect();
                match matches.as_slice() {
                    [id] => *id,
                    [] => return Err(invalid(format!("no zone named '{key}' to calibrate"))),
                    many => {
                        return Err(invalid(format!(
                            "zone name '{key}' is ambiguous, it matches zones {many:?}"
                        )));
                    }
                }
            }
        };
        if out.insert(id, *ov).is_some() {
            return Err(invalid(format!("zone {id} is calibrated twice")));
        }
    }
    Ok(Some(out))
}
