//! Build [`MeshGeometry`] from a catalogued container.

use hl_catalog::{ArrayChunk, CatalogHandle, DEFAULT_CHUNK_ROWS};
use hl_core::{BoundingBox, CancelToken, CoreError, Point2, Real, ensure_same_len, signed_polygon_area};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::layout;
use crate::model::{AreaSource, AreaSpan, CellSizeStats, MeshGeometry, MeshTopology};

/// Name given to a mesh built from every flow area.
pub const ALL_AREAS: &str = "all";

/// Flow areas that carry cell centres, in catalog order.
pub fn list_flow_areas(handle: &CatalogHandle) -> MeshResult<Vec<String>> {
    let groups = match handle.list(layout::FLOW_AREAS) {
        Ok(nodes) => nodes,
        Err(_) => return Ok(Vec::new()),
    };
    Ok(groups
        .iter()
        .filter(|n| n.is_group())
        .filter(|n| handle.exists(&layout::area_dataset(n.name(), layout::CELL_CENTERS)))
        .map(|n| n.name().to_string())
        .collect())
}

/// Extract the named flow area, or every area concatenated when `mesh_name`
/// is `None`.
pub fn extract(
    handle: &CatalogHandle,
    mesh_name: Option<&str>,
    cancel: &CancelToken,
) -> MeshResult<MeshGeometry> {
    let available = list_flow_areas(handle)?;
    if available.is_empty() {
        return Err(MeshError::NoFlowAreas);
    }
    let selected: Vec<String> = match mesh_name {
        Some(name) => {
            if !available.iter().any(|a| a == name) {
                return Err(MeshError::AreaNotFound {
                    name: name.to_string(),
                    available,
                });
            }
            vec![name.to_string()]
        }
        None => available,
    };

    let mut parts = Vec::with_capacity(selected.len());
    for area in &selected {
        cancel.check()?;
        parts.push(read_area(handle, area, cancel)?);
    }

    let name = match mesh_name {
        Some(n) => n.to_string(),
        None if parts.len() == 1 => parts[0].name.clone(),
        None => ALL_AREAS.to_string(),
    };
    let coordinate_system = handle
        .attr_text("/", layout::PROJECTION_ATTRS)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let mesh = assemble(name, coordinate_system, parts)?;
    info!(
        mesh = %mesh.name,
        cells = mesh.cell_count,
        nodes = mesh.node_count,
        "mesh extracted"
    );
    Ok(mesh)
}

struct AreaPart {
    name: String,
    centers: Vec<Point2>,
    areas: Vec<Real>,
    area_source: AreaSource,
    min_elevations: Option<Vec<Real>>,
    topology: Option<MeshTopology>,
}

fn read_chunked(handle: &CatalogHandle, path: &str, cancel: &CancelToken) -> MeshResult<ArrayChunk> {
    Ok(handle.chunks(path, DEFAULT_CHUNK_ROWS, cancel)?.collect_all()?)
}

fn read_points(handle: &CatalogHandle, path: &str, cancel: &CancelToken) -> MeshResult<Vec<Point2>> {
    let chunk = read_chunked(handle, path, cancel)?;
    let points = chunk.to_points().ok_or_else(|| MeshError::BadShape {
        path: path.to_string(),
        expected: "[n, 2]",
        actual: chunk.shape.clone(),
    })?;
    if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
        return Err(CoreError::NonFinite {
            what: "coordinate",
            value: if bad.x.is_finite() { bad.y } else { bad.x },
        }
        .into());
    }
    Ok(points)
}

fn read_area(handle: &CatalogHandle, area: &str, cancel: &CancelToken) -> MeshResult<AreaPart> {
    let centers_path = layout::area_dataset(area, layout::CELL_CENTERS);
    let mut centers = read_points(handle, &centers_path, cancel)?;

    // Rows past `Cell Count` are virtual boundary cells.
    let declared = handle
        .describe(&layout::area_group(area))?
        .attr(layout::CELL_COUNT_ATTR)
        .and_then(|v| v.as_f64())
        .map(|v| v as usize)
        .filter(|&c| c > 0 && c <= centers.len());
    let n = declared.unwrap_or(centers.len());
    centers.truncate(n);
    if n == 0 {
        return Err(MeshError::BadShape {
            path: centers_path,
            expected: "[n > 0, 2]",
            actual: vec![0, 2],
        });
    }

    let topology = read_topology(handle, area, n, cancel)?;

    let stored_path = layout::area_dataset(area, layout::CELL_AREAS);
    let (areas, area_source) = if handle.exists(&stored_path) {
        let mut values = read_chunked(handle, &stored_path, cancel)?.data;
        if values.len() < n {
            ensure_same_len(&stored_path, n, values.len())?;
        }
        values.truncate(n);
        if let Some((cell, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(MeshError::DegenerateCell {
                area: area.to_string(),
                cell,
                reason: format!("stored area {v}"),
            });
        }
        (values, AreaSource::Stored)
    } else if let Some(topo) = &topology {
        (shoelace_areas(area, topo)?, AreaSource::Shoelace)
    } else {
        return Err(MeshError::DatasetMissing {
            area: area.to_string(),
            dataset: layout::CELL_AREAS.to_string(),
        });
    };

    let elev_path = layout::area_dataset(area, layout::CELL_MIN_ELEVATION);
    let min_elevations = if handle.exists(&elev_path) {
        let mut values = read_chunked(handle, &elev_path, cancel)?.data;
        ensure_same_len(&elev_path, n, values.len().min(n))?;
        values.truncate(n);
        Some(values)
    } else {
        None
    };

    debug!(area, cells = n, source = ?area_source, "flow area read");
    Ok(AreaPart {
        name: area.to_string(),
        centers,
        areas,
        area_source,
        min_elevations,
        topology,
    })
}

fn read_topology(
    handle: &CatalogHandle,
    area: &str,
    n_cells: usize,
    cancel: &CancelToken,
) -> MeshResult<Option<MeshTopology>> {
    let fp_path = layout::area_dataset(area, layout::FACEPOINTS);
    let idx_path = layout::area_dataset(area, layout::CELL_FACEPOINTS);
    if !handle.exists(&fp_path) || !handle.exists(&idx_path) {
        return Ok(None);
    }

    let facepoints = read_points(handle, &fp_path, cancel)?;
    let indexes = read_chunked(handle, &idx_path, cancel)?;
    if indexes.shape.len() != 2 || indexes.rows() < n_cells {
        return Err(MeshError::BadShape {
            path: idx_path,
            expected: "[cells, k]",
            actual: indexes.shape,
        });
    }

    let mut cell_offsets = Vec::with_capacity(n_cells + 1);
    let mut cell_nodes = Vec::new();
    cell_offsets.push(0);
    for cell in 0..n_cells {
        let row = indexes.row(cell).unwrap_or(&[]);
        let start = cell_nodes.len();
        for &raw in row.iter().filter(|v| **v >= 0.0) {
            let id = raw as usize;
            if id >= facepoints.len() {
                return Err(MeshError::DegenerateCell {
                    area: area.to_string(),
                    cell,
                    reason: format!("facepoint {id} out of range 0..{}", facepoints.len()),
                });
            }
            cell_nodes.push(id as u32);
        }
        if cell_nodes.len() - start < 3 {
            return Err(MeshError::DegenerateCell {
                area: area.to_string(),
                cell,
                reason: format!("{} facepoints", cell_nodes.len() - start),
            });
        }
        cell_offsets.push(cell_nodes.len());
    }

    Ok(Some(MeshTopology {
        facepoints,
        cell_offsets,
        cell_nodes,
    }))
}

fn shoelace_areas(area: &str, topo: &MeshTopology) -> MeshResult<Vec<Real>> {
    let areas: Vec<Real> = (0..topo.cell_count())
        .into_par_iter()
        .map(|cell| signed_polygon_area(&topo.cell_polygon(cell)).abs())
        .collect();
    if let Some((cell, a)) = areas
        .iter()
        .enumerate()
        .find(|(_, a)| !a.is_finite() || **a <= 0.0)
    {
        return Err(MeshError::DegenerateCell {
            area: area.to_string(),
            cell,
            reason: format!("polygon area {a}"),
        });
    }
    Ok(areas)
}

fn assemble(name: String, coordinate_system: String, parts: Vec<AreaPart>) -> MeshResult<MeshGeometry> {
    let all_topology = parts.iter().all(|p| p.topology.is_some());
    let all_elevations = parts.iter().all(|p| p.min_elevations.is_some());
    if !all_topology && parts.iter().any(|p| p.topology.is_some()) {
        warn!("some flow areas lack topology; combined mesh has none");
    }
    let area_source = if parts.iter().all(|p| p.area_source == AreaSource::Stored) {
        AreaSource::Stored
    } else {
        AreaSource::Shoelace
    };

    let mut spans = Vec::with_capacity(parts.len());
    let mut centers = Vec::new();
    let mut areas = Vec::new();
    let mut elevations = Vec::new();
    let mut facepoints = Vec::new();
    let mut cell_offsets = vec![0];
    let mut cell_nodes = Vec::new();

    for part in parts {
        spans.push(AreaSpan {
            name: part.name,
            first_cell: centers.len(),
            cell_count: part.centers.len(),
        });
        centers.extend(part.centers);
        areas.extend(part.areas);
        if let Some(e) = part.min_elevations {
            elevations.extend(e);
        }
        if let (true, Some(topo)) = (all_topology, part.topology) {
            let base = facepoints.len() as u32;
            let node_base = cell_nodes.len();
            facepoints.extend(topo.facepoints);
            cell_nodes.extend(topo.cell_nodes.iter().map(|n| n + base));
            cell_offsets.extend(topo.cell_offsets.iter().skip(1).map(|o| o + node_base));
        }
    }

    ensure_same_len("cell areas", centers.len(), areas.len())?;
    let bounding_box = BoundingBox::from_points(&centers).ok_or(MeshError::NoFlowAreas)?;
    let topology = all_topology.then_some(MeshTopology {
        facepoints,
        cell_offsets,
        cell_nodes,
    });

    Ok(MeshGeometry {
        name,
        areas: spans,
        cell_count: centers.len(),
        node_count: topology.as_ref().map_or(0, |t| t.facepoints.len()),
        cell_size: CellSizeStats::from_areas(&areas),
        cell_centers: centers,
        cell_areas: areas,
        bounding_box,
        coordinate_system,
        area_source,
        min_elevations: all_elevations.then_some(elevations),
        topology,
    })
}
