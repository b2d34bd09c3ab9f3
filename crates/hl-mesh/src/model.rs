//! Mesh geometry data model.

use hl_core::{BoundingBox, CellId, CoreError, Point2, Real, ensure_same_len};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// Where per-cell areas came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaSource {
    /// Read from the container's stored area dataset.
    Stored,
    /// Computed from topology with the shoelace formula.
    Shoelace,
}

/// Cell-size statistics; size is `sqrt(area)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellSizeStats {
    pub avg: Real,
    pub min: Real,
    pub max: Real,
}

impl CellSizeStats {
    pub fn from_areas(areas: &[Real]) -> Self {
        if areas.is_empty() {
            return Self::default();
        }
        let mut min = Real::INFINITY;
        let mut max = Real::NEG_INFINITY;
        let mut sum = 0.0;
        for a in areas {
            let size = a.max(0.0).sqrt();
            min = min.min(size);
            max = max.max(size);
            sum += size;
        }
        Self {
            avg: sum / areas.len() as Real,
            min,
            max,
        }
    }
}

/// Contiguous range of cells belonging to one flow area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSpan {
    pub name: String,
    pub first_cell: usize,
    pub cell_count: usize,
}

/// Polygon topology in compressed-row form.
///
/// Cell `i` uses facepoints `cell_nodes[cell_offsets[i]..cell_offsets[i + 1]]`,
/// ordered as stored (HEC-RAS stores them counter-clockwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshTopology {
    pub facepoints: Vec<Point2>,
    pub cell_offsets: Vec<usize>,
    pub cell_nodes: Vec<u32>,
}

impl MeshTopology {
    pub fn cell_count(&self) -> usize {
        self.cell_offsets.len().saturating_sub(1)
    }

    pub fn cell_node_ids(&self, cell: usize) -> &[u32] {
        match (self.cell_offsets.get(cell), self.cell_offsets.get(cell + 1)) {
            (Some(&a), Some(&b)) => &self.cell_nodes[a..b],
            _ => &[],
        }
    }

    pub fn cell_polygon(&self, cell: usize) -> Vec<Point2> {
        self.cell_node_ids(cell)
            .iter()
            .filter_map(|&n| self.facepoints.get(n as usize).copied())
            .collect()
    }
}

/// Unstructured 2D mesh of one flow area (or several, concatenated).
///
/// `cell_centers`, `cell_areas` and `min_elevations` are parallel: index `i`
/// always refers to the same cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshGeometry {
    pub name: String,
    pub areas: Vec<AreaSpan>,
    pub cell_count: usize,
    pub node_count: usize,
    pub cell_centers: Vec<Point2>,
    pub cell_areas: Vec<Real>,
    pub bounding_box: BoundingBox,
    pub coordinate_system: String,
    pub cell_size: CellSizeStats,
    pub area_source: AreaSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_elevations: Option<Vec<Real>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<MeshTopology>,
}

impl MeshGeometry {
    /// Mesh without topology from parallel centre and area arrays.
    pub fn from_cells(name: impl Into<String>, centers: Vec<Point2>, areas: Vec<Real>) -> MeshResult<Self> {
        ensure_same_len("cell areas", centers.len(), areas.len())?;
        if let Some(bad) = areas.iter().find(|a| !a.is_finite() || **a < 0.0) {
            return Err(CoreError::Degenerate {
                what: format!("cell area {bad}"),
            }
            .into());
        }
        let bounding_box = BoundingBox::from_points(&centers).ok_or(MeshError::NoFlowAreas)?;
        let name = name.into();
        Ok(Self {
            areas: vec![AreaSpan {
                name: name.clone(),
                first_cell: 0,
                cell_count: centers.len(),
            }],
            name,
            cell_count: centers.len(),
            node_count: 0,
            cell_size: CellSizeStats::from_areas(&areas),
            cell_centers: centers,
            cell_areas: areas,
            bounding_box,
            coordinate_system: "unknown".to_string(),
            area_source: AreaSource::Stored,
            min_elevations: None,
            topology: None,
        })
    }

    /// Attach polygon topology; its cell count must match.
    pub fn with_topology(mut self, topology: MeshTopology) -> MeshResult<Self> {
        ensure_same_len("topology cells", self.cell_count, topology.cell_count())?;
        self.node_count = topology.facepoints.len();
        self.topology = Some(topology);
        Ok(self)
    }

    pub fn with_min_elevations(mut self, elevations: Vec<Real>) -> MeshResult<Self> {
        ensure_same_len("minimum elevations", self.cell_count, elevations.len())?;
        self.min_elevations = Some(elevations);
        Ok(self)
    }

    pub fn total_area(&self) -> Real {
        self.cell_areas.iter().sum()
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cell_count).filter_map(CellId::from_usize)
    }

    /// Span of the named area within the concatenated cell arrays.
    pub fn area(&self, name: &str) -> Option<&AreaSpan> {
        self.areas.iter().find(|a| a.name == name)
    }

    pub fn cell_polygon(&self, cell: usize) -> Option<Vec<Point2>> {
        self.topology.as_ref().map(|t| t.cell_polygon(cell))
    }

    pub fn summary(&self) -> MeshSummary {
        MeshSummary {
            name: self.name.clone(),
            areas: self.areas.clone(),
            cell_count: self.cell_count,
            node_count: self.node_count,
            bounding_box: self.bounding_box,
            coordinate_system: self.coordinate_system.clone(),
            cell_size: self.cell_size,
            total_area: self.total_area(),
            area_source: self.area_source,
            has_topology: self.topology.is_some(),
        }
    }
}

/// Mesh facts without per-cell arrays, for listing and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshSummary {
    pub name: String,
    pub areas: Vec<AreaSpan>,
    pub cell_count: usize,
    pub node_count: usize,
    pub bounding_box: BoundingBox,
    pub coordinate_system: String,
    pub cell_size: CellSizeStats,
    pub total_area: Real,
    pub area_source: AreaSource,
    pub has_topology: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_sqrt_area() {
        let s = CellSizeStats::from_areas(&[4.0, 16.0, 100.0]);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 10.0);
        assert!((s.avg - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn topology_rows() {
        let t = MeshTopology {
            facepoints: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            cell_offsets: vec![0, 3, 6],
            cell_nodes: vec![0, 1, 2, 0, 2, 3],
        };
        assert_eq!(t.cell_count(), 2);
        assert_eq!(t.cell_node_ids(1), &[0, 2, 3]);
        assert_eq!(t.cell_polygon(0)[1], Point2::new(1.0, 0.0));
        assert!(t.cell_node_ids(5).is_empty());
    }
}
