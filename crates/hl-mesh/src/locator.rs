//! Point-to-cell lookup.

use hl_core::{BoundingBox, Point2, Real, point_in_polygon};
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::model::MeshGeometry;

#[derive(Debug, Clone)]
struct CellEnvelope {
    cell: usize,
    min: [Real; 2],
    max: [Real; 2],
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[Real; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellCenter {
    cell: usize,
    at: [Real; 2],
}

impl RTreeObject for CellCenter {
    type Envelope = AABB<[Real; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.at)
    }
}

impl PointDistance for CellCenter {
    fn distance_2(&self, point: &[Real; 2]) -> Real {
        let dx = self.at[0] - point[0];
        let dy = self.at[1] - point[1];
        dx * dx + dy * dy
    }
}

/// How a point was matched to a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellHit {
    /// The point lies inside the cell polygon.
    Inside(usize),
    /// No polygon contains the point (or there is no topology); the cell
    /// with the nearest centre was taken.
    Nearest { cell: usize, distance: Real },
}

impl CellHit {
    pub fn cell(self) -> usize {
        match self {
            CellHit::Inside(c) => c,
            CellHit::Nearest { cell, .. } => cell,
        }
    }
}

/// Spatial index over the cells of one mesh.
///
/// Points farther than one maximum cell size outside the mesh bounding box
/// are reported as outside.
#[derive(Debug)]
pub struct CellLocator<'a> {
    mesh: &'a MeshGeometry,
    polygons: Option<RTree<CellEnvelope>>,
    centers: RTree<CellCenter>,
    reach: BoundingBox,
}

impl<'a> CellLocator<'a> {
    pub fn new(mesh: &'a MeshGeometry) -> Self {
        let polygons = mesh.topology.as_ref().map(|topo| {
            let envelopes = (0..topo.cell_count())
                .filter_map(|cell| {
                    let poly = topo.cell_polygon(cell);
                    BoundingBox::from_points(&poly).map(|b| CellEnvelope {
                        cell,
                        min: [b.min_x, b.min_y],
                        max: [b.max_x, b.max_y],
                    })
                })
                .collect();
            RTree::bulk_load(envelopes)
        });
        let centers = RTree::bulk_load(
            mesh.cell_centers
                .iter()
                .enumerate()
                .map(|(cell, p)| CellCenter {
                    cell,
                    at: [p.x, p.y],
                })
                .collect(),
        );
        Self {
            mesh,
            polygons,
            centers,
            reach: mesh.bounding_box.expanded(mesh.cell_size.max),
        }
    }

    pub fn mesh(&self) -> &MeshGeometry {
        self.mesh
    }

    pub fn locate(&self, p: Point2) -> Option<CellHit> {
        if !p.is_finite() || !self.reach.contains(p) {
            return None;
        }
        if let (Some(tree), Some(topo)) = (&self.polygons, &self.mesh.topology) {
            let envelope = AABB::from_point([p.x, p.y]);
            let inside = tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|e| e.cell)
                .filter(|&cell| point_in_polygon(p, &topo.cell_polygon(cell)))
                .min();
            if let Some(cell) = inside {
                return Some(CellHit::Inside(cell));
            }
        }
        self.centers
            .nearest_neighbor(&[p.x, p.y])
            .map(|c| CellHit::Nearest {
                cell: c.cell,
                distance: c.distance_2(&[p.x, p.y]).sqrt(),
            })
    }

    /// Value of a per-cell array at `p`.
    pub fn sample(&self, p: Point2, values: &[Real]) -> Option<Real> {
        self.locate(p).and_then(|hit| values.get(hit.cell()).copied())
    }
}
