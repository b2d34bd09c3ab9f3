//! Dataset names of the HEC-RAS 2D geometry layout.

pub const FLOW_AREAS: &str = "/Geometry/2D Flow Areas";
pub const CELL_CENTERS: &str = "Cells Center Coordinate";
pub const FACEPOINTS: &str = "FacePoints Coordinate";
pub const CELL_FACEPOINTS: &str = "Cells FacePoint Indexes";
pub const CELL_AREAS: &str = "Cells Surface Area";
pub const CELL_MIN_ELEVATION: &str = "Cells Minimum Elevation";
/// Area attribute giving the number of real (non-virtual) cells.
pub const CELL_COUNT_ATTR: &str = "Cell Count";
/// Root attribute naming the projection.
pub const PROJECTION_ATTRS: &[&str] = &["Projection", "projection", "CRS"];

pub fn area_group(area: &str) -> String {
    format!("{FLOW_AREAS}/{area}")
}

pub fn area_dataset(area: &str, dataset: &str) -> String {
    format!("{FLOW_AREAS}/{area}/{dataset}")
}
