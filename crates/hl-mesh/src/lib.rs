//! hl-mesh: 2D unstructured mesh geometry from model containers.
//!
//! - `extract` reads cell centres, facepoint topology and areas of one flow
//!   area (or all of them)
//! - `MeshGeometry` holds the parallel per-cell arrays
//! - `CellLocator` maps planar points to cells

pub mod error;
pub mod extract;
pub mod layout;
pub mod locator;
pub mod model;

pub use error::{MeshError, MeshResult};
pub use extract::{ALL_AREAS, extract, list_flow_areas};
pub use locator::{CellHit, CellLocator};
pub use model::{AreaSource, AreaSpan, CellSizeStats, MeshGeometry, MeshSummary, MeshTopology};
