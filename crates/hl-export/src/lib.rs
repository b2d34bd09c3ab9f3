//! hl-export: artifacts written from pipeline results.
//!
//! - `export_mesh_field`: per-cell fields over time as VTK `.vtu`
//! - `export_raster`: one field rasterized to `.asc` or GeoTIFF
//! - `export_tabular`: series, hydrographs, sections and zones as CSV/JSON
//! - `export_sections_geojson`: alignment and section lines as GeoJSON
//!
//! Every export runs as an `ExportJob` and writes through a lock file and a
//! temporary sibling, so a target is either fully written or untouched.

pub mod error;
pub mod geojson;
pub mod job;
pub mod raster;
pub mod tabular;
pub mod vtu;
pub mod writer;

pub use error::{ExportError, ExportResult};
pub use geojson::{ALIGNMENT_VERTICES, export_sections_geojson, sections_feature_collection};
pub use job::{ExportJob, ExportSelection, JobStatus, TargetKind};
pub use raster::{DEFAULT_NODATA, RasterGrid, RasterPolicy, RasterSpec, export_raster, rasterize};
pub use tabular::{TabularData, TabularFormat, export_tabular};
pub use vtu::{CELL_AREA, MeshField, MeshFieldFile, TIME_VALUE, export_mesh_field, read_mesh_field};
pub use writer::{OutputLock, STALE_LOCK_AGE, WriteReport, file_digest, write_atomic};
