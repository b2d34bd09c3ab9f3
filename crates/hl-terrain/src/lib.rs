//! hl-terrain: regular-grid elevation rasters.
//!
//! - `TerrainRaster` with a north-up affine `GeoTransform`
//! - bilinear and nearest sampling in model coordinates
//! - single-band GeoTIFF read/write through the `tiff` crate

pub mod error;
pub mod geotiff;
pub mod raster;

pub use error::{TerrainError, TerrainResult};
pub use geotiff::{load_geotiff, write_geotiff};
pub use raster::{GeoTransform, TerrainRaster};

/// Terrain raster extensions recognised by [`load_geotiff`].
pub const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff"];
