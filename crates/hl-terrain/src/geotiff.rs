//! Single-band GeoTIFF input and output.
//!
//! Georeferencing comes from `ModelPixelScale` + `ModelTiepoint`; nodata
//! from the GDAL nodata tag (ASCII). Rotated or sheared transforms
//! (`ModelTransformation`) are not supported.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hl_core::Real;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tracing::{debug, info};

use crate::RASTER_EXTENSIONS;
use crate::error::{TerrainError, TerrainResult};
use crate::raster::{GeoTransform, TerrainRaster};

fn unsupported(path: &Path, reason: impl Into<String>) -> TerrainError {
    TerrainError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Load a terrain raster from a `.tif`/`.tiff` file.
pub fn load_geotiff(path: &Path) -> TerrainResult<TerrainRaster> {
    if !path.is_file() {
        return Err(TerrainError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !RASTER_EXTENSIONS.contains(&ext.as_str()) {
        return Err(unsupported(path, format!("extension {ext:?} is not a raster")));
    }

    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))
        .map_err(|e| unsupported(path, e.to_string()))?;
    let (width, height) = decoder.dimensions()?;

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .ok_or_else(|| unsupported(path, "missing ModelPixelScale tag"))?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?
        .ok_or_else(|| unsupported(path, "missing ModelTiepoint tag"))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(unsupported(path, "malformed georeferencing tags"));
    }
    // Tiepoint (i, j, k, x, y, z): raster point (i, j) maps to model (x, y).
    let transform = GeoTransform::new(
        tiepoint[3] - tiepoint[0] * scale[0],
        tiepoint[4] + tiepoint[1] * scale[1],
        scale[0],
        -scale[1],
    );

    let nodata = decoder
        .find_tag(Tag::GdalNodata)?
        .and_then(|v| v.into_string().ok())
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<Real>().ok());

    let data: Vec<Real> = match decoder.read_image()? {
        DecodingResult::F32(v) => v.into_iter().map(Real::from).collect(),
        DecodingResult::F64(v) => v,
        DecodingResult::U8(v) => v.into_iter().map(Real::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(Real::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(Real::from).collect(),
        DecodingResult::I8(v) => v.into_iter().map(Real::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(Real::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(Real::from).collect(),
        _ => return Err(unsupported(path, "unsupported sample format")),
    };
    let (width, height) = (width as usize, height as usize);
    if data.len() != width * height {
        return Err(unsupported(path, "only single-band rasters are supported"));
    }

    info!(path = %path.display(), width, height, "terrain raster loaded");
    TerrainRaster::new(width, height, transform, data, nodata)
}

/// Write a north-up single-band `f32` GeoTIFF.
pub fn write_geotiff(
    path: &Path,
    width: usize,
    height: usize,
    transform: &GeoTransform,
    data: &[Real],
    nodata: Option<Real>,
) -> TerrainResult<()> {
    if data.len() != width * height {
        return Err(TerrainError::Invalid(format!(
            "{width}x{height} raster needs {} values, got {}",
            width * height,
            data.len()
        )));
    }
    let w = u32::try_from(width).map_err(|_| TerrainError::Invalid("raster too wide".into()))?;
    let h = u32::try_from(height).map_err(|_| TerrainError::Invalid("raster too tall".into()))?;

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    let mut image = encoder.new_image::<colortype::Gray32Float>(w, h)?;
    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image.encoder().write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
    image.encoder().write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    if let Some(nd) = nodata {
        image.encoder().write_tag(Tag::GdalNodata, nd.to_string().as_str())?;
    }
    let samples: Vec<f32> = data.iter().map(|&v| v as f32).collect();
    image.write_data(&samples)?;
    debug!(path = %path.display(), width, height, "geotiff written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl_core::{ErrorKind, Point2};

    #[test]
    fn write_then_load_keeps_georeferencing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tif");
        let t = GeoTransform::new(500_000.0, 4_200_000.0, 2.0, -2.0);
        let data = vec![10.0, 11.0, 12.0, 13.0, 14.0, -9999.0];
        write_geotiff(&path, 3, 2, &t, &data, Some(-9999.0)).unwrap();

        let r = load_geotiff(&path).unwrap();
        assert_eq!((r.width(), r.height()), (3, 2));
        assert_eq!(*r.transform(), t);
        assert_eq!(r.nodata(), Some(-9999.0));
        assert_eq!(r.get(2, 1), None);
        assert_eq!(r.sample_nearest(Point2::new(500_001.0, 4_199_999.0)), Some(10.0));
    }

    #[test]
    fn plain_tiff_without_georeferencing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");
        let mut enc = TiffEncoder::new(BufWriter::new(File::create(&path).unwrap())).unwrap();
        enc.write_image::<colortype::Gray32Float>(2, 1, &[1.0f32, 2.0]).unwrap();
        drop(enc);
        let err = load_geotiff(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn missing_and_wrong_extension() {
        assert_eq!(
            load_geotiff(Path::new("/no/dem.tif")).unwrap_err().kind(),
            ErrorKind::FileNotFound
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.png");
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(load_geotiff(&path).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }
}
