//! In-memory elevation grid.

use hl_core::{BoundingBox, Point2, Real};
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};

/// North-up affine transform, GDAL convention: `origin` is the outer corner
/// of pixel (0, 0) and `pixel_height` is negative when rows run south.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTransform {
    pub origin_x: Real,
    pub origin_y: Real,
    pub pixel_width: Real,
    pub pixel_height: Real,
}

impl GeoTransform {
    pub fn new(origin_x: Real, origin_y: Real, pixel_width: Real, pixel_height: Real) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Fractional pixel coordinates (column, row) of a model point; pixel
    /// `(c, r)` covers `[c, c + 1) x [r, r + 1)`.
    #[inline]
    pub fn world_to_pixel(&self, p: Point2) -> (Real, Real) {
        (
            (p.x - self.origin_x) / self.pixel_width,
            (p.y - self.origin_y) / self.pixel_height,
        )
    }

    #[inline]
    pub fn pixel_to_world(&self, col: Real, row: Real) -> Point2 {
        Point2::new(
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    pub fn pixel_center(&self, col: usize, row: usize) -> Point2 {
        self.pixel_to_world(col as Real + 0.5, row as Real + 0.5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainRaster {
    width: usize,
    height: usize,
    transform: GeoTransform,
    nodata: Option<Real>,
    /// Row-major, row 0 first.
    data: Vec<Real>,
}

impl TerrainRaster {
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        data: Vec<Real>,
        nodata: Option<Real>,
    ) -> TerrainResult<Self> {
        if width == 0 || height == 0 {
            return Err(TerrainError::Invalid(format!("empty raster {width}x{height}")));
        }
        if data.len() != width * height {
            return Err(TerrainError::Invalid(format!(
                "{width}x{height} raster needs {} values, got {}",
                width * height,
                data.len()
            )));
        }
        let t = transform;
        if !(t.pixel_width.is_finite() && t.pixel_height.is_finite())
            || t.pixel_width == 0.0
            || t.pixel_height == 0.0
        {
            return Err(TerrainError::Invalid(format!(
                "pixel size {} x {}",
                t.pixel_width, t.pixel_height
            )));
        }
        Ok(Self {
            width,
            height,
            transform,
            nodata,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<Real> {
        self.nodata
    }

    pub fn data(&self) -> &[Real] {
        &self.data
    }

    pub fn bounds(&self) -> BoundingBox {
        let a = self.transform.pixel_to_world(0.0, 0.0);
        let b = self
            .transform
            .pixel_to_world(self.width as Real, self.height as Real);
        BoundingBox {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Cell value, `None` for nodata, NaN or out-of-range indices.
    pub fn get(&self, col: usize, row: usize) -> Option<Real> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        if !v.is_finite() || self.nodata.is_some_and(|nd| v == nd) {
            return None;
        }
        Some(v)
    }

    pub fn sample_nearest(&self, p: Point2) -> Option<Real> {
        let (u, v) = self.transform.world_to_pixel(p);
        if !(u >= 0.0 && v >= 0.0) {
            return None;
        }
        self.get(u.floor() as usize, v.floor() as usize)
    }

    /// Bilinear interpolation between pixel centres.
    ///
    /// `None` outside the raster or when any contributing pixel is nodata.
    /// Within half a pixel of the edge the neighbour index is clamped, so the
    /// sample degenerates to the available pixels.
    pub fn sample_bilinear(&self, p: Point2) -> Option<Real> {
        let (u, v) = self.transform.world_to_pixel(p);
        if !(u >= 0.0 && v >= 0.0 && u <= self.width as Real && v <= self.height as Real) {
            return None;
        }
        let max_c = (self.width - 1) as Real;
        let max_r = (self.height - 1) as Real;
        let fu = (u - 0.5).clamp(0.0, max_c);
        let fv = (v - 0.5).clamp(0.0, max_r);

        let c0 = fu.floor() as usize;
        let r0 = fv.floor() as usize;
        let c1 = (c0 + 1).min(self.width - 1);
        let r1 = (r0 + 1).min(self.height - 1);
        let tu = fu - c0 as Real;
        let tv = fv - r0 as Real;

        let z00 = self.get(c0, r0)?;
        let z10 = self.get(c1, r0)?;
        let z01 = self.get(c0, r1)?;
        let z11 = self.get(c1, r1)?;

        let top = z00 * (1.0 - tu) + z10 * tu;
        let bottom = z01 * (1.0 - tu) + z11 * tu;
        Some(top * (1.0 - tv) + bottom * tv)
    }
}
