use hl_core::{CancelToken, Point2, Real};
use hl_mesh::MeshGeometry;
use hl_terrain::TerrainRaster;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::curve::{AlignmentCurve, stations};
use crate::error::{SectionError, SectionResult};
use crate::sample::{CellFields, MeshSampler, SampleSource, TerrainSampler};
use crate::section::{CrossSection, SectionSample};

pub const DEFAULT_INTERVALS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionParams {
    pub spacing: Real,
    pub width: Real,
    /// Equal intervals across the width. Odd counts are rounded up.
    #[serde(default = "default_intervals")]
    pub intervals: usize,
    /// Target distance between samples; overrides `intervals` when set.
    #[serde(default)]
    pub sample_step: Option<Real>,
}

fn default_intervals() -> usize {
    DEFAULT_INTERVALS
}

impl SectionParams {
    pub fn new(spacing: Real, width: Real) -> Self {
        Self {
            spacing,
            width,
            intervals: DEFAULT_INTERVALS,
            sample_step: None,
        }
    }

    pub fn with_sample_step(mut self, step: Real) -> Self {
        self.sample_step = Some(step);
        self
    }

    fn validate(&self) -> SectionResult<()> {
        SectionError::positive("spacing", self.spacing)?;
        SectionError::positive("width", self.width)?;
        if let Some(step) = self.sample_step {
            SectionError::positive("sample step", step)?;
        }
        Ok(())
    }

    /// Interval count across the width; always even and at least 2 so the
    /// centreline is sampled.
    pub fn interval_count(&self) -> usize {
        let n = match self.sample_step {
            Some(step) => (self.width / step).ceil().min(1e6) as usize,
            None => self.intervals,
        };
        let n = n.max(2);
        n + n % 2
    }

    /// Strictly increasing offsets from `-width/2` to `+width/2`, mirror
    /// symmetric about zero.
    pub fn offsets(&self) -> Vec<Real> {
        let n = self.interval_count();
        let half = n / 2;
        let d = self.width / n as Real;
        let edge = self.width / 2.0;
        (0..=n)
            .map(|i| {
                if i == 0 {
                    -edge
                } else if i == n {
                    edge
                } else if i < half {
                    -((half - i) as Real * d)
                } else {
                    (i - half) as Real * d
                }
            })
            .collect()
    }
}

fn azimuth_degrees(v: Point2) -> Real {
    v.x.atan2(v.y).to_degrees().rem_euclid(360.0)
}

/// Cross-sections perpendicular to a smooth curve through `alignment`.
///
/// Cancellation is checked before each station.
pub fn generate(
    alignment: &[Point2],
    params: &SectionParams,
    source: &dyn SampleSource,
    cancel: &CancelToken,
) -> SectionResult<Vec<CrossSection>> {
    params.validate()?;
    let curve = AlignmentCurve::new(alignment)?;
    let offsets = params.offsets();
    let total = curve.total_length();

    let mut sections = Vec::new();
    for (idx, station) in stations(total, params.spacing)?.into_iter().enumerate() {
        cancel.check()?;
        let center = curve.point_at(station);
        let tangent = curve.tangent_at(station);
        let right = Point2::new(tangent.y, -tangent.x);

        let samples = offsets
            .iter()
            .map(|&offset| {
                let p = center.add(right.scale(offset));
                let s = source.sample(p);
                SectionSample {
                    offset,
                    x: p.x,
                    y: p.y,
                    elevation: s.elevation,
                    depth: s.depth,
                    velocity: s.velocity,
                }
            })
            .collect::<Vec<_>>();
        debug!(station, samples = samples.len(), "cross-section sampled");

        sections.push(CrossSection {
            id: idx + 1,
            station,
            center,
            bearing: azimuth_degrees(right),
            left: center.add(right.scale(-params.width / 2.0)),
            right: center.add(right.scale(params.width / 2.0)),
            samples,
        });
    }
    info!(
        sections = sections.len(),
        length = total,
        "cross-sections generated"
    );
    Ok(sections)
}

/// [`generate`] sampling a terrain raster when given, mesh cells otherwise.
pub fn generate_on_mesh(
    alignment: &[Point2],
    params: &SectionParams,
    mesh: &MeshGeometry,
    fields: CellFields<'_>,
    terrain: Option<&TerrainRaster>,
    cancel: &CancelToken,
) -> SectionResult<Vec<CrossSection>> {
    let cells = MeshSampler::new(mesh, fields)?;
    match terrain {
        Some(raster) => generate(
            alignment,
            params,
            &TerrainSampler::new(raster, Some(cells)),
            cancel,
        ),
        None => generate(alignment, params, &cells, cancel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offsets() {
        let o = SectionParams::new(10.0, 40.0).offsets();
        assert_eq!(o.len(), 21);
        assert_eq!(o[0], -20.0);
        assert_eq!(o[10], 0.0);
        assert_eq!(o[20], 20.0);
        assert_eq!(o[1], -18.0);
    }

    #[test]
    fn sample_step_rounds_to_even() {
        let p = SectionParams::new(10.0, 10.0).with_sample_step(3.0);
        assert_eq!(p.interval_count(), 4);
        let p = SectionParams::new(10.0, 10.0).with_sample_step(100.0);
        assert_eq!(p.interval_count(), 2);
    }

    #[test]
    fn azimuths() {
        assert_eq!(azimuth_degrees(Point2::new(0.0, 1.0)), 0.0);
        assert!((azimuth_degrees(Point2::new(1.0, 0.0)) - 90.0).abs() < 1e-12);
        assert!((azimuth_degrees(Point2::new(0.0, -1.0)) - 180.0).abs() < 1e-12);
        assert!((azimuth_degrees(Point2::new(-1.0, 0.0)) - 270.0).abs() < 1e-12);
    }
}
