use hl_core::{Point2, Real};
use serde::{Deserialize, Serialize};

/// One sampled point across a section. `offset` is negative on the left of
/// the alignment and positive on the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSample {
    pub offset: Real,
    pub x: Real,
    pub y: Real,
    pub elevation: Option<Real>,
    pub depth: Option<Real>,
    pub velocity: Option<Real>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossSection {
    /// 1-based, in station order.
    pub id: usize,
    /// Arc length along the alignment.
    pub station: Real,
    pub center: Point2,
    /// Azimuth of the section line from left to right, degrees clockwise
    /// from north.
    pub bearing: Real,
    pub left: Point2,
    pub right: Point2,
    pub samples: Vec<SectionSample>,
}

impl CrossSection {
    pub fn width(&self) -> Real {
        match (self.samples.first(), self.samples.last()) {
            (Some(a), Some(b)) => b.offset - a.offset,
            _ => 0.0,
        }
    }

    pub fn offsets(&self) -> impl Iterator<Item = Real> + '_ {
        self.samples.iter().map(|s| s.offset)
    }

    /// `(offset, elevation)` pairs with known elevation.
    pub fn profile(&self) -> Vec<(Real, Real)> {
        self.samples
            .iter()
            .filter_map(|s| s.elevation.map(|z| (s.offset, z)))
            .collect()
    }
}
