//! Arc-length parametrized Catmull-Rom curve through alignment points.

use hl_core::{Point2, Real};

use crate::error::{SectionError, SectionResult};

/// Consecutive control points closer than this are merged.
const DUPLICATE_EPS: Real = 1e-9;
/// Sub-intervals per segment for the arc-length table.
const SUBDIVISIONS: usize = 16;
const BISECTION_STEPS: usize = 60;
/// Most cross-section stations along one alignment.
pub const MAX_STATIONS: usize = 1_000_000;

/// 5-point Gauss-Legendre nodes and weights on [-1, 1].
const GL_NODES: [Real; 5] = [
    0.0,
    -0.538_469_310_105_683_1,
    0.538_469_310_105_683_1,
    -0.906_179_845_938_664,
    0.906_179_845_938_664,
];
const GL_WEIGHTS: [Real; 5] = [
    0.568_888_888_888_888_9,
    0.478_628_670_499_366_5,
    0.478_628_670_499_366_5,
    0.236_926_885_056_189_1,
    0.236_926_885_056_189_1,
];

#[derive(Debug, Clone, Copy)]
struct Piece {
    segment: usize,
    t0: Real,
    t1: Real,
    /// Arc length from the curve start to `t0` of this piece.
    s0: Real,
}

/// Uniform Catmull-Rom spline with reflected phantom end points.
///
/// The curve passes through every (deduplicated) control point; two points
/// give a straight line traversed at constant speed.
#[derive(Debug, Clone)]
pub struct AlignmentCurve {
    /// Control points including the two phantoms.
    ctrl: Vec<Point2>,
    pieces: Vec<Piece>,
    total: Real,
}

impl AlignmentCurve {
    pub fn new(points: &[Point2]) -> SectionResult<Self> {
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(SectionError::InvalidParameter {
                what: "alignment coordinate",
                value: if bad.x.is_finite() { bad.y } else { bad.x },
            });
        }
        let mut pts: Vec<Point2> = Vec::with_capacity(points.len() + 2);
        for &p in points {
            if pts.last().is_none_or(|q: &Point2| q.distance(p) > DUPLICATE_EPS) {
                pts.push(p);
            }
        }
        if pts.len() < 2 {
            return Err(SectionError::TooFewPoints { count: pts.len() });
        }

        let n = pts.len();
        let head = pts[0].scale(2.0).sub(pts[1]);
        let tail = pts[n - 1].scale(2.0).sub(pts[n - 2]);
        let mut ctrl = Vec::with_capacity(n + 2);
        ctrl.push(head);
        ctrl.extend(pts);
        ctrl.push(tail);

        let mut curve = Self {
            ctrl,
            pieces: Vec::with_capacity((n - 1) * SUBDIVISIONS),
            total: 0.0,
        };
        let mut s = 0.0;
        for segment in 0..n - 1 {
            for k in 0..SUBDIVISIONS {
                let t0 = k as Real / SUBDIVISIONS as Real;
                let t1 = (k + 1) as Real / SUBDIVISIONS as Real;
                curve.pieces.push(Piece { segment, t0, t1, s0: s });
                s += curve.length_between(segment, t0, t1);
            }
        }
        curve.total = s;
        if !(s > 0.0) {
            return Err(SectionError::TooFewPoints { count: 1 });
        }
        Ok(curve)
    }

    pub fn total_length(&self) -> Real {
        self.total
    }

    pub fn segment_count(&self) -> usize {
        self.ctrl.len() - 3
    }

    fn controls(&self, segment: usize) -> [Point2; 4] {
        [
            self.ctrl[segment],
            self.ctrl[segment + 1],
            self.ctrl[segment + 2],
            self.ctrl[segment + 3],
        ]
    }

    fn position(&self, segment: usize, t: Real) -> Point2 {
        let [p0, p1, p2, p3] = self.controls(segment);
        let t2 = t * t;
        let t3 = t2 * t;
        let c0 = -0.5 * t3 + t2 - 0.5 * t;
        let c1 = 1.5 * t3 - 2.5 * t2 + 1.0;
        let c2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
        let c3 = 0.5 * t3 - 0.5 * t2;
        p0.scale(c0).add(p1.scale(c1)).add(p2.scale(c2)).add(p3.scale(c3))
    }

    fn derivative(&self, segment: usize, t: Real) -> Point2 {
        let [p0, p1, p2, p3] = self.controls(segment);
        let t2 = t * t;
        let d0 = -1.5 * t2 + 2.0 * t - 0.5;
        let d1 = 4.5 * t2 - 5.0 * t;
        let d2 = -4.5 * t2 + 4.0 * t + 0.5;
        let d3 = 1.5 * t2 - t;
        p0.scale(d0).add(p1.scale(d1)).add(p2.scale(d2)).add(p3.scale(d3))
    }

    fn length_between(&self, segment: usize, a: Real, b: Real) -> Real {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (a + b);
        GL_NODES
            .iter()
            .zip(GL_WEIGHTS)
            .map(|(x, w)| w * self.derivative(segment, mid + half * x).norm())
            .sum::<Real>()
            * half
    }

    /// Segment and parameter at arc length `s` (clamped to the curve).
    fn locate(&self, s: Real) -> (usize, Real) {
        let s = s.clamp(0.0, self.total);
        let idx = self.pieces.partition_point(|p| p.s0 <= s).saturating_sub(1);
        let piece = self.pieces[idx];
        let target = s - piece.s0;

        let (mut lo, mut hi) = (piece.t0, piece.t1);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if self.length_between(piece.segment, piece.t0, mid) < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (piece.segment, 0.5 * (lo + hi))
    }

    pub fn point_at(&self, s: Real) -> Point2 {
        let (segment, t) = self.locate(s);
        self.position(segment, t)
    }

    /// Unit tangent at arc length `s`. Falls back to the chord of the
    /// current segment where the derivative vanishes.
    pub fn tangent_at(&self, s: Real) -> Point2 {
        let (segment, t) = self.locate(s);
        self.derivative(segment, t)
            .normalized()
            .or_else(|| self.ctrl[segment + 2].sub(self.ctrl[segment + 1]).normalized())
            .unwrap_or(Point2::new(1.0, 0.0))
    }
}

/// Stations `0, spacing, 2*spacing, ...` below `total`, then `total` itself.
///
/// More than [`MAX_STATIONS`] stations is rejected before any is built.
pub fn stations(total: Real, spacing: Real) -> SectionResult<Vec<Real>> {
    let spacing = SectionError::positive("spacing", spacing)?;
    let expected = (total / spacing).ceil() + 1.0;
    if !expected.is_finite() || expected > MAX_STATIONS as Real {
        return Err(SectionError::TooManyStations {
            length: total,
            spacing,
            max: MAX_STATIONS,
        });
    }
    let mut out = Vec::with_capacity(expected as usize);
    let mut k = 0usize;
    loop {
        let s = k as Real * spacing;
        // Within rounding of the end counts as the end.
        if s >= total - 1e-9 * total.max(1.0) {
            break;
        }
        out.push(s);
        k += 1;
    }
    out.push(total);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_points_make_a_line() {
        let c = AlignmentCurve::new(&[Point2::new(0.0, 0.0), Point2::new(30.0, 40.0)]).unwrap();
        assert!((c.total_length() - 50.0).abs() < 1e-9);
        let mid = c.point_at(25.0);
        assert!(mid.distance(Point2::new(15.0, 20.0)) < 1e-9);
        let t = c.tangent_at(10.0);
        assert!((t.x - 0.6).abs() < 1e-9 && (t.y - 0.8).abs() < 1e-9);
    }

    #[test]
    fn passes_through_control_points() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), Point2::new(200.0, 50.0)];
        let c = AlignmentCurve::new(&pts).unwrap();
        assert!(c.point_at(0.0).distance(pts[0]) < 1e-9);
        assert!(c.point_at(c.total_length()).distance(pts[2]) < 1e-6);
        // Chord lengths bound the arc length from below.
        assert!(c.total_length() >= 100.0 + (100.0f64).hypot(50.0) - 1e-9);
        assert_eq!(c.segment_count(), 2);
    }

    #[test]
    fn duplicates_dropped() {
        let p = Point2::new(1.0, 1.0);
        assert!(matches!(
            AlignmentCurve::new(&[p, p, p]),
            Err(SectionError::TooFewPoints { count: 1 })
        ));
        let c = AlignmentCurve::new(&[p, p, Point2::new(2.0, 1.0)]).unwrap();
        assert!((c.total_length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn station_layout() {
        assert_eq!(stations(120.0, 50.0).unwrap(), vec![0.0, 50.0, 100.0, 120.0]);
        assert_eq!(stations(100.0, 50.0).unwrap(), vec![0.0, 50.0, 100.0]);
        assert_eq!(stations(10.0, 50.0).unwrap(), vec![0.0, 10.0]);
    }

    #[test]
    fn tiny_spacing_is_rejected() {
        let err = stations(100.0, 1e-9).unwrap_err();
        assert!(matches!(err, SectionError::TooManyStations { .. }));
        assert_eq!(err.kind(), hl_core::ErrorKind::ComputationError);
        assert!(stations(100.0, 0.0).is_err());
        assert_eq!(stations(1.0, 1e-5).unwrap().len(), 100_001);
    }
}
