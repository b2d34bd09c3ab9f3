//! Planar geometry primitives shared by the mesh, section and export stages.

use crate::Real;

/// A point (or vector) in the model's projected plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    pub x: Real,
    pub y: Real,
}

impl Point2 {
    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Point2) -> Point2 {
        Point2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Point2) -> Point2 {
        Point2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, k: Real) -> Point2 {
        Point2::new(self.x * k, self.y * k)
    }

    pub fn dot(self, other: Point2) -> Real {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(self) -> Real {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point2) -> Real {
        self.sub(other).norm()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Point2> {
        let n = self.norm();
        if n > Real::EPSILON && n.is_finite() {
            Some(self.scale(1.0 / n))
        } else {
            None
        }
    }

    /// Left-hand perpendicular (rotated +90 degrees).
    pub fn perp(self) -> Point2 {
        Point2::new(-self.y, self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BoundingBox {
    pub min_x: Real,
    pub min_y: Real,
    pub max_x: Real,
    pub max_y: Real,
}

impl BoundingBox {
    /// Min/max over a point set. Returns `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bb.include(*p);
        }
        Some(bb)
    }

    pub fn include(&mut self, p: Point2) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn width(&self) -> Real {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> Real {
        self.max_y - self.min_y
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn expanded(&self, margin: Real) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// Signed polygon area by the shoelace formula (counter-clockwise positive).
pub fn signed_polygon_area(vertices: &[Point2]) -> Real {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    0.5 * twice
}

/// Unsigned polygon area.
pub fn polygon_area(vertices: &[Point2]) -> Real {
    signed_polygon_area(vertices).abs()
}

/// Even-odd ray casting point-in-polygon test. Boundary points may fall
/// either way; callers that need a decision on edges fall back to distance.
pub fn point_in_polygon(p: Point2, vertices: &[Point2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_cross = vj.x + (p.y - vj.y) / (vi.y - vj.y) * (vi.x - vj.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn shoelace_orientation() {
        let sq = unit_square();
        assert_eq!(signed_polygon_area(&sq), 1.0);
        let rev: Vec<_> = sq.iter().rev().copied().collect();
        assert_eq!(signed_polygon_area(&rev), -1.0);
        assert_eq!(polygon_area(&rev), 1.0);
    }

    #[test]
    fn degenerate_polygon_has_no_area() {
        assert_eq!(polygon_area(&[Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn point_in_square() {
        let sq = unit_square();
        assert!(point_in_polygon(Point2::new(0.5, 0.5), &sq));
        assert!(!point_in_polygon(Point2::new(1.5, 0.5), &sq));
        assert!(!point_in_polygon(Point2::new(0.5, -0.1), &sq));
    }

    #[test]
    fn bounding_box_tracks_extremes() {
        let pts = [Point2::new(3.0, -1.0), Point2::new(-2.0, 4.0), Point2::new(0.0, 0.0)];
        let bb = BoundingBox::from_points(&pts).unwrap();
        assert_eq!(bb.min_x, -2.0);
        assert_eq!(bb.max_x, 3.0);
        assert_eq!(bb.min_y, -1.0);
        assert_eq!(bb.max_y, 4.0);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn perpendicular_is_left_rotation() {
        let t = Point2::new(1.0, 0.0);
        assert_eq!(t.perp(), Point2::new(0.0, 1.0));
        assert!(Point2::new(0.0, 0.0).normalized().is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rectangle_area_survives_translation(
            w in 0.1f64..1e3,
            h in 0.1f64..1e3,
            dx in -1e5f64..1e5,
            dy in -1e5f64..1e5,
        ) {
            let rect = [
                Point2::new(dx, dy),
                Point2::new(dx + w, dy),
                Point2::new(dx + w, dy + h),
                Point2::new(dx, dy + h),
            ];
            let area = polygon_area(&rect);
            prop_assert!((area - w * h).abs() <= 1e-6 * (w * h).max(1.0) + 1e-6 * (dx.abs() + dy.abs()));
            let centre = Point2::new(dx + w / 2.0, dy + h / 2.0);
            prop_assert!(point_in_polygon(centre, &rect));
            let bb = BoundingBox::from_points(&rect).unwrap();
            prop_assert!(bb.contains(centre));
        }
    }
}
