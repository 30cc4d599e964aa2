//! Geometry primitives in page space.
//!
//! All coordinates handled by the library use a top-left origin with `y`
//! growing downward, in PDF points. The parser flips PDF user space into this
//! frame once, so everything downstream (grouping, captions, rendering) can
//! reason about "below" as "larger y".

use serde::{Deserialize, Serialize};

/// Ratio reported for boxes with zero height.
///
/// Large enough to fail the `ratio > 10` rejection rule, so degenerate
/// slivers are dropped instead of treated as errors.
pub const DEGENERATE_RATIO: f64 = 20.0;

/// A point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle `(x0, y0, x1, y1)` with `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Create a box from two opposite corners, normalizing their order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    /// or non-finite coordinates.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.x0 = bbox.x0.min(p.x);
            bbox.y0 = bbox.y0.min(p.y);
            bbox.x1 = bbox.x1.max(p.x);
            bbox.y1 = bbox.y1.max(p.y);
        }
        bbox.is_finite().then_some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> BoundingBox {
        BoundingBox::new(
            self.x0 - margin,
            self.y0 - margin,
            self.x1 + margin,
            self.y1 + margin,
        )
    }

    /// Whether the boxes share any point. Touching edges count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1 && self.y0 <= other.y1 && other.y0 <= self.y1
    }

    /// `width / height`, or [`DEGENERATE_RATIO`] when the height is zero.
    pub fn aspect_ratio(&self) -> f64 {
        let height = self.height();
        if height == 0.0 {
            DEGENERATE_RATIO
        } else {
            self.width() / height
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

/// Union of a sequence of boxes, `None` when empty.
pub fn merge_boxes<'a, I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a BoundingBox>,
{
    boxes
        .into_iter()
        .fold(None, |acc: Option<BoundingBox>, b| match acc {
            Some(merged) => Some(merged.union(b)),
            None => Some(*b),
        })
}

/// Affine transformation `[a b c d e f]` as used by PDF content streams.
///
/// Points are row vectors: `(x, y) -> (a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self` applied first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> Point {
        Point::new(
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounding box of the rectangle `(x0, y0)-(x1, y1)` after transformation.
    pub fn transform_rect(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<BoundingBox> {
        BoundingBox::from_points([
            self.apply(x0, y0),
            self.apply(x1, y0),
            self.apply(x0, y1),
            self.apply(x1, y1),
        ])
    }

    /// Average linear scale factor, used to convert line widths.
    pub fn scale_factor(&self) -> f64 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

/// One segment of a painted path, already in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    Close,
}

impl PathSegment {
    /// Points that bound the segment (control points included).
    pub fn points(&self) -> impl Iterator<Item = Point> {
        let pts: [Option<Point>; 3] = match *self {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => [Some(p), None, None],
            PathSegment::CurveTo(c1, c2, p) => [Some(c1), Some(c2), Some(p)],
            PathSegment::Close => [None, None, None],
        };
        pts.into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let b = BoundingBox::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(b, BoundingBox::new(0.0, 5.0, 10.0, 20.0));
        assert!(b.x0 <= b.x1 && b.y0 <= b.y1);
    }

    #[test]
    fn test_union_and_area() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 20.0, 30.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(0.0, 0.0, 20.0, 30.0));
        assert_eq!(u.area(), 600.0);
        assert_eq!(merge_boxes([&a, &b]), Some(u));
        assert_eq!(merge_boxes(std::iter::empty::<&BoundingBox>()), None);
    }

    #[test]
    fn test_expand_and_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(15.0, 0.0, 25.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.expand(5.0).intersects(&b));
        assert!(a.expand(2.5).intersects(&b.expand(2.5)));
        assert!(!a.expand(2.0).intersects(&b.expand(2.0)));
    }

    #[test]
    fn test_aspect_ratio_degenerate_height() {
        let line = BoundingBox::new(0.0, 10.0, 100.0, 10.0);
        assert_eq!(line.aspect_ratio(), DEGENERATE_RATIO);
        let b = BoundingBox::new(0.0, 0.0, 300.0, 200.0);
        assert_eq!(b.aspect_ratio(), 1.5);
    }

    #[test]
    fn test_matrix_composition() {
        // scale then translate
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translate(10.0, 5.0);
        let m = scale.then(&shift);
        assert_eq!(m.apply(1.0, 1.0), Point::new(12.0, 7.0));
        let r = m.transform_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(r, BoundingBox::new(10.0, 5.0, 12.0, 7.0));
        assert_eq!(scale.scale_factor(), 2.0);
    }

    #[test]
    fn test_from_points_rejects_nan() {
        assert!(BoundingBox::from_points([Point::new(f64::NAN, 0.0)]).is_none());
        assert!(BoundingBox::from_points(Vec::<Point>::new()).is_none());
    }
}
