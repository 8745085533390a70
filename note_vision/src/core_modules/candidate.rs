// THEORY:
// A `Candidate` is one connected shape found in a frame's mask, reduced to the few
// numbers the selector and the steering mapper need: its area, where its mass sits
// (centroid), and the smallest circle that contains it.
//
// Key principles:
// 1.  **Boundary-only geometry**: everything is derived from the outer contour
//     polygon. Area and first-order moments come from Green's theorem over the
//     polygon edges, so the interior pixels never have to be visited again.
// 2.  **Immutable snapshot**: a candidate is built once per frame and only compared
//     afterwards. It has no memory of earlier frames.
// 3.  **Explicit degeneracy**: a contour that encloses no area (a line, a single
//     pixel) has no centroid. That is modelled as `None`, never as NaN.

use crate::config::{DeviationPolicy, ReferencePoint};
use crate::core_modules::enclosing_circle;
use imageproc::point::Point;
use std::f64::consts::PI;

/// A circle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point<f64>,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    pub fn contains(&self, point: &Point<f64>, tolerance: f64) -> bool {
        let dx = point.x - self.center.x;
        let dy = point.y - self.center.y;
        (dx * dx + dy * dy).sqrt() <= self.radius + tolerance
    }
}

/// Zeroth and first-order spatial moments of a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Green's theorem over the closed polygon `points` (last vertex joins the first).
    /// Orientation is normalised so that `m00` is never negative.
    pub fn from_polygon(points: &[Point<f64>]) -> Self {
        if points.len() < 3 {
            return Self::default();
        }

        let mut m00 = 0.0;
        let mut m10 = 0.0;
        let mut m01 = 0.0;
        for (i, current) in points.iter().enumerate() {
            let next = &points[(i + 1) % points.len()];
            let cross = current.x * next.y - next.x * current.y;
            m00 += cross;
            m10 += cross * (current.x + next.x);
            m01 += cross * (current.y + next.y);
        }

        let sign = if m00 < 0.0 { -1.0 } else { 1.0 };
        Self {
            m00: sign * m00 / 2.0,
            m10: sign * m10 / 6.0,
            m01: sign * m01 / 6.0,
        }
    }

    /// `(m10 / m00, m01 / m00)`, defined only for a positive area.
    pub fn centroid(&self) -> Option<Point<f64>> {
        if self.m00 > 0.0 {
            Some(Point::new(self.m10 / self.m00, self.m01 / self.m00))
        } else {
            None
        }
    }
}

/// One connected shape extracted from a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position in extraction order for the current frame only. Not persistent.
    pub id: usize,
    /// Enclosed area in px² (polygon area of the outer boundary).
    pub area: f64,
    /// Moment centroid; `None` when the shape encloses no area.
    pub centroid: Option<Point<f64>>,
    /// Smallest circle containing every boundary point.
    pub enclosing_circle: Circle,
}

impl Candidate {
    pub fn new(
        id: usize,
        area: f64,
        centroid: Option<Point<f64>>,
        enclosing_circle: Circle,
    ) -> Self {
        Self {
            id,
            area,
            centroid,
            enclosing_circle,
        }
    }

    /// Builds a candidate from the outer boundary of a shape. `boundary` must not be empty.
    pub fn from_boundary(id: usize, boundary: &[Point<f64>]) -> Self {
        let moments = Moments::from_polygon(boundary);
        Self {
            id,
            area: moments.m00,
            centroid: moments.centroid(),
            enclosing_circle: enclosing_circle::minimum_enclosing_circle(boundary),
        }
    }

    /// How far the shape departs from its enclosing circle. Zero for a perfect disc.
    ///
    /// `Absolute` is the signed `area - circle area`: never positive for a real
    /// boundary, and more negative the larger the shape. `Normalized` is the
    /// magnitude of that gap relative to `area`.
    pub fn circularity_deviation(&self, policy: DeviationPolicy) -> f64 {
        let gap = self.area - self.enclosing_circle.area();
        match policy {
            DeviationPolicy::Absolute => gap,
            DeviationPolicy::Normalized => {
                if self.area > 0.0 {
                    gap.abs() / self.area
                } else {
                    f64::INFINITY
                }
            }
        }
    }

    /// The point steering is computed from. A missing centroid always falls back to
    /// the enclosing circle centre.
    pub fn reference_point(&self, reference: ReferencePoint) -> Point<f64> {
        match (reference, self.centroid) {
            (ReferencePoint::Centroid, Some(centroid)) => centroid,
            _ => self.enclosing_circle.center,
        }
    }
}
