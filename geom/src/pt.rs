use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, Distance};

/// This represents world-space in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }

        Pt2D { x, y }
    }

    pub fn zero() -> Pt2D {
        Pt2D::new(0.0, 0.0)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn approx_eq(self, other: Pt2D, threshold: Distance) -> bool {
        self.dist_to(other) <= threshold
    }

    pub fn project_away(self, dist: Distance, theta: Angle) -> Pt2D {
        let (sin, cos) = theta.normalized_radians().sin_cos();
        Pt2D::new(
            self.x() + dist.inner_meters() * cos,
            self.y() + dist.inner_meters() * sin,
        )
    }

    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::new_rads((to.y() - self.y()).atan2(to.x() - self.x()))
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x() + dx, self.y() + dy)
    }

    pub fn dist_to(self, to: Pt2D) -> Distance {
        Distance::meters(((self.x() - to.x()).powi(2) + (self.y() - to.y()).powi(2)).sqrt())
    }

    /// Squared distance, in square meters. Cheaper than `dist_to` for comparisons.
    pub fn dist_squared(self, to: Pt2D) -> f64 {
        (self.x() - to.x()).powi(2) + (self.y() - to.y()).powi(2)
    }

    pub fn center(pts: &[Pt2D]) -> Pt2D {
        if pts.is_empty() {
            panic!("Can't find center of 0 points");
        }
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x();
            y += pt.y();
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }

    /// The z component of the cross product of (self -> b) and (self -> c). Positive when
    /// `self, b, c` turn counter-clockwise.
    pub fn cross(self, b: Pt2D, c: Pt2D) -> f64 {
        (b.x() - self.x()) * (c.y() - self.y()) - (b.y() - self.y()) * (c.x() - self.x())
    }

    /// Rotates `self` around `origin` by `theta`.
    pub fn rotate_around(self, theta: Angle, origin: Pt2D) -> Pt2D {
        let (sin, cos) = theta.normalized_radians().sin_cos();
        let dx = self.x() - origin.x();
        let dy = self.y() - origin.y();
        Pt2D::new(
            origin.x() + dx * cos - dy * sin,
            origin.y() + dx * sin + dy * cos,
        )
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x(), self.y())
    }
}

impl From<Pt2D> for geo::Coordinate<f64> {
    fn from(pt: Pt2D) -> Self {
        geo::Coordinate { x: pt.x, y: pt.y }
    }
}

impl From<Pt2D> for geo::Point<f64> {
    fn from(pt: Pt2D) -> Self {
        geo::Point::new(pt.x, pt.y)
    }
}

impl From<geo::Point<f64>> for Pt2D {
    fn from(pt: geo::Point<f64>) -> Self {
        Pt2D::new(pt.x(), pt.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_sign_matches_turn() {
        let a = Pt2D::new(0.0, 0.0);
        let b = Pt2D::new(10.0, 0.0);
        assert!(a.cross(b, Pt2D::new(10.0, 5.0)) > 0.0);
        assert!(a.cross(b, Pt2D::new(10.0, -5.0)) < 0.0);
        assert_eq!(a.cross(b, Pt2D::new(20.0, 0.0)), 0.0);
    }

    #[test]
    fn rotate() {
        let pt = Pt2D::new(1.0, 0.0).rotate_around(Angle::degrees(90.0), Pt2D::zero());
        assert!(pt.approx_eq(Pt2D::new(0.0, 1.0), Distance::meters(1e-9)));
    }
}
