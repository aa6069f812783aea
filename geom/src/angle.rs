use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Pt2D;

/// An angle, stored in radians. Used mostly for headings, which are measured counter-clockwise
/// from the +x axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

/// Which way a chain of three points bends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
    Straight,
}

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new_rads(rads: f64) -> Angle {
        if !rads.is_finite() {
            panic!("Bad Angle {}", rads);
        }
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle::new_rads(degs.to_radians())
    }

    /// The heading of a direction vector.
    pub fn from_direction(dx: f64, dy: f64) -> Angle {
        Angle::new_rads(dy.atan2(dx))
    }

    /// A unit vector pointing along this heading.
    pub fn to_direction(self) -> (f64, f64) {
        let (sin, cos) = self.0.sin_cos();
        (cos, sin)
    }

    pub fn opposite(self) -> Angle {
        Angle::new_rads(self.0 + std::f64::consts::PI)
    }

    pub fn rotate_rads(self, rads: f64) -> Angle {
        Angle::new_rads(self.0 + rads)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        self.rotate_rads(degrees.to_radians())
    }

    /// The raw value, without any normalization.
    pub fn raw_radians(self) -> f64 {
        self.0
    }

    /// Normalized to [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let rads = self.0.rem_euclid(2.0 * std::f64::consts::PI);
        // rem_euclid can round up to exactly 2pi
        if rads >= 2.0 * std::f64::consts::PI {
            0.0
        } else {
            rads
        }
    }

    /// Normalized to [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The signed rotation, in (-pi, pi], needed to turn from `self` to `other`. Positive means
    /// counter-clockwise.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let mut diff = (other.0 - self.0).rem_euclid(2.0 * std::f64::consts::PI);
        if diff > std::f64::consts::PI {
            diff -= 2.0 * std::f64::consts::PI;
        }
        diff
    }

    pub fn approx_eq(self, other: Angle, within_rads: f64) -> bool {
        self.shortest_rotation_towards(other).abs() <= within_rads
    }

    /// True if the two headings point the same or exactly opposite ways.
    pub fn approx_parallel(self, other: Angle, within_rads: f64) -> bool {
        self.approx_eq(other, within_rads) || self.approx_eq(other.opposite(), within_rads)
    }
}

impl TurnDirection {
    /// Uses the sign of the cross product; clockwise is a right turn.
    pub fn from_pts(pt1: Pt2D, pt2: Pt2D, pt3: Pt2D) -> TurnDirection {
        let cross = pt1.cross(pt2, pt3);
        // Scale the tolerance by the legs, so this doesn't depend on units
        let scale = pt1.dist_to(pt2).inner_meters() * pt2.dist_to(pt3).inner_meters();
        if cross.abs() <= 1e-12 * scale {
            TurnDirection::Straight
        } else if cross > 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }

    /// +1 for left, -1 for right, 0 for straight. Curvature carries this sign.
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => 1.0,
            TurnDirection::Right => -1.0,
            TurnDirection::Straight => 0.0,
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_rotation() {
        let east = Angle::degrees(0.0);
        let north = Angle::degrees(90.0);
        assert!((east.shortest_rotation_towards(north) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((north.shortest_rotation_towards(east) + std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let almost_east = Angle::degrees(359.0);
        assert!((east.shortest_rotation_towards(almost_east) + 1.0_f64.to_radians()).abs() < 1e-12);
        assert!(Angle::degrees(-90.0).approx_eq(Angle::degrees(270.0), 1e-9));
    }

    #[test]
    fn turn_direction() {
        let a = Pt2D::new(0.0, 0.0);
        let b = Pt2D::new(10.0, 0.0);
        assert_eq!(
            TurnDirection::from_pts(a, b, Pt2D::new(10.0, 10.0)),
            TurnDirection::Left
        );
        assert_eq!(
            TurnDirection::from_pts(a, b, Pt2D::new(10.0, -10.0)),
            TurnDirection::Right
        );
        assert_eq!(
            TurnDirection::from_pts(a, b, Pt2D::new(20.0, 0.0)),
            TurnDirection::Straight
        );
    }
}
