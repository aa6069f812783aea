use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Angle, Bounds, Distance, InfiniteLine, Pt2D};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Pt2D,
    pub radius: Distance,
}

impl Circle {
    pub fn new(center: Pt2D, radius: Distance) -> Circle {
        Circle { center, radius }
    }

    /// Finds the circle tangent to a heading at two points: the center is where the lines
    /// perpendicular to each heading, through each point, meet. Fails for parallel headings.
    pub fn tangent_to(pt1: Pt2D, heading1: Angle, pt2: Pt2D, heading2: Angle) -> Option<Circle> {
        let perp1 = InfiniteLine::from_pt_angle(pt1, heading1.rotate_degs(90.0));
        let perp2 = InfiniteLine::from_pt_angle(pt2, heading2.rotate_degs(90.0));
        let center = perp1.intersection(&perp2)?;
        Some(Circle::new(center, center.dist_to(pt1)))
    }

    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        // avoid sqrt by squaring radius instead
        pt.dist_squared(self.center) < self.radius.inner_meters().powi(2)
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds {
            min_x: self.center.x() - self.radius.inner_meters(),
            max_x: self.center.x() + self.radius.inner_meters(),
            min_y: self.center.y() - self.radius.inner_meters(),
            max_y: self.center.y() + self.radius.inner_meters(),
        }
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Circle({}, {})", self.center, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EPSILON_DIST;

    #[test]
    fn quarter_turn() {
        // Heading east at (0, 0), heading north at (10, 10): a left turn around (0, 10)
        let circle = Circle::tangent_to(
            Pt2D::new(0.0, 0.0),
            Angle::degrees(0.0),
            Pt2D::new(10.0, 10.0),
            Angle::degrees(90.0),
        )
        .unwrap();
        assert!(circle.center.approx_eq(Pt2D::new(0.0, 10.0), EPSILON_DIST));
        assert!(circle.radius.approx_eq(Distance::meters(10.0), EPSILON_DIST));
        assert!(circle.contains_pt(Pt2D::new(1.0, 9.0)));
    }
}
