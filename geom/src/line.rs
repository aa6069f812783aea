use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Angle, Distance, Pt2D, EPSILON_DIST};

/// A line segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    /// Creates a line segment between two points, which must not be the same
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Result<Line> {
        if pt1.approx_eq(pt2, EPSILON_DIST) {
            bail!("Line from {} to {} too small", pt1, pt2);
        }
        Ok(Line(pt1, pt2))
    }

    /// Equivalent to `Line::new(pt1, pt2).unwrap()`. Use this to effectively document an
    /// assertion at the call-site.
    pub fn must_new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line::new(pt1, pt2).unwrap()
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn length(&self) -> Distance {
        self.pt1().dist_to(self.pt2())
    }

    pub fn reversed(&self) -> Line {
        Line(self.pt2(), self.pt1())
    }

    pub fn angle(&self) -> Angle {
        self.pt1().angle_to(self.pt2())
    }

    pub fn infinite(&self) -> InfiniteLine {
        InfiniteLine(self.pt1(), self.pt2())
    }

    /// Where two segments cross, if they do.
    pub fn intersection(&self, other: &Line) -> Option<Pt2D> {
        // From http://bryceboe.com/2006/10/23/line-segment-intersection-algorithm/
        if is_counter_clockwise(self.pt1(), other.pt1(), other.pt2())
            == is_counter_clockwise(self.pt2(), other.pt1(), other.pt2())
            || is_counter_clockwise(self.pt1(), self.pt2(), other.pt1())
                == is_counter_clockwise(self.pt1(), self.pt2(), other.pt2())
        {
            return None;
        }

        let hit = self.infinite().intersection(&other.infinite())?;
        if self.contains_pt(hit) && other.contains_pt(hit) {
            Some(hit)
        } else {
            None
        }
    }

    /// Shifts the segment sideways. Positive is to the left of the direction of travel.
    pub fn shift_either_direction(&self, width: Distance) -> Line {
        let angle = self.angle().rotate_degs(90.0);
        let dist = width.abs();
        let angle = if width < Distance::ZERO {
            angle.opposite()
        } else {
            angle
        };
        Line(
            self.pt1().project_away(dist, angle),
            self.pt2().project_away(dist, angle),
        )
    }

    /// Returns a point along the line, clamped to the segment.
    pub fn dist_along(&self, dist: Distance) -> Pt2D {
        let len = self.length();
        let dist = dist.clamp_to(Distance::ZERO, len);
        self.unbounded_dist_along(dist)
    }

    /// Like `dist_along`, but the distance may go past either end.
    pub fn unbounded_dist_along(&self, dist: Distance) -> Pt2D {
        let percent = dist / self.length();
        Pt2D::new(
            self.pt1().x() + percent * (self.pt2().x() - self.pt1().x()),
            self.pt1().y() + percent * (self.pt2().y() - self.pt1().y()),
        )
    }

    /// How far along the segment is the closest point to `pt`? Clamped to the segment.
    pub fn dist_along_of_point(&self, pt: Pt2D) -> Distance {
        let len = self.length().inner_meters();
        let dx = self.pt2().x() - self.pt1().x();
        let dy = self.pt2().y() - self.pt1().y();
        let t = ((pt.x() - self.pt1().x()) * dx + (pt.y() - self.pt1().y()) * dy) / len;
        Distance::meters(crate::clamp(t, 0.0, len))
    }

    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        let closest = self.dist_along(self.dist_along_of_point(pt));
        closest.approx_eq(pt, EPSILON_DIST)
    }

    pub fn middle(&self) -> Pt2D {
        self.dist_along(self.length() / 2.0)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Line({} to {})", self.pt1(), self.pt2())
    }
}

fn is_counter_clockwise(pt1: Pt2D, pt2: Pt2D, pt3: Pt2D) -> bool {
    (pt3.y() - pt1.y()) * (pt2.x() - pt1.x()) > (pt2.y() - pt1.y()) * (pt3.x() - pt1.x())
}

/// An infinitely long line through two points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfiniteLine(Pt2D, Pt2D);

impl InfiniteLine {
    /// The line through `pt` with some heading.
    pub fn from_pt_angle(pt: Pt2D, angle: Angle) -> InfiniteLine {
        InfiniteLine(pt, pt.project_away(Distance::meters(1.0), angle))
    }

    /// Fails for parallel lines.
    pub fn intersection(&self, other: &InfiniteLine) -> Option<Pt2D> {
        // From https://en.wikipedia.org/wiki/Line%E2%80%93line_intersection
        let (x1, y1) = (self.0.x(), self.0.y());
        let (x2, y2) = (self.1.x(), self.1.y());
        let (x3, y3) = (other.0.x(), other.0.y());
        let (x4, y4) = (other.1.x(), other.1.y());

        let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
        let len1 = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        let len2 = ((x4 - x3).powi(2) + (y4 - y3).powi(2)).sqrt();
        // Normalize by the lengths, so the parallel check is really on the angle between them
        if denom.abs() <= 1e-9 * len1 * len2 {
            return None;
        }
        let a = x1 * y2 - y1 * x2;
        let b = x3 * y4 - y3 * x4;
        Some(Pt2D::new(
            (a * (x3 - x4) - (x1 - x2) * b) / denom,
            (a * (y3 - y4) - (y1 - y2) * b) / denom,
        ))
    }

    /// The signed distance from the line to `pt`, positive on the left.
    pub fn signed_dist_to(&self, pt: Pt2D) -> Distance {
        let len = self.0.dist_to(self.1).inner_meters();
        Distance::meters(self.0.cross(self.1, pt) / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_intersection() {
        let l1 = Line::must_new(Pt2D::new(-5.0, 0.0), Pt2D::new(5.0, 0.0));
        let l2 = Line::must_new(Pt2D::new(0.0, -5.0), Pt2D::new(0.0, 5.0));
        let hit = l1.intersection(&l2).unwrap();
        assert!(hit.approx_eq(Pt2D::zero(), EPSILON_DIST));

        let l3 = Line::must_new(Pt2D::new(6.0, -5.0), Pt2D::new(6.0, 5.0));
        assert!(l1.intersection(&l3).is_none());
    }

    #[test]
    fn infinite_lines() {
        let l1 = InfiniteLine::from_pt_angle(Pt2D::new(0.0, 0.0), Angle::degrees(0.0));
        let l2 = InfiniteLine::from_pt_angle(Pt2D::new(3.0, 7.0), Angle::degrees(90.0));
        let hit = l1.intersection(&l2).unwrap();
        assert!(hit.approx_eq(Pt2D::new(3.0, 0.0), EPSILON_DIST));

        let l3 = InfiniteLine::from_pt_angle(Pt2D::new(0.0, 1.0), Angle::degrees(180.0));
        assert!(l1.intersection(&l3).is_none());
        assert!(l1.signed_dist_to(Pt2D::new(2.0, 4.0)).approx_eq(Distance::meters(4.0), EPSILON_DIST));
    }

    #[test]
    fn shift() {
        let l = Line::must_new(Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0));
        let left = l.shift_either_direction(Distance::meters(2.0));
        assert!(left.pt1().approx_eq(Pt2D::new(0.0, 2.0), EPSILON_DIST));
        let right = l.shift_either_direction(Distance::meters(-2.0));
        assert!(right.pt2().approx_eq(Pt2D::new(10.0, -2.0), EPSILON_DIST));
    }
}
