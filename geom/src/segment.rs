use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spiral::spiral_local;
use crate::{Angle, Distance, Pt2D, EPSILON_DIST};

/// A position plus the heading of travel there.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanState {
    pub pt: Pt2D,
    pub heading: Angle,
}

impl PlanState {
    pub fn new(pt: Pt2D, heading: Angle) -> PlanState {
        PlanState { pt, heading }
    }

    /// The same position, facing the other way.
    pub fn reversed(self) -> PlanState {
        PlanState {
            pt: self.pt,
            heading: self.heading.opposite(),
        }
    }

    /// Moves sideways from the direction of travel. Positive is to the left.
    pub fn lateral(self, t: Distance) -> Pt2D {
        if t >= Distance::ZERO {
            self.pt.project_away(t, self.heading.rotate_degs(90.0))
        } else {
            self.pt.project_away(-t, self.heading.rotate_degs(-90.0))
        }
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} facing {}", self.pt, self.heading)
    }
}

/// Curvature is positive for left (counter-clockwise) turns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SegmentKind {
    Line,
    Arc { curvature: f64 },
    /// Curvature changes linearly over the length of the segment.
    Spiral { curv_start: f64, curv_end: f64 },
}

/// One analytic piece of a road's plan view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometrySegment {
    /// Arclength at the start of this segment, relative to the chain it belongs to
    pub s: Distance,
    pub start: Pt2D,
    pub heading: Angle,
    pub length: Distance,
    pub kind: SegmentKind,
}

impl GeometrySegment {
    pub fn new(s: Distance, start: PlanState, length: Distance, kind: SegmentKind) -> GeometrySegment {
        GeometrySegment {
            s,
            start: start.pt,
            heading: start.heading,
            length,
            kind,
        }
    }

    pub fn line(s: Distance, start: PlanState, length: Distance) -> GeometrySegment {
        GeometrySegment::new(s, start, length, SegmentKind::Line)
    }

    pub fn end_s(&self) -> Distance {
        self.s + self.length
    }

    pub fn start_state(&self) -> PlanState {
        PlanState::new(self.start, self.heading)
    }

    pub fn end_state(&self) -> PlanState {
        self.state_at(self.end_s())
    }

    pub fn is_line(&self) -> bool {
        self.kind == SegmentKind::Line
    }

    /// Curvature at an arclength (relative to the chain) within this segment.
    pub fn curvature_at(&self, s: Distance) -> f64 {
        match self.kind {
            SegmentKind::Line => 0.0,
            SegmentKind::Arc { curvature } => curvature,
            SegmentKind::Spiral {
                curv_start,
                curv_end,
            } => {
                let pct = self.local(s).safe_percent(self.length);
                curv_start + (curv_end - curv_start) * pct
            }
        }
    }

    fn local(&self, s: Distance) -> Distance {
        (s - self.s).clamp_to(Distance::ZERO, self.length)
    }

    /// Evaluates the position and heading at some arclength, relative to the chain. Values outside
    /// this segment are clamped to its ends.
    pub fn state_at(&self, s: Distance) -> PlanState {
        let ds = self.local(s).inner_meters();
        let (x, y, theta) = match self.kind {
            SegmentKind::Line => (ds, 0.0, 0.0),
            SegmentKind::Arc { curvature } => {
                if curvature.abs() < 1e-12 {
                    (ds, 0.0, 0.0)
                } else {
                    let theta = curvature * ds;
                    (theta.sin() / curvature, (1.0 - theta.cos()) / curvature, theta)
                }
            }
            SegmentKind::Spiral {
                curv_start,
                curv_end,
            } => {
                let dk = if self.length > Distance::ZERO {
                    (curv_end - curv_start) / self.length.inner_meters()
                } else {
                    0.0
                };
                spiral_local(curv_start, dk, ds)
            }
        };

        let (sin, cos) = self.heading.raw_radians().sin_cos();
        PlanState {
            pt: Pt2D::new(
                self.start.x() + x * cos - y * sin,
                self.start.y() + x * sin + y * cos,
            ),
            heading: self.heading.rotate_rads(theta),
        }
    }

    /// Returns the piece of this segment between two arclengths (relative to the chain), starting
    /// at arclength `from`. None if that piece is too short to matter.
    pub fn slice(&self, from: Distance, to: Distance) -> Option<GeometrySegment> {
        let from = from.clamp_to(self.s, self.end_s());
        let to = to.clamp_to(self.s, self.end_s());
        if to - from < EPSILON_DIST {
            return None;
        }
        let kind = match self.kind {
            SegmentKind::Spiral { .. } => SegmentKind::Spiral {
                curv_start: self.curvature_at(from),
                curv_end: self.curvature_at(to),
            },
            other => other,
        };
        Some(GeometrySegment::new(
            from,
            self.state_at(from),
            to - from,
            kind,
        ))
    }

    /// The same segment, moved to start at a different arclength.
    pub fn rebased(&self, s: Distance) -> GeometrySegment {
        GeometrySegment { s, ..*self }
    }
}

impl fmt::Display for GeometrySegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?} from s={} at {}, length {}",
            self.kind,
            self.s,
            self.start_state(),
            self.length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f64, y: f64, degs: f64) -> PlanState {
        PlanState::new(Pt2D::new(x, y), Angle::degrees(degs))
    }

    #[test]
    fn line_and_arc() {
        let line = GeometrySegment::line(Distance::ZERO, state(1.0, 1.0, 90.0), Distance::meters(5.0));
        let end = line.end_state();
        assert!(end.pt.approx_eq(Pt2D::new(1.0, 6.0), EPSILON_DIST));

        // A quarter circle of radius 10, turning right
        let arc = GeometrySegment::new(
            Distance::ZERO,
            state(0.0, 0.0, 0.0),
            Distance::meters(10.0 * std::f64::consts::FRAC_PI_2),
            SegmentKind::Arc { curvature: -0.1 },
        );
        let end = arc.end_state();
        assert!(end.pt.approx_eq(Pt2D::new(10.0, -10.0), EPSILON_DIST));
        assert!(end.heading.approx_eq(Angle::degrees(-90.0), 1e-9));
    }

    #[test]
    fn slicing_a_spiral_matches_the_original() {
        let spiral = GeometrySegment::new(
            Distance::meters(3.0),
            state(5.0, 5.0, 30.0),
            Distance::meters(20.0),
            SegmentKind::Spiral {
                curv_start: 0.0,
                curv_end: 0.08,
            },
        );
        let piece = spiral
            .slice(Distance::meters(10.0), Distance::meters(23.0))
            .unwrap();
        assert_eq!(piece.s, Distance::meters(10.0));
        assert!(piece.length.approx_eq(Distance::meters(13.0), EPSILON_DIST));
        let expected = spiral.end_state();
        let actual = piece.end_state();
        assert!(actual.pt.approx_eq(expected.pt, EPSILON_DIST));
        assert!(actual.heading.approx_eq(expected.heading, 1e-6));

        assert!(spiral
            .slice(Distance::meters(23.0), Distance::meters(30.0))
            .is_none());
    }
}
