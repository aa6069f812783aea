//! Geometry primitives for road design: points, headings, distances, analytic plan-view segments
//! (lines, arcs, spirals), and the fitter that turns control points into a chain of segments.
//!
//! Everything here is in a flat, 2D world space measured in meters. Headings are counter-clockwise
//! from the +x axis.

#[macro_use]
extern crate anyhow;

mod angle;
mod bounds;
mod circle;
mod distance;
mod find_closest;
pub mod fit;
mod line;
mod poly;
mod pt;
mod segment;
mod spiral;

pub use crate::angle::{Angle, TurnDirection};
pub use crate::bounds::Bounds;
pub use crate::circle::Circle;
pub use crate::distance::Distance;
pub use crate::find_closest::FindClosest;
pub use crate::fit::{ControlPoint, FitError, SplineKind};
pub use crate::line::{InfiniteLine, Line};
pub use crate::poly::Poly3;
pub use crate::pt::Pt2D;
pub use crate::segment::{GeometrySegment, PlanState, SegmentKind};

/// Two points closer than this are considered the same.
pub const EPSILON_DIST: Distance = Distance::const_meters(0.0001);
/// Two headings closer than this (in radians) are considered the same.
pub const EPSILON_ANGLE: f64 = 0.0001;

/// Restricts `x` to `[min, max]`. Unlike `f64::clamp`, this doesn't panic when `min > max`; `min`
/// wins.
pub fn clamp(x: f64, min: f64, max: f64) -> f64 {
    if x > max {
        max
    } else if x < min {
        min
    } else {
        x
    }
}

/// Total length of a chain of segments.
pub fn chain_length(segments: &[GeometrySegment]) -> Distance {
    segments.iter().map(|g| g.length).sum()
}

/// Evaluates a chain of contiguous segments at some distance along the whole chain. Distances
/// past either end are clamped to the nearest endpoint.
pub fn chain_position(segments: &[GeometrySegment], s: Distance) -> Option<PlanState> {
    let first = segments.first()?;
    if s <= first.s {
        return Some(first.state_at(first.s));
    }
    for g in segments {
        if s <= g.end_s() {
            return Some(g.state_at(s));
        }
    }
    let last = segments.last()?;
    Some(last.end_state())
}

/// The part of a chain between two arclengths, re-based so it starts at 0. Pieces too short to
/// matter are dropped.
pub fn slice_chain(
    segments: &[GeometrySegment],
    from: Distance,
    to: Distance,
) -> Vec<GeometrySegment> {
    let mut result = Vec::new();
    let mut s = Distance::ZERO;
    for g in segments {
        if g.end_s() <= from || g.s >= to {
            continue;
        }
        if let Some(piece) = g.slice(from, to) {
            result.push(piece.rebased(s));
            s += piece.length;
        }
    }
    result
}

/// Checks that a chain of segments is contiguous: each segment starts where the previous one ends,
/// in arclength, position and heading.
pub fn check_continuity(segments: &[GeometrySegment]) -> anyhow::Result<()> {
    for pair in segments.windows(2) {
        let end = pair[0].end_state();
        let start = pair[1].start_state();
        if (pair[0].end_s() - pair[1].s).abs() > EPSILON_DIST {
            bail!(
                "segment starting at {} ends at {}, but the next starts at {}",
                pair[0].s,
                pair[0].end_s(),
                pair[1].s
            );
        }
        if !end.pt.approx_eq(start.pt, EPSILON_DIST) {
            bail!("position gap between {} and {}", end.pt, start.pt);
        }
        if !end.heading.approx_eq(start.heading, EPSILON_ANGLE) {
            bail!("heading gap between {} and {}", end.heading, start.heading);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_a_chain() {
        let segments = fit::fit_spline(
            SplineKind::Auto,
            &[
                ControlPoint::new(Pt2D::new(0.0, 0.0)),
                ControlPoint::new(Pt2D::new(60.0, 0.0)),
                ControlPoint::new(Pt2D::new(60.0, 40.0)),
            ],
        )
        .unwrap();
        let total = chain_length(&segments);

        let first = slice_chain(&segments, Distance::ZERO, Distance::meters(30.0));
        let second = slice_chain(&segments, Distance::meters(30.0), total);
        assert_eq!(first[0].s, Distance::ZERO);
        assert_eq!(second[0].s, Distance::ZERO);
        check_continuity(&first).unwrap();
        check_continuity(&second).unwrap();
        assert!((chain_length(&first) + chain_length(&second)).approx_eq(total, EPSILON_DIST));

        let joint = chain_position(&segments, Distance::meters(30.0)).unwrap();
        assert!(second[0].start.approx_eq(joint.pt, EPSILON_DIST));
        assert!(chain_position(&segments, total * 2.0)
            .unwrap()
            .pt
            .approx_eq(Pt2D::new(60.0, 40.0), EPSILON_DIST));
    }
}
