//! Turns a list of control points into a continuous chain of lines, arcs and spirals.
//!
//! Without headings, the control points are treated as a polyline and each interior corner is
//! rounded off with a circular arc. When headings are given (or the spline is explicit), each
//! consecutive pair of points is joined by a line/spiral/spiral/line chain that leaves the first
//! point along its heading and arrives at the second along its heading.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spiral::spiral_local;
use crate::{
    chain_length, check_continuity, clamp, Angle, Circle, Distance, GeometrySegment, InfiniteLine, PlanState, Pt2D,
    SegmentKind, TurnDirection, EPSILON_ANGLE, EPSILON_DIST,
};

/// How control points are turned into geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineKind {
    /// Corners are rounded off with arcs, unless a control point has a heading.
    Auto,
    /// Every pair of points is joined with curves respecting the headings.
    Explicit,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub pt: Pt2D,
    /// If absent, a heading is estimated from the neighboring points.
    pub heading: Option<Angle>,
}

impl ControlPoint {
    pub fn new(pt: Pt2D) -> ControlPoint {
        ControlPoint { pt, heading: None }
    }

    pub fn with_heading(pt: Pt2D, heading: Angle) -> ControlPoint {
        ControlPoint {
            pt,
            heading: Some(heading),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FitError {
    /// The control points can't produce valid geometry.
    Degenerate(String),
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FitError::Degenerate(msg) => write!(f, "degenerate geometry: {}", msg),
        }
    }
}

impl std::error::Error for FitError {}

// Connecting two states might need to split into S-curves this many times
const MAX_SPLIT_DEPTH: usize = 2;
// Corners sharper than this can't be rounded off
const MAX_DEFLECTION: f64 = std::f64::consts::PI - 1e-6;

/// Fits a chain of segments through some control points. The chain starts at arclength 0 and
/// passes through the first and last control point.
pub fn fit_spline(
    kind: SplineKind,
    control_points: &[ControlPoint],
) -> Result<Vec<GeometrySegment>, FitError> {
    let pts = dedupe(control_points);
    if pts.len() < 2 {
        return Err(FitError::Degenerate(format!(
            "need at least two distinct control points, got {}",
            pts.len()
        )));
    }

    let segments = if kind == SplineKind::Explicit || pts.iter().any(|cp| cp.heading.is_some()) {
        fit_with_headings(&pts)?
    } else {
        let pts: Vec<Pt2D> = pts.iter().map(|cp| cp.pt).collect();
        fit_rounded_corners(&pts)?
    };
    Ok(tidy(segments))
}

/// Joins two oriented points with a chain of segments, starting at arclength 0. Used both for
/// splines with headings and for the short roads connecting lanes through a junction.
pub fn connect(start: PlanState, end: PlanState) -> Result<Vec<GeometrySegment>, FitError> {
    let segments = tidy(connect_depth(start, end, 0)?);
    if let Err(err) = check_continuity(&segments) {
        return Err(FitError::Degenerate(format!(
            "connecting {} to {} left a gap: {}",
            start, end, err
        )));
    }
    Ok(segments)
}

// Consecutive points that coincide are merged. A heading on either survives.
fn dedupe(control_points: &[ControlPoint]) -> Vec<ControlPoint> {
    let mut result: Vec<ControlPoint> = Vec::new();
    for cp in control_points {
        if let Some(last) = result.last_mut() {
            if last.pt.approx_eq(cp.pt, EPSILON_DIST) {
                if last.heading.is_none() {
                    last.heading = cp.heading;
                }
                continue;
            }
        }
        result.push(*cp);
    }
    result
}

// Signed distance from `from` to `to`, measured along the heading of `from`.
fn along(from: PlanState, to: Pt2D) -> f64 {
    let (dx, dy) = from.heading.to_direction();
    (to.x() - from.pt.x()) * dx + (to.y() - from.pt.y()) * dy
}

fn fit_rounded_corners(pts: &[Pt2D]) -> Result<Vec<GeometrySegment>, FitError> {
    let n = pts.len();
    let legs: Vec<f64> = pts
        .windows(2)
        .map(|pair| pair[0].dist_to(pair[1]).inner_meters())
        .collect();
    let headings: Vec<Angle> = pts.windows(2).map(|pair| pair[0].angle_to(pair[1])).collect();

    let turns: Vec<TurnDirection> = (1..n - 1)
        .map(|v| TurnDirection::from_pts(pts[v - 1], pts[v], pts[v + 1]))
        .collect();
    for v in 1..n - 1 {
        let deflection = headings[v - 1].shortest_rotation_towards(headings[v]);
        if deflection.abs() > MAX_DEFLECTION {
            return Err(FitError::Degenerate(format!(
                "control points reverse direction at {}",
                pts[v]
            )));
        }
    }

    // Vertex v (for 1 <= v < n - 1) has a turn stored at turns[v - 1]. A leg can be used entirely
    // by one corner if the vertex at its other end doesn't need any of it.
    let needs_room = |v: usize| v > 0 && v < n - 1 && turns[v - 1] != TurnDirection::Straight;
    let share = |leg: usize, v: usize| {
        let other = if leg == v { v + 1 } else { leg };
        if needs_room(other) {
            legs[leg] / 2.0
        } else {
            legs[leg]
        }
    };

    let mut segments = Vec::new();
    let mut s = Distance::ZERO;
    let mut current = PlanState::new(pts[0], headings[0]);
    for v in 1..n - 1 {
        if turns[v - 1] == TurnDirection::Straight {
            continue;
        }
        let tangent = share(v - 1, v).min(share(v, v));
        let tangent_in = pts[v].project_away(Distance::meters(tangent), headings[v - 1].opposite());
        let tangent_out = pts[v].project_away(Distance::meters(tangent), headings[v]);

        let approach = along(current, tangent_in);
        if approach > EPSILON_DIST.inner_meters() {
            let line = GeometrySegment::line(s, current, Distance::meters(approach));
            s += line.length;
            current = line.end_state();
            segments.push(line);
        }

        let circle = Circle::tangent_to(tangent_in, headings[v - 1], tangent_out, headings[v])
            .ok_or_else(|| {
                FitError::Degenerate(format!("can't round off the corner at {}", pts[v]))
            })?;
        let deflection = headings[v - 1].shortest_rotation_towards(headings[v]);
        let arc = GeometrySegment::new(
            s,
            current,
            circle.radius * deflection.abs(),
            SegmentKind::Arc {
                curvature: turns[v - 1].sign() / circle.radius.inner_meters(),
            },
        );
        s += arc.length;
        current = arc.end_state();
        segments.push(arc);
    }

    let last = along(current, pts[n - 1]);
    if last > EPSILON_DIST.inner_meters() {
        segments.push(GeometrySegment::line(s, current, Distance::meters(last)));
    }
    if segments.is_empty() {
        return Err(FitError::Degenerate("no geometry left after fitting".to_string()));
    }
    Ok(segments)
}

// Headings that weren't specified get estimated from the neighbors: the bisector at interior
// points, and the direction of the adjacent leg at the ends.
fn estimate_headings(pts: &[ControlPoint]) -> Vec<Angle> {
    let n = pts.len();
    (0..n)
        .map(|i| {
            if let Some(h) = pts[i].heading {
                return h;
            }
            if i == 0 {
                return pts[0].pt.angle_to(pts[1].pt);
            }
            if i == n - 1 {
                return pts[n - 2].pt.angle_to(pts[n - 1].pt);
            }
            let incoming = pts[i - 1].pt.angle_to(pts[i].pt);
            let outgoing = pts[i].pt.angle_to(pts[i + 1].pt);
            incoming.rotate_rads(incoming.shortest_rotation_towards(outgoing) / 2.0)
        })
        .collect()
}

fn fit_with_headings(pts: &[ControlPoint]) -> Result<Vec<GeometrySegment>, FitError> {
    let headings = estimate_headings(pts);
    let mut segments = Vec::new();
    for i in 0..pts.len() - 1 {
        let start = PlanState::new(pts[i].pt, headings[i]);
        let end = PlanState::new(pts[i + 1].pt, headings[i + 1]);
        let offset = chain_length(&segments);
        for g in connect_depth(start, end, 0)? {
            segments.push(g.rebased(g.s + offset));
        }
    }
    if segments.is_empty() {
        return Err(FitError::Degenerate("no geometry left after fitting".to_string()));
    }
    Ok(segments)
}

fn connect_depth(
    start: PlanState,
    end: PlanState,
    depth: usize,
) -> Result<Vec<GeometrySegment>, FitError> {
    let dist = start.pt.dist_to(end.pt);
    let deflection = start.heading.shortest_rotation_towards(end.heading);
    if dist < EPSILON_DIST {
        if deflection.abs() <= EPSILON_ANGLE {
            return Ok(Vec::new());
        }
        return Err(FitError::Degenerate(format!(
            "can't turn in place at {}",
            start.pt
        )));
    }

    let sideways = InfiniteLine::from_pt_angle(start.pt, start.heading).signed_dist_to(end.pt);
    if deflection.abs() <= EPSILON_ANGLE && sideways.abs() < EPSILON_DIST / 10.0 {
        let length = along(start, end.pt);
        if length > 0.0 {
            return Ok(vec![GeometrySegment::line(
                Distance::ZERO,
                start,
                Distance::meters(length),
            )]);
        }
    }

    if let Some(segments) = try_symmetric_spirals(start, end, deflection) {
        return Ok(segments);
    }

    if depth >= MAX_SPLIT_DEPTH {
        return Err(FitError::Degenerate(format!(
            "unable to connect {} to {}",
            start, end
        )));
    }
    // Split into two halves meeting at the midpoint of the chord, where the heading mirrors the
    // ends around the chord.
    let chord = start.pt.angle_to(end.pt);
    let into_chord = start.heading.shortest_rotation_towards(chord);
    let out_of_chord = chord.shortest_rotation_towards(end.heading);
    let middle = PlanState::new(
        Pt2D::new(
            (start.pt.x() + end.pt.x()) / 2.0,
            (start.pt.y() + end.pt.y()) / 2.0,
        ),
        chord.rotate_rads((into_chord - out_of_chord) / 2.0),
    );
    let mut segments = connect_depth(start, middle, depth + 1)?;
    let offset = chain_length(&segments);
    for g in connect_depth(middle, end, depth + 1)? {
        segments.push(g.rebased(g.s + offset));
    }
    Ok(segments)
}

// Builds line, spiral, spiral, line, where the two spirals mirror each other and meet at the
// point of maximum curvature. Needs the two tangent lines to meet ahead of both states.
fn try_symmetric_spirals(
    start: PlanState,
    end: PlanState,
    deflection: f64,
) -> Option<Vec<GeometrySegment>> {
    if deflection.abs() <= EPSILON_ANGLE || deflection.abs() > MAX_DEFLECTION - 0.01 {
        return None;
    }
    let vertex = InfiniteLine::from_pt_angle(start.pt, start.heading)
        .intersection(&InfiniteLine::from_pt_angle(end.pt, end.heading))?;
    let d0 = along(start, vertex);
    let d1 = -along(end, vertex);
    if d0 <= EPSILON_DIST.inner_meters() || d1 <= EPSILON_DIST.inner_meters() {
        return None;
    }

    // For a unit length spiral reaching the half deflection, the tangent length scales linearly
    // with the spiral length.
    let half = deflection.abs() / 2.0;
    let (x1, y1, _) = spiral_local(0.0, deflection.abs(), 1.0);
    let unit_tangent = x1 + y1 * half.tan();
    if unit_tangent <= 0.0 {
        return None;
    }
    // Any spiral length up to the one using the whole shorter tangent fits, but it must not
    // shrink towards zero: that's a corner at the vertex.
    let guess = d0.min(d1) / unit_tangent;
    let (shortest, longest) = (0.5 * guess, guess);
    let mut spiral_len = guess;

    // The closed-form guess is refined against the actual endpoint, since the spirals are
    // integrated numerically.
    let miss = |len: f64| -> f64 {
        let segments = build_spirals(start, deflection, d0, unit_tangent, len);
        let tail = segments.last().map(|g| g.end_state()).unwrap_or(start);
        InfiniteLine::from_pt_angle(tail.pt, end.heading)
            .signed_dist_to(end.pt)
            .inner_meters()
    };
    let mut prev_len = spiral_len * 0.99;
    let mut prev_miss = miss(prev_len);
    for _ in 0..8 {
        let current_miss = miss(spiral_len);
        if current_miss.abs() < 1e-9 || (current_miss - prev_miss).abs() < 1e-15 {
            break;
        }
        let next = spiral_len - current_miss * (spiral_len - prev_len) / (current_miss - prev_miss);
        if !next.is_finite() {
            break;
        }
        prev_len = spiral_len;
        prev_miss = current_miss;
        spiral_len = clamp(next, shortest, longest);
    }

    let mut segments = build_spirals(start, deflection, d0, unit_tangent, spiral_len);
    let tail = segments.last().map(|g| g.end_state()).unwrap_or(start);
    let remaining = along(tail, end.pt);
    if remaining < -EPSILON_DIST.inner_meters() {
        return None;
    }
    let s = chain_length(&segments);
    if remaining > EPSILON_DIST.inner_meters() {
        segments.push(GeometrySegment::line(s, tail, Distance::meters(remaining)));
    }

    let reached = segments.last()?.end_state();
    if !reached.pt.approx_eq(end.pt, EPSILON_DIST)
        || !reached.heading.approx_eq(end.heading, EPSILON_ANGLE)
        || check_continuity(&segments).is_err()
    {
        return None;
    }
    Some(segments)
}

// The leading line and both spirals. The trailing line is whatever is left to reach the end.
fn build_spirals(
    start: PlanState,
    deflection: f64,
    d0: f64,
    unit_tangent: f64,
    spiral_len: f64,
) -> Vec<GeometrySegment> {
    // Each spiral turns through half the deflection
    let peak = deflection / spiral_len;
    let mut segments = Vec::new();
    let mut s = Distance::ZERO;
    let mut current = start;

    let lead = d0 - spiral_len * unit_tangent;
    if lead > EPSILON_DIST.inner_meters() {
        let line = GeometrySegment::line(s, current, Distance::meters(lead));
        s += line.length;
        current = line.end_state();
        segments.push(line);
    }
    for (curv_start, curv_end) in [(0.0, peak), (peak, 0.0)] {
        let spiral = GeometrySegment::new(
            s,
            current,
            Distance::meters(spiral_len),
            SegmentKind::Spiral {
                curv_start,
                curv_end,
            },
        );
        s += spiral.length;
        current = spiral.end_state();
        segments.push(spiral);
    }
    segments
}

// Drops zero-length pieces that don't turn, merges consecutive collinear lines, and renumbers
// arclength so the chain starts at 0 with no gaps.
fn tidy(segments: Vec<GeometrySegment>) -> Vec<GeometrySegment> {
    let mut result: Vec<GeometrySegment> = Vec::new();
    for g in segments {
        if g.length < EPSILON_DIST && g.end_state().heading.approx_eq(g.heading, EPSILON_ANGLE) {
            continue;
        }
        if let Some(last) = result.last_mut() {
            if last.is_line() && g.is_line() && last.heading.approx_eq(g.heading, 1e-9) {
                last.length += g.length;
                continue;
            }
        }
        result.push(g);
    }
    let mut s = Distance::ZERO;
    for g in &mut result {
        g.s = s;
        s += g.length;
    }
    result
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<ControlPoint> {
        raw.iter()
            .map(|(x, y)| ControlPoint::new(Pt2D::new(*x, *y)))
            .collect()
    }

    fn ends_at(segments: &[GeometrySegment], pt: Pt2D) -> bool {
        segments
            .last()
            .map(|g| g.end_state().pt.approx_eq(pt, EPSILON_DIST))
            .unwrap_or(false)
    }

    #[test]
    fn two_points_make_a_line() {
        let segments = fit_spline(SplineKind::Auto, &pts(&[(0.0, 0.0), (100.0, 0.0)])).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_line());
        assert_eq!(segments[0].s, Distance::ZERO);
        assert!(segments[0]
            .length
            .approx_eq(Distance::meters(100.0), EPSILON_DIST));
    }

    #[test]
    fn collinear_points_merge() {
        let segments = fit_spline(
            SplineKind::Auto,
            &pts(&[(0.0, 0.0), (40.0, 0.0), (40.0, 0.0), (100.0, 0.0)]),
        )
        .unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0]
            .length
            .approx_eq(Distance::meters(100.0), EPSILON_DIST));
    }

    #[test]
    fn corner_gets_an_arc() {
        // The shorter leg is used up entirely by the arc
        let segments = fit_spline(
            SplineKind::Auto,
            &pts(&[(0.0, 0.0), (50.0, 0.0), (50.0, 20.0)]),
        )
        .unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_line());
        assert!(segments[0]
            .length
            .approx_eq(Distance::meters(30.0), EPSILON_DIST));
        match segments[1].kind {
            SegmentKind::Arc { curvature } => assert!((curvature - 1.0 / 20.0).abs() < 1e-9),
            other => panic!("expected an arc, got {:?}", other),
        }
        check_continuity(&segments).unwrap();
        assert!(ends_at(&segments, Pt2D::new(50.0, 20.0)));
        assert!(segments
            .last()
            .unwrap()
            .end_state()
            .heading
            .approx_eq(Angle::degrees(90.0), 1e-9));
    }

    #[test]
    fn right_turns_have_negative_curvature() {
        let segments = fit_spline(
            SplineKind::Auto,
            &pts(&[(0.0, 0.0), (20.0, 0.0), (20.0, -50.0)]),
        )
        .unwrap();
        match segments[0].kind {
            SegmentKind::Arc { curvature } => assert!(curvature < 0.0),
            other => panic!("expected an arc, got {:?}", other),
        }
        assert!(ends_at(&segments, Pt2D::new(20.0, -50.0)));
    }

    #[test]
    fn reversal_is_degenerate() {
        assert!(matches!(
            fit_spline(
                SplineKind::Auto,
                &pts(&[(0.0, 0.0), (50.0, 0.0), (10.0, 0.0)])
            ),
            Err(FitError::Degenerate(_))
        ));
        assert!(fit_spline(SplineKind::Auto, &pts(&[(3.0, 3.0), (3.0, 3.0)])).is_err());
        assert!(fit_spline(SplineKind::Auto, &[]).is_err());
    }

    #[test]
    fn connect_a_quarter_turn() {
        let start = PlanState::new(Pt2D::new(-10.0, 0.0), Angle::degrees(0.0));
        let end = PlanState::new(Pt2D::new(0.0, 10.0), Angle::degrees(90.0));
        let segments = connect(start, end).unwrap();
        check_continuity(&segments).unwrap();
        assert!(ends_at(&segments, end.pt));
        assert!(segments
            .last()
            .unwrap()
            .end_state()
            .heading
            .approx_eq(end.heading, EPSILON_ANGLE));
        assert!(segments
            .iter()
            .any(|g| matches!(g.kind, SegmentKind::Spiral { .. })));
    }

    #[test]
    fn connect_uneven_legs() {
        let start = PlanState::new(Pt2D::new(0.0, 0.0), Angle::degrees(0.0));
        let end = PlanState::new(Pt2D::new(40.0, -10.0), Angle::degrees(-90.0));
        let segments = connect(start, end).unwrap();
        check_continuity(&segments).unwrap();
        assert!(segments[0].is_line());
        assert!(ends_at(&segments, end.pt));
    }

    #[test]
    fn connect_straight_and_offset() {
        let start = PlanState::new(Pt2D::new(0.0, 0.0), Angle::degrees(0.0));
        let straight = connect(
            start,
            PlanState::new(Pt2D::new(25.0, 0.0), Angle::degrees(0.0)),
        )
        .unwrap();
        assert_eq!(straight.len(), 1);

        // Parallel but shifted sideways needs an S-curve
        let end = PlanState::new(Pt2D::new(30.0, 4.0), Angle::degrees(0.0));
        let s_curve = connect(start, end).unwrap();
        check_continuity(&s_curve).unwrap();
        assert!(ends_at(&s_curve, end.pt));
    }

    #[test]
    fn connect_keeps_a_curve_at_the_vertex() {
        // The tangent lines meet unevenly; the spirals mustn't shrink into a corner
        let start = PlanState::new(Pt2D::new(-3.5911, 6.4026), Angle::new_rads(0.08394));
        let end = PlanState::new(Pt2D::new(0.0, 3.6), Angle::degrees(270.0));
        let segments = connect(start, end).unwrap();
        check_continuity(&segments).unwrap();
        assert!(ends_at(&segments, end.pt));
        assert!(segments
            .iter()
            .any(|g| matches!(g.kind, SegmentKind::Spiral { .. }) && g.length > Distance::meters(0.5)));
    }

    #[test]
    fn random_connections_are_continuous() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for _ in 0..200 {
            // Build the pair from the vertex where the tangent lines meet, then move the whole
            // thing somewhere random
            let d0 = rng.gen_range(2.0..40.0);
            let d1 = rng.gen_range(2.0..40.0);
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let deflection = sign * rng.gen_range(10.0..150.0);
            let rotation = Angle::degrees(rng.gen_range(0.0..360.0));
            let origin = Pt2D::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0));

            let vertex = origin.project_away(Distance::meters(d0), rotation);
            let end_heading = rotation.rotate_degs(deflection);
            let start = PlanState::new(origin, rotation);
            let end = PlanState::new(
                vertex.project_away(Distance::meters(d1), end_heading),
                end_heading,
            );

            let segments = connect(start, end).unwrap();
            check_continuity(&segments).unwrap();
            assert_eq!(segments[0].s, Distance::ZERO);
            assert!(segments[0].heading.approx_eq(start.heading, EPSILON_ANGLE));
            let reached = segments.last().unwrap().end_state();
            assert!(reached.pt.approx_eq(end.pt, EPSILON_DIST));
            assert!(reached.heading.approx_eq(end.heading, EPSILON_ANGLE));
        }
    }

    #[test]
    fn explicit_headings_are_respected() {
        let cps = vec![
            ControlPoint::with_heading(Pt2D::new(0.0, 0.0), Angle::degrees(0.0)),
            ControlPoint::new(Pt2D::new(50.0, 20.0)),
            ControlPoint::with_heading(Pt2D::new(100.0, 0.0), Angle::degrees(-30.0)),
        ];
        let segments = fit_spline(SplineKind::Auto, &cps).unwrap();
        check_continuity(&segments).unwrap();
        assert!(segments[0].heading.approx_eq(Angle::degrees(0.0), 1e-9));
        let end = segments.last().unwrap().end_state();
        assert!(end.pt.approx_eq(Pt2D::new(100.0, 0.0), EPSILON_DIST));
        assert!(end.heading.approx_eq(Angle::degrees(-30.0), EPSILON_ANGLE));
    }

    #[test]
    fn random_polylines_are_continuous() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for _ in 0..50 {
            // A meandering path that keeps heading roughly east, so corners never double back
            let mut raw = vec![(0.0, 0.0)];
            let mut x = 0.0;
            for _ in 0..rng.gen_range(2..7) {
                x += rng.gen_range(20.0..80.0);
                raw.push((x, rng.gen_range(-40.0..40.0)));
            }
            let cps = pts(&raw);
            let segments = fit_spline(SplineKind::Auto, &cps).unwrap();
            check_continuity(&segments).unwrap();
            assert_eq!(segments[0].s, Distance::ZERO);
            assert!(ends_at(&segments, cps.last().unwrap().pt));

            // Rounding corners makes the path shorter than the polyline, but never shorter
            // than the straight line between the ends
            let polyline: f64 = raw
                .windows(2)
                .map(|p| Pt2D::new(p[0].0, p[0].1).dist_to(Pt2D::new(p[1].0, p[1].1)).inner_meters())
                .sum();
            let chord = cps[0].pt.dist_to(cps.last().unwrap().pt).inner_meters();
            let total = chain_length(&segments).inner_meters();
            assert!(total <= polyline + 1e-6);
            assert!(total >= chord - 1e-6);
        }
    }
}
