//! Turns intersection hits into junctions, and keeps junctions in a consistent state after
//! edits.

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Distance, Pt2D, EPSILON_DIST};

use crate::make::intersections::find_intersections_3d;
use crate::make::{connections, segment_map};
use crate::{
    ContactPoint, EditEffects, Junction, JunctionID, Road, RoadID, RoadLink, RoadNetwork,
    SegmentRef, SplineID,
};

/// How far along a road is in getting junctions where it crosses other roads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadJunctionState {
    NoIntersection,
    /// Crosses another road, but no junction has been made there yet
    SingleIntersection,
    JunctionExists,
}

impl RoadNetwork {
    pub fn junction_state(&self, r: RoadID) -> Result<RoadJunctionState> {
        let road = self.get_r(r)?;
        if [road.predecessor, road.successor]
            .iter()
            .any(|link| matches!(link, Some(RoadLink::Junction(_))))
        {
            return Ok(RoadJunctionState::JunctionExists);
        }
        if find_intersections_3d(self, r).is_empty() {
            Ok(RoadJunctionState::NoIntersection)
        } else {
            Ok(RoadJunctionState::SingleIntersection)
        }
    }
}

// A hit, in spline coordinates. Road ids go stale as soon as the first junction cuts them.
struct Crossing {
    point: Pt2D,
    spline_a: SplineID,
    s_a: Distance,
    width_a: Distance,
    spline_b: SplineID,
    s_b: Distance,
    width_b: Distance,
}

/// Puts a junction wherever a road crosses another. Crossings inside an existing auto junction
/// join that junction; others get a new one, cutting both roads for half the other road's width
/// on each side of the crossing. Afterwards, the road's spline joins any auto junction it passes
/// through without crossing one of its roads.
pub fn update_junctions_for_road(
    net: &mut RoadNetwork,
    r: RoadID,
    effects: &mut EditEffects,
) -> Result<()> {
    let spline = match net.get_r(r) {
        Ok(road) => road.spline,
        Err(_) => {
            return Ok(());
        }
    };
    let hits = find_intersections_3d(net, r);
    let mut crossings = Vec::new();
    for hit in hits {
        let a = net.get_r(hit.road_a)?;
        let b = net.get_r(hit.road_b)?;
        crossings.push(Crossing {
            point: hit.point,
            spline_a: a.spline,
            s_a: a.spline_offset + hit.s_a,
            width_a: a.width_at(hit.s_a),
            spline_b: b.spline,
            s_b: b.spline_offset + hit.s_b,
            width_b: b.width_at(hit.s_b),
        });
    }

    for crossing in crossings {
        let existing = net
            .all_junctions()
            .find(|j| j.auto && j.covers(crossing.point))
            .map(|j| j.id);
        let j = match existing {
            Some(j) => j,
            None => {
                let j = net.new_junction_id();
                let radius = Distance::meters(
                    (crossing.width_a.inner_meters() / 2.0)
                        .hypot(crossing.width_b.inner_meters() / 2.0),
                );
                net.put_junction(Junction::new(j, crossing.point, radius, true));
                info!(
                    "Created {} where {} crosses {}",
                    j, crossing.spline_a, crossing.spline_b
                );
                j
            }
        };
        splice(net, j, crossing.spline_a, crossing.s_a, crossing.width_b, effects)?;
        splice(net, j, crossing.spline_b, crossing.s_b, crossing.width_a, effects)?;
        effects.junction_stale(j);
    }

    join_junctions_passed_through(net, spline, effects)
}

// The roads already meeting at a junction have been cut back from its middle, so a spline
// running straight through it never crosses any of them.
fn join_junctions_passed_through(
    net: &mut RoadNetwork,
    spline: SplineID,
    effects: &mut EditEffects,
) -> Result<()> {
    let sp = net.get_s(spline)?;
    if sp.is_private() {
        return Ok(());
    }
    let along = sp.junctions();
    let mut found: Vec<(JunctionID, Distance, Distance)> = Vec::new();
    for junction in net.all_junctions() {
        if !junction.auto || along.contains(&junction.id) {
            continue;
        }
        for r in sp.roads() {
            let road = net.get_r(r)?;
            let s = match net.project(r, junction.center) {
                Ok((s, _)) => s,
                Err(_) => continue,
            };
            let inside = road
                .try_state_at(s)
                .map(|state| junction.covers(state.pt))
                .unwrap_or(false);
            if inside && level_with(net, road, s, junction.id) {
                found.push((junction.id, road.spline_offset + s, junction.radius));
                break;
            }
        }
    }

    for (j, s, half) in found {
        let sp = net.get_s(spline)?;
        if sp.junctions().contains(&j) {
            continue;
        }
        let (start, end) = room_around(sp.spans(), s, (s - half).max(Distance::ZERO), s + half);
        if end - start < EPSILON_DIST {
            warn!("No room for {} along {} at {}", j, spline, s);
            continue;
        }
        info!("{} passes through {}", spline, j);
        segment_map::insert_junction(net, spline, start, end, j, effects)?;
        effects.junction_stale(j);
    }
    Ok(())
}

// Shrinks [start, end) around `s` so it doesn't overlap any junction already along the spline.
fn room_around(
    spans: Vec<(Distance, Distance, SegmentRef)>,
    s: Distance,
    mut start: Distance,
    mut end: Distance,
) -> (Distance, Distance) {
    for (a, b, entry) in spans {
        if let SegmentRef::Junction(_) = entry {
            if b <= s {
                start = start.max(b);
            } else if a >= s {
                end = end.min(a);
            }
        }
    }
    (start, end)
}

// Whether a road at `s` is at the same level as any road end already at the junction.
fn level_with(net: &RoadNetwork, road: &Road, s: Distance, j: JunctionID) -> bool {
    let z = road.elevation_at(s);
    net.road_ends_at(j).into_iter().any(|end| {
        net.get_r(end.road)
            .map(
                |other| match (z, other.elevation_at(other.contact_s(end.contact))) {
                    (Some(z1), Some(z2)) => (z1 - z2).abs() < net.config.elevation_tolerance,
                    (None, None) => true,
                    _ => false,
                },
            )
            .unwrap_or(false)
    })
}

// Cuts a spline for a junction around `s`, unless the junction is already along it.
fn splice(
    net: &mut RoadNetwork,
    j: JunctionID,
    spline: SplineID,
    s: Distance,
    other_width: Distance,
    effects: &mut EditEffects,
) -> Result<()> {
    let sp = net.get_s(spline)?;
    if sp.junctions().contains(&j) {
        return Ok(());
    }
    let (a, b) = match sp.entry_at(s) {
        Some((a, b, SegmentRef::Road(_))) => (a, b),
        Some((_, _, SegmentRef::Junction(other))) => {
            debug!("{} at {} is already inside {}", spline, s, other);
            return Ok(());
        }
        None => {
            return Ok(());
        }
    };
    let half = other_width.max(net.config.default_lane_width) / 2.0;
    let start = (s - half).max(a);
    let end = (s + half).min(b);
    if end - start < EPSILON_DIST {
        warn!("No room for {} along {} at {}", j, spline, s);
        return Ok(());
    }
    segment_map::insert_junction(net, spline, start, end, j, effects)
}

/// Brings every junction touched by an edit up to date. Auto junctions that no longer join
/// anything are deleted, then the connections of everything else are rebuilt.
pub fn settle_junctions(net: &mut RoadNetwork, effects: &mut EditEffects) -> Result<()> {
    loop {
        let doomed = effects.stale_junctions().into_iter().find(|j| {
            net.get_j(*j)
                .map(|junction| junction.auto && !joins_anything(net, *j))
                .unwrap_or(false)
        });
        match doomed {
            Some(j) => {
                info!("{} doesn't join anything anymore, removing it", j);
                delete_junction(net, j, effects)?;
            }
            None => break,
        }
    }

    let mut todo: BTreeSet<JunctionID> = effects.stale_junctions().into_iter().collect();
    todo.extend(net.all_junctions().filter(|j| j.is_dirty()).map(|j| j.id));
    for j in todo {
        if net.junction_exists(j) {
            connections::rebuild_connections(net, j, effects)?;
        }
    }
    Ok(())
}

// At least two road ends, and not all from the same spline.
fn joins_anything(net: &RoadNetwork, j: JunctionID) -> bool {
    let ends = net.road_ends_at(j);
    let splines: BTreeSet<SplineID> = ends
        .iter()
        .filter_map(|end| net.get_r(end.road).ok().map(|r| r.spline))
        .collect();
    ends.len() >= 2 && splines.len() >= 2
}

/// Deletes a junction with its connections. Along every spline it covers, the neighboring roads
/// take back its span.
pub fn delete_junction(
    net: &mut RoadNetwork,
    j: JunctionID,
    effects: &mut EditEffects,
) -> Result<()> {
    connections::clear_connections(net, j, effects)?;
    for spline in net.spline_ids() {
        if net.spline_exists(spline) && net.get_s(spline)?.junctions().contains(&j) {
            segment_map::remove_entry(net, spline, SegmentRef::Junction(j), effects)?;
        }
    }
    // Road ends attached by hand
    for r in net.road_ids() {
        for contact in [ContactPoint::Start, ContactPoint::End] {
            let road = net.mut_road(r)?;
            if road.link(contact) == Some(RoadLink::Junction(j)) {
                road.set_link(contact, None);
                effects.road_changed(r);
            }
        }
    }
    net.take_junction(j);
    effects.junction_deleted(j);
    info!("Deleted {}", j);
    Ok(())
}
