use anyhow::Result;

use geom::{slice_chain, Distance, EPSILON_DIST};

use crate::make::{connections, segment_map};
use crate::objects::lane::{link_sections, split_sections};
use crate::{
    ContactPoint, EditEffects, EditError, LaneSection, Road, RoadEnd, RoadID, RoadLink,
    RoadNetwork, SegmentRef,
};

/// Splits a road at `s`, and gives the second half its own entry along the spline. Returns the
/// second half.
pub fn divide_road_at(
    net: &mut RoadNetwork,
    r: RoadID,
    s: Distance,
    effects: &mut EditEffects,
) -> Result<RoadID> {
    let road = net.get_r(r)?;
    if road.is_connecting() {
        bail!(EditError::TopologyConflict(format!(
            "can't divide {}, it's a connecting road",
            r
        )));
    }
    let spline = road.spline;
    let new_id = split_road(net, r, s, effects)?;
    let offset = net.get_r(new_id)?.spline_offset;

    let mut segments = net.get_s(spline)?.segments.clone();
    let idx = segments
        .iter()
        .position(|(_, entry)| *entry == SegmentRef::Road(r))
        .ok_or_else(|| {
            EditError::ReferentialIntegrityViolation(format!("{} isn't along {}", r, spline))
        })?;
    segments.insert(idx + 1, (offset, SegmentRef::Road(new_id)));
    segment_map::replace_segments(net, spline, segments, effects)?;
    Ok(new_id)
}

/// Splits one road object in two at `s`. The first half keeps the id; the second half is a new
/// road starting at 0. Doesn't touch the spline's segment map.
pub fn split_road(
    net: &mut RoadNetwork,
    r: RoadID,
    s: Distance,
    effects: &mut EditEffects,
) -> Result<RoadID> {
    let length = net.get_r(r)?.length();
    if s <= EPSILON_DIST || s >= length - EPSILON_DIST {
        bail!(EditError::GeometricDegeneracy(format!(
            "can't divide {} at {}; it's {} long",
            r, s, length
        )));
    }
    let new_id = net.new_road_id();
    let road = net.get_r(r)?;

    let geometry_before = slice_chain(&road.geometry, Distance::ZERO, s);
    let geometry_after = slice_chain(&road.geometry, s, length);
    let (mut sections_before, mut sections_after) = split_sections(&road.lane_sections, s);
    // Every lane continues into the new road with the same id
    if let Some(ls) = sections_before.last_mut() {
        for lane in ls.lanes.values_mut() {
            lane.successor = Some(lane.id);
        }
    }
    if let Some(ls) = sections_after.first_mut() {
        for lane in ls.lanes.values_mut() {
            lane.predecessor = Some(lane.id);
        }
    }
    let (elevation_before, elevation_after) = road.elevation.split(s);
    let old_successor = road.successor;

    let second = Road {
        id: new_id,
        geometry: geometry_after,
        lane_sections: sections_after,
        elevation: elevation_after,
        predecessor: Some(RoadLink::Road(r, ContactPoint::End)),
        successor: old_successor,
        spline: road.spline,
        spline_offset: road.spline_offset + s,
        junction: road.junction,
    };

    let road = net.mut_road(r)?;
    road.geometry = geometry_before;
    road.lane_sections = sections_before;
    road.elevation = elevation_before;
    road.successor = Some(RoadLink::Road(new_id, ContactPoint::Start));
    net.insert_road(second);

    // Whatever was attached to the old end now belongs to the new road
    match old_successor {
        Some(RoadLink::Road(x, contact)) if x != r => {
            let other = net.mut_road(x)?;
            if other.link(contact) == Some(RoadLink::Road(r, ContactPoint::End)) {
                other.set_link(contact, Some(RoadLink::Road(new_id, ContactPoint::End)));
                effects.road_changed(x);
            }
        }
        Some(RoadLink::Junction(j)) => {
            effects.junction_stale(j);
        }
        _ => {}
    }

    effects.road_changed(r);
    effects.road_changed(new_id);
    debug!("Divided {} at {}, creating {}", r, s, new_id);
    Ok(new_id)
}

/// Removes `[s0, s1]` from a road. Returns the part before the gap (which keeps the original id)
/// and the part after, either of which may be gone. The ends facing the gap are left unlinked.
pub fn cut_span(
    net: &mut RoadNetwork,
    r: RoadID,
    s0: Distance,
    s1: Distance,
    effects: &mut EditEffects,
) -> Result<(Option<RoadID>, Option<RoadID>)> {
    let length = net.get_r(r)?.length();
    let s0 = s0.clamp_to(Distance::ZERO, length);
    let s1 = s1.clamp_to(Distance::ZERO, length);
    if s1 - s0 < EPSILON_DIST {
        bail!(EditError::GeometricDegeneracy(format!(
            "can't cut {} from {} to {}",
            r, s0, s1
        )));
    }

    let tail = if s1 < length - EPSILON_DIST {
        let tail = split_road(net, r, s1, effects)?;
        net.mut_road(tail)?.predecessor = None;
        net.mut_road(r)?.successor = None;
        Some(tail)
    } else {
        detach_end(net, RoadEnd::new(r, ContactPoint::End), effects)?;
        None
    };

    let head = if s0 > EPSILON_DIST {
        let road = net.mut_road(r)?;
        road.geometry = slice_chain(&road.geometry, Distance::ZERO, s0);
        road.lane_sections = split_sections(&road.lane_sections, s0).0;
        road.elevation = road.elevation.split(s0).0;
        if let Some(ls) = road.lane_sections.last_mut() {
            for lane in ls.lanes.values_mut() {
                lane.successor = None;
            }
        }
        effects.road_changed(r);
        Some(r)
    } else {
        delete_road(net, r, effects)?;
        None
    };
    Ok((head, tail))
}

/// Folds road `q` into road `p`, which comes right before it along the same spline. `q`'s lane
/// sections and outgoing link move to `p`, and `q` is deleted. The caller fixes up the segment
/// map.
pub fn absorb_road(
    net: &mut RoadNetwork,
    p: RoadID,
    q: RoadID,
    effects: &mut EditEffects,
) -> Result<()> {
    let p_offset = net.get_r(p)?.spline_offset;
    let second = net
        .take_road(q)
        .ok_or_else(|| EditError::UnknownEntity(q.to_string()))?;
    let shift = second.spline_offset - p_offset;

    let road = net.mut_road(p)?;
    for (idx, mut ls) in second.lane_sections.into_iter().enumerate() {
        if idx == 0 {
            if let Some(last) = road.lane_sections.last() {
                if same_layout(last, &ls) {
                    continue;
                }
            }
        }
        ls.s += shift;
        road.lane_sections.push(ls);
    }
    link_sections(&mut road.lane_sections);
    road.successor = second.successor;

    match second.successor {
        Some(RoadLink::Road(x, contact)) => {
            if let Ok(other) = net.mut_road(x) {
                if other.link(contact) == Some(RoadLink::Road(q, ContactPoint::End)) {
                    other.set_link(contact, Some(RoadLink::Road(p, ContactPoint::End)));
                    effects.road_changed(x);
                }
            }
        }
        Some(RoadLink::Junction(j)) => {
            if net.junction_exists(j) {
                connections::drop_connections_touching(net, j, q, effects)?;
                effects.junction_stale(j);
            }
        }
        None => {}
    }

    effects.road_deleted(q);
    effects.road_changed(p);
    debug!("Merged {} into {}", q, p);
    Ok(())
}

/// Joins two roads that directly follow each other along one spline.
pub fn merge_roads(
    net: &mut RoadNetwork,
    first: RoadID,
    second: RoadID,
    effects: &mut EditEffects,
) -> Result<()> {
    let a = net.get_r(first)?;
    let b = net.get_r(second)?;
    if a.is_connecting() || b.is_connecting() {
        bail!(EditError::TopologyConflict(
            "connecting roads can't be merged".to_string()
        ));
    }
    if a.spline != b.spline {
        bail!(EditError::TopologyConflict(format!(
            "{} and {} are on different splines",
            first, second
        )));
    }
    let spline = a.spline;
    let mut segments = net.get_s(spline)?.segments.clone();
    let idx = segments
        .iter()
        .position(|(_, entry)| *entry == SegmentRef::Road(first))
        .ok_or_else(|| {
            EditError::ReferentialIntegrityViolation(format!("{} isn't along {}", first, spline))
        })?;
    if segments.get(idx + 1).map(|(_, entry)| *entry) != Some(SegmentRef::Road(second)) {
        bail!(EditError::TopologyConflict(format!(
            "{} doesn't directly follow {}",
            second, first
        )));
    }
    absorb_road(net, first, second, effects)?;
    segments.remove(idx + 1);
    segment_map::replace_segments(net, spline, segments, effects)
}

/// Deletes a road, unlinking anything attached to either end.
pub fn delete_road(net: &mut RoadNetwork, r: RoadID, effects: &mut EditEffects) -> Result<()> {
    detach_end(net, RoadEnd::new(r, ContactPoint::Start), effects)?;
    detach_end(net, RoadEnd::new(r, ContactPoint::End), effects)?;
    net.take_road(r);
    effects.road_deleted(r);
    Ok(())
}

/// Unlinks one end of a road, and whatever links back to it.
pub fn detach_end(net: &mut RoadNetwork, end: RoadEnd, effects: &mut EditEffects) -> Result<()> {
    match net.get_r(end.road)?.link(end.contact) {
        Some(RoadLink::Road(x, contact)) => {
            if let Ok(other) = net.mut_road(x) {
                if other.link(contact) == Some(RoadLink::Road(end.road, end.contact)) {
                    other.set_link(contact, None);
                    effects.road_changed(x);
                }
            }
        }
        Some(RoadLink::Junction(j)) => {
            if net.junction_exists(j) {
                connections::drop_connections_touching(net, j, end.road, effects)?;
                effects.junction_stale(j);
            }
        }
        None => {
            return Ok(());
        }
    }
    net.mut_road(end.road)?.set_link(end.contact, None);
    effects.road_changed(end.road);
    Ok(())
}

// Same lanes, widths and markings, ignoring links.
fn same_layout(a: &LaneSection, b: &LaneSection) -> bool {
    a.lanes.len() == b.lanes.len()
        && a.lanes.iter().all(|(id, lane)| match b.lanes.get(id) {
            Some(other) => {
                lane.lane_type == other.lane_type
                    && lane.widths == other.widths
                    && lane.road_marks == other.road_marks
            }
            None => false,
        })
}
