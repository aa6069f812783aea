//! Keeps each spline's map of roads and junctions in step with the roads themselves. The map is
//! the source of truth for where each road lies along its spline; road geometry, elevation and
//! the links between neighbors are derived from it.

use anyhow::Result;

use geom::{slice_chain, Distance, EPSILON_DIST};

use crate::make::divide;
use crate::objects::lane::{extend_front, link_sections, split_sections};
use crate::{
    ContactPoint, EditEffects, EditError, JunctionID, RoadEnd, RoadLink, RoadNetwork, SegmentRef,
    SplineID,
};

/// Swaps in a new segment map for a spline, then re-derives every road on it.
pub fn replace_segments(
    net: &mut RoadNetwork,
    spline: SplineID,
    segments: Vec<(Distance, SegmentRef)>,
    effects: &mut EditEffects,
) -> Result<()> {
    let s = net.mut_spline(spline)?;
    s.segments = segments;
    s.check_segments()?;
    sync_roads(net, spline, effects)?;
    relink(net, spline, effects)
}

/// Cuts the spline's geometry and elevation up between its roads, and moves their lane sections
/// along with any change to where they start.
fn sync_roads(net: &mut RoadNetwork, spline: SplineID, effects: &mut EditEffects) -> Result<()> {
    let s = net.get_s(spline)?;
    let spans = s.spans();
    let geometry = s.geometry.clone();
    let elevation = s.elevation.clone();

    for (start, end, entry) in spans {
        let r = match entry {
            SegmentRef::Road(r) => r,
            SegmentRef::Junction(_) => continue,
        };
        let road = net.mut_road(r)?;
        let new_geometry = slice_chain(&geometry, start, end);
        let new_elevation = elevation.slice(start, end);

        let old_offset = road.spline_offset;
        if start > old_offset + EPSILON_DIST {
            let (_, after) = split_sections(&road.lane_sections, start - old_offset);
            road.lane_sections = after;
        } else if start < old_offset - EPSILON_DIST {
            extend_front(&mut road.lane_sections, old_offset - start);
        }
        let length = end - start;
        let keep = road
            .lane_sections
            .iter()
            .skip(1)
            .take_while(|ls| ls.s < length - EPSILON_DIST)
            .count()
            + 1;
        if keep < road.lane_sections.len() {
            road.lane_sections.truncate(keep);
            link_sections(&mut road.lane_sections);
        }

        let changed = road.geometry != new_geometry
            || road.elevation != new_elevation
            || road.spline_offset != start;
        road.geometry = new_geometry;
        road.elevation = new_elevation;
        road.spline_offset = start;
        if changed {
            effects.road_changed(r);
        }
    }
    Ok(())
}

/// Links neighbors along the spline to each other. The outer ends of the first and last road are
/// left alone.
fn relink(net: &mut RoadNetwork, spline: SplineID, effects: &mut EditEffects) -> Result<()> {
    let entries: Vec<SegmentRef> = net
        .get_s(spline)?
        .segments
        .iter()
        .map(|(_, entry)| *entry)
        .collect();
    for pair in entries.windows(2) {
        match (pair[0], pair[1]) {
            (SegmentRef::Road(a), SegmentRef::Road(b)) => {
                set_link(
                    net,
                    RoadEnd::new(a, ContactPoint::End),
                    RoadLink::Road(b, ContactPoint::Start),
                    effects,
                )?;
                set_link(
                    net,
                    RoadEnd::new(b, ContactPoint::Start),
                    RoadLink::Road(a, ContactPoint::End),
                    effects,
                )?;
            }
            (SegmentRef::Road(a), SegmentRef::Junction(j)) => {
                set_link(
                    net,
                    RoadEnd::new(a, ContactPoint::End),
                    RoadLink::Junction(j),
                    effects,
                )?;
            }
            (SegmentRef::Junction(j), SegmentRef::Road(b)) => {
                set_link(
                    net,
                    RoadEnd::new(b, ContactPoint::Start),
                    RoadLink::Junction(j),
                    effects,
                )?;
            }
            (SegmentRef::Junction(_), SegmentRef::Junction(_)) => {}
        }
    }
    Ok(())
}

fn set_link(
    net: &mut RoadNetwork,
    end: RoadEnd,
    link: RoadLink,
    effects: &mut EditEffects,
) -> Result<()> {
    let road = net.mut_road(end.road)?;
    let old = road.link(end.contact);
    if old == Some(link) {
        return Ok(());
    }
    road.set_link(end.contact, Some(link));
    effects.road_changed(end.road);
    // Both junctions gain or lose a road end
    if let Some(RoadLink::Junction(j)) = old {
        if net.junction_exists(j) {
            effects.junction_stale(j);
        }
    }
    if let RoadLink::Junction(j) = link {
        effects.junction_stale(j);
    }
    Ok(())
}

/// Places a junction over `[start, end)` of a spline. Roads it overlaps are cut, and roads it
/// covers completely are deleted. Overlapping another junction is a conflict.
pub fn insert_junction(
    net: &mut RoadNetwork,
    spline: SplineID,
    start: Distance,
    end: Distance,
    j: JunctionID,
    effects: &mut EditEffects,
) -> Result<()> {
    net.get_j(j)?;
    let s = net.get_s(spline)?;
    let length = s.length();
    let spans = s.spans();

    let mut start = start.clamp_to(Distance::ZERO, length);
    let mut end = end.clamp_to(Distance::ZERO, length);
    if end - start < EPSILON_DIST {
        bail!(EditError::GeometricDegeneracy(format!(
            "{} would cover nothing of {} ({} to {})",
            j, spline, start, end
        )));
    }
    // Don't leave slivers next to existing boundaries
    for (a, b, _) in &spans {
        for boundary in [*a, *b] {
            if (start - boundary).abs() < EPSILON_DIST {
                start = boundary;
            }
            if (end - boundary).abs() < EPSILON_DIST {
                end = boundary;
            }
        }
    }

    let mut segments = Vec::new();
    let mut placed = false;
    for (a, b, entry) in spans {
        if b <= start || a >= end {
            if a >= end && !placed {
                segments.push((start, SegmentRef::Junction(j)));
                placed = true;
            }
            segments.push((a, entry));
            continue;
        }
        match entry {
            SegmentRef::Junction(other) => {
                bail!(EditError::TopologyConflict(format!(
                    "{} would overlap {} along {}",
                    j, other, spline
                )));
            }
            SegmentRef::Road(r) => {
                let (head, tail) = divide::cut_span(net, r, start - a, end - a, effects)?;
                if let Some(head) = head {
                    segments.push((a, SegmentRef::Road(head)));
                }
                if !placed {
                    segments.push((start, SegmentRef::Junction(j)));
                    placed = true;
                }
                if let Some(tail) = tail {
                    segments.push((end, SegmentRef::Road(tail)));
                }
            }
        }
    }
    if !placed {
        segments.push((start, SegmentRef::Junction(j)));
    }
    debug!("Inserted {} into {} from {} to {}", j, spline, start, end);

    replace_segments(net, spline, segments, effects)?;
    effects.junction_stale(j);
    Ok(())
}

/// Takes one road or junction out of a spline's map. The previous entry takes over its span, or
/// the next one if it was first. When a junction between two roads goes, the roads are joined.
/// Removing the only entry deletes the whole spline.
pub fn remove_entry(
    net: &mut RoadNetwork,
    spline: SplineID,
    entry: SegmentRef,
    effects: &mut EditEffects,
) -> Result<()> {
    let spans = net.get_s(spline)?.spans();
    let idx = spans
        .iter()
        .position(|(_, _, e)| *e == entry)
        .ok_or_else(|| {
            EditError::ReferentialIntegrityViolation(format!("{} isn't along {}", entry, spline))
        })?;
    if spans.len() == 1 {
        return delete_spline(net, spline, effects);
    }

    let mut segments: Vec<(Distance, SegmentRef)> =
        spans.iter().map(|(start, _, e)| (*start, *e)).collect();
    segments.remove(idx);
    if idx == 0 {
        segments[0].0 = Distance::ZERO;
    }

    match entry {
        SegmentRef::Road(r) => {
            divide::delete_road(net, r, effects)?;
        }
        SegmentRef::Junction(j) => {
            for r in net.get_s(spline)?.roads() {
                for contact in [ContactPoint::Start, ContactPoint::End] {
                    let road = net.mut_road(r)?;
                    if road.link(contact) == Some(RoadLink::Junction(j)) {
                        road.set_link(contact, None);
                        effects.road_changed(r);
                    }
                }
            }
            if idx > 0 && idx + 1 < spans.len() {
                if let (SegmentRef::Road(p), SegmentRef::Road(q)) = (spans[idx - 1].2, spans[idx + 1].2)
                {
                    divide::absorb_road(net, p, q, effects)?;
                    // q slid into the junction's old position
                    segments.remove(idx);
                }
            }
            effects.junction_stale(j);
        }
    }

    replace_segments(net, spline, segments, effects)
}

/// Deletes a spline and every road along it. Junctions along it lose those road ends.
pub fn delete_spline(
    net: &mut RoadNetwork,
    spline: SplineID,
    effects: &mut EditEffects,
) -> Result<()> {
    let segments = net.get_s(spline)?.segments.clone();
    for (_, entry) in segments {
        match entry {
            SegmentRef::Road(r) => {
                divide::delete_road(net, r, effects)?;
            }
            SegmentRef::Junction(j) => {
                if net.junction_exists(j) {
                    effects.junction_stale(j);
                }
            }
        }
    }
    net.take_spline(spline);
    info!("Deleted {}", spline);
    Ok(())
}
