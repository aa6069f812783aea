use anyhow::Result;

use geom::{chain_length, fit, ControlPoint, Distance, Poly3, Pt2D, SplineKind, EPSILON_DIST};

use crate::{
    Connection, ConnectionID, ContactPoint, EditEffects, EditError, ElevationProfile, JunctionID,
    Lane, LaneLink, LaneSection, LaneSide, LaneType, Road, RoadEnd, RoadID, RoadLink, RoadNetwork,
    SegmentRef, Spline,
};

/// One lane at the end of a road, as seen from a junction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EndLane {
    pub id: i32,
    pub lane_type: LaneType,
    pub width: Distance,
    /// Distance from the reference line to the middle of the lane
    pub t: Distance,
}

/// The lanes carrying traffic into (`entering`) or out of a junction at one road end, ordered
/// from the center outwards.
pub fn end_lanes(net: &RoadNetwork, end: RoadEnd, entering: bool) -> Result<Vec<EndLane>> {
    let road = net.get_r(end.road)?;
    let forwards = LaneSide::forwards(net.config.driving_side);
    // Traffic moving towards increasing s enters a junction at the end of the road
    let side = match (end.contact, entering) {
        (ContactPoint::End, true) | (ContactPoint::Start, false) => forwards,
        (ContactPoint::Start, true) | (ContactPoint::End, false) => forwards.opposite(),
    };
    let s = road.contact_s(end.contact);
    let section = match road.end_section(end.contact) {
        Some((_, ls)) => ls,
        None => {
            return Ok(Vec::new());
        }
    };
    let mut lanes = Vec::new();
    for id in section.lane_ids(side) {
        let lane = match section.get(id) {
            Some(lane) => lane,
            None => continue,
        };
        if !lane.lane_type.is_linkable() {
            continue;
        }
        if let Some(t) = section.t_of_lane(id, s) {
            lanes.push(EndLane {
                id,
                lane_type: lane.lane_type,
                width: section.width(id, s),
                t: t.abs(),
            });
        }
    }
    Ok(lanes)
}

/// Pairs each incoming lane, from the center outwards, with the unused outgoing lane of the same
/// type nearest to it sideways.
pub fn match_lanes(incoming: &[EndLane], outgoing: &[EndLane]) -> Vec<(EndLane, EndLane)> {
    let mut used = vec![false; outgoing.len()];
    let mut pairs = Vec::new();
    for from in incoming {
        let best = outgoing
            .iter()
            .enumerate()
            .filter(|(idx, to)| !used[*idx] && to.lane_type == from.lane_type)
            .min_by_key(|(_, to)| (to.t - from.t).abs());
        if let Some((idx, to)) = best {
            used[idx] = true;
            pairs.push((*from, *to));
        }
    }
    pairs
}

/// Builds one connection through a junction: a connecting road from the incoming road end to the
/// outgoing one, with a lane for every pair of matching lanes.
pub fn create_connection(
    net: &mut RoadNetwork,
    j: JunctionID,
    incoming: RoadEnd,
    outgoing: RoadEnd,
    effects: &mut EditEffects,
) -> Result<ConnectionID> {
    net.get_j(j)?;
    if incoming == outgoing {
        bail!(EditError::TopologyConflict(format!(
            "can't connect the {} to itself",
            incoming
        )));
    }
    let ends = net.road_ends_at(j);
    for end in [incoming, outgoing] {
        if !ends.contains(&end) {
            bail!(EditError::TopologyConflict(format!(
                "the {} isn't attached to {}",
                end, j
            )));
        }
    }

    let pairs = match_lanes(
        &end_lanes(net, incoming, true)?,
        &end_lanes(net, outgoing, false)?,
    );
    if pairs.is_empty() {
        bail!(EditError::TopologyConflict(format!(
            "no lanes lead from the {} into the {}",
            incoming, outgoing
        )));
    }

    let in_road = net.get_r(incoming.road)?;
    let out_road = net.get_r(outgoing.road)?;
    let end_state = |road: &Road, contact: ContactPoint| {
        road.try_state_at(road.contact_s(contact)).ok_or_else(|| {
            EditError::GeometricDegeneracy(format!("{} has no geometry", road.id))
        })
    };
    let mut start = end_state(in_road, incoming.contact)?;
    if incoming.contact == ContactPoint::Start {
        start = start.reversed();
    }
    let mut end = end_state(out_road, outgoing.contact)?;
    if outgoing.contact == ContactPoint::End {
        end = end.reversed();
    }
    let geometry = fit::connect(start, end).map_err(EditError::from)?;
    let length = chain_length(&geometry);
    if length < EPSILON_DIST {
        bail!(EditError::GeometricDegeneracy(format!(
            "the {} and the {} are in the same place",
            incoming, outgoing
        )));
    }
    let elevation = match (
        in_road.elevation_at(in_road.contact_s(incoming.contact)),
        out_road.elevation_at(out_road.contact_s(outgoing.contact)),
    ) {
        (Some(z1), Some(z2)) => ElevationProfile {
            records: vec![Poly3::linear(Distance::ZERO, z1, z2, length)],
        },
        _ => ElevationProfile::flat(),
    };

    let forwards = LaneSide::forwards(net.config.driving_side);
    let mut section = LaneSection::new(Distance::ZERO);
    let mut lane_links = Vec::new();
    for (n, (from, to)) in pairs.into_iter().enumerate() {
        let id = forwards.lane_id(n + 1);
        let mut lane = Lane::new(id, from.lane_type, from.width);
        lane.widths = vec![Poly3::linear(
            Distance::ZERO,
            from.width.inner_meters(),
            to.width.inner_meters(),
            length,
        )];
        lane.predecessor = Some(from.id);
        lane.successor = Some(to.id);
        section.lanes.insert(id, lane);
        lane_links.push(LaneLink {
            from: from.id,
            connecting: id,
            to: to.id,
            dirty: false,
        });
    }

    let r = net.new_road_id();
    let spline = net.new_spline_id();
    net.insert_spline(Spline {
        id: spline,
        kind: SplineKind::Explicit,
        control_points: vec![
            ControlPoint::with_heading(start.pt, start.heading),
            ControlPoint::with_heading(end.pt, end.heading),
        ],
        geometry: geometry.clone(),
        segments: vec![(Distance::ZERO, SegmentRef::Road(r))],
        elevation: elevation.clone(),
        lane_template: section.clone(),
        owner: Some(j),
    });
    net.insert_road(Road {
        id: r,
        geometry,
        lane_sections: vec![section],
        elevation,
        predecessor: Some(RoadLink::Road(incoming.road, incoming.contact)),
        successor: Some(RoadLink::Road(outgoing.road, outgoing.contact)),
        spline,
        spline_offset: Distance::ZERO,
        junction: Some(j),
    });

    let junction = net.mut_junction(j)?;
    let id = junction.next_connection_id();
    junction.connections.insert(
        id,
        Connection {
            id,
            incoming,
            outgoing,
            connecting_road: r,
            lane_links,
        },
    );
    effects.road_changed(r);
    effects.junction_changed(j);
    Ok(id)
}

/// Throws away every connection through a junction, then connects every pair of attached road
/// ends that have matching lanes. Pairs that can't be connected are skipped.
pub fn rebuild_connections(
    net: &mut RoadNetwork,
    j: JunctionID,
    effects: &mut EditEffects,
) -> Result<()> {
    clear_connections(net, j, effects)?;
    let ends = net.road_ends_at(j);

    if !ends.is_empty() {
        let mut pts = Vec::new();
        for end in &ends {
            pts.push(net.get_r(end.road)?.end_state(end.contact).pt);
        }
        let center = Pt2D::center(&pts);
        let radius = pts
            .iter()
            .map(|pt| center.dist_to(*pt))
            .max()
            .unwrap_or(Distance::ZERO);
        let junction = net.mut_junction(j)?;
        junction.center = center;
        junction.radius = junction.radius.max(radius);
    }

    for incoming in &ends {
        let entering = end_lanes(net, *incoming, true)?;
        for outgoing in &ends {
            if incoming == outgoing {
                continue;
            }
            if match_lanes(&entering, &end_lanes(net, *outgoing, false)?).is_empty() {
                continue;
            }
            if let Err(err) = create_connection(net, j, *incoming, *outgoing, effects) {
                warn!(
                    "Unable to create connection from the {} to the {} in {}: {}",
                    incoming, outgoing, j, err
                );
            }
        }
    }
    effects.junction_changed(j);
    debug!(
        "Rebuilt {} with {} connections",
        j,
        net.get_j(j)?.connections.len()
    );
    Ok(())
}

/// Deletes every connection through a junction, along with the connecting roads.
pub fn clear_connections(
    net: &mut RoadNetwork,
    j: JunctionID,
    effects: &mut EditEffects,
) -> Result<()> {
    net.mut_junction(j)?.connections.clear();
    for r in net.road_ids() {
        let spline = match net.get_r(r) {
            Ok(road) if road.junction == Some(j) => road.spline,
            _ => continue,
        };
        net.take_road(r);
        net.take_spline(spline);
        effects.road_deleted(r);
    }
    Ok(())
}

/// Drops the connections through a junction that start or end at a road, along with their
/// connecting roads.
pub fn drop_connections_touching(
    net: &mut RoadNetwork,
    j: JunctionID,
    r: RoadID,
    effects: &mut EditEffects,
) -> Result<()> {
    let junction = net.mut_junction(j)?;
    let ids: Vec<ConnectionID> = junction
        .connections
        .values()
        .filter(|c| c.incoming.road == r || c.outgoing.road == r)
        .map(|c| c.id)
        .collect();
    let mut connecting_roads = Vec::new();
    for id in ids {
        if let Some(conn) = junction.connections.remove(&id) {
            connecting_roads.push(conn.connecting_road);
        }
    }
    for cr in connecting_roads {
        if let Some(road) = net.take_road(cr) {
            net.take_spline(road.spline);
            effects.road_deleted(cr);
        }
    }
    Ok(())
}

/// Removes the one connection carried by a connecting road.
pub fn remove_connection_for(
    net: &mut RoadNetwork,
    j: JunctionID,
    r: RoadID,
    effects: &mut EditEffects,
) -> Result<()> {
    let junction = net.mut_junction(j)?;
    let id = junction
        .connections
        .values()
        .find(|c| c.connecting_road == r)
        .map(|c| c.id)
        .ok_or_else(|| {
            EditError::ReferentialIntegrityViolation(format!("no connection in {} uses {}", j, r))
        })?;
    junction.connections.remove(&id);
    if let Some(road) = net.take_road(r) {
        net.take_spline(road.spline);
    }
    effects.road_deleted(r);
    effects.junction_changed(j);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(id: i32, lane_type: LaneType, t: f64) -> EndLane {
        EndLane {
            id,
            lane_type,
            width: Distance::meters(3.0),
            t: Distance::meters(t),
        }
    }

    #[test]
    fn lanes_match_by_type_and_offset() {
        let incoming = vec![
            lane(-1, LaneType::Driving, 1.5),
            lane(-2, LaneType::Driving, 4.5),
            lane(-3, LaneType::Sidewalk, 7.5),
        ];
        let outgoing = vec![
            lane(-1, LaneType::Driving, 1.5),
            lane(-2, LaneType::Biking, 4.5),
            lane(-3, LaneType::Driving, 7.5),
        ];
        let pairs: Vec<(i32, i32)> = match_lanes(&incoming, &outgoing)
            .into_iter()
            .map(|(from, to)| (from.id, to.id))
            .collect();
        assert_eq!(pairs, vec![(-1, -1), (-2, -3)]);
    }
}
