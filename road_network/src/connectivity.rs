use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use petgraph::graphmap::DiGraphMap;

use crate::make::{connections, segment_map};
use crate::{
    ContactPoint, EditEffects, JunctionID, LaneSide, RoadID, RoadLink, RoadNetwork, SegmentRef,
};

/// A lane in one lane section of a road: (road, index of the section, lane id).
pub type LaneNode = (RoadID, usize, i32);

/// Every lane in the network, with edges in the direction of travel between lanes that continue
/// into each other: into the next lane section, into the next road, and through junctions.
pub fn lane_graph(net: &RoadNetwork) -> DiGraphMap<LaneNode, ()> {
    let forwards = LaneSide::forwards(net.config.driving_side);
    let mut graph = DiGraphMap::new();

    for road in net.all_roads() {
        for (idx, ls) in road.lane_sections.iter().enumerate() {
            for (id, lane) in &ls.lanes {
                if *id == 0 {
                    continue;
                }
                let node = (road.id, idx, *id);
                graph.add_node(node);
                let next = match lane.successor {
                    Some(next) => next,
                    None => continue,
                };
                let target = if idx + 1 < road.lane_sections.len() {
                    Some((road.id, idx + 1, next))
                } else if road.is_connecting() {
                    // Lane links handle these
                    None
                } else {
                    match road.successor {
                        Some(RoadLink::Road(x, ContactPoint::Start)) if net.road_exists(x) => {
                            Some((x, 0, next))
                        }
                        _ => None,
                    }
                };
                if let Some(target) = target {
                    if LaneSide::from_id(*id) == forwards || road.is_connecting() {
                        graph.add_edge(node, target, ());
                    } else {
                        graph.add_edge(target, node, ());
                    }
                }
            }
        }
    }

    for junction in net.all_junctions() {
        for conn in junction.connections.values() {
            let (in_idx, out_idx) = match (
                net.get_r(conn.incoming.road)
                    .ok()
                    .and_then(|r| r.end_section(conn.incoming.contact)),
                net.get_r(conn.outgoing.road)
                    .ok()
                    .and_then(|r| r.end_section(conn.outgoing.contact)),
            ) {
                (Some((in_idx, _)), Some((out_idx, _))) => (in_idx, out_idx),
                _ => continue,
            };
            for link in &conn.lane_links {
                let via = (conn.connecting_road, 0, link.connecting);
                graph.add_edge((conn.incoming.road, in_idx, link.from), via, ());
                graph.add_edge(via, (conn.outgoing.road, out_idx, link.to), ());
            }
        }
    }
    graph
}

/// Driving lanes entering a junction that no lane link leads out of.
pub fn find_orphan_lanes(net: &RoadNetwork, j: JunctionID) -> Result<Vec<(RoadID, i32)>> {
    let junction = net.get_j(j)?;
    let mut orphans = Vec::new();
    for end in net.road_ends_at(j) {
        for lane in connections::end_lanes(net, end, true)? {
            if !lane.lane_type.is_driving() {
                continue;
            }
            let linked = junction.connections.values().any(|c| {
                c.incoming == end && c.lane_links.iter().any(|link| link.from == lane.id)
            });
            if !linked {
                orphans.push((end.road, lane.id));
            }
        }
    }
    Ok(orphans)
}

// SCC = strongly connected component

/// Returns (driving lanes in the largest strongly connected component, driving lanes outside of
/// it). Connecting roads are left out of both.
pub fn find_disconnected_lanes(net: &RoadNetwork) -> (HashSet<LaneNode>, Vec<LaneNode>) {
    let graph = lane_graph(net);
    let components = petgraph::algo::kosaraju_scc(&graph);
    let largest_group: HashSet<LaneNode> = components
        .into_iter()
        .max_by_key(|c| c.len())
        .unwrap_or_default()
        .into_iter()
        .filter(|(r, _, _)| is_plain_road(net, *r))
        .collect();
    let mut disconnected = Vec::new();
    for road in net.all_roads() {
        if road.is_connecting() {
            continue;
        }
        for (idx, ls) in road.lane_sections.iter().enumerate() {
            for (id, lane) in &ls.lanes {
                let node = (road.id, idx, *id);
                if lane.lane_type.is_driving() && !largest_group.contains(&node) {
                    disconnected.push(node);
                }
            }
        }
    }
    (largest_group, disconnected)
}

fn is_plain_road(net: &RoadNetwork, r: RoadID) -> bool {
    net.get_r(r).map(|road| !road.is_connecting()).unwrap_or(false)
}

/// Unlinks anything pointing at roads, junctions or splines that no longer exist, logging every
/// fix.
pub(crate) fn fix_dangling_links(net: &mut RoadNetwork, effects: &mut EditEffects) -> Result<()> {
    for r in net.road_ids() {
        let road = net.get_r(r)?;
        if !net.spline_exists(road.spline) {
            warn!("{} is along {}, which is gone; deleting it", r, road.spline);
            net.take_road(r);
            effects.road_deleted(r);
            continue;
        }
        if let Some(j) = road.junction {
            let used = net
                .get_j(j)
                .map(|junction| junction.connecting_roads().contains(&r))
                .unwrap_or(false);
            if !used {
                warn!("{} doesn't carry any connection in {}; deleting it", r, j);
                let spline = road.spline;
                net.take_road(r);
                net.take_spline(spline);
                effects.road_deleted(r);
                continue;
            }
        }
        for contact in [ContactPoint::Start, ContactPoint::End] {
            let link = net.get_r(r)?.link(contact);
            let dangling = match link {
                Some(RoadLink::Road(x, _)) => !net.road_exists(x),
                Some(RoadLink::Junction(j)) => !net.junction_exists(j),
                None => false,
            };
            if let (true, Some(link)) = (dangling, link) {
                warn!("The {} of {} pointed at {}, which is gone", contact, r, link);
                net.mut_road(r)?.set_link(contact, None);
                effects.road_changed(r);
            }
        }
    }

    for j in net.junction_ids() {
        let missing: BTreeSet<_> = net
            .get_j(j)?
            .connections
            .values()
            .filter(|c| {
                !net.road_exists(c.incoming.road)
                    || !net.road_exists(c.outgoing.road)
                    || !net.road_exists(c.connecting_road)
            })
            .map(|c| c.id)
            .collect();
        if missing.is_empty() {
            continue;
        }
        warn!("{} had {} connections to missing roads", j, missing.len());
        let junction = net.mut_junction(j)?;
        junction.connections.retain(|id, _| !missing.contains(id));
        effects.junction_stale(j);
    }

    for spline in net.spline_ids() {
        let segments = net.get_s(spline)?.segments.clone();
        let mut kept: Vec<_> = segments
            .iter()
            .filter(|(_, entry)| match entry {
                SegmentRef::Road(r) => net.road_exists(*r),
                SegmentRef::Junction(j) => net.junction_exists(*j),
            })
            .cloned()
            .collect();
        if kept.len() == segments.len() {
            continue;
        }
        warn!(
            "{} had {} entries for missing roads or junctions",
            spline,
            segments.len() - kept.len()
        );
        if kept.is_empty() {
            net.take_spline(spline);
            continue;
        }
        kept[0].0 = geom::Distance::ZERO;
        segment_map::replace_segments(net, spline, kept, effects)?;
    }
    Ok(())
}
