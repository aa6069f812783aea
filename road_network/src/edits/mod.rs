//! Every change to a `RoadNetwork` goes through one of the methods here. Each one runs as a
//! transaction: it either applies completely and reports what changed, or fails and leaves the
//! network exactly as it was.

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{fit, ControlPoint, Distance, Pt2D, SplineKind, EPSILON_DIST};

use crate::make::{connections, divide, junctions, segment_map};
use crate::{
    connectivity, ConnectionID, ContactPoint, EditError, ElevationProfile, Junction, JunctionID,
    LaneSection, LaneSide, LaneType, Road, RoadEnd, RoadID, RoadLink, RoadNetwork, SegmentRef,
    Spline, SplineID,
};

/// What an edit touched, for anything that needs to redraw or recompute after it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditEffects {
    pub changed_roads: BTreeSet<RoadID>,
    pub deleted_roads: BTreeSet<RoadID>,
    pub changed_junctions: BTreeSet<JunctionID>,
    pub deleted_junctions: BTreeSet<JunctionID>,
    pub changed_lanes: BTreeSet<(RoadID, i32)>,
    // Junctions whose connections have to be derived again before the edit finishes
    #[serde(skip)]
    stale_junctions: BTreeSet<JunctionID>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    RoadUpdated(RoadID),
    RoadRemoved(RoadID),
    JunctionUpdated(JunctionID),
    JunctionRemoved(JunctionID),
    LaneUpdated(RoadID, i32),
}

impl EditEffects {
    pub fn road_changed(&mut self, r: RoadID) {
        if !self.deleted_roads.contains(&r) {
            self.changed_roads.insert(r);
        }
    }

    pub fn road_deleted(&mut self, r: RoadID) {
        self.changed_roads.remove(&r);
        self.changed_lanes.retain(|(road, _)| *road != r);
        self.deleted_roads.insert(r);
    }

    pub fn junction_changed(&mut self, j: JunctionID) {
        if !self.deleted_junctions.contains(&j) {
            self.changed_junctions.insert(j);
        }
    }

    pub fn junction_deleted(&mut self, j: JunctionID) {
        self.changed_junctions.remove(&j);
        self.stale_junctions.remove(&j);
        self.deleted_junctions.insert(j);
    }

    pub fn lane_changed(&mut self, r: RoadID, lane: i32) {
        self.changed_lanes.insert((r, lane));
        self.road_changed(r);
    }

    /// The junction's connections must be rebuilt before the edit finishes.
    pub(crate) fn junction_stale(&mut self, j: JunctionID) {
        self.junction_changed(j);
        if !self.deleted_junctions.contains(&j) {
            self.stale_junctions.insert(j);
        }
    }

    pub(crate) fn stale_junctions(&self) -> Vec<JunctionID> {
        self.stale_junctions.iter().cloned().collect()
    }

    pub fn merge(&mut self, other: EditEffects) {
        for r in other.deleted_roads {
            self.road_deleted(r);
        }
        for j in other.deleted_junctions {
            self.junction_deleted(j);
        }
        for r in other.changed_roads {
            self.road_changed(r);
        }
        for j in other.changed_junctions {
            self.junction_changed(j);
        }
        for (r, lane) in other.changed_lanes {
            if !self.deleted_roads.contains(&r) {
                self.changed_lanes.insert((r, lane));
            }
        }
        for j in other.stale_junctions {
            self.junction_stale(j);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed_roads.is_empty()
            && self.deleted_roads.is_empty()
            && self.changed_junctions.is_empty()
            && self.deleted_junctions.is_empty()
            && self.changed_lanes.is_empty()
    }

    /// Everything as a flat list of events: updated roads, removed roads, updated junctions,
    /// removed junctions, then updated lanes.
    pub fn events(&self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        events.extend(self.changed_roads.iter().map(|r| ChangeEvent::RoadUpdated(*r)));
        events.extend(self.deleted_roads.iter().map(|r| ChangeEvent::RoadRemoved(*r)));
        events.extend(
            self.changed_junctions
                .iter()
                .map(|j| ChangeEvent::JunctionUpdated(*j)),
        );
        events.extend(
            self.deleted_junctions
                .iter()
                .map(|j| ChangeEvent::JunctionRemoved(*j)),
        );
        events.extend(
            self.changed_lanes
                .iter()
                .map(|(r, lane)| ChangeEvent::LaneUpdated(*r, *lane)),
        );
        events
    }
}

impl RoadNetwork {
    /// Runs `f`, then repairs dangling references and settles every junction it touched. If
    /// anything fails, the network is restored to how it was before.
    fn transaction<T, F>(&mut self, label: &str, f: F) -> Result<(T, EditEffects)>
    where
        F: FnOnce(&mut RoadNetwork, &mut EditEffects) -> Result<T>,
    {
        let snapshot = self.clone();
        let mut effects = EditEffects::default();
        let result = f(self, &mut effects).and_then(|value| {
            connectivity::fix_dangling_links(self, &mut effects)?;
            junctions::settle_junctions(self, &mut effects)?;
            Ok(value)
        });
        match result {
            Ok(value) => {
                debug!(
                    "{}: {} roads changed, {} deleted, {} junctions changed, {} deleted",
                    label,
                    effects.changed_roads.len(),
                    effects.deleted_roads.len(),
                    effects.changed_junctions.len(),
                    effects.deleted_junctions.len()
                );
                Ok((value, effects))
            }
            Err(err) => {
                warn!("{} failed, undoing it: {}", label, err);
                *self = snapshot;
                Err(err)
            }
        }
    }

    /// Draws a new spline, covered by one road with the given lanes. Junctions are created
    /// wherever it crosses other roads, unless `auto_junctions` is off.
    pub fn add_spline(
        &mut self,
        kind: SplineKind,
        control_points: Vec<ControlPoint>,
        lanes: LaneSection,
    ) -> Result<(SplineID, EditEffects)> {
        self.transaction("add_spline", |net, effects| {
            let geometry = fit::fit_spline(kind, &control_points).map_err(EditError::from)?;
            let mut lanes = lanes;
            lanes.s = Distance::ZERO;
            lanes.check_contiguous()?;

            let id = net.new_spline_id();
            let r = net.new_road_id();
            net.insert_spline(Spline {
                id,
                kind,
                control_points,
                geometry: geometry.clone(),
                segments: vec![(Distance::ZERO, SegmentRef::Road(r))],
                elevation: ElevationProfile::flat(),
                lane_template: lanes.clone(),
                owner: None,
            });
            net.insert_road(Road {
                id: r,
                geometry,
                lane_sections: vec![lanes],
                elevation: ElevationProfile::flat(),
                predecessor: None,
                successor: None,
                spline: id,
                spline_offset: Distance::ZERO,
                junction: None,
            });
            effects.road_changed(r);
            info!("Added {} with {}", id, r);

            if net.config.auto_junctions {
                junctions::update_junctions_for_road(net, r, effects)?;
            }
            Ok(id)
        })
    }

    /// Refits a spline through new control points. The roads and manual junctions along it keep
    /// their share of its length; auto junctions are detected again from scratch.
    pub fn set_control_points(
        &mut self,
        spline: SplineID,
        control_points: Vec<ControlPoint>,
    ) -> Result<EditEffects> {
        self.transaction("set_control_points", |net, effects| {
            refit_spline(net, spline, control_points, effects)
        })
        .map(|(_, effects)| effects)
    }

    pub fn move_control_point(
        &mut self,
        spline: SplineID,
        idx: usize,
        pt: Pt2D,
    ) -> Result<EditEffects> {
        let mut control_points = self.get_s(spline)?.control_points.clone();
        match control_points.get_mut(idx) {
            Some(cp) => {
                cp.pt = pt;
            }
            None => {
                return Err(EditError::UnknownEntity(format!(
                    "control point {} of {}",
                    idx, spline
                ))
                .into());
            }
        }
        self.set_control_points(spline, control_points)
    }

    /// Sets the height profile along a whole spline. Roads that now pass over or under each
    /// other lose their junctions.
    pub fn set_elevation(
        &mut self,
        spline: SplineID,
        elevation: ElevationProfile,
    ) -> Result<EditEffects> {
        self.transaction("set_elevation", |net, effects| {
            if net.get_s(spline)?.is_private() {
                bail!(EditError::TopologyConflict(format!(
                    "{} belongs to a connecting road",
                    spline
                )));
            }
            let control_points = net.get_s(spline)?.control_points.clone();
            net.mut_spline(spline)?.elevation = elevation;
            refit_spline(net, spline, control_points, effects)
        })
        .map(|(_, effects)| effects)
    }

    /// Deletes a spline and every road on it.
    pub fn remove_spline(&mut self, spline: SplineID) -> Result<EditEffects> {
        self.transaction("remove_spline", |net, effects| {
            if net.get_s(spline)?.is_private() {
                bail!(EditError::TopologyConflict(format!(
                    "{} belongs to a connecting road",
                    spline
                )));
            }
            segment_map::delete_spline(net, spline, effects)
        })
        .map(|(_, effects)| effects)
    }

    /// Removes a road. Along its spline, the span goes to the neighboring road or junction. For
    /// a connecting road, the connection it carries is removed too.
    pub fn remove_road(&mut self, r: RoadID) -> Result<EditEffects> {
        self.transaction("remove_road", |net, effects| {
            let road = net.get_r(r)?;
            if let Some(j) = road.junction {
                connections::remove_connection_for(net, j, r, effects)
            } else {
                let spline = road.spline;
                segment_map::remove_entry(net, spline, SegmentRef::Road(r), effects)
            }
        })
        .map(|(_, effects)| effects)
    }

    /// Splits a road in two at `s`, returning the new second half.
    pub fn divide_road_at(&mut self, r: RoadID, s: Distance) -> Result<(RoadID, EditEffects)> {
        self.transaction("divide_road_at", |net, effects| {
            divide::divide_road_at(net, r, s, effects)
        })
    }

    /// Removes the part of a road between `s_start` and `s_end`, leaving a new manual junction
    /// in the gap. Returns the road after the gap, if anything is left there.
    pub fn cut_road_from_to(
        &mut self,
        r: RoadID,
        s_start: Distance,
        s_end: Distance,
    ) -> Result<(Option<RoadID>, EditEffects)> {
        self.transaction("cut_road_from_to", |net, effects| {
            let road = net.get_r(r)?;
            if road.is_connecting() {
                bail!(EditError::TopologyConflict(format!(
                    "can't cut {}, it's a connecting road",
                    r
                )));
            }
            let (spline, offset) = (road.spline, road.spline_offset);
            let length = road.length();
            let s0 = s_start.clamp_to(Distance::ZERO, length);
            let s1 = s_end.clamp_to(Distance::ZERO, length);
            let j = new_manual_junction(net, spline, offset + s0, offset + s1, effects)?;
            segment_map::insert_junction(net, spline, offset + s0, offset + s1, j, effects)?;
            let spans = net.get_s(spline)?.spans();
            let tail = spans.windows(2).find_map(|pair| match (pair[0].2, pair[1].2) {
                (SegmentRef::Junction(x), SegmentRef::Road(tail)) if x == j => Some(tail),
                _ => None,
            });
            Ok(tail)
        })
    }

    /// Joins two roads that follow each other directly along the same spline.
    pub fn merge_roads(&mut self, first: RoadID, second: RoadID) -> Result<EditEffects> {
        self.transaction("merge_roads", |net, effects| {
            divide::merge_roads(net, first, second, effects)
        })
        .map(|(_, effects)| effects)
    }

    /// Places a manual junction over part of a spline, cutting whatever roads are there.
    pub fn insert_junction(
        &mut self,
        spline: SplineID,
        start: Distance,
        end: Distance,
    ) -> Result<(JunctionID, EditEffects)> {
        self.transaction("insert_junction", |net, effects| {
            let j = new_manual_junction(net, spline, start, end, effects)?;
            segment_map::insert_junction(net, spline, start, end, j, effects)?;
            Ok(j)
        })
    }

    /// Creates an empty manual junction. Attach road ends to it with `attach_road_end`.
    pub fn add_junction(&mut self, center: Pt2D) -> Result<(JunctionID, EditEffects)> {
        self.transaction("add_junction", |net, effects| {
            let j = net.new_junction_id();
            net.put_junction(Junction::new(j, center, Distance::ZERO, false));
            effects.junction_changed(j);
            Ok(j)
        })
    }

    /// Links the free end of a road to a junction. Only the first and last road ends of a spline
    /// can be attached; everything in between is tied to its neighbors along the spline.
    pub fn attach_road_end(&mut self, end: RoadEnd, j: JunctionID) -> Result<EditEffects> {
        self.transaction("attach_road_end", |net, effects| {
            net.get_j(j)?;
            let road = net.get_r(end.road)?;
            if road.is_connecting() {
                bail!(EditError::TopologyConflict(format!(
                    "{} is a connecting road",
                    end.road
                )));
            }
            let spans = net.get_s(road.spline)?.spans();
            let is_free = match end.contact {
                ContactPoint::Start => spans.first().map(|x| x.2) == Some(SegmentRef::Road(end.road)),
                ContactPoint::End => spans.last().map(|x| x.2) == Some(SegmentRef::Road(end.road)),
            };
            if !is_free {
                bail!(EditError::TopologyConflict(format!(
                    "the {} is in the middle of its spline",
                    end
                )));
            }
            divide::detach_end(net, end, effects)?;
            net.mut_road(end.road)?
                .set_link(end.contact, Some(RoadLink::Junction(j)));
            effects.road_changed(end.road);
            effects.junction_stale(j);
            Ok(())
        })
        .map(|(_, effects)| effects)
    }

    /// Deletes a junction and its connections. Roads on either side of it along a spline are
    /// joined back together.
    pub fn remove_junction(&mut self, j: JunctionID) -> Result<EditEffects> {
        self.transaction("remove_junction", |net, effects| {
            net.get_j(j)?;
            junctions::delete_junction(net, j, effects)
        })
        .map(|(_, effects)| effects)
    }

    /// Adds one connection through a junction, between two road ends attached to it.
    pub fn create_connection(
        &mut self,
        j: JunctionID,
        incoming: RoadEnd,
        outgoing: RoadEnd,
    ) -> Result<(ConnectionID, EditEffects)> {
        self.transaction("create_connection", |net, effects| {
            connections::create_connection(net, j, incoming, outgoing, effects)
        })
    }

    /// Throws away every connection through a junction and derives them again.
    pub fn rebuild_connections(&mut self, j: JunctionID) -> Result<EditEffects> {
        self.transaction("rebuild_connections", |net, effects| {
            net.get_j(j)?;
            effects.junction_stale(j);
            Ok(())
        })
        .map(|(_, effects)| effects)
    }

    /// Detects intersections along every spline again, then rebuilds every junction.
    pub fn rebuild_all(&mut self) -> Result<EditEffects> {
        self.transaction("rebuild_all", |net, effects| {
            for r in net.road_ids() {
                // Earlier updates may have cut this road up already
                if net.road_exists(r) && !net.get_r(r)?.is_connecting() {
                    junctions::update_junctions_for_road(net, r, effects)?;
                }
            }
            for j in net.junction_ids() {
                effects.junction_stale(j);
            }
            Ok(())
        })
        .map(|(_, effects)| effects)
    }

    /// Repairs references to anything that no longer exists, like in a network saved by hand.
    /// Every edit does this on its own.
    pub fn fix_dangling_links(&mut self) -> Result<EditEffects> {
        self.transaction("fix_dangling_links", |_, _| Ok(()))
            .map(|(_, effects)| effects)
    }

    /// Adds a lane to the outside of one side of a road, along its whole length. Returns the new
    /// lane's id.
    pub fn add_lane(
        &mut self,
        r: RoadID,
        side: LaneSide,
        lane_type: LaneType,
        width: Option<Distance>,
    ) -> Result<(i32, EditEffects)> {
        self.transaction("add_lane", |net, effects| {
            check_lane_edit(net, r)?;
            if side == LaneSide::Center {
                bail!(EditError::TopologyConflict(
                    "there's only one center lane".to_string()
                ));
            }
            let width = width.unwrap_or(net.config.default_lane_width);
            if width <= EPSILON_DIST {
                bail!(EditError::GeometricDegeneracy(format!(
                    "lane width {} is too small",
                    width
                )));
            }
            let road = net.mut_road(r)?;
            // Sections with fewer lanes on this side give the new lane a different id
            let added: Vec<i32> = road
                .lane_sections
                .iter_mut()
                .map(|ls| ls.push_lane(side, lane_type, width))
                .collect();
            crate::objects::lane::link_sections(&mut road.lane_sections);
            for id in added.iter().collect::<BTreeSet<_>>() {
                effects.lane_changed(r, *id);
            }
            lanes_changed(net, r, effects)?;
            added
                .first()
                .copied()
                .ok_or_else(|| anyhow!("{} has no lane sections", r))
        })
    }

    /// Removes a lane wherever it exists along a road. Lanes further out move one step in.
    pub fn remove_lane(&mut self, r: RoadID, lane: i32) -> Result<EditEffects> {
        self.transaction("remove_lane", |net, effects| {
            check_lane_edit(net, r)?;
            let road = net.mut_road(r)?;
            let mut removed = false;
            let mut touched = BTreeSet::new();
            for ls in &mut road.lane_sections {
                if !ls.lanes.contains_key(&lane) {
                    continue;
                }
                let side = LaneSide::from_id(lane);
                touched.extend(ls.lane_ids(side).into_iter().filter(|id| id.abs() >= lane.abs()));
                ls.remove_lane(lane)?;
                removed = true;
            }
            if !removed {
                bail!(EditError::UnknownEntity(format!("lane {} of {}", lane, r)));
            }
            crate::objects::lane::link_sections(&mut road.lane_sections);
            for id in touched {
                effects.lane_changed(r, id);
            }
            lanes_changed(net, r, effects)
        })
        .map(|(_, effects)| effects)
    }

    /// Makes a lane a constant width along the whole road.
    pub fn set_lane_width(&mut self, r: RoadID, lane: i32, width: Distance) -> Result<EditEffects> {
        self.transaction("set_lane_width", |net, effects| {
            check_lane_edit(net, r)?;
            if lane == 0 {
                bail!(EditError::TopologyConflict(
                    "the center lane has no width".to_string()
                ));
            }
            if width <= EPSILON_DIST {
                bail!(EditError::GeometricDegeneracy(format!(
                    "lane width {} is too small",
                    width
                )));
            }
            let road = net.mut_road(r)?;
            let mut found = false;
            for ls in &mut road.lane_sections {
                if let Some(l) = ls.lanes.get_mut(&lane) {
                    l.set_constant_width(width);
                    found = true;
                }
            }
            if !found {
                bail!(EditError::UnknownEntity(format!("lane {} of {}", lane, r)));
            }
            effects.lane_changed(r, lane);
            lanes_changed(net, r, effects)
        })
        .map(|(_, effects)| effects)
    }
}

fn refit_spline(
    net: &mut RoadNetwork,
    spline: SplineID,
    control_points: Vec<ControlPoint>,
    effects: &mut EditEffects,
) -> Result<()> {
    let (kind, private) = {
        let s = net.get_s(spline)?;
        (s.kind, s.is_private())
    };
    if private {
        bail!(EditError::TopologyConflict(format!(
            "{} belongs to a connecting road",
            spline
        )));
    }
    let geometry = fit::fit_spline(kind, &control_points).map_err(EditError::from)?;

    // Auto junctions along this spline are found again after the refit
    for j in net.get_s(spline)?.junctions() {
        if net.get_j(j)?.auto {
            segment_map::remove_entry(net, spline, SegmentRef::Junction(j), effects)?;
            effects.junction_stale(j);
        }
    }

    let old_length = net.get_s(spline)?.length();
    let new_length = geom::chain_length(&geometry);
    let ratio = if old_length > Distance::ZERO {
        new_length / old_length
    } else {
        1.0
    };
    let segments: Vec<(Distance, SegmentRef)> = {
        let s = net.mut_spline(spline)?;
        s.control_points = control_points;
        s.geometry = geometry;
        s.segments
            .iter()
            .map(|(offset, entry)| (*offset * ratio, *entry))
            .collect()
    };
    segment_map::replace_segments(net, spline, segments, effects)?;

    let spline_obj = net.get_s(spline)?;
    for j in spline_obj.junctions() {
        effects.junction_stale(j);
    }
    // Manual junctions at either end of the spline
    for r in spline_obj.roads() {
        for link in [net.get_r(r)?.predecessor, net.get_r(r)?.successor]
            .into_iter()
            .flatten()
        {
            if let RoadLink::Junction(j) = link {
                effects.junction_stale(j);
            }
        }
    }

    if net.config.auto_junctions {
        for r in net.get_s(spline)?.roads() {
            if net.road_exists(r) {
                junctions::update_junctions_for_road(net, r, effects)?;
            }
        }
    }
    Ok(())
}

fn new_manual_junction(
    net: &mut RoadNetwork,
    spline: SplineID,
    start: Distance,
    end: Distance,
    effects: &mut EditEffects,
) -> Result<JunctionID> {
    let s = net.get_s(spline)?;
    if s.is_private() {
        bail!(EditError::TopologyConflict(format!(
            "{} belongs to a connecting road",
            spline
        )));
    }
    let center = geom::chain_position(&s.geometry, (start + end) / 2.0)
        .map(|state| state.pt)
        .ok_or_else(|| EditError::GeometricDegeneracy(format!("{} has no geometry", spline)))?;
    let radius = (end - start).abs() / 2.0;
    let j = net.new_junction_id();
    net.put_junction(Junction::new(j, center, radius, false));
    effects.junction_changed(j);
    Ok(j)
}

fn check_lane_edit(net: &RoadNetwork, r: RoadID) -> Result<()> {
    if net.get_r(r)?.is_connecting() {
        bail!(EditError::TopologyConflict(format!(
            "the lanes of {} come from its junction",
            r
        )));
    }
    Ok(())
}

// Lane links touching the road have to be derived again.
fn lanes_changed(net: &mut RoadNetwork, r: RoadID, effects: &mut EditEffects) -> Result<()> {
    let road = net.get_r(r)?;
    let linked: Vec<JunctionID> = [road.predecessor, road.successor]
        .into_iter()
        .flatten()
        .filter_map(|link| match link {
            RoadLink::Junction(j) => Some(j),
            RoadLink::Road(_, _) => None,
        })
        .collect();
    for j in linked {
        net.mut_junction(j)?.mark_dirty(r);
        effects.junction_stale(j);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleting_wins_over_changing() {
        let mut effects = EditEffects::default();
        effects.lane_changed(RoadID(1), -1);
        effects.road_changed(RoadID(2));
        effects.road_deleted(RoadID(1));
        effects.road_changed(RoadID(1));
        effects.junction_stale(JunctionID(4));
        effects.junction_deleted(JunctionID(4));
        effects.junction_changed(JunctionID(4));

        assert_eq!(
            effects.events(),
            vec![
                ChangeEvent::RoadUpdated(RoadID(2)),
                ChangeEvent::RoadRemoved(RoadID(1)),
                ChangeEvent::JunctionRemoved(JunctionID(4)),
            ]
        );
        assert!(effects.stale_junctions().is_empty());

        let mut other = EditEffects::default();
        other.lane_changed(RoadID(3), 2);
        effects.merge(other);
        assert_eq!(
            effects.events().last(),
            Some(&ChangeEvent::LaneUpdated(RoadID(3), 2))
        );
        assert!(!effects.is_empty());
    }
}
