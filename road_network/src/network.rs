use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::{deserialize_btreemap, serialize_btreemap};

use crate::{
    ContactPoint, EditError, Junction, JunctionID, NetworkConfig, Road, RoadEnd, RoadID, RoadLink,
    SegmentRef, Spline, SplineID,
};

/// Every spline, road and junction of one document. Ids are never reused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    pub config: NetworkConfig,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    roads: BTreeMap<RoadID, Road>,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    junctions: BTreeMap<JunctionID, Junction>,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    splines: BTreeMap<SplineID, Spline>,

    next_road: usize,
    next_junction: usize,
    next_spline: usize,
}

/// Counts of everything in a network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Not counting the private splines of connecting roads
    pub splines: usize,
    pub roads: usize,
    pub connecting_roads: usize,
    pub junctions: usize,
    pub connections: usize,
    pub lane_links: usize,
}

impl RoadNetwork {
    pub fn new(config: NetworkConfig) -> RoadNetwork {
        RoadNetwork {
            config,
            roads: BTreeMap::new(),
            junctions: BTreeMap::new(),
            splines: BTreeMap::new(),
            next_road: 0,
            next_junction: 0,
            next_spline: 0,
        }
    }

    pub fn load_json(path: &str) -> Result<RoadNetwork> {
        let network: RoadNetwork = abstutil::read_json(path)?;
        if let Err(err) = network.validate() {
            warn!("{} has problems: {}", path, err);
        }
        info!(
            "Loaded {} with {} roads and {} junctions",
            path,
            network.roads.len(),
            network.junctions.len()
        );
        Ok(network)
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        abstutil::write_json(path, self)
    }

    pub fn get_r(&self, id: RoadID) -> Result<&Road> {
        self.roads
            .get(&id)
            .ok_or_else(|| EditError::UnknownEntity(id.to_string()).into())
    }

    pub fn get_j(&self, id: JunctionID) -> Result<&Junction> {
        self.junctions
            .get(&id)
            .ok_or_else(|| EditError::UnknownEntity(id.to_string()).into())
    }

    pub fn get_s(&self, id: SplineID) -> Result<&Spline> {
        self.splines
            .get(&id)
            .ok_or_else(|| EditError::UnknownEntity(id.to_string()).into())
    }

    pub fn road_exists(&self, id: RoadID) -> bool {
        self.roads.contains_key(&id)
    }

    pub fn junction_exists(&self, id: JunctionID) -> bool {
        self.junctions.contains_key(&id)
    }

    pub fn spline_exists(&self, id: SplineID) -> bool {
        self.splines.contains_key(&id)
    }

    pub fn all_roads(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    pub fn all_junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    /// Including the private splines of connecting roads
    pub fn all_splines(&self) -> impl Iterator<Item = &Spline> {
        self.splines.values()
    }

    pub fn num_roads(&self) -> usize {
        self.roads.len()
    }

    pub fn num_junctions(&self) -> usize {
        self.junctions.len()
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            splines: self.splines.values().filter(|s| !s.is_private()).count(),
            roads: self.roads.len(),
            connecting_roads: self.roads.values().filter(|r| r.is_connecting()).count(),
            junctions: self.junctions.len(),
            connections: self.junctions.values().map(|j| j.connections.len()).sum(),
            lane_links: self
                .junctions
                .values()
                .flat_map(|j| j.connections.values())
                .map(|c| c.lane_links.len())
                .sum(),
        }
    }

    /// The road ends attached to a junction, not counting its own connecting roads.
    pub fn road_ends_at(&self, j: JunctionID) -> Vec<RoadEnd> {
        let mut ends = Vec::new();
        for road in self.roads.values() {
            if road.is_connecting() {
                continue;
            }
            for contact in [ContactPoint::Start, ContactPoint::End] {
                if road.link(contact) == Some(RoadLink::Junction(j)) {
                    ends.push(RoadEnd::new(road.id, contact));
                }
            }
        }
        ends
    }

    /// The non-connecting roads covering part of a spline, in order.
    pub fn roads_on_spline(&self, spline: SplineID) -> Result<Vec<RoadID>> {
        Ok(self.get_s(spline)?.roads())
    }

    /// Checks everything is well-formed and every id points at something that exists.
    pub fn validate(&self) -> Result<()> {
        for spline in self.splines.values() {
            spline.check_segments()?;
            for (_, entry) in &spline.segments {
                match entry {
                    SegmentRef::Road(r) => {
                        let road = self.get_r(*r)?;
                        if road.spline != spline.id {
                            bail!("{} is in the map of {}, but says {}", r, spline.id, road.spline);
                        }
                    }
                    SegmentRef::Junction(j) => {
                        self.get_j(*j)?;
                    }
                }
            }
        }
        for road in self.roads.values() {
            road.validate()?;
            self.get_s(road.spline)?;
            for link in [road.predecessor, road.successor].into_iter().flatten() {
                match link {
                    RoadLink::Road(other, _) => {
                        self.get_r(other)?;
                    }
                    RoadLink::Junction(j) => {
                        self.get_j(j)?;
                    }
                }
            }
        }
        for junction in self.junctions.values() {
            for conn in junction.connections.values() {
                let road = self.get_r(conn.connecting_road)?;
                if road.predecessor != Some(RoadLink::Road(conn.incoming.road, conn.incoming.contact))
                    || road.successor
                        != Some(RoadLink::Road(conn.outgoing.road, conn.outgoing.contact))
                {
                    bail!("{} in {} has mismatched links", conn, junction.id);
                }
            }
        }
        Ok(())
    }

    // Internal mutation, used by the edit operators.

    pub(crate) fn mut_road(&mut self, id: RoadID) -> Result<&mut Road> {
        self.roads
            .get_mut(&id)
            .ok_or_else(|| EditError::UnknownEntity(id.to_string()).into())
    }

    pub(crate) fn mut_junction(&mut self, id: JunctionID) -> Result<&mut Junction> {
        self.junctions
            .get_mut(&id)
            .ok_or_else(|| EditError::UnknownEntity(id.to_string()).into())
    }

    pub(crate) fn mut_spline(&mut self, id: SplineID) -> Result<&mut Spline> {
        self.splines
            .get_mut(&id)
            .ok_or_else(|| EditError::UnknownEntity(id.to_string()).into())
    }

    pub(crate) fn insert_road(&mut self, road: Road) {
        self.roads.insert(road.id, road);
    }

    pub(crate) fn put_junction(&mut self, junction: Junction) {
        self.junctions.insert(junction.id, junction);
    }

    pub(crate) fn insert_spline(&mut self, spline: Spline) {
        self.splines.insert(spline.id, spline);
    }

    pub(crate) fn take_road(&mut self, id: RoadID) -> Option<Road> {
        self.roads.remove(&id)
    }

    pub(crate) fn take_junction(&mut self, id: JunctionID) -> Option<Junction> {
        self.junctions.remove(&id)
    }

    pub(crate) fn take_spline(&mut self, id: SplineID) -> Option<Spline> {
        self.splines.remove(&id)
    }

    pub(crate) fn new_road_id(&mut self) -> RoadID {
        let id = RoadID(self.next_road);
        self.next_road += 1;
        id
    }

    pub(crate) fn new_junction_id(&mut self) -> JunctionID {
        let id = JunctionID(self.next_junction);
        self.next_junction += 1;
        id
    }

    pub(crate) fn new_spline_id(&mut self) -> SplineID {
        let id = SplineID(self.next_spline);
        self.next_spline += 1;
        id
    }

    pub(crate) fn road_ids(&self) -> Vec<RoadID> {
        self.roads.keys().cloned().collect()
    }

    pub(crate) fn junction_ids(&self) -> Vec<JunctionID> {
        self.junctions.keys().cloned().collect()
    }

    pub(crate) fn spline_ids(&self) -> Vec<SplineID> {
        self.splines.keys().cloned().collect()
    }
}

impl Default for RoadNetwork {
    fn default() -> RoadNetwork {
        RoadNetwork::new(NetworkConfig::default())
    }
}
