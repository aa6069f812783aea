use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use abstutil::{deserialize_btreemap, serialize_btreemap};
use geom::{Distance, Pt2D};

use crate::{RoadEnd, RoadID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JunctionID(pub usize);

impl fmt::Display for JunctionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Junction #{}", self.0)
    }
}

/// Unique only within one junction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionID(pub usize);

impl fmt::Display for ConnectionID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Connection #{}", self.0)
    }
}

/// Traffic from one lane of the incoming road follows one lane of the connecting road into one
/// lane of the outgoing road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLink {
    pub from: i32,
    pub connecting: i32,
    pub to: i32,
    /// Set when the lanes on either side changed, and the link needs to be derived again.
    pub dirty: bool,
}

/// A way through a junction, from the end of one road into another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionID,
    pub incoming: RoadEnd,
    pub outgoing: RoadEnd,
    /// Carries the geometry and lanes of this connection. Its predecessor is the incoming road
    /// end and its successor is the outgoing road end.
    pub connecting_road: RoadID,
    pub lane_links: Vec<LaneLink>,
}

impl Connection {
    pub fn touches(&self, r: RoadID) -> bool {
        self.incoming.road == r || self.outgoing.road == r || self.connecting_road == r
    }

    pub fn is_dirty(&self) -> bool {
        self.lane_links.iter().any(|link| link.dirty)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} from {} to {} via {}",
            self.id, self.incoming, self.outgoing, self.connecting_road
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub id: JunctionID,
    #[serde(
        serialize_with = "serialize_btreemap",
        deserialize_with = "deserialize_btreemap"
    )]
    pub connections: BTreeMap<ConnectionID, Connection>,
    /// Created by intersection detection, rather than by hand. Auto junctions disappear when
    /// fewer than two road ends remain.
    pub auto: bool,
    /// Roughly the middle of the road ends
    pub center: Pt2D,
    /// Intersection hits within this distance of the center belong to this junction
    pub radius: Distance,
}

impl Junction {
    pub fn new(id: JunctionID, center: Pt2D, radius: Distance, auto: bool) -> Junction {
        Junction {
            id,
            connections: BTreeMap::new(),
            auto,
            center,
            radius,
        }
    }

    pub fn covers(&self, pt: Pt2D) -> bool {
        self.center.dist_to(pt) <= self.radius
    }

    /// The lowest free connection id.
    pub fn next_connection_id(&self) -> ConnectionID {
        let mut id = ConnectionID(0);
        while self.connections.contains_key(&id) {
            id = ConnectionID(id.0 + 1);
        }
        id
    }

    pub fn connecting_roads(&self) -> Vec<RoadID> {
        self.connections
            .values()
            .map(|c| c.connecting_road)
            .collect()
    }

    /// Every (incoming road end, from lane, outgoing road end, to lane) passing through.
    pub fn lane_link_pairs(&self) -> Vec<(RoadEnd, i32, RoadEnd, i32)> {
        let mut pairs = Vec::new();
        for conn in self.connections.values() {
            for link in &conn.lane_links {
                pairs.push((conn.incoming, link.from, conn.outgoing, link.to));
            }
        }
        pairs.sort();
        pairs
    }

    pub fn is_dirty(&self) -> bool {
        self.connections.values().any(|c| c.is_dirty())
    }

    pub fn mark_dirty(&mut self, r: RoadID) -> bool {
        let mut any = false;
        for conn in self.connections.values_mut() {
            if conn.incoming.road == r || conn.outgoing.road == r {
                for link in &mut conn.lane_links {
                    link.dirty = true;
                    any = true;
                }
            }
        }
        any
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at {} with {} connections",
            self.id,
            self.center,
            self.connections.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContactPoint;

    #[test]
    fn connection_ids_fill_gaps() {
        let mut j = Junction::new(JunctionID(3), Pt2D::zero(), Distance::meters(5.0), true);
        assert_eq!(j.next_connection_id(), ConnectionID(0));
        for id in [0, 1, 3] {
            j.connections.insert(
                ConnectionID(id),
                Connection {
                    id: ConnectionID(id),
                    incoming: RoadEnd::new(RoadID(0), ContactPoint::End),
                    outgoing: RoadEnd::new(RoadID(1), ContactPoint::Start),
                    connecting_road: RoadID(10 + id),
                    lane_links: vec![LaneLink {
                        from: -1,
                        connecting: -1,
                        to: -1,
                        dirty: false,
                    }],
                },
            );
        }
        assert_eq!(j.next_connection_id(), ConnectionID(2));
        assert!(!j.is_dirty());
        assert!(j.mark_dirty(RoadID(1)));
        assert!(j.is_dirty());
        assert!(!j.mark_dirty(RoadID(7)));
        assert!(j.covers(Pt2D::new(3.0, 4.0)));
        assert!(!j.covers(Pt2D::new(3.0, 4.1)));
    }
}
