use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{chain_length, chain_position, Angle, Distance, GeometrySegment, PlanState, Pt2D};

use crate::objects::lane::section_idx;
use crate::{ElevationProfile, JunctionID, LaneSection, LaneSide, SplineID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadID(pub usize);

impl fmt::Display for RoadID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Road #{}", self.0)
    }
}

/// Which end of a road.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContactPoint {
    Start,
    End,
}

impl ContactPoint {
    pub fn opposite(self) -> ContactPoint {
        match self {
            ContactPoint::Start => ContactPoint::End,
            ContactPoint::End => ContactPoint::Start,
        }
    }
}

impl fmt::Display for ContactPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContactPoint::Start => write!(f, "start"),
            ContactPoint::End => write!(f, "end"),
        }
    }
}

/// One end of a road.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadEnd {
    pub road: RoadID,
    pub contact: ContactPoint,
}

impl RoadEnd {
    pub fn new(road: RoadID, contact: ContactPoint) -> RoadEnd {
        RoadEnd { road, contact }
    }
}

impl fmt::Display for RoadEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} of {}", self.contact, self.road)
    }
}

/// What's attached to one end of a road.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoadLink {
    Road(RoadID, ContactPoint),
    Junction(JunctionID),
}

impl fmt::Display for RoadLink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RoadLink::Road(r, contact) => write!(f, "{} of {}", contact, r),
            RoadLink::Junction(j) => write!(f, "{}", j),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadID,
    /// Contiguous, starting at s = 0
    pub geometry: Vec<GeometrySegment>,
    /// Ordered by s; the first starts at 0
    pub lane_sections: Vec<LaneSection>,
    pub elevation: ElevationProfile,
    pub predecessor: Option<RoadLink>,
    pub successor: Option<RoadLink>,

    /// The spline this road covers part of
    pub spline: SplineID,
    /// Where this road starts along its spline
    pub spline_offset: Distance,
    /// Only set for connecting roads, which belong to a junction
    pub junction: Option<JunctionID>,
}

impl Road {
    pub fn length(&self) -> Distance {
        chain_length(&self.geometry)
    }

    pub fn is_connecting(&self) -> bool {
        self.junction.is_some()
    }

    pub fn link(&self, contact: ContactPoint) -> Option<RoadLink> {
        match contact {
            ContactPoint::Start => self.predecessor,
            ContactPoint::End => self.successor,
        }
    }

    pub fn set_link(&mut self, contact: ContactPoint, link: Option<RoadLink>) {
        match contact {
            ContactPoint::Start => self.predecessor = link,
            ContactPoint::End => self.successor = link,
        }
    }

    pub fn contact_s(&self, contact: ContactPoint) -> Distance {
        match contact {
            ContactPoint::Start => Distance::ZERO,
            ContactPoint::End => self.length(),
        }
    }

    /// Position and heading of the reference line. `s` is clamped to the road.
    pub fn position_at(&self, s: Distance) -> (Pt2D, Angle) {
        let state = self.state_at(s);
        (state.pt, state.heading)
    }

    /// Like `state_at`, but `None` for a road without geometry.
    pub fn try_state_at(&self, s: Distance) -> Option<PlanState> {
        chain_position(&self.geometry, s)
    }

    /// A road without geometry has nowhere to be. That's logged, and the origin is returned.
    pub fn state_at(&self, s: Distance) -> PlanState {
        match self.try_state_at(s) {
            Some(state) => state,
            None => {
                error!("{} has no geometry, can't find {} along it", self.id, s);
                PlanState::new(Pt2D::zero(), Angle::ZERO)
            }
        }
    }

    /// A world position from a longitudinal and lateral offset. Positive `t` is to the left.
    pub fn position_at_st(&self, s: Distance, t: Distance) -> Pt2D {
        self.state_at(s).lateral(t)
    }

    /// The state at one end of the road, facing along the road.
    pub fn end_state(&self, contact: ContactPoint) -> PlanState {
        self.state_at(self.contact_s(contact))
    }

    pub fn lane_section_at(&self, s: Distance) -> Option<&LaneSection> {
        if self.lane_sections.is_empty() {
            return None;
        }
        Some(&self.lane_sections[section_idx(&self.lane_sections, s)])
    }

    /// The section at one end of the road.
    pub fn end_section(&self, contact: ContactPoint) -> Option<(usize, &LaneSection)> {
        match contact {
            ContactPoint::Start => self.lane_sections.first().map(|ls| (0, ls)),
            ContactPoint::End => self
                .lane_sections
                .last()
                .map(|ls| (self.lane_sections.len() - 1, ls)),
        }
    }

    pub fn width_at(&self, s: Distance) -> Distance {
        self.lane_section_at(s)
            .map(|ls| ls.total_width(s))
            .unwrap_or(Distance::ZERO)
    }

    pub fn side_width_at(&self, side: LaneSide, s: Distance) -> Distance {
        self.lane_section_at(s)
            .map(|ls| ls.side_width(side, s))
            .unwrap_or(Distance::ZERO)
    }

    pub fn lane_at(&self, s: Distance, t: Distance) -> Option<i32> {
        self.lane_section_at(s)?.lane_at(t, s)
    }

    pub fn t_of_lane(&self, s: Distance, id: i32) -> Option<Distance> {
        self.lane_section_at(s)?.t_of_lane(id, s)
    }

    pub fn elevation_at(&self, s: Distance) -> Option<f64> {
        self.elevation.height_at(s)
    }

    /// Points along the reference line every `step`, always including both ends.
    pub fn sample(&self, step: Distance) -> Vec<(Distance, Pt2D)> {
        let length = self.length();
        let mut result = Vec::new();
        if length == Distance::ZERO || step <= Distance::ZERO {
            return result;
        }
        let mut s = Distance::ZERO;
        while s < length {
            result.push((s, self.state_at(s).pt));
            s += step;
        }
        result.push((length, self.state_at(length).pt));
        result
    }

    /// Checks the geometry and lane sections are well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.geometry.is_empty() {
            bail!("{} has no geometry", self.id);
        }
        geom::check_continuity(&self.geometry)?;
        if let Some(first) = self.geometry.first() {
            if first.s != Distance::ZERO {
                bail!("{} geometry starts at {}", self.id, first.s);
            }
        }
        match self.lane_sections.first() {
            Some(ls) if ls.s == Distance::ZERO => {}
            _ => bail!("{} has no lane section at s = 0", self.id),
        }
        for pair in self.lane_sections.windows(2) {
            if pair[1].s <= pair[0].s {
                bail!("{} lane sections out of order at {}", self.id, pair[1].s);
            }
        }
        for ls in &self.lane_sections {
            ls.check_contiguous()?;
        }
        Ok(())
    }
}

impl fmt::Display for Road {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} long)", self.id, self.length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LaneType;

    fn straight_road(length: f64) -> Road {
        Road {
            id: RoadID(0),
            geometry: vec![GeometrySegment::line(
                Distance::ZERO,
                PlanState::new(Pt2D::new(0.0, 0.0), Angle::degrees(90.0)),
                Distance::meters(length),
            )],
            lane_sections: vec![LaneSection::from_types(
                &[LaneType::Driving],
                &[LaneType::Driving, LaneType::Sidewalk],
                Distance::meters(3.0),
            )],
            elevation: ElevationProfile::flat(),
            predecessor: None,
            successor: None,
            spline: SplineID(0),
            spline_offset: Distance::ZERO,
            junction: None,
        }
    }

    #[test]
    fn st_coordinates() {
        let road = straight_road(20.0);
        road.validate().unwrap();
        // Heading north, so left is -x
        let pt = road.position_at_st(Distance::meters(5.0), Distance::meters(2.0));
        assert!(pt.approx_eq(Pt2D::new(-2.0, 5.0), Distance::meters(1e-9)));
        assert_eq!(road.lane_at(Distance::meters(5.0), Distance::meters(-4.0)), Some(-2));
        assert_eq!(
            road.t_of_lane(Distance::meters(5.0), -1),
            Some(Distance::meters(-1.5))
        );
        assert_eq!(road.width_at(Distance::meters(19.0)), Distance::meters(9.0));
    }

    #[test]
    fn no_geometry() {
        let mut road = straight_road(10.0);
        road.geometry.clear();
        assert!(road.validate().is_err());
        assert_eq!(road.try_state_at(Distance::meters(5.0)), None);
        assert!(road.sample(Distance::meters(1.0)).is_empty());
    }

    #[test]
    fn sampling_includes_the_end() {
        let road = straight_road(2.5);
        let samples = road.sample(Distance::meters(1.0));
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[3].0, Distance::meters(2.5));
        assert!(samples[3].1.approx_eq(Pt2D::new(0.0, 2.5), Distance::meters(1e-9)));
    }
}
