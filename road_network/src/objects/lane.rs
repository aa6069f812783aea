use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Distance, Poly3};

use crate::{DrivingSide, EditError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneType {
    Driving,
    Biking,
    Sidewalk,
    Shoulder,
    Parking,
    Border,
    Median,
    /// The center lane, which has no width
    None,
}

impl LaneType {
    pub fn is_driving(self) -> bool {
        self == LaneType::Driving
    }

    /// Can anything travel along this lane through a junction?
    pub fn is_linkable(self) -> bool {
        !matches!(self, LaneType::None | LaneType::Border | LaneType::Median)
    }
}

/// Negative lane ids are on the right of the reference line, positive on the left, and 0 is the
/// center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneSide {
    Left,
    Center,
    Right,
}

impl LaneSide {
    pub fn from_id(id: i32) -> LaneSide {
        if id > 0 {
            LaneSide::Left
        } else if id < 0 {
            LaneSide::Right
        } else {
            LaneSide::Center
        }
    }

    /// The lanes on this side carry traffic in the direction of increasing s.
    pub fn forwards(driving_side: DrivingSide) -> LaneSide {
        match driving_side {
            DrivingSide::Right => LaneSide::Right,
            DrivingSide::Left => LaneSide::Left,
        }
    }

    pub fn opposite(self) -> LaneSide {
        match self {
            LaneSide::Left => LaneSide::Right,
            LaneSide::Right => LaneSide::Left,
            LaneSide::Center => LaneSide::Center,
        }
    }

    /// The id of the `n`th lane out from the center on this side, counting from 1.
    pub fn lane_id(self, n: usize) -> i32 {
        match self {
            LaneSide::Left => n as i32,
            LaneSide::Right => -(n as i32),
            LaneSide::Center => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadMarkType {
    None,
    Solid,
    Broken,
    SolidSolid,
}

/// A painted line along the outer edge of a lane, starting at some offset from the start of the
/// lane section.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadMark {
    pub s_offset: Distance,
    pub kind: RoadMarkType,
    pub width: Distance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: i32,
    pub lane_type: LaneType,
    /// Offsets are relative to the start of the lane section. Empty means no width.
    pub widths: Vec<Poly3>,
    /// The id of the lane continuing this one in the previous section (or road)
    pub predecessor: Option<i32>,
    /// The id of the lane continuing this one in the next section (or road)
    pub successor: Option<i32>,
    pub road_marks: Vec<RoadMark>,
}

impl Lane {
    pub fn new(id: i32, lane_type: LaneType, width: Distance) -> Lane {
        let widths = if id == 0 {
            Vec::new()
        } else {
            vec![Poly3::constant(Distance::ZERO, width.inner_meters())]
        };
        let mark = if lane_type.is_driving() {
            RoadMarkType::Broken
        } else {
            RoadMarkType::Solid
        };
        Lane {
            id,
            lane_type,
            widths,
            predecessor: None,
            successor: None,
            road_marks: vec![RoadMark {
                s_offset: Distance::ZERO,
                kind: mark,
                width: Distance::meters(0.12),
            }],
        }
    }

    pub fn side(&self) -> LaneSide {
        LaneSide::from_id(self.id)
    }

    /// The width at `ds` past the start of the lane section. Never negative.
    pub fn width_at(&self, ds: Distance) -> Distance {
        match Poly3::find(&self.widths, ds) {
            Some(poly) => Distance::meters(poly.eval(ds).max(0.0)),
            None => Distance::ZERO,
        }
    }

    pub fn set_constant_width(&mut self, width: Distance) {
        if self.id != 0 {
            self.widths = vec![Poly3::constant(Distance::ZERO, width.inner_meters())];
        }
    }

    /// Splits the width and road mark records at `ds`. The second lane's records start at 0.
    pub fn split(&self, ds: Distance) -> (Lane, Lane) {
        let (widths_before, widths_after) = Poly3::split(&self.widths, ds);

        let mut marks_before = Vec::new();
        let mut marks_after = Vec::new();
        for mark in &self.road_marks {
            if mark.s_offset < ds {
                marks_before.push(*mark);
            } else {
                marks_after.push(RoadMark {
                    s_offset: mark.s_offset - ds,
                    ..*mark
                });
            }
        }
        if marks_after
            .first()
            .map(|m| m.s_offset > Distance::ZERO)
            .unwrap_or(true)
        {
            if let Some(covering) = marks_before.last() {
                marks_after.insert(
                    0,
                    RoadMark {
                        s_offset: Distance::ZERO,
                        ..*covering
                    },
                );
            }
        }

        let before = Lane {
            widths: widths_before,
            road_marks: marks_before,
            ..self.clone()
        };
        let after = Lane {
            widths: widths_after,
            road_marks: marks_after,
            ..self.clone()
        };
        (before, after)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Lane {} ({:?})", self.id, self.lane_type)
    }
}

/// The cross-section of a road, from some arclength until the next section starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneSection {
    pub s: Distance,
    /// Keyed by signed id. Ids on each side are contiguous, starting next to the center.
    pub lanes: BTreeMap<i32, Lane>,
}

impl LaneSection {
    /// Just a center lane.
    pub fn new(s: Distance) -> LaneSection {
        let mut lanes = BTreeMap::new();
        lanes.insert(0, Lane::new(0, LaneType::None, Distance::ZERO));
        LaneSection { s, lanes }
    }

    /// Lane types on each side are listed from the center outwards.
    pub fn from_types(left: &[LaneType], right: &[LaneType], width: Distance) -> LaneSection {
        let mut section = LaneSection::new(Distance::ZERO);
        for lt in left {
            section.push_lane(LaneSide::Left, *lt, width);
        }
        for lt in right {
            section.push_lane(LaneSide::Right, *lt, width);
        }
        section
    }

    /// Only driving lanes, all the same width.
    pub fn driving(num_left: usize, num_right: usize, width: Distance) -> LaneSection {
        LaneSection::from_types(
            &vec![LaneType::Driving; num_left],
            &vec![LaneType::Driving; num_right],
            width,
        )
    }

    pub fn num_lanes(&self, side: LaneSide) -> usize {
        self.lanes
            .keys()
            .filter(|id| LaneSide::from_id(**id) == side)
            .count()
    }

    /// Ordered from the center outwards.
    pub fn lane_ids(&self, side: LaneSide) -> Vec<i32> {
        (1..=self.num_lanes(side)).map(|n| side.lane_id(n)).collect()
    }

    pub fn get(&self, id: i32) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    pub fn width(&self, id: i32, s: Distance) -> Distance {
        self.lanes
            .get(&id)
            .map(|l| l.width_at(s - self.s))
            .unwrap_or(Distance::ZERO)
    }

    pub fn side_width(&self, side: LaneSide, s: Distance) -> Distance {
        self.lane_ids(side).into_iter().map(|id| self.width(id, s)).sum()
    }

    pub fn total_width(&self, s: Distance) -> Distance {
        self.side_width(LaneSide::Left, s) + self.side_width(LaneSide::Right, s)
    }

    /// The lateral offset of the middle of a lane. Positive is left.
    pub fn t_of_lane(&self, id: i32, s: Distance) -> Option<Distance> {
        self.lanes.get(&id)?;
        let side = LaneSide::from_id(id);
        let mut inner = Distance::ZERO;
        for n in 1..id.unsigned_abs() as usize {
            inner += self.width(side.lane_id(n), s);
        }
        let mid = inner + self.width(id, s) / 2.0;
        Some(if side == LaneSide::Right { -mid } else { mid })
    }

    /// Which lane covers some lateral offset? None past the outer edge.
    pub fn lane_at(&self, t: Distance, s: Distance) -> Option<i32> {
        let side = if t >= Distance::ZERO {
            LaneSide::Left
        } else {
            LaneSide::Right
        };
        let mut edge = Distance::ZERO;
        for id in self.lane_ids(side) {
            edge += self.width(id, s);
            if t.abs() <= edge {
                return Some(id);
            }
        }
        None
    }

    /// Adds a lane to the outside of one side, returning its id.
    pub fn push_lane(&mut self, side: LaneSide, lane_type: LaneType, width: Distance) -> i32 {
        let id = side.lane_id(self.num_lanes(side) + 1);
        self.lanes.insert(id, Lane::new(id, lane_type, width));
        id
    }

    /// Removes a lane, moving every lane further out one step towards the center.
    pub fn remove_lane(&mut self, id: i32) -> Result<Lane> {
        if id == 0 {
            return Err(EditError::TopologyConflict("can't remove the center lane".to_string()).into());
        }
        let removed = self
            .lanes
            .remove(&id)
            .ok_or_else(|| EditError::UnknownEntity(format!("lane {}", id)))?;
        let side = LaneSide::from_id(id);
        let outer: Vec<i32> = self
            .lanes
            .keys()
            .cloned()
            .filter(|other| LaneSide::from_id(*other) == side && other.abs() > id.abs())
            .collect();
        // Renumber from the inside out, so nothing collides
        let mut sorted = outer;
        sorted.sort_by_key(|x| x.abs());
        for old_id in sorted {
            if let Some(mut lane) = self.lanes.remove(&old_id) {
                let new_id = old_id - old_id.signum();
                lane.id = new_id;
                self.lanes.insert(new_id, lane);
            }
        }
        Ok(removed)
    }

    /// Lane ids must run without gaps from the center out on both sides.
    pub fn check_contiguous(&self) -> Result<()> {
        if !self.lanes.contains_key(&0) {
            bail!("lane section at {} has no center lane", self.s);
        }
        for side in [LaneSide::Left, LaneSide::Right] {
            for (idx, id) in self.lane_ids(side).into_iter().enumerate() {
                if !self.lanes.contains_key(&id) {
                    bail!(
                        "lane section at {} is missing lane {} (lane {} on the {:?} side)",
                        self.s,
                        id,
                        idx + 1,
                        side
                    );
                }
                if self.lanes[&id].id != id {
                    bail!("lane {} is stored under id {}", self.lanes[&id].id, id);
                }
            }
        }
        Ok(())
    }
}

/// Index of the section covering `s`.
pub fn section_idx(sections: &[LaneSection], s: Distance) -> usize {
    sections.iter().rposition(|ls| ls.s <= s).unwrap_or(0)
}

/// Splits a list of sections at an arclength. The second list is re-based to start at 0; the
/// section covering `at` continues into it.
pub fn split_sections(sections: &[LaneSection], at: Distance) -> (Vec<LaneSection>, Vec<LaneSection>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    for ls in sections {
        if ls.s < at {
            before.push(ls.clone());
        } else {
            let mut ls = ls.clone();
            ls.s -= at;
            after.push(ls);
        }
    }
    if after
        .first()
        .map(|ls| ls.s > Distance::ZERO)
        .unwrap_or(true)
    {
        if let Some(covering) = before.last_mut() {
            let ds = at - covering.s;
            let mut head = LaneSection::new(covering.s);
            let mut tail = LaneSection::new(Distance::ZERO);
            for (id, lane) in &covering.lanes {
                let (l1, l2) = lane.split(ds);
                head.lanes.insert(*id, l1);
                tail.lanes.insert(*id, l2);
            }
            *covering = head;
            after.insert(0, tail);
        }
    }
    link_sections(&mut before);
    link_sections(&mut after);
    (before, after)
}

/// Moves every section but the first later by `delta`, for a road whose start moved backwards.
/// The first section grows to cover the new space.
pub fn extend_front(sections: &mut [LaneSection], delta: Distance) {
    for ls in sections.iter_mut().skip(1) {
        ls.s += delta;
    }
    if let Some(first) = sections.first_mut() {
        for lane in first.lanes.values_mut() {
            // Width records after the first slide back along with everything else
            for poly in lane.widths.iter_mut().skip(1) {
                poly.s += delta;
            }
            for mark in lane.road_marks.iter_mut().skip(1) {
                mark.s_offset += delta;
            }
        }
    }
}

/// Points every lane at the lane with the same id in the neighboring sections.
pub fn link_sections(sections: &mut [LaneSection]) {
    for idx in 0..sections.len() {
        let prev: Option<Vec<i32>> = if idx == 0 {
            None
        } else {
            Some(sections[idx - 1].lanes.keys().cloned().collect())
        };
        let next: Option<Vec<i32>> = sections
            .get(idx + 1)
            .map(|ls| ls.lanes.keys().cloned().collect());
        for (id, lane) in sections[idx].lanes.iter_mut() {
            if let Some(ref prev) = prev {
                lane.predecessor = prev.iter().find(|x| **x == *id).cloned();
            }
            if let Some(ref next) = next {
                lane.successor = next.iter().find(|x| **x == *id).cloned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width() -> Distance {
        Distance::meters(3.5)
    }

    #[test]
    fn offsets_and_lookup() {
        let ls = LaneSection::from_types(
            &[LaneType::Driving],
            &[LaneType::Driving, LaneType::Sidewalk],
            width(),
        );
        ls.check_contiguous().unwrap();
        assert_eq!(ls.lane_ids(LaneSide::Right), vec![-1, -2]);
        assert_eq!(ls.lane_ids(LaneSide::Left), vec![1]);
        assert_eq!(ls.t_of_lane(1, Distance::ZERO), Some(Distance::meters(1.75)));
        assert_eq!(ls.t_of_lane(-2, Distance::ZERO), Some(Distance::meters(-5.25)));
        assert_eq!(ls.lane_at(Distance::meters(-4.0), Distance::ZERO), Some(-2));
        assert_eq!(ls.lane_at(Distance::meters(2.0), Distance::ZERO), Some(1));
        assert_eq!(ls.lane_at(Distance::meters(4.0), Distance::ZERO), None);
        assert_eq!(ls.total_width(Distance::ZERO), Distance::meters(10.5));
    }

    #[test]
    fn removing_renumbers_outer_lanes() {
        let mut ls = LaneSection::driving(0, 3, width());
        ls.lanes.get_mut(&-3).unwrap().lane_type = LaneType::Shoulder;
        ls.remove_lane(-2).unwrap();
        ls.check_contiguous().unwrap();
        assert_eq!(ls.lane_ids(LaneSide::Right), vec![-1, -2]);
        assert_eq!(ls.get(-2).unwrap().lane_type, LaneType::Shoulder);
        assert!(ls.remove_lane(0).is_err());
        assert!(ls.remove_lane(5).is_err());
    }

    #[test]
    fn splitting_sections() {
        let mut first = LaneSection::driving(1, 1, width());
        first.lanes.get_mut(&-1).unwrap().widths =
            vec![Poly3::linear(Distance::ZERO, 3.0, 4.0, Distance::meters(20.0))];
        let mut second = LaneSection::driving(1, 2, width());
        second.s = Distance::meters(20.0);
        let mut sections = vec![first, second];
        link_sections(&mut sections);

        let (before, after) = split_sections(&sections, Distance::meters(10.0));
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].s, Distance::ZERO);
        assert_eq!(after[1].s, Distance::meters(10.0));
        assert!(after[0]
            .width(-1, Distance::ZERO)
            .approx_eq(Distance::meters(3.5), Distance::meters(1e-9)));
        assert_eq!(after[0].get(-1).unwrap().successor, Some(-1));
        assert_eq!(after[1].get(-2).unwrap().predecessor, None);
    }
}
