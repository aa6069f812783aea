use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{chain_length, ControlPoint, Distance, GeometrySegment, SplineKind, EPSILON_DIST};

use crate::{ElevationProfile, JunctionID, LaneSection, RoadID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SplineID(pub usize);

impl fmt::Display for SplineID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Spline #{}", self.0)
    }
}

/// What covers one span of a spline.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SegmentRef {
    Road(RoadID),
    Junction(JunctionID),
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SegmentRef::Road(r) => write!(f, "{}", r),
            SegmentRef::Junction(j) => write!(f, "{}", j),
        }
    }
}

/// A curve drawn by the user. Its length is split up between roads and junctions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub id: SplineID,
    pub kind: SplineKind,
    pub control_points: Vec<ControlPoint>,
    /// Fitted from the control points
    pub geometry: Vec<GeometrySegment>,
    /// Ordered by offset, starting at 0, covering the whole length without gaps. Each entry runs
    /// until the next one starts.
    pub segments: Vec<(Distance, SegmentRef)>,
    pub elevation: ElevationProfile,
    /// Roads created on this spline start with these lanes
    pub lane_template: LaneSection,
    /// Set for the private spline of a connecting road
    pub owner: Option<JunctionID>,
}

impl Spline {
    pub fn length(&self) -> Distance {
        chain_length(&self.geometry)
    }

    pub fn is_private(&self) -> bool {
        self.owner.is_some()
    }

    /// The [start, end) span of every entry.
    pub fn spans(&self) -> Vec<(Distance, Distance, SegmentRef)> {
        let length = self.length();
        self.segments
            .iter()
            .enumerate()
            .map(|(idx, (start, entry))| {
                let end = self
                    .segments
                    .get(idx + 1)
                    .map(|(next, _)| *next)
                    .unwrap_or(length);
                (*start, end, *entry)
            })
            .collect()
    }

    pub fn span_of(&self, entry: SegmentRef) -> Option<(Distance, Distance)> {
        self.spans()
            .into_iter()
            .find(|(_, _, e)| *e == entry)
            .map(|(start, end, _)| (start, end))
    }

    /// The entry covering an offset along the spline.
    pub fn entry_at(&self, s: Distance) -> Option<(Distance, Distance, SegmentRef)> {
        let spans = self.spans();
        spans
            .iter()
            .find(|(start, end, _)| *start <= s && s < *end)
            .or_else(|| spans.last())
            .cloned()
    }

    pub fn roads(&self) -> Vec<RoadID> {
        self.segments
            .iter()
            .filter_map(|(_, entry)| match entry {
                SegmentRef::Road(r) => Some(*r),
                SegmentRef::Junction(_) => None,
            })
            .collect()
    }

    pub fn junctions(&self) -> Vec<JunctionID> {
        self.segments
            .iter()
            .filter_map(|(_, entry)| match entry {
                SegmentRef::Junction(j) => Some(*j),
                SegmentRef::Road(_) => None,
            })
            .collect()
    }

    /// The segment map must be an ordered partition of the whole spline.
    pub fn check_segments(&self) -> Result<()> {
        if self.segments.is_empty() {
            bail!("{} has an empty segment map", self.id);
        }
        if self.segments[0].0 != Distance::ZERO {
            bail!("{} segment map starts at {}", self.id, self.segments[0].0);
        }
        for pair in self.segments.windows(2) {
            if pair[1].0 <= pair[0].0 {
                bail!(
                    "{} segment map isn't increasing: {} at {}, then {} at {}",
                    self.id,
                    pair[0].1,
                    pair[0].0,
                    pair[1].1,
                    pair[1].0
                );
            }
        }
        if let Some((last, entry)) = self.segments.last() {
            if *last >= self.length() - EPSILON_DIST && self.segments.len() > 1 {
                bail!("{} ends with an empty span for {}", self.id, entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom::{Angle, PlanState, Pt2D};

    fn spline(entries: Vec<(f64, SegmentRef)>) -> Spline {
        Spline {
            id: SplineID(1),
            kind: SplineKind::Auto,
            control_points: Vec::new(),
            geometry: vec![GeometrySegment::line(
                Distance::ZERO,
                PlanState::new(Pt2D::zero(), Angle::ZERO),
                Distance::meters(100.0),
            )],
            segments: entries
                .into_iter()
                .map(|(s, e)| (Distance::meters(s), e))
                .collect(),
            elevation: ElevationProfile::flat(),
            lane_template: LaneSection::driving(1, 1, Distance::meters(3.0)),
            owner: None,
        }
    }

    #[test]
    fn spans_cover_the_spline() {
        let s = spline(vec![
            (0.0, SegmentRef::Road(RoadID(0))),
            (40.0, SegmentRef::Junction(JunctionID(0))),
            (60.0, SegmentRef::Road(RoadID(1))),
        ]);
        s.check_segments().unwrap();
        assert_eq!(
            s.span_of(SegmentRef::Road(RoadID(1))),
            Some((Distance::meters(60.0), Distance::meters(100.0)))
        );
        assert_eq!(
            s.entry_at(Distance::meters(45.0)).map(|(_, _, e)| e),
            Some(SegmentRef::Junction(JunctionID(0)))
        );
        assert_eq!(
            s.entry_at(Distance::meters(100.0)).map(|(_, _, e)| e),
            Some(SegmentRef::Road(RoadID(1)))
        );
        assert_eq!(s.roads(), vec![RoadID(0), RoadID(1)]);
        assert_eq!(s.junctions(), vec![JunctionID(0)]);
    }

    #[test]
    fn bad_segment_maps() {
        assert!(spline(vec![(5.0, SegmentRef::Road(RoadID(0)))])
            .check_segments()
            .is_err());
        assert!(spline(vec![
            (0.0, SegmentRef::Road(RoadID(0))),
            (50.0, SegmentRef::Road(RoadID(1))),
            (50.0, SegmentRef::Road(RoadID(2))),
        ])
        .check_segments()
        .is_err());
    }
}
