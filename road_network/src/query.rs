use anyhow::Result;

use geom::{Bounds, Distance, FindClosest, InfiniteLine, Pt2D};

use crate::{EditError, RoadID, RoadNetwork};

// Golden-section refinement steps when projecting onto a road
const PROJECT_ITERATIONS: usize = 40;

impl RoadNetwork {
    /// The (s, t) coordinates of a point relative to a road. `s` is clamped to the road; `t` is
    /// positive to the left.
    pub fn project(&self, r: RoadID, pt: Pt2D) -> Result<(Distance, Distance)> {
        let road = self.get_r(r)?;
        let samples = road.sample(self.config.sample_step);
        if samples.is_empty() {
            bail!(EditError::GeometricDegeneracy(format!("{} has no length", r)));
        }
        let mut best = 0;
        for (idx, (_, sample)) in samples.iter().enumerate() {
            if sample.dist_squared(pt) < samples[best].1.dist_squared(pt) {
                best = idx;
            }
        }

        // The closest point lies between the neighbors of the closest sample
        let mut lo = samples[best.saturating_sub(1)].0.inner_meters();
        let mut hi = samples[(best + 1).min(samples.len() - 1)].0.inner_meters();
        let dist = |s: f64| road.state_at(Distance::meters(s)).pt.dist_squared(pt);
        let ratio = (5.0_f64.sqrt() - 1.0) / 2.0;
        for _ in 0..PROJECT_ITERATIONS {
            let m1 = hi - ratio * (hi - lo);
            let m2 = lo + ratio * (hi - lo);
            if dist(m1) < dist(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        let s = Distance::meters((lo + hi) / 2.0);
        let state = road.state_at(s);
        let t = InfiniteLine::from_pt_angle(state.pt, state.heading).signed_dist_to(pt);
        Ok((s, t))
    }

    /// The road closest to a point, no further than `max_dist` away, with the point's (s, t)
    /// coordinates along it. Connecting roads are ignored.
    pub fn nearest_road(&self, pt: Pt2D, max_dist: Distance) -> Option<(RoadID, Distance, Distance)> {
        let mut bounds = Bounds::new();
        bounds.update(pt);
        let mut polylines = Vec::new();
        for road in self.all_roads() {
            if road.is_connecting() {
                continue;
            }
            let pts: Vec<Pt2D> = road
                .sample(self.config.sample_step)
                .into_iter()
                .map(|(_, pt)| pt)
                .collect();
            for pt in &pts {
                bounds.update(*pt);
            }
            polylines.push((road.id, pts));
        }
        bounds.buffer(max_dist);

        let mut closest = FindClosest::new(&bounds);
        for (r, pts) in polylines {
            closest.add(r, &pts);
        }
        let (r, _) = closest.closest_pt(pt, max_dist)?;
        let (s, t) = self.project(r, pt).ok()?;
        Some((r, s, t))
    }

    /// The lane under a point, on the closest road within `max_dist`.
    pub fn nearest_lane(&self, pt: Pt2D, max_dist: Distance) -> Option<(RoadID, i32)> {
        let (r, s, t) = self.nearest_road(pt, max_dist)?;
        let lane = self.get_r(r).ok()?.lane_at(s, t)?;
        Some((r, lane))
    }
}
