//! Finds where the reference lines of two roads cross, by sampling both at a fixed step and
//! comparing every pair of samples. This is quadratic in both the number of roads and the number
//! of samples per road.

use serde::{Deserialize, Serialize};

use geom::{Distance, Line, Pt2D};

use crate::{NetworkConfig, Road, RoadID, RoadNetwork};

/// One place where two roads cross.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntersectionHit {
    pub point: Pt2D,
    pub road_a: RoadID,
    pub s_a: Distance,
    pub road_b: RoadID,
    pub s_b: Distance,
}

/// Every crossing between one road and the others, ordered by the other road's id, then along
/// the road. Connecting roads and other roads on the same spline are ignored.
pub fn find_intersections(net: &RoadNetwork, r: RoadID) -> Vec<IntersectionHit> {
    find(net, r, false)
}

/// Like `find_intersections`, but roads passing over or under each other don't count. If only
/// one of two roads has an elevation profile, they never cross.
pub fn find_intersections_3d(net: &RoadNetwork, r: RoadID) -> Vec<IntersectionHit> {
    find(net, r, true)
}

/// Every crossing between any two roads, each pair only once.
pub fn find_all_intersections(net: &RoadNetwork) -> Vec<IntersectionHit> {
    let roads: Vec<(&Road, Vec<(Distance, Pt2D)>)> = net
        .all_roads()
        .filter(|r| !r.is_connecting())
        .map(|r| (r, r.sample(net.config.sample_step)))
        .collect();
    let mut hits = Vec::new();
    for (idx, (a, samples_a)) in roads.iter().enumerate() {
        for (b, samples_b) in roads.iter().skip(idx + 1) {
            if a.spline == b.spline {
                continue;
            }
            hits.extend(match_samples(
                &net.config,
                a.id,
                samples_a,
                b.id,
                samples_b,
            ));
        }
    }
    hits
}

fn find(net: &RoadNetwork, r: RoadID, check_elevation: bool) -> Vec<IntersectionHit> {
    let road = match net.get_r(r) {
        Ok(road) if !road.is_connecting() => road,
        _ => {
            return Vec::new();
        }
    };
    let samples = road.sample(net.config.sample_step);
    let mut hits = Vec::new();
    for other in net.all_roads() {
        if other.id == r || other.is_connecting() || other.spline == road.spline {
            continue;
        }
        if check_elevation && road.elevation.is_empty() != other.elevation.is_empty() {
            continue;
        }
        let found = match_samples(
            &net.config,
            r,
            &samples,
            other.id,
            &other.sample(net.config.sample_step),
        );
        for hit in found {
            if check_elevation && !same_level(&net.config, road, other, &hit) {
                continue;
            }
            hits.push(hit);
        }
    }
    hits
}

fn same_level(config: &NetworkConfig, a: &Road, b: &Road, hit: &IntersectionHit) -> bool {
    match (a.elevation_at(hit.s_a), b.elevation_at(hit.s_b)) {
        (Some(za), Some(zb)) => (za - zb).abs() < config.elevation_tolerance,
        (None, None) => true,
        _ => false,
    }
}

fn match_samples(
    config: &NetworkConfig,
    a: RoadID,
    samples_a: &[(Distance, Pt2D)],
    b: RoadID,
    samples_b: &[(Distance, Pt2D)],
) -> Vec<IntersectionHit> {
    let threshold = config.match_distance();
    let skip = config.skip_samples.max(1);
    let mut hits = Vec::new();

    let mut i = 0;
    while i < samples_a.len() {
        let mut j = 0;
        while i < samples_a.len() && j < samples_b.len() {
            if samples_a[i].1.dist_to(samples_b[j].1) < threshold {
                hits.push(refine(a, samples_a, i, b, samples_b, j));
                // Nearly parallel roads would match many samples in a row
                i += skip;
                j += skip;
            } else {
                j += 1;
            }
        }
        i += 1;
    }
    hits
}

// The chord through the neighbors of sample `idx`, with the index it starts from.
fn chord(samples: &[(Distance, Pt2D)], idx: usize) -> Option<(usize, Line)> {
    let lo = idx.saturating_sub(1);
    let hi = (idx + 1).min(samples.len() - 1);
    Line::new(samples[lo].1, samples[hi].1)
        .ok()
        .map(|line| (lo, line))
}

fn refine(
    a: RoadID,
    samples_a: &[(Distance, Pt2D)],
    i: usize,
    b: RoadID,
    samples_b: &[(Distance, Pt2D)],
    j: usize,
) -> IntersectionHit {
    if let (Some((lo_a, chord_a)), Some((lo_b, chord_b))) = (chord(samples_a, i), chord(samples_b, j))
    {
        if let Some(pt) = chord_a.intersection(&chord_b) {
            return IntersectionHit {
                point: pt,
                road_a: a,
                s_a: samples_a[lo_a].0 + samples_a[lo_a].1.dist_to(pt),
                road_b: b,
                s_b: samples_b[lo_b].0 + samples_b[lo_b].1.dist_to(pt),
            };
        }
    }
    let (pt_a, pt_b) = (samples_a[i].1, samples_b[j].1);
    IntersectionHit {
        point: Pt2D::new((pt_a.x() + pt_b.x()) / 2.0, (pt_a.y() + pt_b.y()) / 2.0),
        road_a: a,
        s_a: samples_a[i].0,
        road_b: b,
        s_b: samples_b[j].0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(from: Pt2D, to: Pt2D, n: usize) -> Vec<(Distance, Pt2D)> {
        let line = Line::must_new(from, to);
        let step = line.length() / (n as f64);
        (0..=n)
            .map(|k| {
                let s = step * (k as f64);
                (s, line.dist_along(s))
            })
            .collect()
    }

    #[test]
    fn crossing_chords_are_refined() {
        let config = NetworkConfig::default();
        // The samples never land exactly on the crossing
        let a = samples(Pt2D::new(-10.0, 0.3), Pt2D::new(10.0, 0.3), 20);
        let b = samples(Pt2D::new(0.4, -10.0), Pt2D::new(0.4, 10.0), 20);
        let hits = match_samples(&config, RoadID(0), &a, RoadID(1), &b);
        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert!(hit.point.approx_eq(Pt2D::new(0.4, 0.3), Distance::meters(1e-9)));
        assert!(hit.s_a.approx_eq(Distance::meters(10.4), Distance::meters(1e-9)));
        assert!(hit.s_b.approx_eq(Distance::meters(10.3), Distance::meters(1e-9)));
    }

    #[test]
    fn overlapping_roads_skip_ahead() {
        let config = NetworkConfig::default();
        let a = samples(Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0), 10);
        let b = samples(Pt2D::new(0.0, 0.1), Pt2D::new(10.0, 0.1), 10);
        let hits = match_samples(&config, RoadID(0), &a, RoadID(1), &b);
        // Every other sample matches
        assert_eq!(hits.len(), 6);
        assert_eq!(hits[1].s_a, Distance::meters(2.0));
        assert_eq!(hits[1].s_b, Distance::meters(2.0));
    }
}
