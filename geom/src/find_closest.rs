use std::collections::HashMap;

use aabb_quadtree::geom::{Point, Rect};
use aabb_quadtree::QuadTree;
use geo::prelude::{ClosestPoint, EuclideanDistance};

use crate::{Bounds, Distance, Pt2D};

/// A quad-tree to quickly find the closest points to some polylines.
pub struct FindClosest<K> {
    // TODO maybe any type of geo:: thing
    geometries: HashMap<K, geo::LineString<f64>>,
    quadtree: QuadTree<K>,
}

impl<K> FindClosest<K>
where
    K: Clone + std::cmp::Eq + std::hash::Hash + std::fmt::Debug,
{
    /// `bounds` must cover everything that'll be added.
    pub fn new(bounds: &Bounds) -> FindClosest<K> {
        FindClosest {
            geometries: HashMap::new(),
            quadtree: QuadTree::default(bounds.as_bbox()),
        }
    }

    /// Adds a chain of sampled points. Fewer than two points are ignored.
    pub fn add(&mut self, key: K, pts: &[Pt2D]) {
        if pts.len() < 2 {
            return;
        }
        let line_string: geo::LineString<f64> =
            pts.iter().map(|pt| geo::Point::from(*pt)).collect::<Vec<_>>().into();
        self.geometries.insert(key.clone(), line_string);
        self.quadtree
            .insert_with_box(key, Bounds::from(pts).as_bbox());
    }

    /// Finds the closest point on the existing geometry to the query pt.
    pub fn closest_pt(&self, query_pt: Pt2D, max_dist_away: Distance) -> Option<(K, Pt2D)> {
        self.all_close_pts(query_pt, max_dist_away)
            .into_iter()
            .min_by_key(|(_, _, dist)| *dist)
            .map(|(key, pt, _)| (key, pt))
    }

    /// Finds every geometry within some distance of the query pt, with the closest point on it.
    pub fn all_close_pts(
        &self,
        query_pt: Pt2D,
        max_dist_away: Distance,
    ) -> Vec<(K, Pt2D, Distance)> {
        let query_geom = geo::Point::from(query_pt);
        let query_bbox = Rect {
            top_left: Point {
                x: (query_pt.x() - max_dist_away.inner_meters()) as f32,
                y: (query_pt.y() - max_dist_away.inner_meters()) as f32,
            },
            bottom_right: Point {
                x: (query_pt.x() + max_dist_away.inner_meters()) as f32,
                y: (query_pt.y() + max_dist_away.inner_meters()) as f32,
            },
        };

        self.quadtree
            .query(query_bbox)
            .into_iter()
            .filter_map(|(key, _, _)| {
                let pt = match self.geometries[key].closest_point(&query_geom) {
                    geo::Closest::SinglePoint(pt) | geo::Closest::Intersection(pt) => pt,
                    geo::Closest::Indeterminate => {
                        return None;
                    }
                };
                let dist = Distance::meters(pt.euclidean_distance(&query_geom));
                if dist <= max_dist_away {
                    Some((key.clone(), Pt2D::from(pt), dist))
                } else {
                    None
                }
            })
            .collect()
    }
}
