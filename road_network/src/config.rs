use serde::{Deserialize, Serialize};

use geom::Distance;

/// Settings for one road network. Anything not specified in a config file takes the default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// If `Right`, traffic moving towards increasing s uses the lanes on the right of the
    /// reference line (USA). If `Left`, the lanes on the left (Australia).
    pub driving_side: DrivingSide,
    /// Distance between samples when looking for intersections
    pub sample_step: Distance,
    /// Two samples closer than this fraction of `sample_step` count as an intersection
    pub match_ratio: f64,
    /// After a match, skip this many samples along both roads
    pub skip_samples: usize,
    /// For elevation-aware detection, the biggest height difference that still counts as
    /// crossing
    pub elevation_tolerance: f64,
    /// Width of lanes added without an explicit width
    pub default_lane_width: Distance,
    /// Detect intersections and create junctions automatically after every geometry change
    pub auto_junctions: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DrivingSide {
    Right,
    Left,
}

impl Default for NetworkConfig {
    fn default() -> NetworkConfig {
        NetworkConfig {
            driving_side: DrivingSide::Right,
            sample_step: Distance::meters(1.0),
            match_ratio: 0.9,
            skip_samples: 2,
            elevation_tolerance: 1.0,
            default_lane_width: Distance::meters(3.6),
            auto_junctions: true,
        }
    }
}

impl NetworkConfig {
    pub fn match_distance(&self) -> Distance {
        self.sample_step * self.match_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"driving_side": "Left", "sample_step": 2.0}"#).unwrap();
        assert_eq!(config.driving_side, DrivingSide::Left);
        assert_eq!(config.sample_step, Distance::meters(2.0));
        assert_eq!(config.skip_samples, 2);
        assert!(config.auto_junctions);
        assert!(config
            .match_distance()
            .approx_eq(Distance::meters(1.8), Distance::meters(1e-12)));
    }
}
