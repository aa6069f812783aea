use serde::{Deserialize, Serialize};

use geom::{Distance, Poly3};

/// Height along a road or spline, as ordered cubic records. Empty means the road is flat and
/// doesn't take part in elevation checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    pub records: Vec<Poly3>,
}

impl ElevationProfile {
    pub fn flat() -> ElevationProfile {
        ElevationProfile::default()
    }

    pub fn constant(height: f64) -> ElevationProfile {
        ElevationProfile {
            records: vec![Poly3::constant(Distance::ZERO, height)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn height_at(&self, s: Distance) -> Option<f64> {
        Poly3::find(&self.records, s).map(|poly| poly.eval(s))
    }

    /// The part between two arclengths, re-based to start at 0.
    pub fn slice(&self, from: Distance, to: Distance) -> ElevationProfile {
        if self.is_empty() {
            return ElevationProfile::flat();
        }
        let (_, after) = Poly3::split(&self.records, from);
        let (before, _) = Poly3::split(&after, to - from);
        ElevationProfile { records: before }
    }

    pub fn split(&self, at: Distance) -> (ElevationProfile, ElevationProfile) {
        let (before, after) = Poly3::split(&self.records, at);
        (
            ElevationProfile { records: before },
            ElevationProfile { records: after },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_keeps_heights() {
        let profile = ElevationProfile {
            records: vec![
                Poly3::linear(Distance::ZERO, 0.0, 10.0, Distance::meters(100.0)),
                Poly3::constant(Distance::meters(100.0), 10.0),
            ],
        };
        let piece = profile.slice(Distance::meters(40.0), Distance::meters(120.0));
        assert!((piece.height_at(Distance::ZERO).unwrap() - 4.0).abs() < 1e-9);
        assert!((piece.height_at(Distance::meters(30.0)).unwrap() - 7.0).abs() < 1e-9);
        assert!((piece.height_at(Distance::meters(70.0)).unwrap() - 10.0).abs() < 1e-9);
        assert!(ElevationProfile::flat()
            .slice(Distance::ZERO, Distance::meters(5.0))
            .height_at(Distance::ZERO)
            .is_none());
    }
}
