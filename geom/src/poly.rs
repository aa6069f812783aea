use serde::{Deserialize, Serialize};

use crate::Distance;

/// A cubic polynomial `a + b*ds + c*ds^2 + d*ds^3`, valid from some offset `s` onwards, where
/// `ds` is measured from `s`. Lane widths and elevation profiles are lists of these.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Poly3 {
    pub s: Distance,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Poly3 {
    pub fn constant(s: Distance, a: f64) -> Poly3 {
        Poly3 {
            s,
            a,
            b: 0.0,
            c: 0.0,
            d: 0.0,
        }
    }

    /// A straight ramp from `start` at `s` to `end` at `s + length`.
    pub fn linear(s: Distance, start: f64, end: f64, length: Distance) -> Poly3 {
        let b = if length > Distance::ZERO {
            (end - start) / length.inner_meters()
        } else {
            0.0
        };
        Poly3 {
            s,
            a: start,
            b,
            c: 0.0,
            d: 0.0,
        }
    }

    /// Evaluates at an absolute position `at`, which should be >= `self.s`.
    pub fn eval(&self, at: Distance) -> f64 {
        let ds = (at - self.s).inner_meters();
        self.a + self.b * ds + self.c * ds * ds + self.d * ds * ds * ds
    }

    /// The same curve, re-expanded so its origin moves forward by `delta`, and with its offset
    /// set to `new_s`.
    pub fn shifted(&self, delta: Distance, new_s: Distance) -> Poly3 {
        let x = delta.inner_meters();
        Poly3 {
            s: new_s,
            a: self.a + self.b * x + self.c * x * x + self.d * x * x * x,
            b: self.b + 2.0 * self.c * x + 3.0 * self.d * x * x,
            c: self.c + 3.0 * self.d * x,
            d: self.d,
        }
    }

    /// Finds the record covering `at` in an ordered list.
    pub fn find(records: &[Poly3], at: Distance) -> Option<&Poly3> {
        records
            .iter()
            .rev()
            .find(|r| r.s <= at)
            .or_else(|| records.first())
    }

    /// Splits an ordered list of records at `at`, producing the records before the split and the
    /// records after, re-based so the second half starts at 0.
    pub fn split(records: &[Poly3], at: Distance) -> (Vec<Poly3>, Vec<Poly3>) {
        let mut before = Vec::new();
        let mut after = Vec::new();
        for r in records {
            if r.s < at {
                before.push(*r);
            } else {
                after.push(Poly3 { s: r.s - at, ..*r });
            }
        }
        // The record covering the split point continues into the second half
        if after.first().map(|r| r.s > Distance::ZERO).unwrap_or(true) {
            if let Some(covering) = before.last() {
                after.insert(0, covering.shifted(at - covering.s, Distance::ZERO));
            }
        }
        (before, after)
    }
}
