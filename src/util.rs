//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

/// Values closer to zero than this are treated as zero.
pub const EPSILON: f64 = 1e-10;

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    /// Creates a new interval.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Creates the interval `[centre - below, centre + above]`.
    pub fn around(centre: f64, below: f64, above: f64) -> Self {
        Self {
            min: centre - below,
            max: centre + above,
        }
    }

    /// Returns true if this closed interval contains the value.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Returns true if the half-open interval `(self.min, self.max]`
    /// intersects the closed interval `other`.
    pub fn left_open_meets(&self, other: &Self) -> bool {
        (self.min < other.min && other.min <= self.max)
            || (self.min < other.max && other.max <= self.max)
            || (other.min <= self.min && self.max < other.max)
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// Whether `x` is zero up to [EPSILON].
pub fn is_zero(x: f64) -> bool {
    x.abs() < EPSILON
}

/// Whether `a` and `b` differ by no more than `precision`.
pub fn approx_eq(a: f64, b: f64, precision: f64) -> bool {
    (a - b).abs() <= precision
}

/// Snaps values within [EPSILON] of zero to exactly zero, so that a stopped
/// vehicle never reports a tiny negative velocity.
pub fn snap_to_zero(x: f64) -> f64 {
    if is_zero(x) {
        0.0
    } else {
        x
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn left_open_meets() {
        let window = Interval::new(9.9, 10.1);

        // Tick ending inside the window
        assert!(Interval::new(10.03, 10.05).left_open_meets(&window));
        // Tick straddling the lower bound
        assert!(Interval::new(9.89, 9.91).left_open_meets(&window));
        // Tick ending exactly on the lower bound
        assert!(Interval::new(9.88, 9.9).left_open_meets(&window));
        // Tick starting exactly on the upper bound is open there
        assert!(!Interval::new(10.1, 10.12).left_open_meets(&window));
        // Entirely late
        assert!(!Interval::new(10.28, 10.3).left_open_meets(&window));
    }

    #[test]
    fn snapping() {
        assert_eq!(snap_to_zero(-1e-12), 0.0);
        assert_eq!(snap_to_zero(0.5), 0.5);
        assert!(is_zero(1e-11));
        assert!(!is_zero(1e-6));
    }
}
