//! Bound intervals for constraint outputs and problem arguments.

use crate::types::Scalar;
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed interval `[lower, upper]`; either end may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    /// Lower end of the interval
    pub lower: T,
    /// Upper end of the interval
    pub upper: T,
}

impl<T: Scalar> Interval<T> {
    /// Creates the interval `[lower, upper]`.
    pub fn new(lower: T, upper: T) -> Self {
        Self { lower, upper }
    }

    /// The unbounded interval `(-inf, +inf)`.
    pub fn unbounded() -> Self {
        Self {
            lower: <T as Float>::neg_infinity(),
            upper: <T as Float>::infinity(),
        }
    }

    /// The interval `[lower, +inf)`.
    pub fn lower(lower: T) -> Self {
        Self {
            lower,
            upper: <T as Float>::infinity(),
        }
    }

    /// The interval `(-inf, upper]`.
    pub fn upper(upper: T) -> Self {
        Self {
            lower: <T as Float>::neg_infinity(),
            upper,
        }
    }

    /// Returns true when neither end is finite.
    pub fn is_unbounded(&self) -> bool {
        <T as Float>::is_infinite(self.lower)
            && <T as Float>::is_infinite(self.upper)
            && self.lower < self.upper
    }

    /// Returns true if `value` lies in the interval.
    pub fn contains(&self, value: T) -> bool {
        self.lower <= value && value <= self.upper
    }
}

impl<T: Scalar> Default for Interval<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T: Scalar> From<(T, T)> for Interval<T> {
    fn from((lower, upper): (T, T)) -> Self {
        Self::new(lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_default() {
        let interval = Interval::<f64>::default();
        assert!(interval.is_unbounded());
        assert_eq!(interval.lower, f64::NEG_INFINITY);
        assert_eq!(interval.upper, f64::INFINITY);
    }

    #[test]
    fn test_half_bounded() {
        let lower = Interval::lower(25.0);
        assert!(!lower.is_unbounded());
        assert!(lower.contains(1e300));
        assert!(!lower.contains(24.0));

        let upper = Interval::upper(-1.0);
        assert!(upper.contains(-1.0));
        assert!(!upper.contains(0.0));
    }

    #[test]
    fn test_from_pair() {
        let interval: Interval<f64> = (-2.0, 2.0).into();
        assert_eq!(interval, Interval::new(-2.0, 2.0));
    }
}
