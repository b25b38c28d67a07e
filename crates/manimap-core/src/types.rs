//! Type definitions and aliases used throughout the workspace.
//!
//! This module provides the scalar trait shared by every numeric container
//! and a few aliases over nalgebra's dynamically sized types.

use nalgebra::{OMatrix, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used by composed functions (f32 or f64).
///
/// This trait combines all the numeric traits the composition engine
/// relies on for accumulation and derivative propagation.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    ///
    /// Returns None if the conversion fails.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }
}

impl Scalar for f32 {}

impl Scalar for f64 {}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, nalgebra::Dyn, nalgebra::Dyn>;

/// Type alias for a dynamically-sized column vector.
pub type DVector<T> = nalgebra::DVector<T>;

/// Type alias for a borrowed segment of a dynamically-sized vector.
pub type DVectorView<'a, T> = nalgebra::DVectorView<'a, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(<f64 as Scalar>::from_f64(0.5), 0.5);
        assert_eq!(<f32 as Scalar>::from_f64(0.5), 0.5_f32);
        assert_eq!(<f64 as Scalar>::try_from_f64(1.25), Some(1.25));
    }

    #[test]
    fn test_scalar_supports_float_and_real_field() {
        fn norm<T: Scalar>(a: T, b: T) -> T {
            <T as Float>::sqrt(a * a + b * b)
        }
        assert_eq!(norm(3.0_f64, 4.0), 5.0);
        assert_eq!(norm(3.0_f32, 4.0), 5.0);
    }
}
