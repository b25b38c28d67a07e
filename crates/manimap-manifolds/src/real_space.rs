//! # Euclidean Space R^n
//!
//! The simplest manifold: points and tangent vectors are both plain
//! vectors of `n` coordinates, so the chart differential is the identity
//! and derivatives need no pull-back.

use manimap_core::{manifold::Manifold, types::Scalar};

/// The Euclidean space `R^n`.
///
/// Instances are distinct blocks of variables even when their dimensions
/// agree; share one instance through an `Arc` to refer to the same block
/// from several functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealSpace {
    name: String,
    dimension: usize,
}

impl RealSpace {
    /// Creates `R^dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            name: format!("R^{dimension}"),
            dimension,
        }
    }

    /// Creates `R^dimension` with a custom display name.
    pub fn with_name(dimension: usize, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }

    /// Number of coordinates.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl<T: Scalar> Manifold<T> for RealSpace {
    fn name(&self) -> &str {
        &self.name
    }

    fn representation_dimension(&self) -> usize {
        self.dimension
    }

    fn tangent_dimension(&self) -> usize {
        self.dimension
    }

    fn is_flat(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manimap_core::types::{DMatrix, DVector};

    #[test]
    fn test_dimensions() {
        let r = RealSpace::new(39);
        assert_eq!(Manifold::<f64>::representation_dimension(&r), 39);
        assert_eq!(Manifold::<f64>::tangent_dimension(&r), 39);
        assert_eq!(Manifold::<f64>::name(&r), "R^39");
        assert!(Manifold::<f64>::is_flat(&r));
    }

    #[test]
    fn test_differential_is_identity() {
        let r = RealSpace::with_name(3, "position");
        let x = DVector::<f64>::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(r.differential(x.rows(0, 3)).unwrap(), DMatrix::identity(3, 3));
        assert_eq!(Manifold::<f64>::name(&r), "position");
    }
}
