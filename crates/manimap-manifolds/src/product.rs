//! # Cartesian Product M₁ × M₂ × ... × Mₙ
//!
//! Points of a product are the concatenation of the factors' points and
//! tangent vectors the concatenation of the factors' tangent vectors:
//! ```text
//! T_{(x₁,...,xₙ)} M = T_{x₁} M₁ × ... × T_{xₙ} Mₙ
//! ```
//! The chart differential is therefore block diagonal.
//!
//! Factors are shared handles. A product keeps them in multiplication
//! order and preserves their identity, which is what lets the composition
//! engine locate a function's manifold inside a larger product.

use manimap_core::{
    error::{MapError, Result},
    manifold::{ManifoldRef, Manifold},
    types::{DMatrix, DVectorView, Scalar},
};
use std::sync::Arc;

/// Cartesian product of shared manifolds.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use manimap_core::manifold::{Manifold, ManifoldRef};
/// use manimap_manifolds::{CartesianProduct, RealSpace, SO3};
///
/// let position: ManifoldRef<f64> = Arc::new(RealSpace::new(3));
/// let orientation: ManifoldRef<f64> = Arc::new(SO3::new());
/// let pose = CartesianProduct::new(vec![position]).multiply(orientation);
///
/// assert_eq!(pose.representation_dimension(), 12);
/// assert_eq!(pose.tangent_dimension(), 6);
/// assert_eq!(pose.name(), "R^3 × SO(3)");
/// ```
#[derive(Debug, Clone)]
pub struct CartesianProduct<T: Scalar> {
    name: String,
    factors: Vec<ManifoldRef<T>>,
    representation_dimension: usize,
    tangent_dimension: usize,
}

impl<T: Scalar> CartesianProduct<T> {
    /// Creates the product of `factors`, in order.
    pub fn new(factors: Vec<ManifoldRef<T>>) -> Self {
        let mut product = Self::empty();
        for factor in factors {
            product = product.multiply(factor);
        }
        product
    }

    /// The product of no manifold, a zero-dimensional point.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            factors: Vec::new(),
            representation_dimension: 0,
            tangent_dimension: 0,
        }
    }

    /// Appends `factor` to the product.
    #[must_use]
    pub fn multiply(mut self, factor: ManifoldRef<T>) -> Self {
        if !self.name.is_empty() {
            self.name.push_str(" × ");
        }
        self.name.push_str(factor.name());
        self.representation_dimension += factor.representation_dimension();
        self.tangent_dimension += factor.tangent_dimension();
        self.factors.push(factor);
        self
    }

    /// Number of direct factors.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Returns true for the empty product.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Shares the product as a manifold handle.
    pub fn into_ref(self) -> ManifoldRef<T> {
        Arc::new(self)
    }
}

impl<T: Scalar> Manifold<T> for CartesianProduct<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn representation_dimension(&self) -> usize {
        self.representation_dimension
    }

    fn tangent_dimension(&self) -> usize {
        self.tangent_dimension
    }

    fn factors(&self) -> &[ManifoldRef<T>] {
        &self.factors
    }

    fn is_product(&self) -> bool {
        true
    }

    fn is_flat(&self) -> bool {
        self.factors.iter().all(|m| m.is_flat())
    }

    fn differential(&self, point: DVectorView<'_, T>) -> Result<DMatrix<T>> {
        if point.len() != self.representation_dimension {
            return Err(MapError::dimension_mismatch(
                format!("differential of {}", self.name),
                self.representation_dimension,
                point.len(),
            ));
        }
        let mut d = DMatrix::zeros(self.representation_dimension, self.tangent_dimension);
        let (mut row, mut col) = (0, 0);
        for factor in &self.factors {
            let rep = factor.representation_dimension();
            let tangent = factor.tangent_dimension();
            let block = factor.differential(point.rows(row, rep))?;
            d.view_mut((row, col), (rep, tangent)).copy_from(&block);
            row += rep;
            col += tangent;
        }
        Ok(d)
    }
}
