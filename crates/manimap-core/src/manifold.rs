//! Manifold trait consumed by the composition engine.
//!
//! The engine never does geometry. It only needs to know how many ambient
//! (representation) and tangent coordinates a manifold occupies, how a
//! product manifold decomposes into elementary factors, and how to map a
//! tangent vector to the ambient coordinates at a point (the chart
//! differential) so that derivatives computed in ambient coordinates can
//! be pulled back.
//!
//! Manifolds are shared through [`ManifoldRef`] and compared by identity:
//! two distinct `RealSpace` instances of the same dimension are two
//! different blocks of variables.

use crate::{
    error::{MapError, Result},
    types::{DMatrix, DVectorView, Scalar},
};
use std::fmt::Debug;
use std::sync::Arc;

/// Shared handle to a manifold.
pub type ManifoldRef<T> = Arc<dyn Manifold<T>>;

/// Trait for manifolds that functions can be defined on.
///
/// # Example
///
/// ```
/// use manimap_core::prelude::*;
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct Line;
///
/// impl Manifold<f64> for Line {
///     fn name(&self) -> &str {
///         "line"
///     }
///
///     fn representation_dimension(&self) -> usize {
///         1
///     }
///
///     fn tangent_dimension(&self) -> usize {
///         1
///     }
/// }
///
/// let line: ManifoldRef<f64> = Arc::new(Line);
/// assert!(line.is_flat());
/// assert_eq!(elementary_factors(&line).len(), 1);
/// ```
pub trait Manifold<T: Scalar>: Debug + Send + Sync {
    /// Returns a human-readable name for the manifold.
    fn name(&self) -> &str;

    /// Number of coordinates of a point (ambient coordinates).
    fn representation_dimension(&self) -> usize;

    /// Number of coordinates of a tangent vector.
    fn tangent_dimension(&self) -> usize;

    /// Ordered factors of a product manifold.
    ///
    /// Elementary manifolds return an empty slice.
    fn factors(&self) -> &[ManifoldRef<T>] {
        &[]
    }

    /// Returns true for product manifolds, including empty ones.
    fn is_product(&self) -> bool {
        !self.factors().is_empty()
    }

    /// Returns true if ambient and tangent coordinates coincide.
    fn is_flat(&self) -> bool {
        self.factors().is_empty() && self.representation_dimension() == self.tangent_dimension()
    }

    /// Chart differential at `point`.
    ///
    /// Returns the `representation_dimension x tangent_dimension` matrix
    /// mapping a tangent vector at `point` to ambient coordinates. Flat
    /// manifolds default to the identity.
    fn differential(&self, point: DVectorView<'_, T>) -> Result<DMatrix<T>> {
        if point.len() != self.representation_dimension() {
            return Err(MapError::dimension_mismatch(
                format!("differential of {}", self.name()),
                self.representation_dimension(),
                point.len(),
            ));
        }
        if self.representation_dimension() == self.tangent_dimension() {
            Ok(DMatrix::identity(
                self.representation_dimension(),
                self.tangent_dimension(),
            ))
        } else {
            Err(MapError::missing_capability(self.name(), "chart differential"))
        }
    }
}

/// Returns true if `a` and `b` are the same manifold instance.
#[inline]
pub fn same_manifold<T: Scalar>(a: &ManifoldRef<T>, b: &ManifoldRef<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Elementary factors of `manifold`, depth first and in product order.
///
/// An elementary manifold is its own single factor and an empty product
/// has none. Repeated factors are kept, so the result describes the
/// coordinate layout of `manifold`.
pub fn elementary_factors<T: Scalar>(manifold: &ManifoldRef<T>) -> Vec<ManifoldRef<T>> {
    let mut out = Vec::new();
    collect_factors(manifold, &mut out);
    out
}

fn collect_factors<T: Scalar>(manifold: &ManifoldRef<T>, out: &mut Vec<ManifoldRef<T>>) {
    if manifold.is_product() {
        for factor in manifold.factors() {
            collect_factors(factor, out);
        }
    } else {
        out.push(Arc::clone(manifold));
    }
}
