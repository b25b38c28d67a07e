//! Merging manifolds into one product without repeated factors.

use manimap_core::{
    manifold::{elementary_factors, same_manifold, ManifoldRef},
    types::Scalar,
};
use manimap_manifolds::CartesianProduct;
use tracing::trace;

/// Accumulates manifolds into the product of their distinct elementary
/// factors.
///
/// Factors keep the order of their first appearance. The product is built
/// lazily and reused until another factor is added, so asking for it twice
/// returns the same instance.
#[derive(Debug, Clone)]
pub struct ManifoldMerger<T: Scalar> {
    factors: Vec<ManifoldRef<T>>,
    merged: Option<ManifoldRef<T>>,
}

impl<T: Scalar> ManifoldMerger<T> {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self {
            factors: Vec::new(),
            merged: None,
        }
    }

    /// Adds the elementary factors of `manifold` not already present.
    pub fn add_manifold(&mut self, manifold: &ManifoldRef<T>) {
        for leaf in elementary_factors(manifold) {
            if !self.contains(&leaf) {
                trace!(manifold = leaf.name(), "merging factor");
                self.factors.push(leaf);
                self.merged = None;
            }
        }
    }

    /// Returns true if `manifold` is one of the merged factors.
    pub fn contains(&self, manifold: &ManifoldRef<T>) -> bool {
        self.factors.iter().any(|m| same_manifold(m, manifold))
    }

    /// The product of all merged factors.
    pub fn manifold(&mut self) -> ManifoldRef<T> {
        let factors = &self.factors;
        ManifoldRef::clone(
            self.merged
                .get_or_insert_with(|| CartesianProduct::new(factors.clone()).into_ref()),
        )
    }

    /// Distinct elementary factors in order of appearance.
    pub fn factors(&self) -> &[ManifoldRef<T>] {
        &self.factors
    }

    /// Number of distinct factors.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Returns true if no manifold was added.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Forgets every factor.
    pub fn clear(&mut self) {
        self.factors.clear();
        self.merged = None;
    }
}

impl<T: Scalar> Default for ManifoldMerger<T> {
    fn default() -> Self {
        Self::new()
    }
}
