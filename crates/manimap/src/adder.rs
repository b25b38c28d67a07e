//! Two-phase construction of weighted sums over merged manifolds.
//!
//! An [`AdderOnManifold`] records contributions as plain data. Their
//! manifolds are merged as they arrive, and nothing is evaluated or
//! wrapped until [`AdderOnManifold::get_function`] replays the records
//! against the merged manifold.

use crate::{
    mapper::Restriction,
    merger::ManifoldMerger,
    on_manifold::FunctionOnManifold,
    sum::SumOnManifold,
};
use manimap_core::{
    config::MapConfig,
    error::{MapError, Result},
    function::FunctionRef,
    manifold::{same_manifold, ManifoldRef},
    types::Scalar,
};
use std::sync::Arc;
use tracing::debug;

/// One recorded term of a sum.
#[derive(Debug, Clone)]
pub struct Contribution<T: Scalar> {
    /// Weight of the term
    pub weight: T,
    /// Function evaluated on `manifold`
    pub function: FunctionRef<T>,
    /// Manifold the function is declared on
    pub manifold: ManifoldRef<T>,
    /// Coordinates of `manifold` the function depends on
    pub restriction: Restriction<T>,
}

/// Accumulates weighted functions declared on different manifolds.
#[derive(Debug, Clone)]
pub struct AdderOnManifold<T: Scalar> {
    contributions: Vec<Contribution<T>>,
    merger: ManifoldMerger<T>,
    config: MapConfig,
}

impl<T: Scalar> AdderOnManifold<T> {
    /// Creates an empty adder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    /// Creates an empty adder.
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            contributions: Vec::new(),
            merger: ManifoldMerger::new(),
            config,
        }
    }

    /// Records `weight * function`, with `function` declared on `manifold`.
    pub fn add(
        &mut self,
        weight: T,
        function: FunctionRef<T>,
        manifold: &ManifoldRef<T>,
        restriction: Restriction<T>,
    ) -> &mut Self {
        self.merger.add_manifold(manifold);
        self.contributions.push(Contribution {
            weight,
            function,
            manifold: ManifoldRef::clone(manifold),
            restriction,
        });
        self
    }

    /// Records `function` on the whole of `manifold` with the default weight.
    pub fn add_function(&mut self, function: FunctionRef<T>, manifold: &ManifoldRef<T>) -> &mut Self {
        let weight = <T as Scalar>::from_f64(self.config.default_weight);
        self.add(weight, function, manifold, Restriction::none())
    }

    /// Number of recorded contributions.
    pub fn number_of_functions(&self) -> usize {
        self.contributions.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Recorded contributions, in order.
    pub fn contributions(&self) -> &[Contribution<T>] {
        &self.contributions
    }

    /// Distinct elementary factors referenced so far.
    pub fn factors(&self) -> &[ManifoldRef<T>] {
        self.merger.factors()
    }

    /// The product of every manifold referenced so far.
    pub fn manifold(&mut self) -> ManifoldRef<T> {
        self.merger.manifold()
    }

    /// Output size shared by the contributions.
    ///
    /// Fails on the first contribution whose output size differs from the
    /// previous one.
    pub fn output_size(&self) -> Result<usize> {
        let Some(first) = self.contributions.first() else {
            return Err(MapError::empty("no function was added"));
        };
        let mut expected = first.function.output_size();
        for contribution in &self.contributions[1..] {
            let actual = contribution.function.output_size();
            if actual != expected {
                return Err(MapError::output_size_mismatch(
                    contribution.function.name(),
                    actual,
                    expected,
                ));
            }
            expected = actual;
        }
        Ok(expected)
    }

    /// Builds the weighted sum of the contributions over `global`.
    ///
    /// Every contribution is lifted to the merged manifold, the lifted
    /// functions are summed, and the sum is lifted once more to `global`,
    /// which must contain every merged factor. When `global` is the merged
    /// manifold itself the sum is returned as is.
    pub fn get_function(&mut self, global: &ManifoldRef<T>) -> Result<FunctionRef<T>> {
        self.output_size().map_err(MapError::log)?;
        let merged = self.merger.manifold();

        let terms = self
            .contributions
            .iter()
            .map(|c| {
                let lifted = FunctionOnManifold::new(
                    FunctionRef::clone(&c.function),
                    &c.manifold,
                    &merged,
                    &c.restriction,
                    &self.config,
                )?;
                Ok((c.weight, Arc::new(lifted) as FunctionRef<T>))
            })
            .collect::<Result<Vec<_>>>()
            .map_err(MapError::log)?;

        let sum: FunctionRef<T> =
            Arc::new(SumOnManifold::new(terms, &merged, &self.config).map_err(MapError::log)?);
        debug!(
            functions = self.contributions.len(),
            merged = merged.name(),
            global = global.name(),
            "built weighted sum"
        );

        if same_manifold(&merged, global) {
            return Ok(sum);
        }
        let lifted = FunctionOnManifold::new(sum, &merged, global, &Restriction::none(), &self.config)
            .map_err(MapError::log)?;
        Ok(Arc::new(lifted))
    }

    /// Forgets every contribution and merged manifold.
    ///
    /// Functions already returned by [`get_function`](Self::get_function)
    /// are unaffected.
    pub fn clear(&mut self) {
        self.contributions.clear();
        self.merger.clear();
    }
}

impl<T: Scalar> Default for AdderOnManifold<T> {
    fn default() -> Self {
        Self::new()
    }
}
