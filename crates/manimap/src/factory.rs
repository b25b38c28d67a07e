//! Assembly of optimization problems from functions on sub-manifolds.
//!
//! A [`ManifoldProblemFactory`] collects an objective, constraints and
//! argument bounds, each declared on the manifold it naturally lives on.
//! [`ManifoldProblemFactory::get_problem`] merges every referenced
//! manifold into one global product, lifts all functions onto it and
//! places the declared bounds at their global coordinates.
//!
//! The layout of the global manifold follows registration order: the
//! first manifold referenced by any call comes first.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use manimap::prelude::*;
//!
//! let position: ManifoldRef<f64> = Arc::new(RealSpace::new(3));
//! let joints: ManifoldRef<f64> = Arc::new(RealSpace::new(10));
//!
//! let mut factory = ManifoldProblemFactory::new();
//! factory.set_objective(Arc::new(ConstantFunction::<f64>::zero(3)), &position, Restriction::none());
//! factory
//!     .add_constraint(Arc::new(ConstantFunction::<f64>::zero(10)), &joints, Restriction::none())
//!     .set_bounds(vec![Interval::lower(0.0)])
//!     .unwrap();
//! factory
//!     .add_argument_bounds(&joints, vec![Interval::new(-1.0, 1.0); 10])
//!     .unwrap();
//!
//! let problem = factory.get_problem().unwrap();
//! assert_eq!(problem.input_size(), 13);
//! assert_eq!(problem.constraints().len(), 1);
//! assert_eq!(problem.argument_bounds()[3], Interval::new(-1.0, 1.0));
//! ```

use crate::{
    adder::AdderOnManifold,
    mapper::{IndexMap, Restriction},
    merger::ManifoldMerger,
    problem::{Constraint, Problem},
};
use manimap_core::{
    config::MapConfig,
    error::{MapError, Result},
    function::{ConstantFunction, FunctionRef},
    interval::Interval,
    manifold::ManifoldRef,
    types::Scalar,
};
use std::sync::Arc;
use tracing::debug;

/// Which registration referenced a manifold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Objective,
    Constraint,
    Argument,
}

#[derive(Debug, Clone)]
struct ConstraintSlot<T: Scalar> {
    adder: AdderOnManifold<T>,
    bounds: Option<Vec<Interval<T>>>,
    scaling: Option<Vec<T>>,
}

/// Collects functions on sub-manifolds and builds a [`Problem`].
#[derive(Debug, Clone)]
pub struct ManifoldProblemFactory<T: Scalar> {
    objective: AdderOnManifold<T>,
    constraints: Vec<ConstraintSlot<T>>,
    argument_bounds: Vec<(ManifoldRef<T>, Vec<Interval<T>>)>,
    argument_scaling: Vec<(ManifoldRef<T>, Vec<T>)>,
    layout: Vec<(Origin, ManifoldRef<T>)>,
    config: MapConfig,
}

impl<T: Scalar> ManifoldProblemFactory<T> {
    /// Creates an empty factory with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    /// Creates an empty factory.
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            objective: AdderOnManifold::with_config(config.clone()),
            constraints: Vec::new(),
            argument_bounds: Vec::new(),
            argument_scaling: Vec::new(),
            layout: Vec::new(),
            config,
        }
    }

    /// The configuration shared by every builder of the factory.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Registers a new constraint `function` declared on `manifold`.
    ///
    /// The returned handle sets the constraint's bounds and scaling or adds
    /// further terms to it. Bounds default to unbounded and scaling to 1.
    pub fn add_constraint(
        &mut self,
        function: FunctionRef<T>,
        manifold: &ManifoldRef<T>,
        restriction: Restriction<T>,
    ) -> ConstraintHandle<'_, T> {
        let weight = <T as Scalar>::from_f64(self.config.default_weight);
        let mut adder = AdderOnManifold::with_config(self.config.clone());
        adder.add(weight, function, manifold, restriction);
        self.constraints.push(ConstraintSlot {
            adder,
            bounds: None,
            scaling: None,
        });
        self.layout.push((Origin::Constraint, ManifoldRef::clone(manifold)));
        let index = self.constraints.len() - 1;
        ConstraintHandle { factory: self, index }
    }

    /// Handle on constraint `index`, in registration order.
    pub fn constraint_mut(&mut self, index: usize) -> Option<ConstraintHandle<'_, T>> {
        (index < self.constraints.len()).then_some(ConstraintHandle { factory: self, index })
    }

    /// Number of registered constraints.
    pub fn number_of_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Replaces the objective by `function` declared on `manifold`.
    pub fn set_objective(
        &mut self,
        function: FunctionRef<T>,
        manifold: &ManifoldRef<T>,
        restriction: Restriction<T>,
    ) -> &mut Self {
        self.objective.clear();
        self.layout.retain(|(origin, _)| *origin != Origin::Objective);
        let weight = <T as Scalar>::from_f64(self.config.default_weight);
        self.add_objective(weight, function, manifold, restriction)
    }

    /// Adds `weight * function` to the objective.
    pub fn add_objective(
        &mut self,
        weight: T,
        function: FunctionRef<T>,
        manifold: &ManifoldRef<T>,
        restriction: Restriction<T>,
    ) -> &mut Self {
        self.objective.add(weight, function, manifold, restriction);
        self.layout.push((Origin::Objective, ManifoldRef::clone(manifold)));
        self
    }

    /// Bounds the first `bounds.len()` ambient coordinates of `manifold`.
    ///
    /// A later declaration on the same manifold overrides the coordinates
    /// it covers.
    pub fn add_argument_bounds(
        &mut self,
        manifold: &ManifoldRef<T>,
        bounds: Vec<Interval<T>>,
    ) -> Result<&mut Self> {
        check_argument_len("argument bounds", manifold, bounds.len())?;
        self.argument_bounds.push((ManifoldRef::clone(manifold), bounds));
        self.layout.push((Origin::Argument, ManifoldRef::clone(manifold)));
        Ok(self)
    }

    /// Scales the first `scaling.len()` ambient coordinates of `manifold`.
    pub fn add_argument_scaling(&mut self, manifold: &ManifoldRef<T>, scaling: Vec<T>) -> Result<&mut Self> {
        check_argument_len("argument scaling", manifold, scaling.len())?;
        self.argument_scaling.push((ManifoldRef::clone(manifold), scaling));
        self.layout.push((Origin::Argument, ManifoldRef::clone(manifold)));
        Ok(self)
    }

    /// Builds the problem over the product of every referenced manifold.
    ///
    /// The factory keeps its registrations and can build again.
    pub fn get_problem(&mut self) -> Result<Problem<T>> {
        let mut merger = ManifoldMerger::new();
        for (_, manifold) in &self.layout {
            merger.add_manifold(manifold);
        }
        if merger.is_empty() {
            return Err(MapError::empty("no function or argument bounds were registered").log());
        }
        let global = merger.manifold();
        let (ambient, tangent) = (global.representation_dimension(), global.tangent_dimension());

        let objective: FunctionRef<T> = if self.objective.is_empty() {
            Arc::new(ConstantFunction::<T>::zero(ambient).with_tangent_size(tangent))
        } else {
            self.objective.get_function(&global)?
        };

        let mut constraints = Vec::with_capacity(self.constraints.len());
        for slot in &mut self.constraints {
            let function = slot.adder.get_function(&global)?;
            let outputs = function.output_size();
            let bounds = match &slot.bounds {
                Some(bounds) => check_output_len(&function, "constraint bounds", bounds)?.to_vec(),
                None => vec![Interval::unbounded(); outputs],
            };
            let scaling = match &slot.scaling {
                Some(scaling) => check_output_len(&function, "constraint scaling", scaling)?.to_vec(),
                None => vec![T::one(); outputs],
            };
            constraints.push(Constraint {
                function,
                bounds,
                scaling,
            });
        }

        let mut argument_bounds = vec![Interval::unbounded(); ambient];
        for (manifold, bounds) in &self.argument_bounds {
            IndexMap::new(manifold, &global, &Restriction::none(), &self.config)?
                .place(bounds, &mut argument_bounds);
        }
        let mut argument_scaling = vec![T::one(); ambient];
        for (manifold, scaling) in &self.argument_scaling {
            IndexMap::new(manifold, &global, &Restriction::none(), &self.config)?
                .place(scaling, &mut argument_scaling);
        }

        debug!(
            manifold = global.name(),
            ambient,
            tangent,
            constraints = constraints.len(),
            linear = constraints.iter().filter(|c| c.is_linear()).count(),
            objective = objective.name(),
            "built problem on manifold"
        );

        Ok(Problem {
            manifold: global,
            objective,
            constraints,
            argument_bounds,
            argument_scaling,
        })
    }

    /// Forgets every registration.
    pub fn clear(&mut self) {
        self.objective.clear();
        self.constraints.clear();
        self.argument_bounds.clear();
        self.argument_scaling.clear();
        self.layout.clear();
    }
}

impl<T: Scalar> Default for ManifoldProblemFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable access to one registered constraint.
#[derive(Debug)]
pub struct ConstraintHandle<'a, T: Scalar> {
    factory: &'a mut ManifoldProblemFactory<T>,
    index: usize,
}

impl<T: Scalar> ConstraintHandle<'_, T> {
    /// Position of the constraint in the finalized problem.
    pub fn index(&self) -> usize {
        self.index
    }

    fn slot(&mut self) -> &mut ConstraintSlot<T> {
        &mut self.factory.constraints[self.index]
    }

    /// Adds `weight * function` to the constraint.
    pub fn add(
        &mut self,
        weight: T,
        function: FunctionRef<T>,
        manifold: &ManifoldRef<T>,
        restriction: Restriction<T>,
    ) -> &mut Self {
        self.slot().adder.add(weight, function, manifold, restriction);
        self.factory
            .layout
            .push((Origin::Constraint, ManifoldRef::clone(manifold)));
        self
    }

    /// Sets one interval per constraint output.
    pub fn set_bounds(&mut self, bounds: Vec<Interval<T>>) -> Result<&mut Self> {
        let expected = self.slot().adder.output_size()?;
        if bounds.len() != expected {
            return Err(MapError::dimension_mismatch("constraint bounds", expected, bounds.len()));
        }
        self.slot().bounds = Some(bounds);
        Ok(self)
    }

    /// Sets one scaling factor per constraint output.
    pub fn set_scaling(&mut self, scaling: Vec<T>) -> Result<&mut Self> {
        let expected = self.slot().adder.output_size()?;
        if scaling.len() != expected {
            return Err(MapError::dimension_mismatch("constraint scaling", expected, scaling.len()));
        }
        self.slot().scaling = Some(scaling);
        Ok(self)
    }
}

fn check_argument_len<T: Scalar>(context: &str, manifold: &ManifoldRef<T>, len: usize) -> Result<()> {
    if len > manifold.representation_dimension() {
        return Err(MapError::dimension_mismatch(
            format!("{context} of {}", manifold.name()),
            format!("at most {}", manifold.representation_dimension()),
            len,
        ));
    }
    Ok(())
}

fn check_output_len<'a, T: Scalar, U>(
    function: &FunctionRef<T>,
    context: &str,
    values: &'a [U],
) -> Result<&'a [U]> {
    if values.len() != function.output_size() {
        return Err(MapError::dimension_mismatch(
            format!("{context} of {}", function.name()),
            function.output_size(),
            values.len(),
        )
        .log());
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use manimap_core::function::DifferentiableFunction;
    use manimap_core::memory::Workspace;
    use manimap_core::test_functions::{CoordinateSquares, SumOfCoordinates};
    use manimap_core::types::DVector;
    use manimap_manifolds::RealSpace;

    fn real(n: usize) -> ManifoldRef<f64> {
        Arc::new(RealSpace::new(n))
    }

    #[test]
    fn test_layout_follows_registration_order() {
        let (a, b, c) = (real(2), real(3), real(4));
        let mut factory = ManifoldProblemFactory::new();
        factory.add_constraint(Arc::new(SumOfCoordinates::new(3)), &b, Restriction::none());
        factory.set_objective(Arc::new(SumOfCoordinates::new(2)), &a, Restriction::none());
        factory.add_argument_bounds(&c, vec![Interval::new(0.0, 1.0)]).unwrap();

        let problem = factory.get_problem().unwrap();
        assert_eq!(problem.input_size(), 9);
        let names: Vec<_> = problem
            .manifold()
            .factors()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, ["R^3", "R^2", "R^4"]);
        assert_eq!(problem.argument_bounds()[5], Interval::new(0.0, 1.0));
        assert!(problem.argument_bounds()[6].is_unbounded());
    }

    #[test]
    fn test_set_objective_replaces_previous_terms() {
        let (a, b) = (real(2), real(5));
        let mut factory = ManifoldProblemFactory::new();
        factory.set_objective(Arc::new(SumOfCoordinates::new(5)), &b, Restriction::none());
        factory.set_objective(Arc::new(SumOfCoordinates::new(2)), &a, Restriction::none());

        let problem = factory.get_problem().unwrap();
        assert_eq!(problem.input_size(), 2);
        assert_eq!(problem.objective().name(), "sum of 2 coordinates");
    }

    #[test]
    fn test_objective_defaults_to_zero() {
        let r3 = real(3);
        let mut factory = ManifoldProblemFactory::new();
        factory.add_constraint(Arc::new(SumOfCoordinates::new(3)), &r3, Restriction::none());
        let problem = factory.get_problem().unwrap();

        let objective = problem.objective();
        assert_eq!(objective.name(), "zero");
        assert_eq!(objective.input_size(), 3);

        let mut value = DVector::from_element(1, 7.0);
        objective
            .compute(&DVector::from_element(3, 1.0), &mut value, &mut Workspace::new())
            .unwrap();
        assert_eq!(value[0], 0.0);
        assert!(problem.constraints()[0].is_linear());
    }

    #[test]
    fn test_constraint_handle() {
        let r2 = real(2);
        let mut factory = ManifoldProblemFactory::new();
        {
            let mut handle = factory.add_constraint(
                Arc::new(CoordinateSquares::new(2)),
                &r2,
                Restriction::none(),
            );
            assert_eq!(handle.index(), 0);
            handle.add(2.0, Arc::new(CoordinateSquares::new(2)), &r2, Restriction::none());
            handle
                .set_bounds(vec![Interval::upper(1.0); 2])
                .unwrap()
                .set_scaling(vec![0.5, 2.0])
                .unwrap();
            assert!(matches!(
                handle.set_bounds(vec![Interval::upper(1.0)]),
                Err(MapError::DimensionMismatch { .. })
            ));
        }
        assert!(factory.constraint_mut(1).is_none());

        let problem = factory.get_problem().unwrap();
        let constraint = &problem.constraints()[0];
        assert_eq!(constraint.bounds, vec![Interval::upper(1.0); 2]);
        assert_eq!(constraint.scaling, vec![0.5, 2.0]);
        assert!(!constraint.is_linear());

        let mut value = DVector::zeros(2);
        constraint
            .function
            .compute(&DVector::from_vec(vec![1.0, 2.0]), &mut value, &mut Workspace::new())
            .unwrap();
        assert_eq!(value, DVector::from_vec(vec![3.0, 12.0]));
    }

    #[test]
    fn test_argument_declarations_are_checked() {
        let r2 = real(2);
        let mut factory = ManifoldProblemFactory::<f64>::new();
        assert!(factory
            .add_argument_bounds(&r2, vec![Interval::unbounded(); 3])
            .is_err());
        assert!(factory.add_argument_scaling(&r2, vec![2.0]).is_ok());

        let problem = factory.get_problem().unwrap();
        assert_eq!(problem.argument_scaling(), &[2.0, 1.0]);
    }

    #[test]
    fn test_empty_factory_and_clear() {
        let mut factory = ManifoldProblemFactory::<f64>::new();
        assert!(matches!(factory.get_problem(), Err(MapError::Empty { .. })));

        factory.add_constraint(Arc::new(SumOfCoordinates::new(1)), &real(1), Restriction::none());
        assert!(factory.get_problem().is_ok());
        factory.clear();
        assert_eq!(factory.number_of_constraints(), 0);
        assert!(factory.get_problem().is_err());
    }
}
