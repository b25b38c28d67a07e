//! Finalized optimization problems over one global manifold.

use manimap_core::{
    function::FunctionRef,
    interval::Interval,
    manifold::ManifoldRef,
    types::Scalar,
};

/// A constraint `lower_i <= g_i(x) <= upper_i`, scaled per output.
#[derive(Debug, Clone)]
pub struct Constraint<T: Scalar> {
    /// Constraint function over the global manifold
    pub function: FunctionRef<T>,
    /// One interval per output
    pub bounds: Vec<Interval<T>>,
    /// One scaling factor per output
    pub scaling: Vec<T>,
}

impl<T: Scalar> Constraint<T> {
    /// Returns true if the constraint function is linear.
    pub fn is_linear(&self) -> bool {
        self.function.capabilities().is_linear()
    }

    /// Number of constraint outputs.
    pub fn output_size(&self) -> usize {
        self.function.output_size()
    }
}

/// Objective, constraints and argument bounds over one manifold.
///
/// Every function takes a point of [`manifold`](Self::manifold) in
/// ambient coordinates and differentiates along its tangent space.
/// Argument bounds and scaling have one entry per ambient coordinate.
#[derive(Debug, Clone)]
pub struct Problem<T: Scalar> {
    pub(crate) manifold: ManifoldRef<T>,
    pub(crate) objective: FunctionRef<T>,
    pub(crate) constraints: Vec<Constraint<T>>,
    pub(crate) argument_bounds: Vec<Interval<T>>,
    pub(crate) argument_scaling: Vec<T>,
}

impl<T: Scalar> Problem<T> {
    /// The global manifold.
    pub fn manifold(&self) -> &ManifoldRef<T> {
        &self.manifold
    }

    /// The objective function.
    pub fn objective(&self) -> &FunctionRef<T> {
        &self.objective
    }

    /// Constraints in registration order.
    pub fn constraints(&self) -> &[Constraint<T>] {
        &self.constraints
    }

    /// Bounds of every ambient coordinate of the global manifold.
    pub fn argument_bounds(&self) -> &[Interval<T>] {
        &self.argument_bounds
    }

    /// Scaling of every ambient coordinate of the global manifold.
    pub fn argument_scaling(&self) -> &[T] {
        &self.argument_scaling
    }

    /// Number of ambient coordinates of the global manifold.
    pub fn input_size(&self) -> usize {
        self.manifold.representation_dimension()
    }

    /// Number of tangent coordinates of the global manifold.
    pub fn tangent_size(&self) -> usize {
        self.manifold.tangent_dimension()
    }
}
