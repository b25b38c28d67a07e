//! Weighted sums of functions sharing one manifold.

use manimap_core::{
    config::MapConfig,
    derivative::{Derivative, Representation},
    error::{MapError, Result},
    function::{Capabilities, DifferentiableFunction, FunctionRef},
    manifold::ManifoldRef,
    memory::Workspace,
    types::{DVector, Scalar},
};

/// `f(x) = Σ wᵢ fᵢ(x)` over a common manifold.
///
/// Every term takes a point of the same manifold, has the same output
/// size and produces derivatives in the same representation. Evaluation
/// borrows one scratch buffer from the workspace, zeroes it before each
/// term and accumulates the weighted result, so a term never writes into
/// the sum's output directly.
///
/// Capability flags are those every term guarantees.
#[derive(Debug)]
pub struct SumOnManifold<T: Scalar> {
    name: String,
    manifold: ManifoldRef<T>,
    weights: Vec<T>,
    functions: Vec<FunctionRef<T>>,
    capabilities: Capabilities,
    representation: Representation,
    tolerance: T,
}

impl<T: Scalar> SumOnManifold<T> {
    /// Creates the weighted sum of `terms` over `manifold`.
    pub fn new(
        terms: Vec<(T, FunctionRef<T>)>,
        manifold: &ManifoldRef<T>,
        config: &MapConfig,
    ) -> Result<Self> {
        let Some((_, first)) = terms.first() else {
            return Err(MapError::empty(format!("sum over {} has no term", manifold.name())));
        };
        let output_size = first.output_size();
        let representation = first.representation();

        for (_, function) in &terms {
            if function.output_size() != output_size {
                return Err(MapError::output_size_mismatch(
                    function.name(),
                    function.output_size(),
                    output_size,
                ));
            }
            if function.input_size() != manifold.representation_dimension()
                || function.tangent_size() != manifold.tangent_dimension()
            {
                return Err(MapError::dimension_mismatch(
                    format!("term {} of a sum over {}", function.name(), manifold.name()),
                    format!(
                        "{} inputs and {} tangent coordinates",
                        manifold.representation_dimension(),
                        manifold.tangent_dimension()
                    ),
                    format!(
                        "{} inputs and {} tangent coordinates",
                        function.input_size(),
                        function.tangent_size()
                    ),
                ));
            }
            if function.representation() != representation {
                return Err(MapError::RepresentationMismatch {
                    function: function.name().to_string(),
                    expected: representation.to_string(),
                    actual: function.representation().to_string(),
                });
            }
        }

        let name = terms
            .iter()
            .map(|(_, f)| f.name())
            .collect::<Vec<_>>()
            .join(" + ");
        let capabilities = terms
            .iter()
            .fold(Capabilities::CONSTANT, |acc, (_, f)| acc & f.capabilities());
        let (weights, functions) = terms.into_iter().unzip();

        Ok(Self {
            name,
            manifold: ManifoldRef::clone(manifold),
            weights,
            functions,
            capabilities,
            representation,
            tolerance: <T as Scalar>::from_f64(config.sparse_tolerance),
        })
    }

    /// The manifold every term is defined on.
    pub fn manifold(&self) -> &ManifoldRef<T> {
        &self.manifold
    }

    /// The summed functions, in order.
    pub fn functions(&self) -> &[FunctionRef<T>] {
        &self.functions
    }

    /// The weights, parallel to [`functions`](Self::functions).
    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    fn terms(&self) -> impl Iterator<Item = (T, &FunctionRef<T>)> {
        self.weights.iter().copied().zip(&self.functions)
    }
}

impl<T: Scalar> DifferentiableFunction<T> for SumOnManifold<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.manifold.representation_dimension()
    }

    fn tangent_size(&self) -> usize {
        self.manifold.tangent_dimension()
    }

    fn output_size(&self) -> usize {
        self.functions[0].output_size()
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn representation(&self) -> Representation {
        self.representation
    }

    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, ws: &mut Workspace<T>) -> Result<()> {
        result.fill(T::zero());
        let mut scratch = ws.acquire_temp_vector(self.output_size());
        for (weight, function) in self.terms() {
            scratch.fill(T::zero());
            function.compute(x, &mut scratch, ws)?;
            result.axpy(weight, &*scratch, T::one());
        }
        Ok(())
    }

    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, ws: &mut Workspace<T>) -> Result<()> {
        jacobian.check_shape(&self.name, self.output_size(), self.tangent_size())?;
        jacobian.set_zero();
        let mut scratch =
            ws.acquire_temp_derivative(self.representation, self.output_size(), self.tangent_size());
        for (weight, function) in self.terms() {
            scratch.set_zero();
            function.jacobian(x, &mut scratch, ws)?;
            jacobian.add_scaled(weight, &scratch, self.tolerance)?;
        }
        Ok(())
    }

    fn hessian(
        &self,
        x: &DVector<T>,
        output_index: usize,
        hessian: &mut Derivative<T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        self.check_output_index(output_index)?;
        let n = self.tangent_size();
        hessian.check_shape(&self.name, n, n)?;
        hessian.set_zero();
        let mut scratch = ws.acquire_temp_derivative(self.representation, n, n);
        for (weight, function) in self.terms() {
            scratch.set_zero();
            function.hessian(x, output_index, &mut scratch, ws)?;
            hessian.add_scaled(weight, &scratch, self.tolerance)?;
        }
        Ok(())
    }

    fn gradient(
        &self,
        _x: &DVector<T>,
        _output_index: usize,
        _gradient: &mut DVector<T>,
        _ws: &mut Workspace<T>,
    ) -> Result<()> {
        Err(MapError::unsupported("gradient", &self.name))
    }
}
