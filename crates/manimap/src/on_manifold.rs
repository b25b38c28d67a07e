//! Functions lifted from a local manifold to a global product manifold.

use crate::{
    dispatcher::{strategy_for, ScatterStrategy},
    mapper::{DerivativeCoordinates, IndexMap, Restriction},
};
use manimap_core::{
    config::MapConfig,
    derivative::{Derivative, Representation},
    error::{MapError, Result},
    function::{Capabilities, DifferentiableFunction, FunctionRef},
    manifold::ManifoldRef,
    memory::{PooledVector, Workspace},
    types::{DVector, Scalar},
};
use tracing::debug;

/// A function declared on a local manifold, evaluated on a global one.
///
/// The input is a point of the global manifold in ambient coordinates;
/// the function only sees the coordinates of its local manifold, gathered
/// through an [`IndexMap`]. Derivatives are taken along the global tangent
/// space: columns of coordinates the function does not depend on are zero.
///
/// The wrapped function may report derivatives in ambient coordinates
/// (leaf functions, `tangent_size == input_size`) or in tangent
/// coordinates (functions already lifted to the local manifold). Ambient
/// derivatives are pulled back through the chart differential of every
/// curved factor; the second-order term of the chart is not included in
/// pulled-back Hessians.
#[derive(Debug)]
pub struct FunctionOnManifold<T: Scalar> {
    function: FunctionRef<T>,
    local: ManifoldRef<T>,
    global: ManifoldRef<T>,
    map: IndexMap<T>,
    coordinates: DerivativeCoordinates,
    scatter: Box<dyn ScatterStrategy<T>>,
}

impl<T: Scalar> FunctionOnManifold<T> {
    /// Lifts `function`, declared on `local` restricted by `restriction`,
    /// to `global`.
    ///
    /// Fails when a factor of `local` is not a factor of `global`, when the
    /// restriction cannot be applied, or when the input size of `function`
    /// differs from the number of coordinates it is mapped to.
    pub fn new(
        function: FunctionRef<T>,
        local: &ManifoldRef<T>,
        global: &ManifoldRef<T>,
        restriction: &Restriction<T>,
        config: &MapConfig,
    ) -> Result<Self> {
        let map = IndexMap::new(local, global, restriction, config)?;
        if function.input_size() != map.local_ambient_size() {
            return Err(MapError::dimension_mismatch(
                format!("input of {} on {}", function.name(), local.name()),
                map.local_ambient_size(),
                function.input_size(),
            ));
        }

        let coordinates = if function.tangent_size() == function.input_size() {
            DerivativeCoordinates::Ambient
        } else if function.tangent_size() == map.local_tangent_size() {
            DerivativeCoordinates::Tangent
        } else {
            return Err(MapError::dimension_mismatch(
                format!("derivative columns of {} on {}", function.name(), local.name()),
                map.local_tangent_size(),
                function.tangent_size(),
            ));
        };

        let tolerance = <T as Scalar>::from_f64(config.sparse_tolerance);
        let scatter = strategy_for(function.representation(), tolerance);
        debug!(
            function = function.name(),
            local = local.name(),
            global = global.name(),
            segments = map.segments().len(),
            "function mapped onto manifold"
        );

        Ok(Self {
            function,
            local: ManifoldRef::clone(local),
            global: ManifoldRef::clone(global),
            map,
            coordinates,
            scatter,
        })
    }

    /// The wrapped function.
    pub fn function(&self) -> &FunctionRef<T> {
        &self.function
    }

    /// The manifold the wrapped function is declared on.
    pub fn local_manifold(&self) -> &ManifoldRef<T> {
        &self.local
    }

    /// The manifold this function is evaluated on.
    pub fn global_manifold(&self) -> &ManifoldRef<T> {
        &self.global
    }

    /// Placement of the local coordinates in the global manifold.
    pub fn index_map(&self) -> &IndexMap<T> {
        &self.map
    }

    fn gather(&self, x: &DVector<T>, ws: &Workspace<T>) -> Result<PooledVector<T>> {
        let mut local = ws.acquire_temp_vector(self.map.local_ambient_size());
        self.map.gather(x, &mut local)?;
        Ok(local)
    }
}

impl<T: Scalar> DifferentiableFunction<T> for FunctionOnManifold<T> {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn input_size(&self) -> usize {
        self.map.global_ambient_size()
    }

    fn tangent_size(&self) -> usize {
        self.map.global_tangent_size()
    }

    fn output_size(&self) -> usize {
        self.function.output_size()
    }

    fn capabilities(&self) -> Capabilities {
        let capabilities = self.function.capabilities();
        // Linear and quadratic forms in ambient coordinates do not stay so
        // along a curved chart.
        if self.coordinates == DerivativeCoordinates::Ambient && !self.map.is_flat() {
            capabilities & Capabilities::TWICE_DIFFERENTIABLE
        } else {
            capabilities
        }
    }

    fn representation(&self) -> Representation {
        self.function.representation()
    }

    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, ws: &mut Workspace<T>) -> Result<()> {
        let local = self.gather(x, ws)?;
        self.function.compute(&local, result, ws)
    }

    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, ws: &mut Workspace<T>) -> Result<()> {
        jacobian.check_shape(self.name(), self.output_size(), self.tangent_size())?;
        let local = self.gather(x, ws)?;
        let mut local_jacobian = ws.acquire_temp_derivative(
            self.function.representation(),
            self.function.output_size(),
            self.function.tangent_size(),
        );
        self.function.jacobian(&local, &mut local_jacobian, ws)?;

        let blocks = self.map.column_blocks(&local, self.coordinates)?;
        jacobian.set_zero();
        self.scatter.scatter_jacobian(&blocks, &local_jacobian, jacobian)
    }

    fn hessian(
        &self,
        x: &DVector<T>,
        output_index: usize,
        hessian: &mut Derivative<T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        self.check_output_index(output_index)?;
        hessian.check_shape(self.name(), self.tangent_size(), self.tangent_size())?;
        let local = self.gather(x, ws)?;
        let size = self.function.tangent_size();
        let mut local_hessian = ws.acquire_temp_derivative(self.function.representation(), size, size);
        self.function.hessian(&local, output_index, &mut local_hessian, ws)?;

        let blocks = self.map.column_blocks(&local, self.coordinates)?;
        hessian.set_zero();
        self.scatter.scatter_hessian(&blocks, &local_hessian, hessian)
    }

    /// Forwards to the wrapped function's gradient, so a function without
    /// one fails here too, and places the result along the global tangent
    /// space.
    fn gradient(
        &self,
        x: &DVector<T>,
        output_index: usize,
        gradient: &mut DVector<T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        if gradient.len() != self.tangent_size() {
            return Err(MapError::dimension_mismatch(
                format!("gradient of {}", self.name()),
                self.tangent_size(),
                gradient.len(),
            ));
        }
        let local = self.gather(x, ws)?;
        let mut local_gradient = ws.acquire_temp_vector(self.function.tangent_size());
        self.function.gradient(&local, output_index, &mut local_gradient, ws)?;

        let blocks = self.map.column_blocks(&local, self.coordinates)?;
        gradient.fill(T::zero());
        for block in &blocks {
            let source = local_gradient.rows(block.local.start, block.local.len);
            let mut dest = gradient.rows_mut(block.global.start, block.global.len);
            match &block.chart {
                Some(d) => dest += d.tr_mul(&source),
                None => dest += source,
            }
        }
        Ok(())
    }
}
