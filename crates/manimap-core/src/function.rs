//! Differentiable function trait and capability flags.
//!
//! Leaf functions are written in ambient coordinates: their input is a
//! point in the representation coordinates of the manifold they are
//! defined on, and their Jacobian has one column per input coordinate.
//! Functions produced by the composition engine take ambient input as
//! well but differentiate along tangent coordinates, which is why
//! [`DifferentiableFunction::tangent_size`] is reported separately.

use crate::{
    derivative::{Derivative, Representation},
    error::{MapError, Result},
    memory::Workspace,
    types::{DVector, Scalar},
};
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

/// Analytic properties a function guarantees.
///
/// The flags are cumulative: a linear function is also quadratic, twice
/// differentiable and differentiable, so the constants below already
/// include the weaker properties. Combining functions keeps only what every
/// operand guarantees, which is the bitwise AND of their flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    bits: u8,
}

impl Capabilities {
    /// No guarantee.
    pub const NONE: Self = Self { bits: 0 };
    /// Values and Jacobians are available.
    pub const DIFFERENTIABLE: Self = Self { bits: 0b0_0001 };
    /// Hessians are available.
    pub const TWICE_DIFFERENTIABLE: Self = Self { bits: 0b0_0011 };
    /// Hessians are constant.
    pub const QUADRATIC: Self = Self { bits: 0b0_0111 };
    /// Jacobians are constant.
    pub const LINEAR: Self = Self { bits: 0b0_1111 };
    /// Values are constant.
    pub const CONSTANT: Self = Self { bits: 0b1_1111 };

    /// Raw flag bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Whether every property of `other` is held.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Properties held by both sets.
    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Properties held by either set.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Whether Hessians are available.
    #[inline]
    pub const fn is_twice_differentiable(self) -> bool {
        self.contains(Self::TWICE_DIFFERENTIABLE)
    }

    /// Whether Jacobians are constant.
    #[inline]
    pub const fn is_linear(self) -> bool {
        self.contains(Self::LINEAR)
    }

    /// Name of the strongest property held.
    pub fn label(self) -> &'static str {
        if self.contains(Self::CONSTANT) {
            "constant"
        } else if self.contains(Self::LINEAR) {
            "linear"
        } else if self.contains(Self::QUADRATIC) {
            "quadratic"
        } else if self.contains(Self::TWICE_DIFFERENTIABLE) {
            "twice differentiable"
        } else if self.contains(Self::DIFFERENTIABLE) {
            "differentiable"
        } else {
            "none"
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::DIFFERENTIABLE
    }
}

impl BitAnd for Capabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared handle to a differentiable function.
pub type FunctionRef<T> = Arc<dyn DifferentiableFunction<T>>;

/// Trait for vector-valued differentiable functions.
///
/// Every evaluation writes into a caller-provided buffer, overwriting its
/// previous content, and borrows any temporary storage from the workspace.
/// Buffers must have the shapes reported by the size accessors; the
/// helpers [`jacobian_buffer`](Self::jacobian_buffer) and
/// [`hessian_buffer`](Self::hessian_buffer) create them.
pub trait DifferentiableFunction<T: Scalar>: fmt::Debug + Send + Sync {
    /// Display name used in diagnostics.
    fn name(&self) -> &str;

    /// Number of (ambient) input coordinates.
    fn input_size(&self) -> usize;

    /// Number of columns of the Jacobian.
    fn tangent_size(&self) -> usize {
        self.input_size()
    }

    /// Number of outputs.
    fn output_size(&self) -> usize;

    /// Analytic properties of the function.
    fn capabilities(&self) -> Capabilities;

    /// Representation of the derivatives this function produces.
    fn representation(&self) -> Representation {
        Representation::Dense
    }

    /// Evaluates the function at `x` into `result`.
    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, ws: &mut Workspace<T>)
        -> Result<()>;

    /// Evaluates the `output_size x tangent_size` Jacobian at `x`.
    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, ws: &mut Workspace<T>)
        -> Result<()>;

    /// Evaluates the `tangent_size x tangent_size` Hessian of output
    /// `output_index` at `x`.
    fn hessian(
        &self,
        _x: &DVector<T>,
        _output_index: usize,
        _hessian: &mut Derivative<T>,
        _ws: &mut Workspace<T>,
    ) -> Result<()> {
        Err(MapError::missing_capability(self.name(), "hessian"))
    }

    /// Evaluates the gradient of output `output_index` at `x`.
    ///
    /// The default extracts one row of the Jacobian.
    fn gradient(
        &self,
        x: &DVector<T>,
        output_index: usize,
        gradient: &mut DVector<T>,
        ws: &mut Workspace<T>,
    ) -> Result<()> {
        self.check_output_index(output_index)?;
        if gradient.len() != self.tangent_size() {
            return Err(MapError::dimension_mismatch(
                format!("gradient of {}", self.name()),
                self.tangent_size(),
                gradient.len(),
            ));
        }
        let mut jacobian = self.jacobian_buffer();
        self.jacobian(x, &mut jacobian, ws)?;
        gradient.copy_from(&jacobian.row_vector(output_index));
        Ok(())
    }

    /// Creates a zero Jacobian buffer in this function's representation.
    fn jacobian_buffer(&self) -> Derivative<T> {
        Derivative::zeros(self.representation(), self.output_size(), self.tangent_size())
    }

    /// Creates a zero Hessian buffer in this function's representation.
    fn hessian_buffer(&self) -> Derivative<T> {
        Derivative::zeros(self.representation(), self.tangent_size(), self.tangent_size())
    }

    /// Checks that `x` has `input_size` coordinates.
    fn check_input(&self, x: &DVector<T>) -> Result<()> {
        if x.len() == self.input_size() {
            Ok(())
        } else {
            Err(MapError::dimension_mismatch(
                format!("input of {}", self.name()),
                self.input_size(),
                x.len(),
            ))
        }
    }

    /// Checks that `output_index` designates an output.
    fn check_output_index(&self, output_index: usize) -> Result<()> {
        if output_index < self.output_size() {
            Ok(())
        } else {
            Err(MapError::invalid_parameter(format!(
                "output index {output_index} out of range for {} of output size {}",
                self.name(),
                self.output_size()
            )))
        }
    }
}

/// A function whose value does not depend on its input.
///
/// Its derivatives are zero. It is used as the objective of problems that
/// only declare constraints.
#[derive(Debug, Clone)]
pub struct ConstantFunction<T: Scalar> {
    name: String,
    value: DVector<T>,
    input_size: usize,
    tangent_size: usize,
    representation: Representation,
}

impl<T: Scalar> ConstantFunction<T> {
    /// Creates a constant function of `input_size` inputs returning `value`.
    pub fn new(input_size: usize, value: DVector<T>) -> Self {
        Self {
            name: format!("constant ({} outputs)", value.len()),
            value,
            input_size,
            tangent_size: input_size,
            representation: Representation::Dense,
        }
    }

    /// Scalar zero function of `input_size` inputs.
    pub fn zero(input_size: usize) -> Self {
        Self::new(input_size, DVector::zeros(1)).with_name("zero")
    }

    /// Sets the number of Jacobian columns when it differs from the input size.
    #[must_use]
    pub fn with_tangent_size(mut self, tangent_size: usize) -> Self {
        self.tangent_size = tangent_size;
        self
    }

    /// Sets the representation of the produced derivatives.
    #[must_use]
    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The constant value.
    pub fn value(&self) -> &DVector<T> {
        &self.value
    }
}

impl<T: Scalar> DifferentiableFunction<T> for ConstantFunction<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn tangent_size(&self) -> usize {
        self.tangent_size
    }

    fn output_size(&self) -> usize {
        self.value.len()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONSTANT
    }

    fn representation(&self) -> Representation {
        self.representation
    }

    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        result.copy_from(&self.value);
        Ok(())
    }

    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        jacobian.check_shape(&self.name, self.output_size(), self.tangent_size)?;
        jacobian.set_zero();
        Ok(())
    }

    fn hessian(
        &self,
        x: &DVector<T>,
        output_index: usize,
        hessian: &mut Derivative<T>,
        _ws: &mut Workspace<T>,
    ) -> Result<()> {
        self.check_input(x)?;
        self.check_output_index(output_index)?;
        hessian.check_shape(&self.name, self.tangent_size, self.tangent_size)?;
        hessian.set_zero();
        Ok(())
    }
}
