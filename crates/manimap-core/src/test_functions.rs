//! Leaf functions shared by the tests and benches of the workspace.
//!
//! Each function can produce dense or sparse derivatives so the same
//! scenario can be checked in both representations.

use crate::{
    derivative::{Derivative, Representation},
    error::Result,
    function::{Capabilities, DifferentiableFunction},
    memory::Workspace,
    sparse::CooMatrix,
    types::{DVector, Scalar},
};

/// `f(x) = sum_i x_i`.
#[derive(Debug, Clone)]
pub struct SumOfCoordinates {
    name: String,
    size: usize,
    representation: Representation,
}

impl SumOfCoordinates {
    /// Dense variant over `size` inputs.
    pub fn new(size: usize) -> Self {
        Self {
            name: format!("sum of {size} coordinates"),
            size,
            representation: Representation::Dense,
        }
    }

    /// Sparse variant over `size` inputs.
    pub fn sparse(size: usize) -> Self {
        Self {
            representation: Representation::Sparse,
            ..Self::new(size)
        }
    }
}

impl<T: Scalar> DifferentiableFunction<T> for SumOfCoordinates {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        1
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LINEAR
    }

    fn representation(&self) -> Representation {
        self.representation
    }

    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        result[0] = x.sum();
        Ok(())
    }

    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        let mut coo = CooMatrix::with_capacity(1, self.size, self.size);
        for j in 0..self.size {
            coo.push(0, j, T::one())?;
        }
        jacobian.assign_from_coo(&coo, T::zero())
    }

    fn hessian(
        &self,
        x: &DVector<T>,
        output_index: usize,
        hessian: &mut Derivative<T>,
        _ws: &mut Workspace<T>,
    ) -> Result<()> {
        self.check_input(x)?;
        <Self as DifferentiableFunction<T>>::check_output_index(self, output_index)?;
        hessian.check_shape(&self.name, self.size, self.size)?;
        hessian.set_zero();
        Ok(())
    }
}

/// `f_i(x) = x_i^2` for every coordinate.
#[derive(Debug, Clone)]
pub struct CoordinateSquares {
    name: String,
    size: usize,
    representation: Representation,
}

impl CoordinateSquares {
    /// Dense variant over `size` inputs and outputs.
    pub fn new(size: usize) -> Self {
        Self {
            name: format!("squares of {size} coordinates"),
            size,
            representation: Representation::Dense,
        }
    }

    /// Sparse variant over `size` inputs and outputs.
    pub fn sparse(size: usize) -> Self {
        Self {
            representation: Representation::Sparse,
            ..Self::new(size)
        }
    }
}

impl<T: Scalar> DifferentiableFunction<T> for CoordinateSquares {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::QUADRATIC
    }

    fn representation(&self) -> Representation {
        self.representation
    }

    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        result.copy_from(&x.component_mul(x));
        Ok(())
    }

    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        let two = T::one() + T::one();
        let mut coo = CooMatrix::with_capacity(self.size, self.size, self.size);
        for i in 0..self.size {
            coo.push(i, i, two * x[i])?;
        }
        jacobian.assign_from_coo(&coo, T::zero())
    }

    fn hessian(
        &self,
        x: &DVector<T>,
        output_index: usize,
        hessian: &mut Derivative<T>,
        _ws: &mut Workspace<T>,
    ) -> Result<()> {
        self.check_input(x)?;
        <Self as DifferentiableFunction<T>>::check_output_index(self, output_index)?;
        let mut coo = CooMatrix::new(self.size, self.size);
        coo.push(output_index, output_index, T::one() + T::one())?;
        hessian.assign_from_coo(&coo, T::zero())
    }
}

/// `f(x) = ||x - c||^2` for a fixed center `c`.
#[derive(Debug, Clone)]
pub struct SquaredDistance<T: Scalar> {
    name: String,
    center: DVector<T>,
    representation: Representation,
}

impl<T: Scalar> SquaredDistance<T> {
    /// Dense variant with the given center.
    pub fn new(center: DVector<T>) -> Self {
        Self {
            name: format!("squared distance in R^{}", center.len()),
            center,
            representation: Representation::Dense,
        }
    }

    /// Sparse variant with the given center.
    pub fn sparse(center: DVector<T>) -> Self {
        Self {
            representation: Representation::Sparse,
            ..Self::new(center)
        }
    }
}

impl<T: Scalar> DifferentiableFunction<T> for SquaredDistance<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.center.len()
    }

    fn output_size(&self) -> usize {
        1
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::QUADRATIC
    }

    fn representation(&self) -> Representation {
        self.representation
    }

    fn compute(&self, x: &DVector<T>, result: &mut DVector<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        result[0] = (x - &self.center).norm_squared();
        Ok(())
    }

    fn jacobian(&self, x: &DVector<T>, jacobian: &mut Derivative<T>, _ws: &mut Workspace<T>) -> Result<()> {
        self.check_input(x)?;
        let two = T::one() + T::one();
        let mut coo = CooMatrix::with_capacity(1, x.len(), x.len());
        for (j, (xi, ci)) in x.iter().zip(self.center.iter()).enumerate() {
            coo.push(0, j, two * (*xi - *ci))?;
        }
        jacobian.assign_from_coo(&coo, T::zero())
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
        let n = x.len();
        let mut coo = CooMatrix::with_capacity(n, n, n);
        for i in 0..n {
            coo.push(i, i, T::one() + T::one())?;
        }
        hessian.assign_from_coo(&coo, T::zero())
    }
}
