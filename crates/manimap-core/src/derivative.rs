//! Dense and sparse containers for Jacobians and Hessians.
//!
//! A function declares the numeric representation of its derivatives once;
//! buffers handed to it are created from that declaration with
//! [`Derivative::zeros`].

use crate::{
    error::{MapError, Result},
    sparse::{CooMatrix, CsrMatrix},
    types::{DMatrix, DVector, Scalar},
};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric representation of a function's derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Representation {
    /// Column-major dense matrices.
    #[default]
    Dense,
    /// Compressed sparse row matrices.
    Sparse,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense => write!(f, "dense"),
            Self::Sparse => write!(f, "sparse"),
        }
    }
}

/// A Jacobian or Hessian in either representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Derivative<T: Scalar> {
    /// Dense storage
    Dense(DMatrix<T>),
    /// Sparse storage
    Sparse(CsrMatrix<T>),
}

impl<T: Scalar> Derivative<T> {
    /// Creates a zero derivative of the given shape and representation.
    pub fn zeros(representation: Representation, nrows: usize, ncols: usize) -> Self {
        match representation {
            Representation::Dense => Self::Dense(DMatrix::zeros(nrows, ncols)),
            Representation::Sparse => Self::Sparse(CsrMatrix::zeros(nrows, ncols)),
        }
    }

    /// Returns the representation of the stored matrix.
    pub fn representation(&self) -> Representation {
        match self {
            Self::Dense(_) => Representation::Dense,
            Self::Sparse(_) => Representation::Sparse,
        }
    }

    /// Returns the number of rows.
    pub fn nrows(&self) -> usize {
        match self {
            Self::Dense(m) => m.nrows(),
            Self::Sparse(m) => m.nrows(),
        }
    }

    /// Returns the number of columns.
    pub fn ncols(&self) -> usize {
        match self {
            Self::Dense(m) => m.ncols(),
            Self::Sparse(m) => m.ncols(),
        }
    }

    /// Returns the entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> T {
        match self {
            Self::Dense(m) => m[(row, col)],
            Self::Sparse(m) => m.get(row, col),
        }
    }

    /// Resets every entry to zero, keeping shape and representation.
    pub fn set_zero(&mut self) {
        match self {
            Self::Dense(m) => m.fill(T::zero()),
            Self::Sparse(m) => m.clear(),
        }
    }

    /// Returns a dense copy.
    pub fn to_dense(&self) -> DMatrix<T> {
        match self {
            Self::Dense(m) => m.clone(),
            Self::Sparse(m) => m.to_dense(),
        }
    }

    /// Returns row `row` as a dense vector.
    pub fn row_vector(&self, row: usize) -> DVector<T> {
        match self {
            Self::Dense(m) => m.row(row).transpose(),
            Self::Sparse(m) => {
                let mut v = DVector::zeros(m.ncols());
                for (j, value) in m.row(row) {
                    v[j] = value;
                }
                v
            }
        }
    }

    /// Calls `f` on every structurally nonzero entry `(row, col, value)`.
    ///
    /// Dense storage skips exact zeros.
    pub fn try_for_each_nonzero<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(usize, usize, T) -> Result<()>,
    {
        match self {
            Self::Dense(m) => {
                for j in 0..m.ncols() {
                    for i in 0..m.nrows() {
                        let v = m[(i, j)];
                        if v != T::zero() {
                            f(i, j, v)?;
                        }
                    }
                }
            }
            Self::Sparse(m) => {
                for (i, j, v) in m.iter() {
                    f(i, j, v)?;
                }
            }
        }
        Ok(())
    }

    /// Checks that the derivative has the given shape.
    pub fn check_shape(&self, context: &str, nrows: usize, ncols: usize) -> Result<()> {
        if self.nrows() != nrows || self.ncols() != ncols {
            return Err(MapError::dimension_mismatch(
                context,
                format!("{nrows}x{ncols}"),
                format!("{}x{}", self.nrows(), self.ncols()),
            ));
        }
        Ok(())
    }

    /// Computes `self += alpha * other`.
    ///
    /// Both operands must have the same shape. A dense target accepts a
    /// sparse operand; a sparse target requires a sparse operand so that
    /// it is never densified.
    pub fn add_scaled(&mut self, alpha: T, other: &Self, tolerance: T) -> Result<()> {
        other.check_shape("derivative accumulation", self.nrows(), self.ncols())?;
        match (self, other) {
            (Self::Dense(target), Self::Dense(source)) => {
                *target += source * alpha;
            }
            (Self::Dense(target), Self::Sparse(source)) => {
                for (i, j, v) in source.iter() {
                    target[(i, j)] += alpha * v;
                }
            }
            (Self::Sparse(target), Self::Sparse(source)) => {
                target.add_scaled(alpha, source, tolerance)?;
            }
            (Self::Sparse(_), Self::Dense(_)) => {
                return Err(MapError::RepresentationMismatch {
                    function: "derivative accumulation".to_string(),
                    expected: Representation::Sparse.to_string(),
                    actual: Representation::Dense.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Replaces the content with the matrix assembled from `coo`.
    ///
    /// Dense targets receive the triplets directly; sparse targets are
    /// rebuilt in compressed form.
    pub fn assign_from_coo(&mut self, coo: &CooMatrix<T>, tolerance: T) -> Result<()> {
        let csr = coo.to_csr_with_tolerance(tolerance);
        self.check_shape("assembled derivative", csr.nrows(), csr.ncols())?;
        match self {
            Self::Dense(m) => {
                m.fill(T::zero());
                for (i, j, v) in csr.iter() {
                    m[(i, j)] = v;
                }
            }
            Self::Sparse(m) => *m = csr,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zeros_and_shape() {
        let dense = Derivative::<f64>::zeros(Representation::Dense, 2, 5);
        let sparse = Derivative::<f64>::zeros(Representation::Sparse, 2, 5);

        assert_eq!(dense.representation(), Representation::Dense);
        assert_eq!(sparse.representation(), Representation::Sparse);
        assert_eq!((sparse.nrows(), sparse.ncols()), (2, 5));
        assert!(dense.check_shape("test", 2, 5).is_ok());
        assert!(dense.check_shape("test", 5, 2).is_err());
        assert_eq!(dense.to_dense(), sparse.to_dense());
    }

    #[test]
    fn test_add_scaled_dense_and_sparse_agree() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);

        let mut dense = Derivative::zeros(Representation::Dense, 2, 3);
        let mut sparse = Derivative::zeros(Representation::Sparse, 2, 3);
        dense.add_scaled(0.5, &Derivative::Dense(m.clone()), 0.0).unwrap();
        sparse
            .add_scaled(0.5, &Derivative::Sparse(CsrMatrix::from_dense(&m, 0.0)), 0.0)
            .unwrap();

        assert_relative_eq!(dense.to_dense(), sparse.to_dense());
        assert_relative_eq!(dense.get(1, 1), 1.5);
    }

    #[test]
    fn test_sparse_target_rejects_dense_operand() {
        let mut sparse = Derivative::<f64>::zeros(Representation::Sparse, 1, 1);
        let dense = Derivative::<f64>::zeros(Representation::Dense, 1, 1);
        assert!(matches!(
            sparse.add_scaled(1.0, &dense, 0.0),
            Err(MapError::RepresentationMismatch { .. })
        ));
    }

    #[test]
    fn test_row_vector() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let sparse = Derivative::Sparse(CsrMatrix::from_dense(&m, 0.0));
        assert_eq!(sparse.row_vector(1), DVector::from_vec(vec![3.0, 4.0]));
        assert_eq!(Derivative::Dense(m).row_vector(0), DVector::from_vec(vec![1.0, 2.0]));
    }

    #[test]
    fn test_nonzero_iteration_skips_dense_zeros() {
        let m = DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 3.0, 0.0]);
        let mut seen = Vec::new();
        Derivative::Dense(m)
            .try_for_each_nonzero(|i, j, v| {
                seen.push((i, j, v));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![(1, 0, 3.0), (0, 1, 2.0)]);
    }

    proptest::proptest! {
        #[test]
        fn prop_accumulation_agrees_across_representations(
            entries in proptest::collection::vec((0..4usize, 0..5usize, -3.0..3.0f64), 0..12),
            alpha in -2.0..2.0f64,
        ) {
            let mut m = DMatrix::zeros(4, 5);
            for &(i, j, v) in &entries {
                m[(i, j)] = v;
            }
            let mut dense = Derivative::Dense(DMatrix::from_element(4, 5, 1.0));
            let mut sparse = Derivative::Sparse(CsrMatrix::from_dense(&DMatrix::from_element(4, 5, 1.0), 0.0));
            dense.add_scaled(alpha, &Derivative::Dense(m.clone()), 0.0).unwrap();
            sparse
                .add_scaled(alpha, &Derivative::Sparse(CsrMatrix::from_dense(&m, 0.0)), 0.0)
                .unwrap();
            proptest::prop_assert!((dense.to_dense() - sparse.to_dense()).amax() < 1e-12);
        }
    }

    #[test]
    fn test_assign_from_coo() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(1, 0, 2.0).unwrap();
        coo.push(1, 0, 1.0).unwrap();

        let mut dense = Derivative::zeros(Representation::Dense, 2, 2);
        dense.assign_from_coo(&coo, 0.0).unwrap();
        assert_eq!(dense.get(1, 0), 3.0);

        let mut sparse = Derivative::zeros(Representation::Sparse, 2, 2);
        sparse.assign_from_coo(&coo, 0.0).unwrap();
        assert_eq!(sparse.get(1, 0), 3.0);
    }
}
