//! Sparse matrix support for derivatives.
//!
//! Jacobians and Hessians of functions on large product manifolds are
//! mostly zero: a term only depends on the coordinates of its own local
//! manifold. This module provides a compressed sparse row matrix for
//! storing them and a coordinate (triplet) matrix for assembling them.

use crate::{
    error::{MapError as Error, Result},
    types::{DMatrix, Scalar},
};
use num_traits::Float;

/// Compressed Sparse Row (CSR) format matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T: Scalar> {
    /// Number of rows
    nrows: usize,
    /// Number of columns
    ncols: usize,
    /// Row pointers (length nrows + 1)
    row_ptr: Vec<usize>,
    /// Column indices (length nnz), sorted within each row
    col_idx: Vec<usize>,
    /// Non-zero values (length nnz)
    values: Vec<T>,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Creates an all-zero matrix with no stored entries.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            row_ptr: vec![0; nrows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates a CSR matrix from a dense matrix, keeping entries whose
    /// magnitude exceeds `tolerance`.
    pub fn from_dense(dense: &DMatrix<T>, tolerance: T) -> Self {
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();

        for i in 0..dense.nrows() {
            for j in 0..dense.ncols() {
                let val = dense[(i, j)];
                if Float::abs(val) > tolerance {
                    col_idx.push(j);
                    values.push(val);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            nrows: dense.nrows(),
            ncols: dense.ncols(),
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Converts to a dense matrix.
    pub fn to_dense(&self) -> DMatrix<T> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for (i, j, v) in self.iter() {
            dense[(i, j)] = v;
        }
        dense
    }

    /// Returns the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of stored elements.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns the entry at `(row, col)`, zero when it is not stored.
    pub fn get(&self, row: usize, col: usize) -> T {
        if row >= self.nrows {
            return T::zero();
        }
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        self.col_idx[start..end]
            .binary_search(&col)
            .map_or_else(|_| T::zero(), |k| self.values[start + k])
    }

    /// Iterates over the stored entries as `(row, col, value)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        (0..self.nrows).flat_map(move |i| {
            (self.row_ptr[i]..self.row_ptr[i + 1]).map(move |k| (i, self.col_idx[k], self.values[k]))
        })
    }

    /// Iterates over the stored entries of one row as `(col, value)`.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let (start, end) = if row < self.nrows {
            (self.row_ptr[row], self.row_ptr[row + 1])
        } else {
            (0, 0)
        };
        (start..end).map(move |k| (self.col_idx[k], self.values[k]))
    }

    /// Removes every stored entry, keeping the shape.
    pub fn clear(&mut self) {
        self.row_ptr.iter_mut().for_each(|p| *p = 0);
        self.col_idx.clear();
        self.values.clear();
    }

    /// Computes `self += alpha * other` without densifying either operand.
    pub fn add_scaled(&mut self, alpha: T, other: &Self, tolerance: T) -> Result<()> {
        if self.nrows != other.nrows || self.ncols != other.ncols {
            return Err(Error::dimension_mismatch(
                "sparse accumulation",
                format!("{}x{}", self.nrows, self.ncols),
                format!("{}x{}", other.nrows, other.ncols),
            ));
        }

        let mut coo = CooMatrix::with_capacity(self.nrows, self.ncols, self.nnz() + other.nnz());
        coo.extend_from_csr(T::one(), self);
        coo.extend_from_csr(alpha, other);
        *self = coo.to_csr_with_tolerance(tolerance);
        Ok(())
    }
}

/// Coordinate (COO) format matrix for easier construction.
///
/// Duplicate coordinates are allowed and summed when converting to CSR.
#[derive(Debug, Clone)]
pub struct CooMatrix<T: Scalar> {
    /// Number of rows
    nrows: usize,
    /// Number of columns
    ncols: usize,
    /// Triplets (row, col, value)
    triplets: Vec<(usize, usize, T)>,
}

impl<T: Scalar> CooMatrix<T> {
    /// Creates a new empty COO matrix.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            triplets: Vec::new(),
        }
    }

    /// Creates a new empty COO matrix with room for `capacity` triplets.
    pub fn with_capacity(nrows: usize, ncols: usize, capacity: usize) -> Self {
        Self {
            nrows,
            ncols,
            triplets: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns the number of pushed triplets, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.triplets.len()
    }

    /// Returns true if no triplet was pushed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }

    /// Adds an entry to the matrix.
    pub fn push(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.nrows {
            return Err(Error::dimension_mismatch(
                "COO entry",
                format!("row < {}", self.nrows),
                format!("row = {row}"),
            ));
        }

        if col >= self.ncols {
            return Err(Error::dimension_mismatch(
                "COO entry",
                format!("col < {}", self.ncols),
                format!("col = {col}"),
            ));
        }

        if value != T::zero() {
            self.triplets.push((row, col, value));
        }

        Ok(())
    }

    /// Appends `alpha * m` entry by entry.
    pub fn extend_from_csr(&mut self, alpha: T, m: &CsrMatrix<T>) {
        debug_assert!(m.nrows() <= self.nrows && m.ncols() <= self.ncols);
        self.triplets
            .extend(m.iter().map(|(i, j, v)| (i, j, alpha * v)));
    }

    /// Converts to CSR format, dropping exact zeros.
    pub fn to_csr(&self) -> CsrMatrix<T> {
        self.to_csr_with_tolerance(T::zero())
    }

    /// Converts to CSR format, summing duplicates and dropping entries whose
    /// magnitude does not exceed `tolerance`.
    pub fn to_csr_with_tolerance(&self, tolerance: T) -> CsrMatrix<T> {
        // Sort triplets by (row, col)
        let mut sorted_triplets = self.triplets.clone();
        sorted_triplets.sort_by_key(|&(r, c, _)| (r, c));

        // Remove duplicates by summing values
        let mut unique_triplets: Vec<(usize, usize, T)> = Vec::with_capacity(sorted_triplets.len());
        for (r, c, v) in sorted_triplets {
            if let Some(last) = unique_triplets.last_mut() {
                let (last_r, last_c, ref mut last_v) = *last;
                if last_r == r && last_c == c {
                    *last_v += v;
                    continue;
                }
            }
            unique_triplets.push((r, c, v));
        }

        // Build CSR format
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();

        let mut current_row = 0;
        for (r, c, v) in unique_triplets {
            if Float::abs(v) <= tolerance {
                continue;
            }
            while current_row < r {
                row_ptr.push(col_idx.len());
                current_row += 1;
            }
            col_idx.push(c);
            values.push(v);
        }

        while current_row < self.nrows {
            row_ptr.push(col_idx.len());
            current_row += 1;
        }

        CsrMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_from_dense() {
        let dense = DMatrix::from_row_slice(3, 3, &[
            1.0, 0.0, 2.0,
            0.0, 3.0, 0.0,
            4.0, 0.0, 5.0,
        ]);

        let csr = CsrMatrix::from_dense(&dense, 1e-10);
        assert_eq!(csr.nrows(), 3);
        assert_eq!(csr.ncols(), 3);
        assert_eq!(csr.nnz(), 5);
        assert_eq!(csr.get(0, 2), 2.0);
        assert_eq!(csr.get(1, 0), 0.0);

        let reconstructed = csr.to_dense();
        assert_eq!(dense, reconstructed);
    }

    #[test]
    fn test_coo_to_csr_sums_duplicates() {
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 0, 1.0).unwrap();
        coo.push(2, 2, 5.0).unwrap();
        coo.push(0, 2, 2.0).unwrap();
        coo.push(0, 0, 0.5).unwrap();
        coo.push(1, 1, 3.0).unwrap();

        let csr = coo.to_csr();
        assert_eq!(csr.nnz(), 4);

        let dense = csr.to_dense();
        assert_eq!(dense[(0, 0)], 1.5);
        assert_eq!(dense[(0, 2)], 2.0);
        assert_eq!(dense[(1, 1)], 3.0);
        assert_eq!(dense[(2, 2)], 5.0);
    }

    #[test]
    fn test_coo_rejects_out_of_range() {
        let mut coo = CooMatrix::<f64>::new(2, 2);
        assert!(coo.push(2, 0, 1.0).is_err());
        assert!(coo.push(0, 2, 1.0).is_err());
        assert!(coo.is_empty());
    }

    #[test]
    fn test_add_scaled() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        let b = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 4.0, 0.0, 1.0, 0.0]);

        let mut csr = CsrMatrix::from_dense(&a, 0.0);
        csr.add_scaled(2.0, &CsrMatrix::from_dense(&b, 0.0), 0.0).unwrap();

        assert_eq!(csr.to_dense(), &a + &b * 2.0);
        assert_eq!(csr.nnz(), 3);
    }

    #[test]
    fn test_add_scaled_shape_mismatch() {
        let mut a = CsrMatrix::<f64>::zeros(2, 3);
        let b = CsrMatrix::<f64>::zeros(3, 2);
        assert!(a.add_scaled(1.0, &b, 0.0).is_err());
    }

    #[test]
    fn test_row_iteration_and_clear() {
        let dense = DMatrix::from_row_slice(2, 2, &[0.0, 7.0, 8.0, 9.0]);
        let mut csr = CsrMatrix::from_dense(&dense, 0.0);

        let row: Vec<_> = csr.row(1).collect();
        assert_eq!(row, vec![(0, 8.0), (1, 9.0)]);

        csr.clear();
        assert_eq!(csr.nnz(), 0);
        assert_eq!(csr.to_dense(), DMatrix::zeros(2, 2));
    }
}
