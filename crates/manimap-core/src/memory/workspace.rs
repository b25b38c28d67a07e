//! Evaluation context for composed functions.

use crate::{
    derivative::Representation,
    memory::pool::{MatrixPool, PooledDerivative, PooledMatrix, PooledVector, VectorPool},
    types::Scalar,
};

/// Scratch memory threaded through every evaluation.
///
/// A workspace is cheap to create and is meant to be owned by the caller
/// of an evaluation loop. Temporaries are borrowed through
/// [`acquire_temp_vector`](Self::acquire_temp_vector) and
/// [`acquire_temp_matrix`](Self::acquire_temp_matrix) and go back to the
/// pools when their guards are dropped, so repeated evaluations of the
/// same composition settle into zero allocations.
///
/// # Example
/// ```
/// use manimap_core::memory::Workspace;
///
/// let ws = Workspace::<f64>::new();
/// let mut buffer = ws.acquire_temp_vector(3);
/// buffer[1] = 2.0;
/// assert_eq!(buffer.len(), 3);
/// ```
#[derive(Clone)]
pub struct Workspace<T: Scalar> {
    vector_pool: VectorPool<T>,
    matrix_pool: MatrixPool<T>,
}

impl<T: Scalar> Workspace<T> {
    /// Create a new empty workspace.
    pub fn new() -> Self {
        Self {
            vector_pool: VectorPool::new(8),
            matrix_pool: MatrixPool::new(4),
        }
    }

    /// Acquire a zero-filled temporary vector.
    pub fn acquire_temp_vector(&self, size: usize) -> PooledVector<T> {
        self.vector_pool.acquire(size)
    }

    /// Acquire a zero-filled temporary matrix.
    pub fn acquire_temp_matrix(&self, rows: usize, cols: usize) -> PooledMatrix<T> {
        self.matrix_pool.acquire(rows, cols)
    }

    /// Acquire a zero-filled temporary Jacobian or Hessian buffer.
    pub fn acquire_temp_derivative(
        &self,
        representation: Representation,
        rows: usize,
        cols: usize,
    ) -> PooledDerivative<T> {
        PooledDerivative::acquire(&self.matrix_pool, representation, rows, cols)
    }

    /// Number of buffers allocated because no pooled buffer was free.
    pub fn allocations(&self) -> usize {
        self.vector_pool.allocations() + self.matrix_pool.allocations()
    }

    /// Drop every pooled buffer.
    pub fn clear(&mut self) {
        self.vector_pool.clear();
        self.matrix_pool.clear();
    }
}

impl<T: Scalar> Default for Workspace<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for workspaces with pre-allocated buffers.
pub struct WorkspaceBuilder<T: Scalar> {
    max_vectors_per_size: usize,
    max_matrices_per_size: usize,
    vectors: Vec<(usize, usize)>,
    matrices: Vec<(usize, usize, usize)>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Scalar> WorkspaceBuilder<T> {
    /// Create a new workspace builder.
    pub fn new() -> Self {
        Self {
            max_vectors_per_size: 8,
            max_matrices_per_size: 4,
            vectors: Vec::new(),
            matrices: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Set how many vectors of one size the workspace keeps.
    pub fn max_vectors_per_size(mut self, max: usize) -> Self {
        self.max_vectors_per_size = max;
        self
    }

    /// Set how many matrices of one shape the workspace keeps.
    pub fn max_matrices_per_size(mut self, max: usize) -> Self {
        self.max_matrices_per_size = max;
        self
    }

    /// Pre-allocate `count` vectors of length `size`.
    pub fn with_vectors(mut self, size: usize, count: usize) -> Self {
        self.vectors.push((size, count));
        self
    }

    /// Pre-allocate `count` matrices of shape `rows x cols`.
    pub fn with_matrices(mut self, rows: usize, cols: usize, count: usize) -> Self {
        self.matrices.push((rows, cols, count));
        self
    }

    /// Build the workspace.
    pub fn build(self) -> Workspace<T> {
        let workspace = Workspace {
            vector_pool: VectorPool::new(self.max_vectors_per_size),
            matrix_pool: MatrixPool::new(self.max_matrices_per_size),
        };
        for (size, count) in self.vectors {
            workspace.vector_pool.reserve(size, count);
        }
        for (rows, cols, count) in self.matrices {
            workspace.matrix_pool.reserve(rows, cols, count);
        }
        workspace
    }
}

impl<T: Scalar> Default for WorkspaceBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_survive_mutable_reborrow() {
        fn nested(ws: &mut Workspace<f64>) -> f64 {
            let v = ws.acquire_temp_vector(4);
            v.sum()
        }

        let mut ws = Workspace::<f64>::new();
        let mut outer = ws.acquire_temp_vector(4);
        outer[0] = 1.0;
        assert_eq!(nested(&mut ws), 0.0);
        assert_eq!(outer[0], 1.0);
    }

    #[test]
    fn test_repeated_use_stops_allocating() {
        let ws = Workspace::<f64>::new();
        for _ in 0..3 {
            let _v = ws.acquire_temp_vector(5);
            let _m = ws.acquire_temp_matrix(2, 5);
        }
        assert_eq!(ws.allocations(), 2);
    }

    #[test]
    fn test_builder_preallocates() {
        let ws = WorkspaceBuilder::<f64>::new()
            .with_vectors(10, 2)
            .with_matrices(3, 10, 1)
            .build();

        let _a = ws.acquire_temp_vector(10);
        let _b = ws.acquire_temp_vector(10);
        let _m = ws.acquire_temp_matrix(3, 10);
        assert_eq!(ws.allocations(), 0);
    }
}
