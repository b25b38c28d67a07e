//! Pools of reusable vectors and matrices.
//!
//! Buffers are keyed by their shape. A buffer acquired from a pool is
//! zero-filled and returns to its pool when the guard is dropped; the
//! guard holds no borrow of the pool, so callers may keep it alive while
//! passing their workspace down to nested evaluations.

use crate::{
    derivative::{Derivative, Representation},
    sparse::CsrMatrix,
    types::{DMatrix, DVector, Scalar},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

#[derive(Debug)]
struct VectorPoolInner<T: Scalar> {
    /// Pools organized by vector size
    pools: HashMap<usize, Vec<DVector<T>>>,
    /// Maximum number of vectors to keep per size
    max_per_size: usize,
    /// Number of vectors created because no pooled one was available
    allocations: usize,
}

impl<T: Scalar> VectorPoolInner<T> {
    fn new(max_per_size: usize) -> Self {
        Self {
            pools: HashMap::new(),
            max_per_size,
            allocations: 0,
        }
    }

    fn acquire(&mut self, size: usize) -> DVector<T> {
        if let Some(mut vec) = self.pools.get_mut(&size).and_then(Vec::pop) {
            vec.fill(T::zero());
            return vec;
        }
        self.allocations += 1;
        DVector::zeros(size)
    }

    fn release(&mut self, vec: DVector<T>) {
        // Zero-length vectors are placeholders left behind by `take`.
        if vec.is_empty() {
            return;
        }
        let pool = self.pools.entry(vec.len()).or_default();
        if pool.len() < self.max_per_size {
            pool.push(vec);
        }
    }
}

/// Thread-safe vector pool.
#[derive(Clone)]
pub struct VectorPool<T: Scalar> {
    inner: Arc<Mutex<VectorPoolInner<T>>>,
}

impl<T: Scalar> VectorPool<T> {
    /// Create a new vector pool with the specified maximum vectors per size.
    pub fn new(max_per_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VectorPoolInner::new(max_per_size))),
        }
    }

    /// Acquire a zero-filled vector from the pool or create a new one.
    pub fn acquire(&self, size: usize) -> PooledVector<T> {
        let vector = self.inner.lock().acquire(size);
        PooledVector {
            vector,
            pool: self.clone(),
        }
    }

    /// Store `count` vectors of length `size` ahead of use.
    pub fn reserve(&self, size: usize, count: usize) {
        let mut inner = self.inner.lock();
        let keep = count.min(inner.max_per_size);
        let pool = inner.pools.entry(size).or_default();
        while pool.len() < keep {
            pool.push(DVector::zeros(size));
        }
    }

    /// Get the number of pooled vectors for a specific size.
    pub fn pool_size(&self, size: usize) -> usize {
        self.inner.lock().pools.get(&size).map_or(0, Vec::len)
    }

    /// Number of vectors allocated because the pool was empty.
    pub fn allocations(&self) -> usize {
        self.inner.lock().allocations
    }

    /// Clear all pooled vectors.
    pub fn clear(&self) {
        self.inner.lock().pools.clear();
    }
}

impl<T: Scalar> Default for VectorPool<T> {
    fn default() -> Self {
        Self::new(16)
    }
}

/// A vector borrowed from a pool that automatically returns when dropped.
pub struct PooledVector<T: Scalar> {
    vector: DVector<T>,
    pool: VectorPool<T>,
}

impl<T: Scalar> PooledVector<T> {
    /// Take ownership of the vector, preventing it from returning to the pool.
    pub fn take(mut self) -> DVector<T> {
        std::mem::replace(&mut self.vector, DVector::zeros(0))
    }
}

impl<T: Scalar> Deref for PooledVector<T> {
    type Target = DVector<T>;

    fn deref(&self) -> &Self::Target {
        &self.vector
    }
}

impl<T: Scalar> DerefMut for PooledVector<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vector
    }
}

impl<T: Scalar> Drop for PooledVector<T> {
    fn drop(&mut self) {
        let vec = std::mem::replace(&mut self.vector, DVector::zeros(0));
        self.pool.inner.lock().release(vec);
    }
}

#[derive(Debug)]
struct MatrixPoolInner<T: Scalar> {
    /// Pools organized by (rows, cols) dimensions
    pools: HashMap<(usize, usize), Vec<DMatrix<T>>>,
    /// Maximum number of matrices to keep per dimension
    max_per_size: usize,
    /// Number of matrices created because no pooled one was available
    allocations: usize,
}

impl<T: Scalar> MatrixPoolInner<T> {
    fn new(max_per_size: usize) -> Self {
        Self {
            pools: HashMap::new(),
            max_per_size,
            allocations: 0,
        }
    }

    fn acquire(&mut self, rows: usize, cols: usize) -> DMatrix<T> {
        if let Some(mut mat) = self.pools.get_mut(&(rows, cols)).and_then(Vec::pop) {
            mat.fill(T::zero());
            return mat;
        }
        self.allocations += 1;
        DMatrix::zeros(rows, cols)
    }

    fn release(&mut self, mat: DMatrix<T>) {
        if mat.is_empty() {
            return;
        }
        let pool = self.pools.entry((mat.nrows(), mat.ncols())).or_default();
        if pool.len() < self.max_per_size {
            pool.push(mat);
        }
    }
}

/// Thread-safe matrix pool.
#[derive(Clone)]
pub struct MatrixPool<T: Scalar> {
    inner: Arc<Mutex<MatrixPoolInner<T>>>,
}

impl<T: Scalar> MatrixPool<T> {
    /// Create a new matrix pool with the specified maximum matrices per dimension.
    pub fn new(max_per_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MatrixPoolInner::new(max_per_size))),
        }
    }

    /// Acquire a zero-filled matrix from the pool or create a new one.
    pub fn acquire(&self, rows: usize, cols: usize) -> PooledMatrix<T> {
        let matrix = self.inner.lock().acquire(rows, cols);
        PooledMatrix {
            matrix,
            pool: self.clone(),
        }
    }

    /// Store `count` matrices of shape `rows x cols` ahead of use.
    pub fn reserve(&self, rows: usize, cols: usize, count: usize) {
        let mut inner = self.inner.lock();
        let keep = count.min(inner.max_per_size);
        let pool = inner.pools.entry((rows, cols)).or_default();
        while pool.len() < keep {
            pool.push(DMatrix::zeros(rows, cols));
        }
    }

    /// Get the number of pooled matrices for specific dimensions.
    pub fn pool_size(&self, rows: usize, cols: usize) -> usize {
        self.inner.lock().pools.get(&(rows, cols)).map_or(0, Vec::len)
    }

    /// Number of matrices allocated because the pool was empty.
    pub fn allocations(&self) -> usize {
        self.inner.lock().allocations
    }

    /// Clear all pooled matrices.
    pub fn clear(&self) {
        self.inner.lock().pools.clear();
    }
}

impl<T: Scalar> Default for MatrixPool<T> {
    fn default() -> Self {
        Self::new(8)
    }
}

/// A matrix borrowed from a pool that automatically returns when dropped.
pub struct PooledMatrix<T: Scalar> {
    matrix: DMatrix<T>,
    pool: MatrixPool<T>,
}

impl<T: Scalar> PooledMatrix<T> {
    /// Take ownership of the matrix, preventing it from returning to the pool.
    pub fn take(mut self) -> DMatrix<T> {
        std::mem::replace(&mut self.matrix, DMatrix::zeros(0, 0))
    }
}

impl<T: Scalar> Deref for PooledMatrix<T> {
    type Target = DMatrix<T>;

    fn deref(&self) -> &Self::Target {
        &self.matrix
    }
}

impl<T: Scalar> DerefMut for PooledMatrix<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.matrix
    }
}

impl<T: Scalar> Drop for PooledMatrix<T> {
    fn drop(&mut self) {
        let mat = std::mem::replace(&mut self.matrix, DMatrix::zeros(0, 0));
        self.pool.inner.lock().release(mat);
    }
}

/// A derivative buffer whose dense storage comes from a matrix pool.
///
/// Sparse buffers do not allocate until entries are assembled, so only
/// dense storage is recycled.
pub struct PooledDerivative<T: Scalar> {
    derivative: Derivative<T>,
    pool: MatrixPool<T>,
}

impl<T: Scalar> PooledDerivative<T> {
    /// Acquire a zero derivative of the given shape and representation.
    pub fn acquire(pool: &MatrixPool<T>, representation: Representation, rows: usize, cols: usize) -> Self {
        let derivative = match representation {
            Representation::Dense => Derivative::Dense(pool.acquire(rows, cols).take()),
            Representation::Sparse => Derivative::Sparse(CsrMatrix::zeros(rows, cols)),
        };
        Self {
            derivative,
            pool: pool.clone(),
        }
    }
}

impl<T: Scalar> Deref for PooledDerivative<T> {
    type Target = Derivative<T>;

    fn deref(&self) -> &Self::Target {
        &self.derivative
    }
}

impl<T: Scalar> DerefMut for PooledDerivative<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.derivative
    }
}

impl<T: Scalar> Drop for PooledDerivative<T> {
    fn drop(&mut self) {
        let placeholder = Derivative::Sparse(CsrMatrix::zeros(0, 0));
        if let Derivative::Dense(mat) = std::mem::replace(&mut self.derivative, placeholder) {
            self.pool.inner.lock().release(mat);
        }
    }
}
