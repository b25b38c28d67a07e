//! Scratch memory for evaluating composed functions.
//!
//! Composed functions never own scratch state. Every evaluation borrows
//! temporaries from the [`Workspace`] passed by the caller, so a single
//! composed function can be evaluated from several threads with one
//! workspace per thread, and nested compositions can be evaluated
//! without aliasing.

pub mod pool;
pub mod workspace;

pub use pool::{MatrixPool, PooledDerivative, PooledMatrix, PooledVector, VectorPool};
pub use workspace::{Workspace, WorkspaceBuilder};
