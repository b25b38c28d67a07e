//! Core traits and types for composing differentiable functions over
//! product manifolds.
//!
//! This crate defines the collaborators the composition engine in `manimap`
//! is written against:
//!
//! - **Manifolds**: charts with a representation (ambient) dimension and a
//!   tangent dimension, possibly built as Cartesian products
//! - **Differentiable functions**: leaf functions exposing values,
//!   Jacobians and Hessians together with a capability descriptor
//! - **Derivatives**: dense or sparse containers for Jacobians and Hessians
//! - **Workspaces**: evaluation contexts owning reusable scratch buffers
//!
//! # Modules
//!
//! - [`config`]: Configuration of the composition engine
//! - [`derivative`]: Dense and sparse derivative containers
//! - [`error`]: Error types
//! - [`function`]: Differentiable function trait and capability flags
//! - [`interval`]: Bound intervals
//! - [`manifold`]: Manifold trait and identity helpers
//! - [`memory`]: Buffer pools and the evaluation workspace
//! - [`sparse`]: Compressed sparse row and coordinate matrices
//! - [`types`]: Scalar trait and type aliases

pub mod config;
pub mod derivative;
pub mod error;
pub mod function;
pub mod interval;
pub mod manifold;
pub mod memory;
pub mod sparse;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_functions;

// Re-export commonly used items at the crate root
pub use error::{MapError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use manimap_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{MapConfig, MapConfigBuilder, RestrictionPolicy};
    pub use crate::derivative::{Derivative, Representation};
    pub use crate::error::{MapError, Result};
    pub use crate::function::{
        Capabilities, ConstantFunction, DifferentiableFunction, FunctionRef,
    };
    pub use crate::interval::Interval;
    pub use crate::manifold::{elementary_factors, same_manifold, Manifold, ManifoldRef};
    pub use crate::memory::{Workspace, WorkspaceBuilder};
    pub use crate::sparse::{CooMatrix, CsrMatrix};
    pub use crate::types::{DMatrix, DVector, DVectorView, Scalar};
}
