//! # Manimap
//!
//! Composition of differentiable functions declared on sub-manifolds into
//! functions and problems over one product manifold.
//!
//! Each function is written against the manifold it naturally lives on,
//! e.g. an orientation constraint on `SO(3)` or a joint limit on `R^10`,
//! possibly using only some coordinates of that manifold. The engine
//! merges all manifolds into one Cartesian product, maps every local
//! coordinate to its global position, and evaluates values, Jacobians and
//! Hessians on the product, pulling derivatives back through the chart of
//! curved factors.
//!
//! ## Modules
//!
//! - [`mapper`]: placement of local coordinates in a global manifold
//! - [`merger`]: deduplicated product of contributed manifolds
//! - [`on_manifold`]: a function lifted to a global manifold
//! - [`dispatcher`]: dense and sparse scattering of derivatives
//! - [`sum`]: weighted sums over one manifold
//! - [`adder`]: two-phase construction of weighted sums
//! - [`problem`], [`factory`]: problem assembly
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use manimap::prelude::*;
//!
//! let position: ManifoldRef<f64> = Arc::new(RealSpace::new(3));
//! let joints: ManifoldRef<f64> = Arc::new(RealSpace::new(10));
//!
//! let mut adder = AdderOnManifold::new();
//! adder
//!     .add_function(Arc::new(ConstantFunction::<f64>::zero(3)), &position)
//!     .add_function(Arc::new(ConstantFunction::<f64>::zero(10)), &joints);
//!
//! let global = adder.manifold();
//! let f = adder.get_function(&global).unwrap();
//! assert_eq!(f.input_size(), 13);
//! ```

pub mod adder;
pub mod dispatcher;
pub mod factory;
pub mod mapper;
pub mod merger;
pub mod on_manifold;
pub mod problem;
pub mod sum;

pub use manimap_core::{MapError, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use manimap_core::prelude::*;
    pub use manimap_manifolds::{CartesianProduct, RealSpace, SO3};

    pub use crate::adder::{AdderOnManifold, Contribution};
    pub use crate::dispatcher::{DenseScatter, ScatterStrategy, SparseScatter};
    pub use crate::factory::{ConstraintHandle, ManifoldProblemFactory};
    pub use crate::mapper::{IndexMap, Restriction, Span};
    pub use crate::merger::ManifoldMerger;
    pub use crate::on_manifold::FunctionOnManifold;
    pub use crate::problem::{Constraint, Problem};
    pub use crate::sum::SumOnManifold;
}
