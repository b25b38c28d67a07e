//! Manimap Manifolds - Concrete manifolds for function composition.
//!
//! This crate provides the manifolds that variables of a composed problem
//! live on: flat Euclidean blocks, rotations, and Cartesian products of
//! other manifolds.

pub mod product;
pub mod real_space;
pub mod so3;

pub use product::CartesianProduct;
pub use real_space::RealSpace;
pub use so3::SO3;
