//! # Rotation Group SO(3)
//!
//! The special orthogonal group of 3D rotations:
//! ```text
//! SO(3) = {R ∈ R^{3×3} : RᵀR = I, det(R) = 1}
//! ```
//!
//! ## Coordinates
//!
//! A point is stored as the 9 entries of its rotation matrix in
//! column-major order, so functions on SO(3) see 9 ambient coordinates.
//! Tangent vectors are body-frame angular velocities `ω ∈ R^3`, moving `R`
//! along `R exp([ω]×)`.
//!
//! ## Chart differential
//!
//! At `R` the derivative of `ω ↦ vec(R exp([ω]×))` at zero is the `9 × 3`
//! matrix whose column `k` is
//! ```text
//! vec(R [e_k]×)
//! ```
//! where `[v]×` is the skew-symmetric cross-product matrix of `v`.

use manimap_core::{
    error::{MapError, Result},
    manifold::Manifold,
    types::{DMatrix, DVector, DVectorView, Scalar},
};
use nalgebra::{Matrix3, Rotation3, Vector3};
use rand::Rng;

/// The rotation group SO(3) in rotation-matrix coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SO3 {
    name: String,
}

impl SO3 {
    /// Creates SO(3).
    pub fn new() -> Self {
        Self {
            name: "SO(3)".to_string(),
        }
    }

    /// Creates SO(3) with a custom display name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Ambient coordinates of a rotation.
    pub fn point_from_rotation<T: Scalar>(rotation: &Rotation3<T>) -> DVector<T> {
        DVector::from_column_slice(rotation.matrix().as_slice())
    }

    /// Rotation matrix stored in `point`.
    pub fn matrix_from_point<T: Scalar>(point: DVectorView<'_, T>) -> Result<Matrix3<T>> {
        if point.len() != 9 {
            return Err(MapError::dimension_mismatch("SO(3) point", 9, point.len()));
        }
        Ok(Matrix3::from_iterator(point.iter().copied()))
    }

    /// The identity rotation.
    pub fn identity_point<T: Scalar>() -> DVector<T> {
        Self::point_from_rotation(&Rotation3::identity())
    }

    /// A random rotation.
    pub fn random_point<T: Scalar>() -> DVector<T> {
        let mut rng = rand::thread_rng();
        let axis_angle = Vector3::from_fn(|_, _| {
            <T as Scalar>::from_f64(rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI))
        });
        Self::point_from_rotation(&Rotation3::new(axis_angle))
    }
}

impl Default for SO3 {
    fn default() -> Self {
        Self::new()
    }
}

/// Cross-product matrix `[v]×`.
fn hat<T: Scalar>(v: &Vector3<T>) -> Matrix3<T> {
    let zero = T::zero();
    Matrix3::new(zero, -v.z, v.y, v.z, zero, -v.x, -v.y, v.x, zero)
}

impl<T: Scalar> Manifold<T> for SO3 {
    fn name(&self) -> &str {
        &self.name
    }

    fn representation_dimension(&self) -> usize {
        9
    }

    fn tangent_dimension(&self) -> usize {
        3
    }

    fn is_flat(&self) -> bool {
        false
    }

    fn differential(&self, point: DVectorView<'_, T>) -> Result<DMatrix<T>> {
        let rotation = Self::matrix_from_point(point)?;
        let mut d = DMatrix::zeros(9, 3);
        for k in 0..3 {
            let column = rotation * hat(&Vector3::ith(k, T::one()));
            d.column_mut(k).copy_from_slice(column.as_slice());
        }
        Ok(d)
    }
}
