//! Representation-specific scatter of local derivatives.
//!
//! A function evaluated on a local manifold produces a derivative whose
//! columns follow the local coordinates. Scattering accumulates it into a
//! derivative over the global tangent space, one [`ColumnBlock`] at a
//! time. Curved blocks are pulled back through their chart differential
//! `D`: Jacobian columns become `J D` and Hessian blocks `Dᵢᵀ H Dⱼ`.
//!
//! The dense strategy writes contiguous blocks into a dense target. The
//! sparse strategy only visits the nonzeros of the local derivative and
//! assembles the target from triplets, so a sparse target is never
//! densified.

use crate::mapper::ColumnBlock;
use manimap_core::{
    derivative::{Derivative, Representation},
    error::{MapError, Result},
    sparse::CooMatrix,
    types::Scalar,
};
use std::fmt;

/// Accumulation of local derivatives into global ones.
pub trait ScatterStrategy<T: Scalar>: fmt::Debug + Send + Sync {
    /// Representation of the global derivatives this strategy writes.
    fn representation(&self) -> Representation;

    /// Adds the local Jacobian `local` into the global Jacobian `global`.
    fn scatter_jacobian(
        &self,
        blocks: &[ColumnBlock<T>],
        local: &Derivative<T>,
        global: &mut Derivative<T>,
    ) -> Result<()>;

    /// Adds the local Hessian `local` into the global Hessian `global`.
    fn scatter_hessian(
        &self,
        blocks: &[ColumnBlock<T>],
        local: &Derivative<T>,
        global: &mut Derivative<T>,
    ) -> Result<()>;
}

/// Returns the strategy writing derivatives in `representation`.
///
/// `tolerance` is the drop tolerance of assembled sparse derivatives.
pub fn strategy_for<T: Scalar>(
    representation: Representation,
    tolerance: T,
) -> Box<dyn ScatterStrategy<T>> {
    match representation {
        Representation::Dense => Box::new(DenseScatter),
        Representation::Sparse => Box::new(SparseScatter { tolerance }),
    }
}

/// Block insertion into dense derivatives.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseScatter;

/// Triplet insertion into sparse derivatives.
#[derive(Debug, Clone, Copy)]
pub struct SparseScatter<T: Scalar> {
    tolerance: T,
}

impl<T: Scalar> SparseScatter<T> {
    /// Creates the strategy with the given drop tolerance.
    pub fn new(tolerance: T) -> Self {
        Self { tolerance }
    }
}

impl<T: Scalar> ScatterStrategy<T> for DenseScatter {
    fn representation(&self) -> Representation {
        Representation::Dense
    }

    fn scatter_jacobian(
        &self,
        blocks: &[ColumnBlock<T>],
        local: &Derivative<T>,
        global: &mut Derivative<T>,
    ) -> Result<()> {
        check_jacobian(blocks, local, global)?;
        let Derivative::Dense(target) = global else {
            return Err(target_mismatch(Representation::Dense));
        };
        match local {
            Derivative::Dense(source) => {
                for block in blocks {
                    let columns = source.columns(block.local.start, block.local.len);
                    let mut dest = target.columns_mut(block.global.start, block.global.len);
                    match &block.chart {
                        Some(d) => dest += columns * d,
                        None => dest += columns,
                    }
                }
            }
            Derivative::Sparse(_) => {
                let mut spread = Vec::new();
                local.try_for_each_nonzero(|i, j, v| {
                    spread_column(blocks, j, &mut spread);
                    for &(g, c) in &spread {
                        target[(i, g)] += v * c;
                    }
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    fn scatter_hessian(
        &self,
        blocks: &[ColumnBlock<T>],
        local: &Derivative<T>,
        global: &mut Derivative<T>,
    ) -> Result<()> {
        check_hessian(blocks, local, global)?;
        let Derivative::Dense(target) = global else {
            return Err(target_mismatch(Representation::Dense));
        };
        match local {
            Derivative::Dense(source) => {
                for row in blocks {
                    for col in blocks {
                        let sub = source.view(
                            (row.local.start, col.local.start),
                            (row.local.len, col.local.len),
                        );
                        let mut dest = target.view_mut(
                            (row.global.start, col.global.start),
                            (row.global.len, col.global.len),
                        );
                        match (&row.chart, &col.chart) {
                            (None, None) => dest += sub,
                            (Some(dr), None) => dest += dr.tr_mul(&sub),
                            (None, Some(dc)) => dest += sub * dc,
                            (Some(dr), Some(dc)) => dest += dr.tr_mul(&sub) * dc,
                        }
                    }
                }
            }
            Derivative::Sparse(_) => {
                let (mut rows, mut cols) = (Vec::new(), Vec::new());
                local.try_for_each_nonzero(|i, j, v| {
                    spread_column(blocks, i, &mut rows);
                    spread_column(blocks, j, &mut cols);
                    for &(gi, ci) in &rows {
                        for &(gj, cj) in &cols {
                            target[(gi, gj)] += v * ci * cj;
                        }
                    }
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}

impl<T: Scalar> ScatterStrategy<T> for SparseScatter<T> {
    fn representation(&self) -> Representation {
        Representation::Sparse
    }

    fn scatter_jacobian(
        &self,
        blocks: &[ColumnBlock<T>],
        local: &Derivative<T>,
        global: &mut Derivative<T>,
    ) -> Result<()> {
        check_jacobian(blocks, local, global)?;
        let Derivative::Sparse(existing) = &*global else {
            return Err(target_mismatch(Representation::Sparse));
        };
        let mut coo = CooMatrix::new(global.nrows(), global.ncols());
        coo.extend_from_csr(T::one(), existing);
        let mut spread = Vec::new();
        local.try_for_each_nonzero(|i, j, v| {
            spread_column(blocks, j, &mut spread);
            for &(g, c) in &spread {
                coo.push(i, g, v * c)?;
            }
            Ok(())
        })?;
        global.assign_from_coo(&coo, self.tolerance)
    }

    fn scatter_hessian(
        &self,
        blocks: &[ColumnBlock<T>],
        local: &Derivative<T>,
        global: &mut Derivative<T>,
    ) -> Result<()> {
        check_hessian(blocks, local, global)?;
        let Derivative::Sparse(existing) = &*global else {
            return Err(target_mismatch(Representation::Sparse));
        };
        let mut coo = CooMatrix::new(global.nrows(), global.ncols());
        coo.extend_from_csr(T::one(), existing);
        let (mut rows, mut cols) = (Vec::new(), Vec::new());
        local.try_for_each_nonzero(|i, j, v| {
            spread_column(blocks, i, &mut rows);
            spread_column(blocks, j, &mut cols);
            for &(gi, ci) in &rows {
                for &(gj, cj) in &cols {
                    coo.push(gi, gj, v * ci * cj)?;
                }
            }
            Ok(())
        })?;
        global.assign_from_coo(&coo, self.tolerance)
    }
}

/// Global columns (with coefficients) that local column `col` feeds.
fn spread_column<T: Scalar>(blocks: &[ColumnBlock<T>], col: usize, out: &mut Vec<(usize, T)>) {
    out.clear();
    let index = blocks.partition_point(|b| b.local.end() <= col);
    let Some(block) = blocks.get(index) else {
        return;
    };
    let offset = col - block.local.start;
    match &block.chart {
        Some(d) => out.extend(
            (0..block.global.len)
                .map(|k| (block.global.start + k, d[(offset, k)]))
                .filter(|&(_, c)| c != T::zero()),
        ),
        None => out.push((block.global.start + offset, T::one())),
    }
}

fn local_width<T: Scalar>(blocks: &[ColumnBlock<T>]) -> usize {
    blocks.last().map_or(0, |b| b.local.end())
}

fn check_jacobian<T: Scalar>(
    blocks: &[ColumnBlock<T>],
    local: &Derivative<T>,
    global: &Derivative<T>,
) -> Result<()> {
    local.check_shape("local jacobian", global.nrows(), local_width(blocks))
}

fn check_hessian<T: Scalar>(
    blocks: &[ColumnBlock<T>],
    local: &Derivative<T>,
    global: &Derivative<T>,
) -> Result<()> {
    let width = local_width(blocks);
    local.check_shape("local hessian", width, width)?;
    if global.nrows() != global.ncols() {
        return Err(MapError::dimension_mismatch(
            "global hessian",
            format!("{0}x{0}", global.nrows()),
            format!("{}x{}", global.nrows(), global.ncols()),
        ));
    }
    Ok(())
}

fn target_mismatch(expected: Representation) -> MapError {
    let actual = match expected {
        Representation::Dense => Representation::Sparse,
        Representation::Sparse => Representation::Dense,
    };
    MapError::RepresentationMismatch {
        function: "scatter target".to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Dense matrix of the whole column map.
#[cfg(test)]
fn pulled_back_dense<T: Scalar>(
    blocks: &[ColumnBlock<T>],
    global_width: usize,
) -> manimap_core::types::DMatrix<T> {
    let mut p = manimap_core::types::DMatrix::zeros(local_width(blocks), global_width);
    let mut spread = Vec::new();
    for col in 0..local_width(blocks) {
        spread_column(blocks, col, &mut spread);
        for &(g, c) in &spread {
            p[(col, g)] = c;
        }
    }
    p
}
