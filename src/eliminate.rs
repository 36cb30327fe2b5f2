//! The elimination step: factors in, one conditional and one residual out.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::conditional::GaussianConditional;
use crate::dynmatrix::VerticalBlockMatrix;
use crate::error::InferenceError;
use crate::factor::JacobianFactor;
use crate::linalg::{householder_triangularize, weighted_gram_schmidt, Precision};
use crate::noise::NoiseModel;
use crate::ordering::Key;
use crate::traits::{FloatScalar, MatrixRef};

/// Tolerances and policy for [`eliminate_qr`].
#[derive(Debug, Clone, Copy)]
pub struct EliminationSettings<T> {
    /// Coefficients below this magnitude cannot pivot a hard constraint and
    /// are ignored when accumulating precision.
    pub zero_tol: T,
    /// Columns whose accumulated precision `Σ a²/σ²` falls below this carry
    /// no information and produce no row (constraint rows only).
    pub rank_tol: T,
    /// Accept frontal variables whose stacked column block is all zero,
    /// leaving a zero diagonal instead of failing.
    pub allow_free_variables: bool,
}

impl Default for EliminationSettings<f64> {
    fn default() -> Self {
        Self {
            zero_tol: 1e-9,
            rank_tol: 1e-8,
            allow_free_variables: false,
        }
    }
}

impl Default for EliminationSettings<f32> {
    fn default() -> Self {
        Self {
            zero_tol: 1e-5,
            rank_tol: 1e-4,
            allow_free_variables: false,
        }
    }
}

/// Output of one elimination step.
#[derive(Debug, Clone)]
pub struct EliminationResult<T> {
    /// Density of the frontal variables given the parents.
    pub conditional: Arc<GaussianConditional<T>>,
    /// What the eliminated factors still say about the parents.
    pub remaining: JacobianFactor<T>,
}

/// One row of the reduced augmented matrix, spanning every column.
struct ReducedRow<T> {
    pivot: usize,
    values: Vec<T>,
    sigma: T,
}

/// Eliminate `frontals` from `factors` by QR.
///
/// The factors are stacked into `[A_frontals | A_parents | b]` with the
/// frontal columns first, in the requested order, and the parents after
/// them in order of first appearance. The stack is then reduced:
///
/// - without hard-constraint rows, rows are whitened and Householder
///   reflections triangularize every column. The conditional has a unit
///   noise model and the residual has none;
/// - with hard-constraint rows, weighted Gram-Schmidt eliminates column by
///   column. A constraint row with a usable coefficient takes the pivot and
///   keeps sigma 0 (the first such row wins); otherwise the noisy rows are
///   combined and the result scaled to unit sigma.
///
/// `R` always has a non-negative diagonal. If the frontal block has lower
/// rank than its width, zero rows with unit sigma fill the gaps, so the
/// deficiency shows up as zero diagonal entries.
///
/// # Errors
///
/// [`NoFrontals`](InferenceError::NoFrontals), [`DuplicateKey`](InferenceError::DuplicateKey),
/// [`UnknownVariable`](InferenceError::UnknownVariable) for a frontal no factor
/// touches, [`DimensionMismatch`](InferenceError::DimensionMismatch) for
/// inconsistent block widths, and [`ZeroFrontalBlock`](InferenceError::ZeroFrontalBlock)
/// unless `settings.allow_free_variables` is set.
///
/// # Example
///
/// ```
/// use gaussian_inference::{eliminate_qr, DynMatrix, DynVector, EliminationSettings, JacobianFactor};
///
/// // x1 = 1, x2 - x1 = 1
/// let prior = JacobianFactor::unary(1, DynMatrix::eye(1), DynVector::from_slice(&[1.0]), None).unwrap();
/// let odom = JacobianFactor::binary(
///     1, DynMatrix::from_rows(1, 1, &[-1.0]),
///     2, DynMatrix::eye(1),
///     DynVector::from_slice(&[1.0]),
///     None,
/// ).unwrap();
///
/// let out = eliminate_qr(&[&prior, &odom], &[1], &EliminationSettings::default()).unwrap();
/// assert_eq!(out.conditional.frontals(), &[1]);
/// assert_eq!(out.conditional.parents(), &[2]);
/// assert_eq!(out.remaining.keys(), &[2]);
/// assert!(out.conditional.r()[(0, 0)] > 0.0);
/// ```
pub fn eliminate_qr<T: FloatScalar>(
    factors: &[&JacobianFactor<T>],
    frontals: &[Key],
    settings: &EliminationSettings<T>,
) -> Result<EliminationResult<T>, InferenceError> {
    if frontals.is_empty() {
        return Err(InferenceError::NoFrontals);
    }
    let combined = JacobianFactor::combine(factors, frontals)?;

    let nf = frontals.len();
    if !settings.allow_free_variables {
        for (pos, &key) in frontals.iter().enumerate() {
            if combined.a(pos).is_zero() {
                return Err(InferenceError::ZeroFrontalBlock(key));
            }
        }
    }

    let ab = combined.ab();
    let fd = ab.offset(nf);
    let n = ab.offset(combined.keys().len());
    let constrained = combined.model().is_some_and(|m| m.is_constrained());

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "eliminating {:?} from {} factors: {} rows, {} frontal columns, {} parent columns, constrained = {}",
        frontals,
        factors.len(),
        combined.rows(),
        fd,
        n - fd,
        constrained
    );

    let rows = if constrained {
        reduce_constrained(&combined, n, settings)
    } else {
        reduce_householder(&combined, n)
    };

    #[cfg(feature = "tracing")]
    tracing::trace!(
        "reduced to {} rows (pivots {:?})",
        rows.len(),
        rows.iter().map(|r| r.pivot).collect::<Vec<_>>()
    );

    Ok(split(&combined, nf, fd, n, rows))
}

fn reduce_householder<T: FloatScalar>(combined: &JacobianFactor<T>, n: usize) -> Vec<ReducedRow<T>> {
    let mut ab = combined.augmented_jacobian(true);
    let pivots = householder_triangularize(&mut ab, n);
    pivots
        .into_iter()
        .enumerate()
        .map(|(i, pivot)| ReducedRow {
            pivot,
            values: (0..ab.ncols()).map(|j| *ab.get(i, j)).collect(),
            sigma: T::one(),
        })
        .collect()
}

fn reduce_constrained<T: FloatScalar>(
    combined: &JacobianFactor<T>,
    n: usize,
    settings: &EliminationSettings<T>,
) -> Vec<ReducedRow<T>> {
    let mut ab = combined.augmented_jacobian(false);
    let sigmas = match combined.model() {
        Some(m) => m.sigmas().to_vec(),
        None => vec![T::one(); combined.rows()],
    };
    weighted_gram_schmidt(&mut ab, &sigmas, n, settings.zero_tol, settings.rank_tol)
        .into_iter()
        .map(|row| match row.precision {
            Precision::Infinite => ReducedRow {
                pivot: row.col,
                values: row.rd,
                sigma: T::zero(),
            },
            Precision::Finite(p) => {
                let scale = p.sqrt();
                ReducedRow {
                    pivot: row.col,
                    values: row.rd.into_iter().map(|v| v * scale).collect(),
                    sigma: T::one(),
                }
            }
        })
        .collect()
}

/// Split reduced rows into the conditional (pivots among the frontal
/// columns) and the residual (pivots among the parent columns).
fn split<T: FloatScalar>(
    combined: &JacobianFactor<T>,
    nf: usize,
    fd: usize,
    n: usize,
    rows: Vec<ReducedRow<T>>,
) -> EliminationResult<T> {
    let keys = combined.keys().to_vec();
    let block_dims = combined.block_dims();

    let mut rsd = VerticalBlockMatrix::zeros(&block_dims, fd);
    let mut cond_sigmas = vec![T::one(); fd];
    let mut residual_rows = Vec::new();
    for row in rows {
        if row.pivot < fd {
            let dst = rsd.full_mut();
            for (j, &v) in row.values.iter().enumerate().skip(row.pivot) {
                dst[(row.pivot, j)] = v;
            }
            cond_sigmas[row.pivot] = row.sigma;
        } else {
            residual_rows.push(row);
        }
    }

    let mut residual = VerticalBlockMatrix::zeros(&block_dims[nf..], residual_rows.len());
    let mut residual_sigmas = Vec::with_capacity(residual_rows.len());
    {
        let dst = residual.full_mut();
        for (i, row) in residual_rows.iter().enumerate() {
            for (j, &v) in row.values[fd..=n].iter().enumerate() {
                dst[(i, j)] = v;
            }
            residual_sigmas.push(row.sigma);
        }
    }
    let residual_model = residual_sigmas
        .iter()
        .any(|&s| s == T::zero())
        .then(|| NoiseModel::mixed(residual_sigmas));

    let parents = keys[nf..].to_vec();
    let conditional = GaussianConditional::from_parts_unchecked(keys, nf, rsd, NoiseModel::diagonal(cond_sigmas));
    EliminationResult {
        conditional: Arc::new(conditional),
        remaining: JacobianFactor::from_parts(parents, residual, residual_model),
    }
}
