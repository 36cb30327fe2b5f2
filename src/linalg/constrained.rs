use alloc::vec;
use alloc::vec::Vec;

use crate::traits::{FloatScalar, MatrixMut};

/// Precision of one eliminated direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precision<T> {
    /// A hard constraint pinned this direction.
    Infinite,
    /// Accumulated `Σ aᵢ²/σᵢ²` over the noisy rows.
    Finite(T),
}

impl<T: FloatScalar> Precision<T> {
    pub fn is_infinite(&self) -> bool {
        matches!(self, Precision::Infinite)
    }
}

/// One row produced by weighted Gram-Schmidt.
///
/// `rd` spans every column of the augmented matrix; entries before `col`
/// are zero and `rd[col] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRow<T> {
    pub col: usize,
    pub rd: Vec<T>,
    pub precision: Precision<T>,
}

/// Weighted pseudo-inverse of a single column `a`.
///
/// Rows with `sigmas[i] == 0` carry infinite weight: the first of them with
/// `|a[i]| >= zero_tol` wins outright and yields `pseudo = eᵢ / a[i]`.
/// Otherwise `precision = Σ aᵢ²/σᵢ²` over rows with `|a[i]| >= zero_tol` and
/// `pseudo = (a / σ²) / precision`. Below `rank_tol` the column carries no
/// information and `pseudo` is left zero.
pub fn weighted_pseudoinverse<T: FloatScalar>(
    a: &[T],
    sigmas: &[T],
    zero_tol: T,
    rank_tol: T,
    pseudo: &mut [T],
) -> Precision<T> {
    assert_eq!(a.len(), sigmas.len(), "pseudo-inverse: sigma count mismatch");
    assert_eq!(a.len(), pseudo.len(), "pseudo-inverse: output length mismatch");
    pseudo.iter_mut().for_each(|p| *p = T::zero());

    for (i, (&ai, &si)) in a.iter().zip(sigmas).enumerate() {
        if si == T::zero() && ai.abs() >= zero_tol {
            pseudo[i] = T::one() / ai;
            return Precision::Infinite;
        }
    }

    let mut precision = T::zero();
    for (&ai, &si) in a.iter().zip(sigmas) {
        if si > T::zero() && ai.abs() >= zero_tol {
            precision = precision + ai * ai / (si * si);
        }
    }
    if precision < rank_tol {
        return Precision::Finite(precision);
    }
    for ((p, &ai), &si) in pseudo.iter_mut().zip(a).zip(sigmas) {
        if si > T::zero() && ai.abs() >= zero_tol {
            *p = ai / (si * si) / precision;
        }
    }
    Precision::Finite(precision)
}

/// Weighted Gram-Schmidt over the first `reduce_cols` columns of `ab`.
///
/// `ab` is the unwhitened augmented matrix; `sigmas` has one entry per row,
/// zero marking a hard constraint. Each eliminated column yields a
/// [`WeightedRow`] expressing that variable in terms of the later columns,
/// after which its contribution is subtracted from every later column.
/// Columns carrying no information (`precision < rank_tol`) are skipped, and
/// at most `min(rows, reduce_cols)` rows are produced.
///
/// `ab` is consumed as workspace.
pub fn weighted_gram_schmidt<T: FloatScalar>(
    ab: &mut impl MatrixMut<T>,
    sigmas: &[T],
    reduce_cols: usize,
    zero_tol: T,
    rank_tol: T,
) -> Vec<WeightedRow<T>> {
    let m = ab.nrows();
    let n = ab.ncols();
    assert_eq!(sigmas.len(), m, "one sigma per row required");
    assert!(reduce_cols <= n, "cannot reduce {} of {} columns", reduce_cols, n);

    let max_rank = m.min(reduce_cols);
    let mut rows = Vec::with_capacity(max_rank);
    let mut a = vec![T::zero(); m];
    let mut pseudo = vec![T::zero(); m];

    for j in 0..reduce_cols {
        if rows.len() >= max_rank {
            break;
        }
        for (i, ai) in a.iter_mut().enumerate() {
            *ai = *ab.get(i, j);
        }
        let precision = weighted_pseudoinverse(&a, sigmas, zero_tol, rank_tol, &mut pseudo);
        if let Precision::Finite(p) = precision {
            if p < rank_tol {
                continue;
            }
        }

        let mut rd = vec![T::zero(); n];
        rd[j] = T::one();
        for (k, rdk) in rd.iter_mut().enumerate().skip(j + 1) {
            let mut dot = T::zero();
            for (i, &pi) in pseudo.iter().enumerate() {
                dot = dot + pi * *ab.get(i, k);
            }
            *rdk = dot;
        }

        for k in (j + 1)..n {
            let rk = rd[k];
            if rk == T::zero() {
                continue;
            }
            for (i, &ai) in a.iter().enumerate() {
                let old = *ab.get(i, k);
                *ab.get_mut(i, k) = old - ai * rk;
            }
        }

        rows.push(WeightedRow { col: j, rd, precision });
    }
    rows
}
