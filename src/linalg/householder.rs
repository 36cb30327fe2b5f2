use alloc::vec::Vec;

use crate::traits::{FloatScalar, MatrixMut};

/// Householder reduction of an augmented system `[A | b]` to row-echelon form, in place.
///
/// Walks the leading `reduce_cols` columns of `ab`, applying reflections
/// `H = I - tau * v * vᵀ` to every trailing column (remaining blocks and the
/// RHS), so the whitened row space and the residual norm are preserved.
/// A column that is already zero on the unreduced rows is skipped without
/// consuming a row.
///
/// Returns the pivot column of each reduced row: row `i` is zero left of
/// `pivots[i]`, its pivot entry is non-negative (rows whose reflection left
/// a negative pivot are negated, which is itself orthogonal), and everything
/// below it in that column is exactly zero. Rows past `pivots.len()` hold
/// zeros over the reduced columns.
///
/// Rank deficiency is reported through the pivots and their magnitudes,
/// never through an error.
pub fn householder_triangularize<T: FloatScalar>(ab: &mut impl MatrixMut<T>, reduce_cols: usize) -> Vec<usize> {
    let m = ab.nrows();
    let n = ab.ncols();
    assert!(reduce_cols <= n, "cannot reduce {} of {} columns", reduce_cols, n);

    let mut pivots = Vec::with_capacity(m.min(reduce_cols));
    for col in 0..reduce_cols {
        let row = pivots.len();
        if row >= m {
            break;
        }

        let mut norm_sq = T::zero();
        for i in row..m {
            let v = *ab.get(i, col);
            norm_sq = norm_sq + v * v;
        }
        if norm_sq == T::zero() {
            continue;
        }

        let norm = norm_sq.sqrt();
        let a_pivot = *ab.get(row, col);

        // sigma = sign(a) * ||x|| so that v0 = a + sigma avoids cancellation.
        let sigma = if a_pivot < T::zero() { -norm } else { norm };
        let v0 = a_pivot + sigma;
        let tau = v0 / sigma;

        // Store v = [1, a[row+1,col]/v0, ...] below the pivot.
        for i in (row + 1)..m {
            let val = *ab.get(i, col) / v0;
            *ab.get_mut(i, col) = val;
        }

        // A[row:m, j] -= tau * v * (vᵀ A[row:m, j]) for the trailing columns.
        for j in (col + 1)..n {
            let mut dot = *ab.get(row, j);
            for i in (row + 1)..m {
                dot = dot + *ab.get(i, col) * *ab.get(i, j);
            }
            dot = dot * tau;

            *ab.get_mut(row, j) = *ab.get(row, j) - dot;
            for i in (row + 1)..m {
                let vi = *ab.get(i, col);
                let old = *ab.get(i, j);
                *ab.get_mut(i, j) = old - dot * vi;
            }
        }

        *ab.get_mut(row, col) = -sigma;
        for i in (row + 1)..m {
            *ab.get_mut(i, col) = T::zero();
        }
        pivots.push(col);
    }

    for (row, &col) in pivots.iter().enumerate() {
        if *ab.get(row, col) < T::zero() {
            for j in col..n {
                let v = *ab.get(row, j);
                *ab.get_mut(row, j) = -v;
            }
        }
    }
    pivots
}
