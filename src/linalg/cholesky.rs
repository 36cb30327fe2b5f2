use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::DynMatrix;

/// Upper Cholesky factor of a symmetric positive semidefinite matrix.
///
/// Returns `R` with `RᵀR = G`. Pivots at or below
/// `tol · max(1, G[j,j])` are treated as rank deficiency: row `j` of `R`
/// is left zero instead of failing, so an information matrix with
/// unconstrained directions still yields a valid square-root form.
///
/// Only the upper triangle of `g` is read.
pub fn cholesky_upper_semidefinite<T: FloatScalar>(g: &impl MatrixRef<T>, tol: T) -> DynMatrix<T> {
    let n = g.nrows();
    assert_eq!(n, g.ncols(), "Cholesky decomposition requires a square matrix");

    let mut r = DynMatrix::zeros(n, n);
    for j in 0..n {
        let gjj = *g.get(j, j);
        let mut diag = gjj;
        for k in 0..j {
            let rkj = r[(k, j)];
            diag = diag - rkj * rkj;
        }

        let threshold = tol * gjj.abs().max(T::one());
        if diag <= threshold {
            continue;
        }
        let rjj = diag.sqrt();
        r[(j, j)] = rjj;

        let inv_rjj = T::one() / rjj;
        for c in (j + 1)..n {
            let mut sum = *g.get(j, c);
            for k in 0..j {
                sum = sum - r[(k, j)] * r[(k, c)];
            }
            *r.get_mut(j, c) = sum * inv_rjj;
        }
    }
    r
}
