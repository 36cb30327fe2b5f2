use crate::traits::{FloatScalar, MatrixRef};

/// Solve `R·x = b` in place by back substitution, `R` upper triangular.
///
/// Only the upper triangle of `r` is read. A zero pivot is divided
/// through (IEEE `inf`/`NaN`); rank deficiency is the caller's concern.
pub fn solve_upper_in_place<T: FloatScalar>(r: &impl MatrixRef<T>, b: &mut [T]) {
    let n = r.nrows();
    assert_eq!(n, r.ncols(), "triangular solve requires a square matrix");
    assert_eq!(b.len(), n, "triangular solve: rhs length mismatch");
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum = sum - *r.get(i, j) * b[j];
        }
        b[i] = sum / *r.get(i, i);
    }
}

/// Solve `Rᵀ·x = b` in place by forward substitution, `R` upper triangular.
pub fn solve_upper_transpose_in_place<T: FloatScalar>(r: &impl MatrixRef<T>, b: &mut [T]) {
    let n = r.nrows();
    assert_eq!(n, r.ncols(), "triangular solve requires a square matrix");
    assert_eq!(b.len(), n, "triangular solve: rhs length mismatch");
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum = sum - *r.get(j, i) * b[j];
        }
        b[i] = sum / *r.get(i, i);
    }
}
