use core::ops::{Add, Mul, Neg, Sub};

use crate::traits::Scalar;

use super::{DynMatrix, DynVector};

// ── Element-wise addition / subtraction ─────────────────────────────

impl<T: Scalar> Add<&DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn add(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            (self.nrows, self.ncols),
            (rhs.nrows, rhs.ncols),
            "dimension mismatch: {}x{} + {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let data = self
            .data
            .iter()
            .zip(rhs.data.iter())
            .map(|(&a, &b)| a + b)
            .collect();
        DynMatrix {
            data,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar> Sub<&DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn sub(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            (self.nrows, self.ncols),
            (rhs.nrows, rhs.ncols),
            "dimension mismatch: {}x{} - {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let data = self
            .data
            .iter()
            .zip(rhs.data.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        DynMatrix {
            data,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar + Neg<Output = T>> Neg for &DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn neg(self) -> DynMatrix<T> {
        DynMatrix {
            data: self.data.iter().map(|&a| -a).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

// ── Scalar multiplication ───────────────────────────────────────────

impl<T: Scalar> Mul<T> for &DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn mul(self, s: T) -> DynMatrix<T> {
        DynMatrix {
            data: self.data.iter().map(|&a| a * s).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

// ── Matrix multiplication ───────────────────────────────────────────

impl<T: Scalar> Mul<&DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    /// `(M x K) * (K x N)`, accumulated column by column.
    fn mul(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let mut out = DynMatrix::zeros(self.nrows, rhs.ncols);
        for j in 0..rhs.ncols {
            for k in 0..self.ncols {
                let b = rhs[(k, j)];
                if b == T::zero() {
                    continue;
                }
                let a_col = self.col_slice(k, 0);
                let out_col = out.col_slice_mut(j, 0);
                for (o, &a) in out_col.iter_mut().zip(a_col) {
                    *o = *o + a * b;
                }
            }
        }
        out
    }
}

// ── Vectors ─────────────────────────────────────────────────────────

impl<T: Scalar> Add<&DynVector<T>> for &DynVector<T> {
    type Output = DynVector<T>;
    fn add(self, rhs: &DynVector<T>) -> DynVector<T> {
        assert_eq!(self.len(), rhs.len(), "vector length mismatch");
        self.iter().zip(rhs.iter()).map(|(&a, &b)| a + b).collect()
    }
}

impl<T: Scalar> Sub<&DynVector<T>> for &DynVector<T> {
    type Output = DynVector<T>;
    fn sub(self, rhs: &DynVector<T>) -> DynVector<T> {
        assert_eq!(self.len(), rhs.len(), "vector length mismatch");
        self.iter().zip(rhs.iter()).map(|(&a, &b)| a - b).collect()
    }
}

impl<T: Scalar + Neg<Output = T>> Neg for &DynVector<T> {
    type Output = DynVector<T>;
    fn neg(self) -> DynVector<T> {
        self.iter().map(|&a| -a).collect()
    }
}
