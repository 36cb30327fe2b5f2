use alloc::vec;
use alloc::vec::Vec;

use crate::traits::{FloatScalar, MatrixMut};

/// Per-row Gaussian noise model.
///
/// One standard deviation per scalar row. A sigma of exactly zero marks a
/// hard constraint: the row must hold exactly and is never whitened.
/// Constraint and noisy rows may be mixed freely; the distinction is kept
/// per row.
///
/// ```
/// use gaussian_inference::NoiseModel;
///
/// let model = NoiseModel::mixed(vec![0.0, 0.5]);
/// assert!(model.is_constrained());
/// assert!(model.is_constrained_row(0));
///
/// let mut r = [3.0, 3.0];
/// model.whiten_in_place(&mut r);
/// assert_eq!(r, [3.0, 6.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseModel<T> {
    sigmas: Vec<T>,
}

impl<T: FloatScalar> NoiseModel<T> {
    /// Independent rows with the given standard deviations.
    ///
    /// Panics on a negative or non-finite sigma.
    pub fn diagonal(sigmas: Vec<T>) -> Self {
        for (i, &s) in sigmas.iter().enumerate() {
            assert!(
                s >= T::zero() && s.is_finite(),
                "sigma {} must be finite and non-negative, got {:?}",
                i,
                s,
            );
        }
        Self { sigmas }
    }

    /// Unit weight on every row.
    pub fn unit(dim: usize) -> Self {
        Self {
            sigmas: vec![T::one(); dim],
        }
    }

    /// Same sigma on every row.
    pub fn isotropic(dim: usize, sigma: T) -> Self {
        Self::diagonal(vec![sigma; dim])
    }

    /// Every row is a hard constraint.
    pub fn constrained(dim: usize) -> Self {
        Self {
            sigmas: vec![T::zero(); dim],
        }
    }

    /// Any mix of hard-constraint (zero) and noisy rows.
    pub fn mixed(sigmas: Vec<T>) -> Self {
        Self::diagonal(sigmas)
    }

    /// From per-row precisions `1/σ²`; an infinite precision is a constraint.
    pub fn from_precisions(precisions: &[T]) -> Self {
        let sigmas = precisions
            .iter()
            .map(|&p| {
                if p.is_infinite() {
                    T::zero()
                } else {
                    T::one() / p.sqrt()
                }
            })
            .collect();
        Self::diagonal(sigmas)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.sigmas.len()
    }

    #[inline]
    pub fn sigmas(&self) -> &[T] {
        &self.sigmas
    }

    #[inline]
    pub fn sigma(&self, row: usize) -> T {
        self.sigmas[row]
    }

    #[inline]
    pub fn is_constrained_row(&self, row: usize) -> bool {
        self.sigmas[row] == T::zero()
    }

    /// Whether any row is a hard constraint.
    pub fn is_constrained(&self) -> bool {
        self.sigmas.iter().any(|&s| s == T::zero())
    }

    /// Whether every sigma is exactly one.
    pub fn is_unit(&self) -> bool {
        self.sigmas.iter().all(|&s| s == T::one())
    }

    /// Multiplier applied to row `i` when whitening: `1/σ`, or 1 for constraints.
    #[inline]
    pub fn row_weight(&self, row: usize) -> T {
        let s = self.sigmas[row];
        if s == T::zero() {
            T::one()
        } else {
            T::one() / s
        }
    }

    /// Divide each entry by its row sigma; constraint rows are untouched.
    pub fn whiten_in_place(&self, v: &mut [T]) {
        assert_eq!(v.len(), self.dim(), "whiten: length mismatch");
        for (i, x) in v.iter_mut().enumerate() {
            *x = *x * self.row_weight(i);
        }
    }

    /// Inverse of [`whiten_in_place`](Self::whiten_in_place).
    pub fn unwhiten_in_place(&self, v: &mut [T]) {
        assert_eq!(v.len(), self.dim(), "unwhiten: length mismatch");
        for (x, &s) in v.iter_mut().zip(&self.sigmas) {
            if s != T::zero() {
                *x = *x * s;
            }
        }
    }

    /// Whiten every row of a matrix (one sigma per matrix row).
    pub fn whiten_rows(&self, m: &mut impl MatrixMut<T>) {
        assert_eq!(m.nrows(), self.dim(), "whiten: row count mismatch");
        for i in 0..m.nrows() {
            let w = self.row_weight(i);
            if w == T::one() {
                continue;
            }
            for j in 0..m.ncols() {
                let v = *m.get(i, j);
                *m.get_mut(i, j) = v * w;
            }
        }
    }

    /// Rows `start..start + len` as their own model.
    pub fn rows(&self, start: usize, len: usize) -> Self {
        Self {
            sigmas: self.sigmas[start..start + len].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynMatrix;

    #[test]
    fn constructors() {
        assert!(NoiseModel::<f64>::unit(3).is_unit());
        assert_eq!(NoiseModel::isotropic(2, 0.5).sigmas(), &[0.5, 0.5]);
        assert!(NoiseModel::<f64>::constrained(2).is_constrained_row(1));
        let m = NoiseModel::from_precisions(&[4.0, f64::INFINITY]);
        assert_eq!(m.sigmas(), &[0.5, 0.0]);
        assert!(m.is_constrained());
        assert!(!NoiseModel::isotropic(2, 2.0).is_constrained());
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn negative_sigma_panics() {
        let _ = NoiseModel::diagonal(vec![1.0, -0.1]);
    }

    #[test]
    fn whiten_roundtrip_keeps_constraints() {
        let m = NoiseModel::mixed(vec![0.0, 0.1, 2.0]);
        let mut v: [f64; 3] = [1.0, 1.0, 1.0];
        m.whiten_in_place(&mut v);
        assert_eq!(v[0], 1.0);
        assert!((v[1] - 10.0).abs() < 1e-12);
        assert_eq!(v[2], 0.5);
        m.unwhiten_in_place(&mut v);
        assert!((v[1] - 1.0).abs() < 1e-12);
        assert_eq!(v[2], 1.0);
    }

    #[test]
    fn whiten_matrix_rows() {
        let m = NoiseModel::diagonal(vec![0.5, 0.0]);
        let mut a = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        m.whiten_rows(&mut a);
        assert_eq!(a, DynMatrix::from_rows(2, 2, &[2.0, 4.0, 3.0, 4.0]));
        assert_eq!(m.rows(1, 1).sigmas(), &[0.0]);
    }
}
