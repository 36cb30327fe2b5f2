use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec::Vec;

use crate::dynmatrix::{BlockView, VerticalBlockMatrix};
use crate::error::InferenceError;
use crate::factor::JacobianFactor;
use crate::linalg::{solve_upper_in_place, solve_upper_transpose_in_place};
use crate::noise::NoiseModel;
use crate::ordering::Key;
use crate::traits::{FloatScalar, MatrixRef};
use crate::values::VectorValues;
use crate::{DynMatrix, DynVector};

/// Gaussian density of some frontal variables given their parents:
/// `R·x_f + Σ Sᵢ·x_pᵢ = d`.
///
/// Stored as one block matrix `[R S₁ … Sₖ | d]` whose rows are the frontal
/// rows, plus one sigma per row (zero for hard-constraint rows). `R` is
/// square and upper triangular. Conditionals are immutable; operations
/// that change one build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianConditional<T> {
    keys: Vec<Key>,
    nr_frontals: usize,
    rsd: VerticalBlockMatrix<T>,
    model: NoiseModel<T>,
}

impl<T: FloatScalar> GaussianConditional<T> {
    /// Single frontal variable with optional parents.
    ///
    /// `model` defaults to unit sigmas.
    ///
    /// ```
    /// use gaussian_inference::{DynMatrix, DynVector, GaussianConditional};
    ///
    /// let c = GaussianConditional::new(
    ///     1,
    ///     DynVector::from_slice(&[1.0, 2.0]),
    ///     DynMatrix::eye(2),
    ///     vec![],
    ///     None,
    /// )
    /// .unwrap();
    /// assert_eq!(c.rows(), 2);
    /// assert!(c.parents().is_empty());
    /// ```
    pub fn new(
        frontal: Key,
        d: DynVector<T>,
        r: DynMatrix<T>,
        parents: Vec<(Key, DynMatrix<T>)>,
        model: Option<NoiseModel<T>>,
    ) -> Result<Self, InferenceError> {
        let rows = d.len();
        let mut terms = Vec::with_capacity(parents.len() + 1);
        terms.push((frontal, r));
        terms.extend(parents);
        let model = model.unwrap_or_else(|| NoiseModel::unit(rows));
        let factor = JacobianFactor::new(terms, d, None)?;
        let keys = factor.keys().to_vec();
        let rsd = factor.ab().clone();
        Self::from_parts(keys, 1, rsd, model)
    }

    /// Assemble from keys (frontals first), the frontal count, `[R S | d]`,
    /// and per-row sigmas. Checks that `R` is square and upper triangular
    /// and that the blocks match the keys.
    pub fn from_parts(
        keys: Vec<Key>,
        nr_frontals: usize,
        rsd: VerticalBlockMatrix<T>,
        model: NoiseModel<T>,
    ) -> Result<Self, InferenceError> {
        if rsd.nblocks() != keys.len() + 1 || rsd.block_width(keys.len()) != 1 {
            return Err(InferenceError::InvalidConditional(format!(
                "{} keys need {} blocks plus one RHS column, got {} blocks",
                keys.len(),
                keys.len(),
                rsd.nblocks()
            )));
        }
        if nr_frontals > keys.len() {
            return Err(InferenceError::InvalidConditional(format!(
                "{} frontals but only {} keys",
                nr_frontals,
                keys.len()
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(&dup) = keys.iter().find(|&&k| !seen.insert(k)) {
            return Err(InferenceError::DuplicateKey(dup));
        }
        let fd = rsd.offset(nr_frontals);
        if fd != rsd.rows() {
            return Err(InferenceError::InvalidConditional(format!(
                "R must be square: {} rows, {} frontal columns",
                rsd.rows(),
                fd
            )));
        }
        if model.dim() != rsd.rows() {
            return Err(InferenceError::RowMismatch {
                expected: rsd.rows(),
                got: model.dim(),
            });
        }
        let full = rsd.full();
        for j in 0..fd {
            for i in (j + 1)..fd {
                if full[(i, j)] != T::zero() {
                    return Err(InferenceError::InvalidConditional(format!(
                        "R is not upper triangular at ({}, {})",
                        i, j
                    )));
                }
            }
        }
        Ok(Self::from_parts_unchecked(keys, nr_frontals, rsd, model))
    }

    /// Right-hand side `d`.
    pub fn d(&self) -> DynVector<T> {
        self.rsd.block(self.keys.len()).column(0)
    }

    /// `Σ ln|rᵢᵢ|`; `-inf` when a diagonal entry is zero.
    pub fn log_determinant(&self) -> T {
        let full = self.rsd.full();
        (0..self.rows()).fold(T::zero(), |acc, i| acc + full[(i, i)].abs().ln())
    }

    /// Product of the diagonal of `R`.
    pub fn determinant(&self) -> T {
        let full = self.rsd.full();
        (0..self.rows()).fold(T::one(), |acc, i| acc * full[(i, i)])
    }

    /// Solve for the frontals given the parents already in `x`, and insert them.
    ///
    /// `x_f = R⁻¹(d − Σ Sᵢ·x_pᵢ)`, then each frontal entry is multiplied by
    /// its row sigma (constraint rows use 1).
    pub fn solve_in_place(&self, x: &mut VectorValues<T>) -> Result<(), InferenceError> {
        let rhs = self.d().as_slice().to_vec();
        self.solve_from(rhs, x, true)
    }

    /// `x_f = R⁻¹(rhs_f − Σ Sᵢ·x_pᵢ)`: the frontal entries of `rhs` stand in
    /// for `d`, and no sigma scaling is applied (see
    /// [`scale_frontals_by_sigma`](Self::scale_frontals_by_sigma)).
    pub fn solve_with_rhs(&self, rhs: &VectorValues<T>, x: &mut VectorValues<T>) -> Result<(), InferenceError> {
        let rhs = self.gather(rhs, self.frontals())?;
        self.solve_from(rhs, x, false)
    }

    fn solve_from(&self, mut rhs: Vec<T>, x: &mut VectorValues<T>, scale: bool) -> Result<(), InferenceError> {
        for (i, &parent) in self.parents().iter().enumerate() {
            let pos = self.nr_frontals + i;
            let xp = checked_value(x, parent, self.rsd.block_width(pos))?;
            self.rsd.block(pos).gemv_add(-T::one(), xp.as_slice(), &mut rhs);
        }
        solve_upper_in_place(&self.r(), &mut rhs);
        if scale {
            self.scale_by_sigma(&mut rhs);
        }
        self.scatter(&rhs, x);
        Ok(())
    }

    /// One step of the transposed back-substitution.
    ///
    /// Replaces the frontal entries of `gy` with `R⁻ᵀ·gy_f` and subtracts
    /// `Sᵢᵀ·gy_f` from every parent entry. Parents missing from `gy` are
    /// inserted as zero first.
    pub fn solve_transpose_in_place(&self, gy: &mut VectorValues<T>) -> Result<(), InferenceError> {
        let mut frontal = self.gather(gy, self.frontals())?;
        solve_upper_transpose_in_place(&self.r(), &mut frontal);
        for (i, &parent) in self.parents().iter().enumerate() {
            let pos = self.nr_frontals + i;
            let s = self.rsd.block(pos);
            if gy.get(parent).is_none() {
                gy.insert(parent, DynVector::zeros(s.ncols()));
            }
            if let Some(gp) = gy.get_mut(parent) {
                if gp.len() != s.ncols() {
                    return Err(InferenceError::DimensionMismatch {
                        key: parent,
                        expected: s.ncols(),
                        got: gp.len(),
                    });
                }
                s.gemv_t_add(-T::one(), &frontal, gp.as_mut_slice());
            }
        }
        self.scatter(&frontal, gy);
        Ok(())
    }

    /// Multiply the frontal entries of `gy` by their row sigmas (1 for constraints).
    pub fn scale_frontals_by_sigma(&self, gy: &mut VectorValues<T>) -> Result<(), InferenceError> {
        let mut frontal = self.gather(gy, self.frontals())?;
        self.scale_by_sigma(&mut frontal);
        self.scatter(&frontal, gy);
        Ok(())
    }

    fn scale_by_sigma(&self, stacked: &mut [T]) {
        for (i, v) in stacked.iter_mut().enumerate() {
            let s = self.model.sigma(i);
            if s != T::zero() {
                *v = *v * s;
            }
        }
    }

    /// Equivalent factor `‖(R·x_f + Σ Sᵢ·x_pᵢ − d)/σ‖²`.
    ///
    /// Keeps the noise model unless every sigma is one.
    pub fn to_factor(&self) -> JacobianFactor<T> {
        let model = (!self.model.is_unit()).then(|| self.model.clone());
        JacobianFactor::from_parts(self.keys.clone(), self.rsd.clone(), model)
    }

    /// Concatenate the values of `keys` (frontals or parents) from `x`.
    fn gather(&self, x: &VectorValues<T>, keys: &[Key]) -> Result<Vec<T>, InferenceError> {
        let mut out = Vec::new();
        for &k in keys {
            let pos = self.position(k).ok_or(InferenceError::UnknownVariable(k))?;
            let xk = checked_value(x, k, self.rsd.block_width(pos))?;
            out.extend_from_slice(xk.as_slice());
        }
        Ok(out)
    }

    /// Split a stacked frontal vector back into per-key values.
    fn scatter(&self, stacked: &[T], x: &mut VectorValues<T>) {
        for (pos, &k) in self.frontals().iter().enumerate() {
            let range = self.rsd.block_range(pos);
            x.insert(k, DynVector::from_slice(&stacked[range]));
        }
    }
}

impl<T> GaussianConditional<T> {
    pub(crate) fn from_parts_unchecked(
        keys: Vec<Key>,
        nr_frontals: usize,
        rsd: VerticalBlockMatrix<T>,
        model: NoiseModel<T>,
    ) -> Self {
        debug_assert_eq!(rsd.nblocks(), keys.len() + 1);
        Self {
            keys,
            nr_frontals,
            rsd,
            model,
        }
    }

    /// Frontal keys followed by parent keys.
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[inline]
    pub fn frontals(&self) -> &[Key] {
        &self.keys[..self.nr_frontals]
    }

    #[inline]
    pub fn parents(&self) -> &[Key] {
        &self.keys[self.nr_frontals..]
    }

    #[inline]
    pub fn nr_frontals(&self) -> usize {
        self.nr_frontals
    }

    /// Number of rows, equal to the total frontal dimension.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rsd.rows()
    }

    #[inline]
    pub fn model(&self) -> &NoiseModel<T> {
        &self.model
    }

    /// The whole `[R S | d]` block matrix.
    #[inline]
    pub fn rsd(&self) -> &VerticalBlockMatrix<T> {
        &self.rsd
    }

    /// Upper-triangular frontal block.
    pub fn r(&self) -> BlockView<'_, T> {
        self.rsd.blocks(0, self.nr_frontals)
    }

    /// Block of the `i`-th parent.
    pub fn s(&self, i: usize) -> BlockView<'_, T> {
        self.rsd.block(self.nr_frontals + i)
    }

    pub fn position(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }

    /// Dimension of `key` in this conditional.
    pub fn dim(&self, key: Key) -> Option<usize> {
        self.position(key).map(|pos| self.rsd.block_width(pos))
    }

    /// Whether `key` is one of the frontals.
    pub fn is_frontal(&self, key: Key) -> bool {
        self.frontals().contains(&key)
    }
}

/// `x[key]`, checked against the expected dimension.
pub(crate) fn checked_value<T: FloatScalar>(x: &VectorValues<T>, key: Key, dim: usize) -> Result<&DynVector<T>, InferenceError> {
    let v = x.at(key)?;
    if v.len() != dim {
        return Err(InferenceError::DimensionMismatch {
            key,
            expected: dim,
            got: v.len(),
        });
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
        assert!((a - b).abs() < tol, "{}: {} vs {} (diff {})", msg, a, b, (a - b).abs());
    }

    /// x1 (2-dim) given x2 (1-dim): R = [2 1; 0 4], S = [1; -1], d = [3, 8].
    fn sample() -> GaussianConditional<f64> {
        GaussianConditional::new(
            1,
            DynVector::from_slice(&[3.0, 8.0]),
            DynMatrix::from_rows(2, 2, &[2.0, 1.0, 0.0, 4.0]),
            vec![(2, DynMatrix::from_rows(2, 1, &[1.0, -1.0]))],
            None,
        )
        .unwrap()
    }

    #[test]
    fn structure() {
        let c = sample();
        assert_eq!(c.keys(), &[1, 2]);
        assert_eq!(c.frontals(), &[1]);
        assert_eq!(c.parents(), &[2]);
        assert_eq!(c.rows(), 2);
        assert_eq!(c.dim(2), Some(1));
        assert_eq!(c.s(0)[(1, 0)], -1.0);
        assert_eq!(c.d().as_slice(), &[3.0, 8.0]);
        assert_eq!(c.determinant(), 8.0);
        assert_near(c.log_determinant(), 8.0_f64.ln(), 1e-15, "logdet");
    }

    #[test]
    fn rejects_lower_entries() {
        let mut rsd = VerticalBlockMatrix::zeros(&[2, 1], 2);
        rsd.full_mut()[(1, 0)] = 1.0;
        let err = GaussianConditional::from_parts(vec![1], 1, rsd, NoiseModel::unit(2)).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidConditional(_)));
    }

    #[test]
    fn rejects_non_square_r() {
        let rsd = VerticalBlockMatrix::<f64>::zeros(&[2, 1], 1);
        assert!(GaussianConditional::from_parts(vec![1], 1, rsd, NoiseModel::unit(1)).is_err());
    }

    #[test]
    fn solve_with_parent() {
        let c = sample();
        let mut x = VectorValues::new();
        x.insert(2, DynVector::from_slice(&[4.0]));
        c.solve_in_place(&mut x).unwrap();
        // rhs = [3 - 4, 8 + 4] = [-1, 12]; x1 = [(-1 - 3)/2, 3]
        let x1 = x.at(1).unwrap();
        assert_near(x1[0], -2.0, 1e-15, "x1[0]");
        assert_near(x1[1], 3.0, 1e-15, "x1[1]");
    }

    #[test]
    fn solve_without_parent_fails() {
        let c = sample();
        let mut x = VectorValues::new();
        assert_eq!(c.solve_in_place(&mut x), Err(InferenceError::MissingValue(2)));
    }

    #[test]
    fn solve_scales_by_sigma() {
        let c = GaussianConditional::new(
            5,
            DynVector::from_slice(&[1.0, 2.0]),
            DynMatrix::eye(2),
            vec![],
            Some(NoiseModel::mixed(vec![0.0, 0.5])),
        )
        .unwrap();
        let mut x = VectorValues::new();
        c.solve_in_place(&mut x).unwrap();
        assert_eq!(x.at(5).unwrap().as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn transpose_step() {
        let c = sample();
        let mut gy = VectorValues::new();
        gy.insert(1, DynVector::from_slice(&[2.0, 5.0]));
        c.solve_transpose_in_place(&mut gy).unwrap();
        // Rᵀ y = [2, 5]: y0 = 1, y1 = (5 - 1)/4 = 1; parent -= Sᵀy = 1 - 1 = 0
        assert_eq!(gy.at(1).unwrap().as_slice(), &[1.0, 1.0]);
        assert_eq!(gy.at(2).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn to_factor_drops_unit_model() {
        let c = sample();
        let f = c.to_factor();
        assert!(f.model().is_none());
        assert_eq!(f.keys(), c.keys());

        let mut x = VectorValues::new();
        x.insert(2, DynVector::from_slice(&[4.0]));
        c.solve_in_place(&mut x).unwrap();
        assert_near(f.error(&x).unwrap(), 0.0, 1e-15, "factor error at solution");

        let constrained = GaussianConditional::new(
            1,
            DynVector::from_slice(&[1.0]),
            DynMatrix::eye(1),
            vec![],
            Some(NoiseModel::constrained(1)),
        )
        .unwrap();
        assert!(constrained.to_factor().model().unwrap().is_constrained());
    }
}
