use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::dynmatrix::VerticalBlockMatrix;
use crate::error::InferenceError;
use crate::linalg::cholesky_upper_semidefinite;
use crate::ordering::Key;
use crate::traits::{FloatScalar, MatrixRef};
use crate::values::VectorValues;
use crate::{DynMatrix, DynVector};

use super::JacobianFactor;

/// A Gaussian factor in information form.
///
/// Holds the augmented information matrix
///
/// ```text
/// [ G   g ]
/// [ gᵀ  f ]
/// ```
///
/// over its keys, representing `0.5·(xᵀGx − 2xᵀg + f)`. Column blocks follow
/// the key order with one trailing column for `g`/`f`.
#[derive(Debug, Clone, PartialEq)]
pub struct HessianFactor<T> {
    keys: Vec<Key>,
    info: VerticalBlockMatrix<T>,
}

impl<T: FloatScalar> HessianFactor<T> {
    /// Build from `G`, `g`, and `f` with the given per-key dimensions.
    pub fn new(
        keys: Vec<Key>,
        dims: &[usize],
        g_mat: &DynMatrix<T>,
        g_vec: &DynVector<T>,
        f: T,
    ) -> Result<Self, InferenceError> {
        if keys.len() != dims.len() {
            return Err(InferenceError::RowMismatch {
                expected: keys.len(),
                got: dims.len(),
            });
        }
        let mut seen = BTreeSet::new();
        if let Some(&dup) = keys.iter().find(|&&k| !seen.insert(k)) {
            return Err(InferenceError::DuplicateKey(dup));
        }
        let n: usize = dims.iter().sum();
        if g_mat.nrows() != n || g_mat.ncols() != n {
            return Err(InferenceError::RowMismatch {
                expected: n,
                got: g_mat.nrows(),
            });
        }
        if g_vec.len() != n {
            return Err(InferenceError::RowMismatch {
                expected: n,
                got: g_vec.len(),
            });
        }

        let mut block_dims = dims.to_vec();
        block_dims.push(1);
        let mut info = VerticalBlockMatrix::zeros(&block_dims, n + 1);
        let full = info.full_mut();
        full.set_block(0, 0, g_mat);
        for (i, &gi) in g_vec.iter().enumerate() {
            full[(i, n)] = gi;
            full[(n, i)] = gi;
        }
        full[(n, n)] = f;
        Ok(Self { keys, info })
    }

    /// Information form of a Jacobian factor (whitened).
    ///
    /// A zero-sigma row has infinite weight, so a factor carrying hard
    /// constraints is rejected rather than softened.
    pub fn from_jacobian(factor: &JacobianFactor<T>) -> Result<Self, InferenceError> {
        if factor.model().is_some_and(|m| m.is_constrained()) {
            return Err(InferenceError::ConstrainedInformation(factor.keys().to_vec()));
        }
        let info = VerticalBlockMatrix::from_matrix(factor.augmented_information(), &factor.block_dims());
        Ok(Self {
            keys: factor.keys().to_vec(),
            info,
        })
    }

    fn n(&self) -> usize {
        self.info.offset(self.keys.len())
    }

    /// Information matrix `G`.
    pub fn information(&self) -> DynMatrix<T> {
        let n = self.n();
        self.info.full().block(0, 0, n, n)
    }

    /// Linear term `g`.
    pub fn linear_term(&self) -> DynVector<T> {
        let n = self.n();
        DynVector::from_slice(&self.info.full().col_slice(n, 0)[..n])
    }

    /// Constant term `f`.
    pub fn constant_term(&self) -> T {
        let n = self.n();
        self.info.full()[(n, n)]
    }

    /// The full augmented matrix `[G g; gᵀ f]`.
    pub fn augmented_information(&self) -> DynMatrix<T> {
        self.info.full().clone()
    }

    /// Stack the values of the factor's keys into one vector.
    fn stacked(&self, x: &VectorValues<T>) -> Result<DynVector<T>, InferenceError> {
        let mut parts = Vec::with_capacity(self.keys.len());
        for (pos, &k) in self.keys.iter().enumerate() {
            let xk = x.at(k)?;
            let d = self.info.block_width(pos);
            if xk.len() != d {
                return Err(InferenceError::DimensionMismatch {
                    key: k,
                    expected: d,
                    got: xk.len(),
                });
            }
            parts.push(xk);
        }
        Ok(DynVector::concat(&parts))
    }

    /// `0.5·(xᵀGx − 2xᵀg + f)`.
    pub fn error(&self, x: &VectorValues<T>) -> Result<T, InferenceError> {
        let xs = self.stacked(x)?;
        let gx = self.information().mul_vec(xs.as_slice());
        let two = T::one() + T::one();
        let quad = xs.dot(&gx) - two * xs.dot(&self.linear_term()) + self.constant_term();
        Ok(T::half() * quad)
    }

    /// `grad += G·x − g`, scattered per key.
    pub fn gradient_add(&self, x: &VectorValues<T>, grad: &mut VectorValues<T>) -> Result<(), InferenceError> {
        let xs = self.stacked(x)?;
        let mut gx = self.information().mul_vec(xs.as_slice());
        gx.axpy(-T::one(), &self.linear_term());
        for (pos, &k) in self.keys.iter().enumerate() {
            let range = self.info.block_range(pos);
            let part = DynVector::from_slice(&gx.as_slice()[range]);
            match grad.get_mut(k) {
                Some(gk) => gk.axpy(T::one(), &part),
                None => {
                    grad.insert(k, part);
                }
            }
        }
        Ok(())
    }

    /// Square-root form `‖R·x − d‖²` with `RᵀR = G` and `Rᵀd = g`.
    ///
    /// Directions the information matrix does not constrain give zero rows.
    /// The constant term is not carried: the result's error differs from
    /// this factor's by a constant.
    pub fn to_jacobian(&self) -> JacobianFactor<T> {
        let n = self.n();
        let g = self.information();
        let r = cholesky_upper_semidefinite(&g, rank_tolerance::<T>(n));

        // Forward solve Rᵀd = g, skipping zero pivots.
        let mut d = self.linear_term().as_slice().to_vec();
        for i in 0..n {
            let rii = r[(i, i)];
            if rii == T::zero() {
                d[i] = T::zero();
                continue;
            }
            let mut sum = d[i];
            for j in 0..i {
                sum = sum - *r.get(j, i) * d[j];
            }
            d[i] = sum / rii;
        }

        let block_dims: Vec<usize> = (0..self.info.nblocks()).map(|i| self.info.block_width(i)).collect();
        let mut ab = VerticalBlockMatrix::zeros(&block_dims, n);
        ab.full_mut().set_block(0, 0, &r);
        ab.set_column_block(self.keys.len(), 0, &d);
        JacobianFactor::from_parts(self.keys.clone(), ab, None)
    }
}

impl<T> HessianFactor<T> {
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// `(key, dim)` pairs in factor order.
    pub fn dims(&self) -> impl Iterator<Item = (Key, usize)> + '_ {
        self.keys.iter().enumerate().map(|(pos, &k)| (k, self.info.block_width(pos)))
    }
}

fn rank_tolerance<T: FloatScalar>(n: usize) -> T {
    let scale = <T as num_traits::NumCast>::from(16 * n.max(1)).unwrap_or_else(T::one);
    T::epsilon() * scale
}
