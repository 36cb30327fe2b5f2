use alloc::collections::btree_map::{BTreeMap, Entry};
use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use crate::dynmatrix::{BlockView, VerticalBlockMatrix};
use crate::eliminate::{eliminate_qr, EliminationResult, EliminationSettings};
use crate::error::InferenceError;
use crate::noise::NoiseModel;
use crate::ordering::Key;
use crate::traits::{FloatScalar, MatrixRef};
use crate::values::VectorValues;
use crate::{DynMatrix, DynVector};

/// A linear Gaussian constraint `‖W(A·x − b)‖²` over a few variables.
///
/// Stored as one augmented block matrix `[A₁ … Aₙ | b]`, one column block
/// per key plus the right-hand side. The noise model is optional: `None`
/// means the rows are already whitened (unit weight).
///
/// ```
/// use gaussian_inference::{DynMatrix, DynVector, JacobianFactor, NoiseModel, VectorValues};
///
/// let f = JacobianFactor::unary(
///     1,
///     DynMatrix::eye(2),
///     DynVector::from_slice(&[1.0f64, 2.0]),
///     Some(NoiseModel::isotropic(2, 0.5)),
/// )
/// .unwrap();
///
/// let mut x = VectorValues::new();
/// x.insert(1, DynVector::from_slice(&[1.0, 1.0]));
/// // whitened residual [0, -2]
/// assert!((f.error(&x).unwrap() - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianFactor<T> {
    keys: Vec<Key>,
    ab: VerticalBlockMatrix<T>,
    model: Option<NoiseModel<T>>,
}

impl<T: FloatScalar> JacobianFactor<T> {
    /// Build from `(key, block)` terms, a right-hand side, and an optional model.
    ///
    /// Every block must have `b.len()` rows, keys must be distinct, and the
    /// model (if any) must have one sigma per row.
    pub fn new(
        terms: Vec<(Key, DynMatrix<T>)>,
        b: DynVector<T>,
        model: Option<NoiseModel<T>>,
    ) -> Result<Self, InferenceError> {
        let rows = b.len();
        let mut seen = BTreeSet::new();
        for (key, a) in &terms {
            if !seen.insert(*key) {
                return Err(InferenceError::DuplicateKey(*key));
            }
            if a.nrows() != rows {
                return Err(InferenceError::RowMismatch {
                    expected: rows,
                    got: a.nrows(),
                });
            }
        }
        check_model(&model, rows)?;

        let mut dims: Vec<usize> = terms.iter().map(|(_, a)| a.ncols()).collect();
        dims.push(1);
        let mut ab = VerticalBlockMatrix::zeros(&dims, rows);
        for (i, (_, a)) in terms.iter().enumerate() {
            ab.set_block(i, 0, a);
        }
        ab.set_column_block(terms.len(), 0, b.as_slice());

        Ok(Self {
            keys: terms.into_iter().map(|(k, _)| k).collect(),
            ab,
            model,
        })
    }

    /// A factor with no variables, only a constant right-hand side.
    pub fn from_rhs(b: DynVector<T>) -> Self {
        let rows = b.len();
        let mut ab = VerticalBlockMatrix::zeros(&[1], rows);
        ab.set_column_block(0, 0, b.as_slice());
        Self {
            keys: Vec::new(),
            ab,
            model: None,
        }
    }

    pub fn unary(
        key: Key,
        a: DynMatrix<T>,
        b: DynVector<T>,
        model: Option<NoiseModel<T>>,
    ) -> Result<Self, InferenceError> {
        Self::new(vec![(key, a)], b, model)
    }

    pub fn binary(
        key1: Key,
        a1: DynMatrix<T>,
        key2: Key,
        a2: DynMatrix<T>,
        b: DynVector<T>,
        model: Option<NoiseModel<T>>,
    ) -> Result<Self, InferenceError> {
        Self::new(vec![(key1, a1), (key2, a2)], b, model)
    }

    /// Adopt an already-assembled `[A₁ … Aₙ | b]` block matrix.
    pub fn from_blocks(
        keys: Vec<Key>,
        ab: VerticalBlockMatrix<T>,
        model: Option<NoiseModel<T>>,
    ) -> Result<Self, InferenceError> {
        if ab.nblocks() != keys.len() + 1 || ab.block_width(keys.len()) != 1 {
            return Err(InferenceError::RowMismatch {
                expected: keys.len() + 1,
                got: ab.nblocks(),
            });
        }
        let mut seen = BTreeSet::new();
        if let Some(&dup) = keys.iter().find(|&&k| !seen.insert(k)) {
            return Err(InferenceError::DuplicateKey(dup));
        }
        check_model(&model, ab.rows())?;
        Ok(Self { keys, ab, model })
    }

    /// The zero-row factor over no variables.
    pub fn empty() -> Self {
        Self::from_rhs(DynVector::zeros(0))
    }

    /// Stack several factors into one.
    ///
    /// Variables listed in `ordering` come first, in that order; every other
    /// variable follows in order of first appearance. Rows are stacked in
    /// factor order. Noise models are concatenated, with unit sigmas for
    /// rows of unmodeled factors; the result has no model when no input had one.
    pub fn combine(factors: &[&JacobianFactor<T>], ordering: &[Key]) -> Result<Self, InferenceError> {
        let mut order: Vec<Key> = Vec::with_capacity(ordering.len());
        let mut requested = BTreeSet::new();
        for &k in ordering {
            if !requested.insert(k) {
                return Err(InferenceError::DuplicateKey(k));
            }
            order.push(k);
        }

        let mut dims: BTreeMap<Key, usize> = BTreeMap::new();
        for f in factors {
            for (pos, &k) in f.keys.iter().enumerate() {
                let d = f.ab.block_width(pos);
                match dims.entry(k) {
                    Entry::Occupied(e) => {
                        if *e.get() != d {
                            return Err(InferenceError::DimensionMismatch {
                                key: k,
                                expected: *e.get(),
                                got: d,
                            });
                        }
                    }
                    Entry::Vacant(e) => {
                        e.insert(d);
                        if !requested.contains(&k) {
                            order.push(k);
                        }
                    }
                }
            }
        }
        if let Some(&missing) = ordering.iter().find(|&&k| !dims.contains_key(&k)) {
            return Err(InferenceError::UnknownVariable(missing));
        }

        let slot: BTreeMap<Key, usize> = order.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let mut block_dims: Vec<usize> = order.iter().map(|k| dims[k]).collect();
        block_dims.push(1);
        let rows: usize = factors.iter().map(|f| f.rows()).sum();
        let rhs = order.len();

        let mut ab = VerticalBlockMatrix::zeros(&block_dims, rows);
        let mut sigmas = Vec::with_capacity(rows);
        let mut any_model = false;
        let mut row0 = 0;
        for f in factors {
            for (pos, k) in f.keys.iter().enumerate() {
                ab.set_block(slot[k], row0, &f.ab.block(pos));
            }
            ab.set_block(rhs, row0, &f.ab.block(f.keys.len()));
            match &f.model {
                Some(m) => {
                    any_model = true;
                    sigmas.extend_from_slice(m.sigmas());
                }
                None => sigmas.extend(core::iter::repeat(T::one()).take(f.rows())),
            }
            row0 += f.rows();
        }

        Ok(Self {
            keys: order,
            ab,
            model: any_model.then(|| NoiseModel::diagonal(sigmas)),
        })
    }

    /// Eliminate `frontals` from this factor alone.
    pub fn eliminate(
        &self,
        frontals: &[Key],
        settings: &EliminationSettings<T>,
    ) -> Result<EliminationResult<T>, InferenceError> {
        eliminate_qr(&[self], frontals, settings)
    }

    /// Right-hand side.
    pub fn b(&self) -> DynVector<T> {
        self.ab.block(self.keys.len()).column(0)
    }

    /// `A·x − b`, without whitening.
    pub fn unweighted_error(&self, x: &VectorValues<T>) -> Result<DynVector<T>, InferenceError> {
        let mut e = self.b().scaled(-T::one());
        self.accumulate_ax(x, e.as_mut_slice())?;
        Ok(e)
    }

    /// Whitened residual `W(A·x − b)`.
    pub fn error_vector(&self, x: &VectorValues<T>) -> Result<DynVector<T>, InferenceError> {
        let mut e = self.unweighted_error(x)?;
        if let Some(m) = &self.model {
            m.whiten_in_place(e.as_mut_slice());
        }
        Ok(e)
    }

    /// `0.5·‖W(A·x − b)‖²`.
    pub fn error(&self, x: &VectorValues<T>) -> Result<T, InferenceError> {
        if self.rows() == 0 {
            return Ok(T::zero());
        }
        Ok(T::half() * self.error_vector(x)?.norm_squared())
    }

    /// Whitened `A·x`.
    pub fn multiply(&self, x: &VectorValues<T>) -> Result<DynVector<T>, InferenceError> {
        let mut y = DynVector::zeros(self.rows());
        self.accumulate_ax(x, y.as_mut_slice())?;
        if let Some(m) = &self.model {
            m.whiten_in_place(y.as_mut_slice());
        }
        Ok(y)
    }

    /// `x += alpha·AᵀW·e` for every variable of the factor.
    ///
    /// Variables missing from `x` are inserted as zero first.
    pub fn transpose_multiply_add(&self, alpha: T, e: &DynVector<T>, x: &mut VectorValues<T>) {
        assert_eq!(e.len(), self.rows(), "transpose_multiply_add: length mismatch");
        let mut we = e.clone();
        if let Some(m) = &self.model {
            m.whiten_in_place(we.as_mut_slice());
        }
        for (pos, &k) in self.keys.iter().enumerate() {
            let a = self.ab.block(pos);
            if x.get(k).is_none() {
                x.insert(k, DynVector::zeros(a.ncols()));
            }
            if let Some(xk) = x.get_mut(k) {
                a.gemv_t_add(alpha, we.as_slice(), xk.as_mut_slice());
            }
        }
    }

    /// `g += AᵀWᵀW(A·x − b)`, the gradient of [`error`](Self::error).
    pub fn gradient_add(&self, x: &VectorValues<T>, g: &mut VectorValues<T>) -> Result<(), InferenceError> {
        let e = self.error_vector(x)?;
        self.transpose_multiply_add(T::one(), &e, g);
        Ok(())
    }

    /// Dense `(A, b)`, whitened when `whiten` is set.
    pub fn jacobian(&self, whiten: bool) -> (DynMatrix<T>, DynVector<T>) {
        let ab = self.augmented_jacobian(whiten);
        let n = ab.ncols() - 1;
        let b = DynVector::from_slice(ab.col_slice(n, 0));
        (ab.block(0, 0, ab.nrows(), n), b)
    }

    /// Dense `[A | b]`, whitened when `whiten` is set.
    pub fn augmented_jacobian(&self, whiten: bool) -> DynMatrix<T> {
        let mut ab = self.ab.full().clone();
        if whiten {
            if let Some(m) = &self.model {
                m.whiten_rows(&mut ab);
            }
        }
        ab
    }

    /// Whitened information matrix `AᵀWᵀWA`.
    pub fn information(&self) -> DynMatrix<T> {
        let (a, _) = self.jacobian(true);
        &a.transpose() * &a
    }

    /// Whitened augmented information `[AᵀA Aᵀb; bᵀA bᵀb]`.
    pub fn augmented_information(&self) -> DynMatrix<T> {
        let ab = self.augmented_jacobian(true);
        &ab.transpose() * &ab
    }

    /// Copy with the noise model folded into the rows.
    ///
    /// Constraint rows stay constraints: if any row has a zero sigma the
    /// result carries a mixed model of zeros and ones, otherwise none.
    pub fn whiten(&self) -> Self {
        let ab = VerticalBlockMatrix::from_matrix(self.augmented_jacobian(true), &self.block_dims());
        let model = self.model.as_ref().filter(|m| m.is_constrained()).map(|m| {
            NoiseModel::mixed(
                m.sigmas()
                    .iter()
                    .map(|&s| if s == T::zero() { T::zero() } else { T::one() })
                    .collect(),
            )
        });
        Self {
            keys: self.keys.clone(),
            ab,
            model,
        }
    }

    /// `y += A·x` (unwhitened), checking that `x` covers every key.
    fn accumulate_ax(&self, x: &VectorValues<T>, y: &mut [T]) -> Result<(), InferenceError> {
        for (pos, &k) in self.keys.iter().enumerate() {
            let a = self.ab.block(pos);
            let xk = x.at(k)?;
            if xk.len() != a.ncols() {
                return Err(InferenceError::DimensionMismatch {
                    key: k,
                    expected: a.ncols(),
                    got: xk.len(),
                });
            }
            a.gemv_add(T::one(), xk.as_slice(), y);
        }
        Ok(())
    }
}

impl<T> JacobianFactor<T> {
    /// Assemble without validation; callers guarantee the block layout.
    pub(crate) fn from_parts(keys: Vec<Key>, ab: VerticalBlockMatrix<T>, model: Option<NoiseModel<T>>) -> Self {
        debug_assert_eq!(ab.nblocks(), keys.len() + 1);
        Self { keys, ab, model }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.ab.rows()
    }

    /// Whether the factor has no rows (and so contributes nothing).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[inline]
    pub fn model(&self) -> Option<&NoiseModel<T>> {
        self.model.as_ref()
    }

    /// The augmented block matrix `[A₁ … Aₙ | b]`.
    #[inline]
    pub fn ab(&self) -> &VerticalBlockMatrix<T> {
        &self.ab
    }

    /// Position of `key` among the factor's variables.
    pub fn position(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }

    /// Block of the variable at `pos`.
    pub fn a(&self, pos: usize) -> BlockView<'_, T> {
        assert!(pos < self.keys.len(), "factor has {} variables, asked for {}", self.keys.len(), pos);
        self.ab.block(pos)
    }

    /// Block of `key`, if the factor involves it.
    pub fn a_for(&self, key: Key) -> Option<BlockView<'_, T>> {
        self.position(key).map(|pos| self.ab.block(pos))
    }

    /// Dimension of `key` in this factor.
    pub fn dim(&self, key: Key) -> Option<usize> {
        self.position(key).map(|pos| self.ab.block_width(pos))
    }

    /// `(key, dim)` pairs in factor order.
    pub fn dims(&self) -> impl Iterator<Item = (Key, usize)> + '_ {
        self.keys.iter().enumerate().map(|(pos, &k)| (k, self.ab.block_width(pos)))
    }

    /// Column widths of all blocks, including the trailing RHS.
    pub(crate) fn block_dims(&self) -> Vec<usize> {
        (0..self.ab.nblocks()).map(|i| self.ab.block_width(i)).collect()
    }
}

fn check_model<T: FloatScalar>(model: &Option<NoiseModel<T>>, rows: usize) -> Result<(), InferenceError> {
    match model {
        Some(m) if m.dim() != rows => Err(InferenceError::RowMismatch {
            expected: rows,
            got: m.dim(),
        }),
        _ => Ok(()),
    }
}
