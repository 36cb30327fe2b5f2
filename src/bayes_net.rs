use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::conditional::GaussianConditional;
use crate::error::InferenceError;
use crate::graph::GaussianFactorGraph;
use crate::ordering::{Key, Ordering};
use crate::traits::FloatScalar;
use crate::values::VectorValues;
use crate::{DynMatrix, DynVector};

/// A chain of Gaussian conditionals, first-eliminated first.
///
/// Every conditional's parents are frontals of later conditionals (or of
/// none, for a partial net). Conditionals are shared through [`Arc`] and
/// never mutated; a net is built once, by elimination or from a list, and
/// then only queried.
///
/// ```
/// use std::sync::Arc;
/// use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
///
/// let c = |key, r: f64| {
///     Arc::new(GaussianConditional::new(
///         key,
///         DynVector::from_slice(&[1.0]),
///         DynMatrix::from_rows(1, 1, &[r]),
///         vec![],
///         None,
///     )
///     .unwrap())
/// };
/// let net = GaussianBayesNet::from_conditionals(vec![c(1, 2.0), c(2, 3.0)]);
/// assert!((net.determinant() - 6.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianBayesNet<T> {
    conditionals: Vec<Arc<GaussianConditional<T>>>,
}

impl<T> Default for GaussianBayesNet<T> {
    fn default() -> Self {
        Self {
            conditionals: Vec::new(),
        }
    }
}

impl<T> GaussianBayesNet<T> {
    /// The empty net.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap conditionals listed first-eliminated first.
    pub fn from_conditionals(conditionals: Vec<Arc<GaussianConditional<T>>>) -> Self {
        Self { conditionals }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Arc<GaussianConditional<T>>> {
        self.conditionals.iter()
    }

    pub fn get(&self, i: usize) -> Option<&Arc<GaussianConditional<T>>> {
        self.conditionals.get(i)
    }

    #[inline]
    pub fn conditionals(&self) -> &[Arc<GaussianConditional<T>>] {
        &self.conditionals
    }

    /// Frontal keys in net order, i.e. the elimination order.
    ///
    /// Fails with [`DuplicateKey`](InferenceError::DuplicateKey) when two
    /// conditionals share a frontal, which elimination never produces.
    pub fn ordering(&self) -> Result<Ordering, InferenceError> {
        Ordering::new(self.conditionals.iter().flat_map(|c| c.frontals().iter().copied()).collect())
    }

    /// Every key mentioned, frontal or parent.
    pub fn keys(&self) -> BTreeSet<Key> {
        self.conditionals.iter().flat_map(|c| c.keys().iter().copied()).collect()
    }
}

impl<T: FloatScalar> GaussianBayesNet<T> {
    /// Solve the whole net by back-substitution, last-eliminated first.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
    /// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
    /// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
    /// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
    /// # };
    /// // x1 + x2 = 3, 2·x2 = 4
    /// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
    /// let x = net.optimize().unwrap();
    /// assert_eq!(x.at(2).unwrap()[0], 2.0);
    /// assert_eq!(x.at(1).unwrap()[0], 1.0);
    /// ```
    pub fn optimize(&self) -> Result<VectorValues<T>, InferenceError> {
        let mut x = VectorValues::new();
        self.optimize_in_place(&mut x)?;
        Ok(x)
    }

    /// Back-substitute into `x`, which may already hold values for parents
    /// outside the net.
    pub fn optimize_in_place(&self, x: &mut VectorValues<T>) -> Result<(), InferenceError> {
        for c in self.conditionals.iter().rev() {
            c.solve_in_place(x)?;
        }
        Ok(())
    }

    /// Solve `R·y = input` (the net's `R`, ignoring its `d`), then scale by sigmas.
    ///
    /// Keys of `input` outside the net are carried through unchanged.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
    /// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
    /// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
    /// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
    /// # };
    /// // x1 + x2 = 3, 2·x2 = 4
    /// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
    /// # use gaussian_inference::VectorValues;
    /// let input: VectorValues<f64> = [(1, DynVector::from_slice(&[1.0])), (2, DynVector::from_slice(&[4.0]))]
    ///     .into_iter()
    ///     .collect();
    /// let y = net.back_substitute(&input).unwrap();
    /// assert_eq!(y.at(2).unwrap()[0], 2.0);
    /// assert_eq!(y.at(1).unwrap()[0], -1.0);
    /// ```
    pub fn back_substitute(&self, input: &VectorValues<T>) -> Result<VectorValues<T>, InferenceError> {
        let mut output = input.clone();
        for c in self.conditionals.iter().rev() {
            c.solve_with_rhs(input, &mut output)?;
        }
        for c in &self.conditionals {
            c.scale_frontals_by_sigma(&mut output)?;
        }
        Ok(output)
    }

    /// Solve `Rᵀ·y = gx`, first-eliminated first, then scale by sigmas.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
    /// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
    /// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
    /// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
    /// # };
    /// // x1 + x2 = 3, 2·x2 = 4
    /// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
    /// # use gaussian_inference::VectorValues;
    /// let gx: VectorValues<f64> = [(1, DynVector::from_slice(&[1.0])), (2, DynVector::from_slice(&[4.0]))]
    ///     .into_iter()
    ///     .collect();
    /// let gy = net.back_substitute_transpose(&gx).unwrap();
    /// assert_eq!(gy.at(1).unwrap()[0], 1.0);
    /// assert_eq!(gy.at(2).unwrap()[0], 1.5);
    /// ```
    pub fn back_substitute_transpose(&self, gx: &VectorValues<T>) -> Result<VectorValues<T>, InferenceError> {
        let mut gy = gx.clone();
        for c in &self.conditionals {
            c.solve_transpose_in_place(&mut gy)?;
        }
        for c in &self.conditionals {
            c.scale_frontals_by_sigma(&mut gy)?;
        }
        Ok(gy)
    }

    /// `Σ ln|rᵢᵢ|` over every conditional; `-inf` with a zero diagonal.
    pub fn log_determinant(&self) -> T {
        self.conditionals
            .iter()
            .fold(T::zero(), |acc, c| acc + c.log_determinant())
    }

    /// Product of every diagonal entry of `R`, as `exp(Σ ln|rᵢᵢ|)` with the
    /// sign tracked separately.
    ///
    /// A zero diagonal gives exactly zero; the empty net gives one.
    pub fn determinant(&self) -> T {
        let mut negative = false;
        for c in &self.conditionals {
            let r = c.r();
            for i in 0..c.rows() {
                let v = r[(i, i)];
                if v == T::zero() {
                    return T::zero();
                }
                negative ^= v < T::zero();
            }
        }
        let magnitude = self.log_determinant().exp();
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Dense upper-triangular `(R, d)` for the whole net.
    ///
    /// Columns follow [`ordering`](Self::ordering); every row is divided by
    /// its sigma (constraint rows by one). Fails with
    /// [`NotInNet`](InferenceError::NotInNet) if a parent is not a frontal of
    /// the net.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
    /// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
    /// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
    /// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
    /// # };
    /// // x1 + x2 = 3, 2·x2 = 4
    /// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
    /// let (r, d) = net.matrix().unwrap();
    /// assert_eq!(r.as_slice(), &[1.0, 0.0, 1.0, 2.0]); // column-major
    /// assert_eq!(d.as_slice(), &[3.0, 4.0]);
    /// ```
    pub fn matrix(&self) -> Result<(DynMatrix<T>, DynVector<T>), InferenceError> {
        let mut offsets: BTreeMap<Key, usize> = BTreeMap::new();
        let mut n = 0;
        for c in &self.conditionals {
            for &k in c.frontals() {
                offsets.insert(k, n);
                n += c.dim(k).unwrap_or(0);
            }
        }

        let mut r = DynMatrix::zeros(n, n);
        let mut d = DynVector::zeros(n);
        let mut row0 = 0;
        for c in &self.conditionals {
            let rsd = c.rsd();
            let cd = c.d();
            for (pos, &k) in c.keys().iter().enumerate() {
                let col0 = *offsets.get(&k).ok_or(InferenceError::NotInNet(k))?;
                let block = rsd.block(pos);
                for i in 0..c.rows() {
                    let w = c.model().row_weight(i);
                    for j in 0..rsd.block_width(pos) {
                        r[(row0 + i, col0 + j)] = block[(i, j)] * w;
                    }
                }
            }
            for i in 0..c.rows() {
                d[row0 + i] = cd[i] * c.model().row_weight(i);
            }
            row0 += c.rows();
        }
        Ok((r, d))
    }

    /// The net as a factor graph, one factor per conditional.
    pub fn to_factor_graph(&self) -> GaussianFactorGraph<T> {
        GaussianFactorGraph::from(self)
    }

    /// `0.5·Σ ‖(R·x_f + S·x_p − d)/σ‖²`.
    pub fn error(&self, x: &VectorValues<T>) -> Result<T, InferenceError> {
        self.to_factor_graph().error(x)
    }

    /// Gradient of [`error`](Self::error) at `x0`.
    pub fn gradient(&self, x0: &VectorValues<T>) -> Result<VectorValues<T>, InferenceError> {
        self.to_factor_graph().gradient(x0)
    }

    /// Gradient of [`error`](Self::error) at zero, `−Rᵀ·d`.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
    /// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
    /// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
    /// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
    /// # };
    /// // x1 + x2 = 3, 2·x2 = 4
    /// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
    /// let g = net.gradient_at_zero().unwrap();
    /// assert_eq!(g.at(1).unwrap()[0], -3.0);
    /// assert_eq!(g.at(2).unwrap()[0], -11.0);
    /// ```
    pub fn gradient_at_zero(&self) -> Result<VectorValues<T>, InferenceError> {
        self.to_factor_graph().gradient_at_zero()
    }

    /// Minimizer of the error along the steepest-descent direction from
    /// zero (the Cauchy point): `−(‖g‖² / ‖R·g‖²)·g` with `g` the gradient at zero.
    ///
    /// Returns zero when the gradient vanishes.
    pub fn optimize_gradient_search(&self) -> Result<VectorValues<T>, InferenceError> {
        let graph = self.to_factor_graph();
        let grad = graph.gradient_at_zero()?;
        let grad_sq = grad.norm_squared();
        let rg = graph.multiply(&grad)?;
        let rg_sq = rg.iter().fold(T::zero(), |acc, e| acc + e.norm_squared());
        if rg_sq == T::zero() {
            return Ok(grad.zero_like());
        }
        Ok(grad.scale(-grad_sq / rg_sq))
    }
}

impl<T> FromIterator<Arc<GaussianConditional<T>>> for GaussianBayesNet<T> {
    fn from_iter<I: IntoIterator<Item = Arc<GaussianConditional<T>>>>(iter: I) -> Self {
        Self::from_conditionals(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a GaussianBayesNet<T> {
    type Item = &'a Arc<GaussianConditional<T>>;
    type IntoIter = core::slice::Iter<'a, Arc<GaussianConditional<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditionals.iter()
    }
}
