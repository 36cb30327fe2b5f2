use alloc::borrow::Cow;
use alloc::collections::btree_map::{BTreeMap, Entry};
use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::bayes_net::GaussianBayesNet;
use crate::eliminate::{eliminate_qr, EliminationSettings};
use crate::error::InferenceError;
use crate::factor::{GaussianFactor, JacobianFactor};
use crate::noise::NoiseModel;
use crate::ordering::{Key, Ordering};
use crate::traits::FloatScalar;
use crate::values::VectorValues;
use crate::{DynMatrix, DynVector};

/// An unordered collection of Gaussian factors.
///
/// ```
/// use gaussian_inference::{DynMatrix, DynVector, EliminationSettings, GaussianFactorGraph, Ordering};
///
/// let mut graph = GaussianFactorGraph::<f64>::new();
/// graph.add_jacobian(vec![(1, DynMatrix::eye(1))], DynVector::from_slice(&[2.0]), None).unwrap();
/// graph
///     .add_jacobian(
///         vec![(1, DynMatrix::from_rows(1, 1, &[-1.0])), (2, DynMatrix::eye(1))],
///         DynVector::from_slice(&[3.0]),
///         None,
///     )
///     .unwrap();
///
/// let ordering = Ordering::new(vec![1, 2]).unwrap();
/// let x = graph.optimize(&ordering, &EliminationSettings::default()).unwrap();
/// assert!((x.at(2).unwrap()[0] - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianFactorGraph<T> {
    factors: Vec<GaussianFactor<T>>,
}

impl<T> Default for GaussianFactorGraph<T> {
    fn default() -> Self {
        Self { factors: Vec::new() }
    }
}

impl<T> GaussianFactorGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factor.
    pub fn push(&mut self, factor: impl Into<GaussianFactor<T>>) {
        self.factors.push(factor.into());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, GaussianFactor<T>> {
        self.factors.iter()
    }

    pub fn get(&self, i: usize) -> Option<&GaussianFactor<T>> {
        self.factors.get(i)
    }
}

impl<T: FloatScalar> GaussianFactorGraph<T> {
    /// Build a [`JacobianFactor`] and append it.
    pub fn add_jacobian(
        &mut self,
        terms: Vec<(Key, DynMatrix<T>)>,
        b: DynVector<T>,
        model: Option<NoiseModel<T>>,
    ) -> Result<(), InferenceError> {
        self.push(JacobianFactor::new(terms, b, model)?);
        Ok(())
    }

    /// Every variable any factor references.
    pub fn keys(&self) -> BTreeSet<Key> {
        self.factors.iter().flat_map(|f| f.keys().iter().copied()).collect()
    }

    /// Dimension of every variable, checked for consistency across factors.
    pub fn dims(&self) -> Result<BTreeMap<Key, usize>, InferenceError> {
        let mut dims = BTreeMap::new();
        for f in &self.factors {
            for (key, d) in f.dims() {
                match dims.entry(key) {
                    Entry::Vacant(e) => {
                        e.insert(d);
                    }
                    Entry::Occupied(e) => {
                        if *e.get() != d {
                            return Err(InferenceError::DimensionMismatch {
                                key,
                                expected: *e.get(),
                                got: d,
                            });
                        }
                    }
                }
            }
        }
        Ok(dims)
    }

    /// Total error `Σ 0.5·‖W(A·x − b)‖²`.
    pub fn error(&self, x: &VectorValues<T>) -> Result<T, InferenceError> {
        self.factors
            .iter()
            .try_fold(T::zero(), |acc, f| Ok(acc + f.error(x)?))
    }

    /// Gradient of [`error`](Self::error) at `x0`.
    pub fn gradient(&self, x0: &VectorValues<T>) -> Result<VectorValues<T>, InferenceError> {
        let mut g = VectorValues::zeros(self.dims()?);
        for f in &self.factors {
            f.gradient_add(x0, &mut g)?;
        }
        Ok(g)
    }

    /// Gradient at `x = 0`, i.e. `−Σ AᵀWᵀW·b`.
    pub fn gradient_at_zero(&self) -> Result<VectorValues<T>, InferenceError> {
        let x0 = VectorValues::zeros(self.dims()?);
        self.gradient(&x0)
    }

    /// Whitened `A·x`, one vector per factor.
    pub fn multiply(&self, x: &VectorValues<T>) -> Result<Vec<DynVector<T>>, InferenceError> {
        self.factors.iter().map(|f| f.to_jacobian().multiply(x)).collect()
    }

    /// `x += alpha·AᵀW·e`, where `e` holds one vector per factor.
    pub fn transpose_multiply_add(&self, alpha: T, e: &[DynVector<T>], x: &mut VectorValues<T>) {
        assert_eq!(e.len(), self.factors.len(), "one error vector per factor required");
        for (f, ei) in self.factors.iter().zip(e) {
            f.to_jacobian().transpose_multiply_add(alpha, ei, x);
        }
    }

    /// Dense whitened `[A | b]` with columns in `ordering`.
    ///
    /// ```
    /// use gaussian_inference::{DynMatrix, DynVector, GaussianFactorGraph, NoiseModel, Ordering};
    ///
    /// let mut graph = GaussianFactorGraph::new();
    /// graph
    ///     .add_jacobian(
    ///         vec![(1, DynMatrix::eye(1)), (2, DynMatrix::from_rows(1, 1, &[3.0]))],
    ///         DynVector::from_slice(&[4.0]),
    ///         Some(NoiseModel::isotropic(1, 0.5)),
    ///     )
    ///     .unwrap();
    /// let ab = graph.augmented_jacobian(&Ordering::new(vec![2, 1]).unwrap()).unwrap();
    /// assert_eq!(ab.as_slice(), &[6.0, 2.0, 8.0]);
    /// ```
    pub fn augmented_jacobian(&self, ordering: &Ordering) -> Result<DynMatrix<T>, InferenceError> {
        self.check_covers(ordering)?;
        let jacobians: Vec<Cow<'_, JacobianFactor<T>>> = self.factors.iter().map(|f| f.to_jacobian()).collect();
        let refs: Vec<&JacobianFactor<T>> = jacobians.iter().map(|j| j.as_ref()).collect();
        Ok(JacobianFactor::combine(&refs, ordering.as_slice())?.augmented_jacobian(true))
    }

    /// Dense augmented information `[Λ η; ηᵀ f]` with blocks in `ordering`.
    ///
    /// Summed factor by factor, so information-form factors keep their
    /// constant term.
    pub fn augmented_hessian(&self, ordering: &Ordering) -> Result<DynMatrix<T>, InferenceError> {
        self.check_covers(ordering)?;
        let dims = self.dims()?;
        let mut offsets = BTreeMap::new();
        let mut n = 0;
        for &k in ordering {
            offsets.insert(k, n);
            n += dims[&k];
        }

        let mut h = DynMatrix::zeros(n + 1, n + 1);
        for f in &self.factors {
            let info = f.augmented_information();
            // Map each local column to its global column; the last one is the RHS.
            let mut global = Vec::with_capacity(info.ncols());
            for (key, d) in f.dims() {
                let off = offsets[&key];
                global.extend(off..off + d);
            }
            global.push(n);
            for (lj, &gj) in global.iter().enumerate() {
                for (li, &gi) in global.iter().enumerate() {
                    h[(gi, gj)] = h[(gi, gj)] + info[(li, lj)];
                }
            }
        }
        Ok(h)
    }

    /// Eliminate every variable, in `ordering`, into a Bayes net.
    ///
    /// The ordering must name exactly the graph's variables.
    ///
    /// ```
    /// use gaussian_inference::{
    ///     DynMatrix, DynVector, EliminationSettings, GaussianFactorGraph, InferenceError, Ordering,
    /// };
    ///
    /// // x1 = 2, x2 - x1 = 3
    /// let mut graph = GaussianFactorGraph::new();
    /// graph.add_jacobian(vec![(1, DynMatrix::eye(1))], DynVector::from_slice(&[2.0]), None).unwrap();
    /// graph
    ///     .add_jacobian(
    ///         vec![(1, DynMatrix::from_rows(1, 1, &[-1.0])), (2, DynMatrix::eye(1))],
    ///         DynVector::from_slice(&[3.0]),
    ///         None,
    ///     )
    ///     .unwrap();
    ///
    /// let settings = EliminationSettings::default();
    /// let net = graph.eliminate_sequential(&Ordering::new(vec![2, 1]).unwrap(), &settings).unwrap();
    /// assert_eq!(net.len(), 2);
    /// assert_eq!(net.get(0).unwrap().frontals(), &[2]);
    /// assert_eq!(net.get(0).unwrap().parents(), &[1]);
    ///
    /// let partial = Ordering::new(vec![1]).unwrap();
    /// assert_eq!(
    ///     graph.eliminate_sequential(&partial, &settings),
    ///     Err(InferenceError::IncompleteOrdering(2))
    /// );
    /// ```
    pub fn eliminate_sequential(
        &self,
        ordering: &Ordering,
        settings: &EliminationSettings<T>,
    ) -> Result<GaussianBayesNet<T>, InferenceError> {
        self.check_covers(ordering)?;
        self.eliminate_partial_sequential(ordering, settings).map(|(net, _)| net)
    }

    /// Eliminate the variables of `ordering` only.
    ///
    /// Returns the Bayes net over them and the factors left over the
    /// remaining variables. Each step gathers the live factors touching the
    /// next variable through a [`VariableIndex`], eliminates it with
    /// [`eliminate_qr`], and returns the residual to the pool while it still
    /// names variables, even with no rows left.
    pub fn eliminate_partial_sequential(
        &self,
        ordering: &Ordering,
        settings: &EliminationSettings<T>,
    ) -> Result<(GaussianBayesNet<T>, GaussianFactorGraph<T>), InferenceError> {
        let mut pool: Vec<Option<GaussianFactor<T>>> = self.factors.iter().cloned().map(Some).collect();
        let mut index = VariableIndex::from_factors(self.factors.iter());
        let mut conditionals = Vec::with_capacity(ordering.len());

        for &key in ordering {
            let gathered: Vec<GaussianFactor<T>> = index
                .remove(key)
                .into_iter()
                .filter_map(|slot| pool.get_mut(slot).and_then(Option::take))
                .collect();
            if gathered.is_empty() {
                return Err(InferenceError::UnknownVariable(key));
            }

            let jacobians: Vec<Cow<'_, JacobianFactor<T>>> = gathered.iter().map(|f| f.to_jacobian()).collect();
            let refs: Vec<&JacobianFactor<T>> = jacobians.iter().map(|j| j.as_ref()).collect();
            let result = eliminate_qr(&refs, &[key], settings)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "eliminated {} from {} factors: {} parents, residual {} rows",
                key,
                gathered.len(),
                result.conditional.parents().len(),
                result.remaining.rows()
            );

            conditionals.push(result.conditional);
            // A zero-row residual still records its parents' dimensions; it
            // keeps them reachable when the frontal absorbed every row.
            if !result.remaining.keys().is_empty() {
                index.add(pool.len(), result.remaining.keys());
                pool.push(Some(result.remaining.into()));
            }
        }

        let remaining = pool.into_iter().flatten().collect();
        Ok((GaussianBayesNet::from_conditionals(conditionals), remaining))
    }

    /// Eliminate in `ordering` and back-substitute.
    ///
    /// ```
    /// use gaussian_inference::{DynMatrix, DynVector, EliminationSettings, GaussianFactorGraph, NoiseModel, Ordering};
    ///
    /// // Two measurements of x1, the second twice as precise.
    /// let mut graph = GaussianFactorGraph::<f64>::new();
    /// let one = DynMatrix::eye(1);
    /// graph.add_jacobian(vec![(1, one.clone())], DynVector::from_slice(&[0.0]), Some(NoiseModel::isotropic(1, 1.0))).unwrap();
    /// graph.add_jacobian(vec![(1, one)], DynVector::from_slice(&[3.0]), Some(NoiseModel::isotropic(1, 0.5))).unwrap();
    ///
    /// let x = graph.optimize(&Ordering::new(vec![1]).unwrap(), &EliminationSettings::default()).unwrap();
    /// assert!((x.at(1).unwrap()[0] - 2.4).abs() < 1e-12);
    /// ```
    pub fn optimize(
        &self,
        ordering: &Ordering,
        settings: &EliminationSettings<T>,
    ) -> Result<VectorValues<T>, InferenceError> {
        self.eliminate_sequential(ordering, settings)?.optimize()
    }

    /// The ordering names every variable of the graph and nothing else.
    fn check_covers(&self, ordering: &Ordering) -> Result<(), InferenceError> {
        let keys = self.keys();
        if let Some(&k) = ordering.iter().find(|&&k| !keys.contains(&k)) {
            return Err(InferenceError::UnknownVariable(k));
        }
        if let Some(&k) = keys.iter().find(|&&k| !ordering.contains(k)) {
            return Err(InferenceError::IncompleteOrdering(k));
        }
        Ok(())
    }
}

impl<T: FloatScalar> From<&GaussianBayesNet<T>> for GaussianFactorGraph<T> {
    /// Each conditional as its equivalent factor.
    fn from(net: &GaussianBayesNet<T>) -> Self {
        net.iter().map(|c| GaussianFactor::Jacobian(c.to_factor())).collect()
    }
}

impl<T> FromIterator<GaussianFactor<T>> for GaussianFactorGraph<T> {
    fn from_iter<I: IntoIterator<Item = GaussianFactor<T>>>(iter: I) -> Self {
        Self {
            factors: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a GaussianFactorGraph<T> {
    type Item = &'a GaussianFactor<T>;
    type IntoIter = core::slice::Iter<'a, GaussianFactor<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}

/// Variable → factor slots lookup driving sequential elimination.
///
/// Slots are positions in the elimination pool; a slot whose factor has
/// already been consumed is simply skipped by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableIndex {
    slots: BTreeMap<Key, Vec<usize>>,
}

impl VariableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index factors by position.
    pub fn from_factors<'a, T: FloatScalar + 'a>(factors: impl Iterator<Item = &'a GaussianFactor<T>>) -> Self {
        let mut index = Self::new();
        for (slot, f) in factors.enumerate() {
            index.add(slot, f.keys());
        }
        index
    }

    /// Record that the factor at `slot` involves `keys`.
    pub fn add(&mut self, slot: usize, keys: &[Key]) {
        for &k in keys {
            self.slots.entry(k).or_default().push(slot);
        }
    }

    /// Slots touching `key`.
    pub fn slots(&self, key: Key) -> &[usize] {
        self.slots.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop `key` from the index, returning its slots.
    pub fn remove(&mut self, key: Key) -> Vec<usize> {
        self.slots.remove(&key).unwrap_or_default()
    }

    /// Number of indexed variables.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
