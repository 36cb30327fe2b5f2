//! Reduce a solved network onto a retained subset of its variables.
//!
//! Conditioning substitutes the already-solved values of every removed
//! variable into the rows that remain. No re-factorization happens, so the
//! result is exact only at the given solution. For a marginal that holds at
//! any linearization point, eliminate the removed variables instead with
//! [`summarize_graph_sequential`].

use alloc::collections::BTreeSet;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;

use crate::bayes_net::GaussianBayesNet;
use crate::conditional::{checked_value, GaussianConditional};
use crate::dynmatrix::VerticalBlockMatrix;
use crate::eliminate::EliminationSettings;
use crate::error::InferenceError;
use crate::factor::GaussianFactor;
use crate::graph::GaussianFactorGraph;
use crate::noise::NoiseModel;
use crate::ordering::{Key, Ordering};
use crate::traits::FloatScalar;
use crate::values::VectorValues;

/// Condition one conditional on the solved values of every variable not in `saved`.
///
/// - Nothing removed: the same `Arc` is returned.
/// - Every frontal removed: `None`, the conditional says nothing about `saved`.
/// - Otherwise the rows of the retained frontals are kept, the columns of
///   the retained variables are copied, and each removed variable's block
///   times its value is subtracted from `d`. Row sigmas are carried over.
///
/// # Errors
///
/// [`MissingValue`](InferenceError::MissingValue) if `solution` lacks a
/// removed variable, [`DimensionMismatch`](InferenceError::DimensionMismatch)
/// if its value has the wrong length.
pub fn condition_density<T: FloatScalar>(
    conditional: &Arc<GaussianConditional<T>>,
    saved: &BTreeSet<Key>,
    solution: &VectorValues<T>,
) -> Result<Option<Arc<GaussianConditional<T>>>, InferenceError> {
    let keys = conditional.keys();
    if keys.iter().all(|k| saved.contains(k)) {
        return Ok(Some(Arc::clone(conditional)));
    }

    let nf = conditional.nr_frontals();
    let kept: Vec<usize> = (0..keys.len()).filter(|&p| saved.contains(&keys[p])).collect();
    let kept_frontals = kept.iter().take_while(|&&p| p < nf).count();
    if kept_frontals == 0 {
        #[cfg(feature = "tracing")]
        tracing::trace!("dropping conditional on {:?}: every frontal removed", conditional.frontals());
        return Ok(None);
    }

    let rsd = conditional.rsd();
    // Rows of R line up with the frontal columns.
    let rows: Vec<Range<usize>> = kept[..kept_frontals].iter().map(|&p| rsd.block_range(p)).collect();
    let nrows: usize = rows.iter().map(|r| r.len()).sum();

    let d_full = conditional.d();
    let mut d: Vec<T> = rows
        .iter()
        .flat_map(|r| d_full.as_slice()[r.clone()].iter().copied())
        .collect();
    for pos in (0..keys.len()).filter(|&p| !saved.contains(&keys[p])) {
        let x = checked_value(solution, keys[pos], rsd.block_width(pos))?;
        let block = rsd.block(pos);
        let mut row0 = 0;
        for r in &rows {
            block
                .rows(r.start, r.len())
                .gemv_add(-T::one(), x.as_slice(), &mut d[row0..row0 + r.len()]);
            row0 += r.len();
        }
    }

    let mut dims: Vec<usize> = kept.iter().map(|&p| rsd.block_width(p)).collect();
    dims.push(1);
    let mut reduced = VerticalBlockMatrix::zeros(&dims, nrows);
    for (i, &pos) in kept.iter().enumerate() {
        let block = rsd.block(pos);
        let mut row0 = 0;
        for r in &rows {
            reduced.set_block(i, row0, &block.rows(r.start, r.len()));
            row0 += r.len();
        }
    }
    reduced.set_column_block(kept.len(), 0, &d);

    let model = conditional.model();
    let sigmas = rows.iter().flat_map(|r| r.clone().map(|i| model.sigma(i))).collect();
    let new_keys = kept.iter().map(|&p| keys[p]).collect();

    #[cfg(feature = "tracing")]
    tracing::trace!(
        "conditioned {:?}: kept {} of {} keys, {} rows",
        conditional.frontals(),
        kept.len(),
        keys.len(),
        nrows
    );

    let reduced = GaussianConditional::from_parts(new_keys, kept_frontals, reduced, NoiseModel::diagonal(sigmas))?;
    Ok(Some(Arc::new(reduced)))
}

/// Condition a set of conditionals (the cliques of a solved net or tree)
/// and collect the survivors as factors.
///
/// Fails with [`NotInNet`](InferenceError::NotInNet) if a saved variable
/// appears in none of the conditionals.
///
/// ```
/// # use std::sync::Arc;
/// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
/// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
/// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
/// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
/// # };
/// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
/// use std::collections::BTreeSet;
/// use gaussian_inference::{condition, VectorValues};
///
/// let x = net.optimize().unwrap(); // x1 = 1, x2 = 2
/// let saved: BTreeSet<u64> = [1].into_iter().collect();
/// let graph = condition(&net, &saved, &x).unwrap();
/// assert_eq!(graph.len(), 1);
/// assert_eq!(graph.error(&x).unwrap(), 0.0);
///
/// // x1 alone: x1 = 3 - x2 at the solved x2
/// let only_x1: VectorValues<f64> = [(1, DynVector::from_slice(&[1.0]))].into_iter().collect();
/// assert_eq!(graph.error(&only_x1).unwrap(), 0.0);
/// ```
pub fn condition<'a, T: FloatScalar + 'a>(
    conditionals: impl IntoIterator<Item = &'a Arc<GaussianConditional<T>>>,
    saved: &BTreeSet<Key>,
    solution: &VectorValues<T>,
) -> Result<GaussianFactorGraph<T>, InferenceError> {
    let conditioned = condition_all(conditionals, saved, solution)?;
    Ok(conditioned
        .iter()
        .map(|c| GaussianFactor::Jacobian(c.to_factor()))
        .collect())
}

/// [`condition`], keeping the result as a Bayes net.
///
/// The retained conditionals keep their relative order, so the result is
/// again ordered first-eliminated first.
///
/// ```
/// # use std::sync::Arc;
/// # use gaussian_inference::{DynMatrix, DynVector, GaussianBayesNet, GaussianConditional};
/// # let c = |key, r: f64, d: f64, parents: Vec<(u64, f64)>| {
/// #     let s = parents.into_iter().map(|(k, s)| (k, DynMatrix::from_rows(1, 1, &[s]))).collect();
/// #     Arc::new(GaussianConditional::new(key, DynVector::from_slice(&[d]), DynMatrix::from_rows(1, 1, &[r]), s, None).unwrap())
/// # };
/// let net = GaussianBayesNet::from_conditionals(vec![c(1, 1.0, 3.0, vec![(2, 1.0)]), c(2, 2.0, 4.0, vec![])]);
/// use std::collections::BTreeSet;
/// use gaussian_inference::{condition_bayes_net, InferenceError};
///
/// let x = net.optimize().unwrap();
/// let reduced = condition_bayes_net(&net, &[1].into_iter().collect(), &x).unwrap();
/// assert_eq!(reduced.len(), 1);
/// assert_eq!(reduced.get(0).unwrap().d().as_slice(), &[1.0]);
///
/// let unknown: BTreeSet<u64> = [9].into_iter().collect();
/// assert_eq!(condition_bayes_net(&net, &unknown, &x), Err(InferenceError::NotInNet(9)));
/// ```
pub fn condition_bayes_net<T: FloatScalar>(
    net: &GaussianBayesNet<T>,
    saved: &BTreeSet<Key>,
    solution: &VectorValues<T>,
) -> Result<GaussianBayesNet<T>, InferenceError> {
    Ok(GaussianBayesNet::from_conditionals(condition_all(net, saved, solution)?))
}

fn condition_all<'a, T: FloatScalar + 'a>(
    conditionals: impl IntoIterator<Item = &'a Arc<GaussianConditional<T>>>,
    saved: &BTreeSet<Key>,
    solution: &VectorValues<T>,
) -> Result<Vec<Arc<GaussianConditional<T>>>, InferenceError> {
    let conditionals: Vec<&Arc<GaussianConditional<T>>> = conditionals.into_iter().collect();
    let known: BTreeSet<Key> = conditionals.iter().flat_map(|c| c.keys().iter().copied()).collect();
    if let Some(&k) = saved.iter().find(|&k| !known.contains(k)) {
        return Err(InferenceError::NotInNet(k));
    }

    let mut out = Vec::with_capacity(conditionals.len());
    for c in conditionals {
        if let Some(reduced) = condition_density(c, saved, solution)? {
            out.push(reduced);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("conditioned onto {} variables: {} conditionals retained", saved.len(), out.len());

    Ok(out)
}

/// Solve `net`, then condition it onto `saved` at that solution.
pub fn summarize<T: FloatScalar>(
    net: &GaussianBayesNet<T>,
    saved: &BTreeSet<Key>,
) -> Result<GaussianFactorGraph<T>, InferenceError> {
    let solution = net.optimize()?;
    condition(net, saved, &solution)
}

/// Eliminate every variable of `graph` not in `saved` (in ascending key
/// order) and return the factors left over the saved variables.
///
/// Unlike [`condition`], this is a true marginal and needs no solution.
/// Fails with [`UnknownVariable`](InferenceError::UnknownVariable) if a
/// saved variable is not in the graph.
pub fn summarize_graph_sequential<T: FloatScalar>(
    graph: &GaussianFactorGraph<T>,
    saved: &BTreeSet<Key>,
    settings: &EliminationSettings<T>,
) -> Result<GaussianFactorGraph<T>, InferenceError> {
    let keys = graph.keys();
    if let Some(&k) = saved.iter().find(|&k| !keys.contains(k)) {
        return Err(InferenceError::UnknownVariable(k));
    }
    let removed = Ordering::natural(keys.into_iter().filter(|k| !saved.contains(k)));
    let (_, remaining) = graph.eliminate_partial_sequential(&removed, settings)?;
    Ok(remaining)
}
