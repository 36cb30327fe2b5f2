use alloc::collections::btree_map::{self, BTreeMap};
use alloc::vec::Vec;

use crate::error::InferenceError;
use crate::ordering::{Key, Ordering};
use crate::traits::FloatScalar;
use crate::DynVector;

/// Assignment of a dense vector to each variable.
///
/// Used for solutions, linearization points, and gradients. Lookup is by
/// key only; iteration is in ascending key order.
///
/// ```
/// use gaussian_inference::{DynVector, VectorValues};
///
/// let mut x = VectorValues::new();
/// x.insert(7, DynVector::from_slice(&[1.0, 2.0]));
/// assert_eq!(x.at(7).unwrap()[1], 2.0);
/// assert!(x.at(8).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VectorValues<T> {
    values: BTreeMap<Key, DynVector<T>>,
}

impl<T> Default for VectorValues<T> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<T> VectorValues<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Insert or replace the value of `key`.
    pub fn insert(&mut self, key: Key, value: DynVector<T>) -> Option<DynVector<T>> {
        self.values.insert(key, value)
    }

    pub fn get(&self, key: Key) -> Option<&DynVector<T>> {
        self.values.get(&key)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut DynVector<T>> {
        self.values.get_mut(&key)
    }

    /// Like [`get`](Self::get) but a missing key is a
    /// [`MissingValue`](InferenceError::MissingValue) error.
    pub fn at(&self, key: Key) -> Result<&DynVector<T>, InferenceError> {
        self.values.get(&key).ok_or(InferenceError::MissingValue(key))
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Key, DynVector<T>> {
        self.values.iter()
    }
}

impl<T: FloatScalar> VectorValues<T> {
    /// Zero vectors with the same keys and dimensions.
    pub fn zero_like(&self) -> Self {
        self.values
            .iter()
            .map(|(&k, v)| (k, DynVector::zeros(v.len())))
            .collect()
    }

    /// Zero vectors for the given `(key, dim)` pairs.
    pub fn zeros(dims: impl IntoIterator<Item = (Key, usize)>) -> Self {
        dims.into_iter().map(|(k, d)| (k, DynVector::zeros(d))).collect()
    }

    /// Sum of per-key dot products. Keys missing on either side contribute nothing.
    pub fn dot(&self, rhs: &Self) -> T {
        self.values
            .iter()
            .filter_map(|(k, v)| rhs.values.get(k).map(|w| v.dot(w)))
            .fold(T::zero(), |acc, d| acc + d)
    }

    pub fn norm_squared(&self) -> T {
        self.dot(self)
    }

    pub fn norm(&self) -> T {
        self.norm_squared().sqrt()
    }

    pub fn scale(&self, s: T) -> Self {
        self.values.iter().map(|(&k, v)| (k, v.scaled(s))).collect()
    }

    /// Element-wise sum; both sides must have the same keys.
    pub fn add(&self, rhs: &Self) -> Result<Self, InferenceError> {
        self.zip_with(rhs, |a, b| a + b)
    }

    /// Element-wise difference; both sides must have the same keys.
    pub fn sub(&self, rhs: &Self) -> Result<Self, InferenceError> {
        self.zip_with(rhs, |a, b| a - b)
    }

    fn zip_with(&self, rhs: &Self, f: impl Fn(&DynVector<T>, &DynVector<T>) -> DynVector<T>) -> Result<Self, InferenceError> {
        if let Some(k) = rhs.keys().find(|k| !self.contains(*k)) {
            return Err(InferenceError::MissingValue(k));
        }
        self.values
            .iter()
            .map(|(&k, v)| {
                let w = rhs.at(k)?;
                if v.len() != w.len() {
                    return Err(InferenceError::DimensionMismatch {
                        key: k,
                        expected: v.len(),
                        got: w.len(),
                    });
                }
                Ok((k, f(v, w)))
            })
            .collect()
    }

    /// Concatenate the values of `ordering`'s keys into one vector.
    pub fn vector(&self, ordering: &Ordering) -> Result<DynVector<T>, InferenceError> {
        let parts = ordering
            .iter()
            .map(|&k| self.at(k))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DynVector::concat(&parts))
    }

    /// Largest absolute element difference over keys present in both.
    pub fn max_abs_diff(&self, rhs: &Self) -> T {
        self.values
            .iter()
            .filter_map(|(k, v)| rhs.values.get(k).map(|w| v.max_abs_diff(w)))
            .fold(T::zero(), |m, d| m.max(d))
    }
}

impl<T> FromIterator<(Key, DynVector<T>)> for VectorValues<T> {
    fn from_iter<I: IntoIterator<Item = (Key, DynVector<T>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a VectorValues<T> {
    type Item = (&'a Key, &'a DynVector<T>);
    type IntoIter = btree_map::Iter<'a, Key, DynVector<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vv(entries: &[(Key, &[f64])]) -> VectorValues<f64> {
        entries.iter().map(|&(k, v)| (k, DynVector::from_slice(v))).collect()
    }

    #[test]
    fn arithmetic() {
        let a = vv(&[(1, &[1.0, 2.0]), (2, &[3.0])]);
        let b = vv(&[(1, &[1.0, 1.0]), (2, &[-1.0])]);
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!(a.add(&b).unwrap(), vv(&[(1, &[2.0, 3.0]), (2, &[2.0])]));
        assert_eq!(a.sub(&b).unwrap(), vv(&[(1, &[0.0, 1.0]), (2, &[4.0])]));
        assert_eq!(a.scale(2.0).at(2).unwrap()[0], 6.0);
        assert_eq!(a.zero_like().norm(), 0.0);
    }

    #[test]
    fn mismatched_keys() {
        let a = vv(&[(1, &[1.0])]);
        let b = vv(&[(2, &[1.0])]);
        assert_eq!(a.add(&b), Err(InferenceError::MissingValue(2)));
        let c = vv(&[(1, &[1.0, 2.0])]);
        assert!(matches!(a.sub(&c), Err(InferenceError::DimensionMismatch { key: 1, .. })));
    }

    #[test]
    fn stacked_vector() {
        let a = vv(&[(1, &[1.0, 2.0]), (2, &[3.0])]);
        let ord = Ordering::new(alloc::vec![2, 1]).unwrap();
        assert_eq!(a.vector(&ord).unwrap().as_slice(), &[3.0, 1.0, 2.0]);
        let missing = Ordering::new(alloc::vec![5]).unwrap();
        assert_eq!(a.vector(&missing), Err(InferenceError::MissingValue(5)));
    }
}
