use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::error::InferenceError;

/// Variable identifier. Opaque: its numeric value implies no ordering, and
/// its dimension is discovered from the factors that reference it.
pub type Key = u64;

/// An explicit elimination sequence.
///
/// Immutable once built and passed by reference into every elimination
/// call; the engine never stores an ordering between calls.
///
/// ```
/// use gaussian_inference::Ordering;
///
/// let ord = Ordering::new(vec![3, 1, 2]).unwrap();
/// assert_eq!(ord.position(1), Some(1));
/// assert!(!ord.contains(7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ordering {
    keys: Vec<Key>,
}

impl Ordering {
    /// Build from a key sequence. Fails on duplicates.
    pub fn new(keys: Vec<Key>) -> Result<Self, InferenceError> {
        let mut seen = BTreeSet::new();
        for &k in &keys {
            if !seen.insert(k) {
                return Err(InferenceError::DuplicateKey(k));
            }
        }
        Ok(Self { keys })
    }

    /// Keys in ascending numeric order, deduplicated.
    pub fn natural(keys: impl IntoIterator<Item = Key>) -> Self {
        let set: BTreeSet<Key> = keys.into_iter().collect();
        Self {
            keys: set.into_iter().collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Key> {
        self.keys.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Key] {
        &self.keys
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    /// Index of `key` in the sequence.
    pub fn position(&self, key: Key) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }
}

impl<'a> IntoIterator for &'a Ordering {
    type Item = &'a Key;
    type IntoIter = core::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
