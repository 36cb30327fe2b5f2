use alloc::string::String;
use alloc::vec::Vec;

use crate::ordering::Key;

/// Structural errors raised by factor construction, elimination, solving,
/// and conditioning.
///
/// Numerical degeneracy (zero or tiny pivots) is never an error: it is left
/// in the data, visible on the diagonal of `R` and in the determinant.
///
/// ```
/// use gaussian_inference::{InferenceError, Ordering};
///
/// let err = Ordering::new(vec![1, 2, 1]).unwrap_err();
/// assert_eq!(err, InferenceError::DuplicateKey(1));
/// assert_eq!(err.to_string(), "variable 1 appears more than once");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InferenceError {
    /// A variable was requested that no supplied factor references.
    #[error("variable {0} does not appear in any factor")]
    UnknownVariable(Key),

    /// A block's column count disagrees with the variable's dimension.
    #[error("variable {key} has dimension {expected}, got a block with {got} columns")]
    DimensionMismatch { key: Key, expected: usize, got: usize },

    /// Blocks, right-hand side, or noise model disagree on the row count.
    #[error("expected {expected} rows, got {got}")]
    RowMismatch { expected: usize, got: usize },

    /// A key was listed twice in a factor, ordering, or frontal set.
    #[error("variable {0} appears more than once")]
    DuplicateKey(Key),

    /// Elimination was asked to eliminate nothing.
    #[error("no frontal variables given")]
    NoFrontals,

    /// A frontal variable has an all-zero column block and free variables
    /// were not permitted.
    #[error("frontal variable {0} has an all-zero column block")]
    ZeroFrontalBlock(Key),

    /// A value needed for solving or conditioning was not supplied.
    #[error("no value for variable {0}")]
    MissingValue(Key),

    /// A variable to retain does not appear in the conditionals.
    #[error("variable {0} is not part of the Bayes net")]
    NotInNet(Key),

    /// The elimination ordering misses a variable of the graph.
    #[error("variable {0} is in the graph but not in the ordering")]
    IncompleteOrdering(Key),

    /// A factor with hard-constraint rows has no information form.
    #[error("factor on {0:?} has hard-constraint rows and no information form")]
    ConstrainedInformation(Vec<Key>),

    /// A conditional's blocks are inconsistent.
    #[error("invalid conditional: {0}")]
    InvalidConditional(String),
}
