use core::fmt::Debug;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be used as matrix elements.
///
/// Blanket-implemented for all types satisfying the bounds.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num> Scalar for T {}

/// Trait for the real floating-point types the inference engine runs on.
///
/// Required by everything that whitens, triangularizes, or takes square
/// roots and logarithms: in practice `f32` and `f64`.
pub trait FloatScalar: Scalar + Float {
    /// `1/2`, used by the quadratic error `0.5·‖e‖²`.
    #[inline]
    fn half() -> Self {
        Self::one() / (Self::one() + Self::one())
    }
}

impl<T: Scalar + Float> FloatScalar for T {}

/// Read-only access to a matrix-like type.
///
/// Implemented by [`DynMatrix`](crate::DynMatrix) and by the borrowed
/// [`BlockView`](crate::dynmatrix::BlockView), so the triangular solvers and
/// factor arithmetic work on whole matrices and sub-blocks alike.
pub trait MatrixRef<T> {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn get(&self, row: usize, col: usize) -> &T;
}

/// Mutable access to a matrix-like type.
///
/// Extends `MatrixRef` with mutable element access, enabling
/// in-place algorithms (Householder, Gram-Schmidt, Cholesky) to work generically.
pub trait MatrixMut<T>: MatrixRef<T> {
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T;
}
