//! Dense kernels behind elimination.
//!
//! All of them work in place on anything implementing
//! [`MatrixMut`](crate::traits::MatrixMut): whole [`DynMatrix`](crate::DynMatrix)
//! buffers or the backing matrix of a
//! [`VerticalBlockMatrix`](crate::dynmatrix::VerticalBlockMatrix).
//!
//! | Kernel | Used for |
//! |---|---|
//! | [`householder_triangularize`] | QR of whitened factors without constraints |
//! | [`weighted_gram_schmidt`] | QR of factors with hard-constraint rows |
//! | [`cholesky_upper_semidefinite`] | Hessian to Jacobian conversion |
//! | [`solve_upper_in_place`] / [`solve_upper_transpose_in_place`] | conditional solves |

pub(crate) mod cholesky;
pub(crate) mod constrained;
pub(crate) mod householder;
pub(crate) mod triangular;

pub use cholesky::cholesky_upper_semidefinite;
pub use constrained::{weighted_gram_schmidt, weighted_pseudoinverse, Precision, WeightedRow};
pub use householder::householder_triangularize;
pub use triangular::{solve_upper_in_place, solve_upper_transpose_in_place};
