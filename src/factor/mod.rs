//! Linear Gaussian factors.
//!
//! [`JacobianFactor`] is the square-root form `‖W(A·x − b)‖²` that
//! elimination consumes; [`HessianFactor`] is the information form
//! `[G g; gᵀ f]`. [`GaussianFactor`] is the closed variant over both that
//! factor graphs hold.

mod hessian;
mod jacobian;

#[cfg(test)]
mod tests;

pub use hessian::HessianFactor;
pub use jacobian::JacobianFactor;

use alloc::borrow::Cow;
use alloc::vec::Vec;

use crate::error::InferenceError;
use crate::ordering::Key;
use crate::traits::FloatScalar;
use crate::values::VectorValues;
use crate::DynMatrix;

/// One factor of a [`GaussianFactorGraph`](crate::GaussianFactorGraph).
#[derive(Debug, Clone, PartialEq)]
pub enum GaussianFactor<T> {
    Jacobian(JacobianFactor<T>),
    Hessian(HessianFactor<T>),
}

impl<T: FloatScalar> GaussianFactor<T> {
    pub fn keys(&self) -> &[Key] {
        match self {
            GaussianFactor::Jacobian(f) => f.keys(),
            GaussianFactor::Hessian(f) => f.keys(),
        }
    }

    /// `(key, dim)` pairs in factor order.
    pub fn dims(&self) -> Vec<(Key, usize)> {
        match self {
            GaussianFactor::Jacobian(f) => f.dims().collect(),
            GaussianFactor::Hessian(f) => f.dims().collect(),
        }
    }

    /// Whether the factor contributes nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            GaussianFactor::Jacobian(f) => f.is_empty(),
            GaussianFactor::Hessian(f) => f.keys().is_empty() && f.constant_term() == T::zero(),
        }
    }

    pub fn error(&self, x: &VectorValues<T>) -> Result<T, InferenceError> {
        match self {
            GaussianFactor::Jacobian(f) => f.error(x),
            GaussianFactor::Hessian(f) => f.error(x),
        }
    }

    /// Accumulate this factor's gradient at `x` into `g`.
    pub fn gradient_add(&self, x: &VectorValues<T>, g: &mut VectorValues<T>) -> Result<(), InferenceError> {
        match self {
            GaussianFactor::Jacobian(f) => f.gradient_add(x, g),
            GaussianFactor::Hessian(f) => f.gradient_add(x, g),
        }
    }

    /// Augmented information matrix `[G g; gᵀ f]` in the factor's key order.
    pub fn augmented_information(&self) -> DynMatrix<T> {
        match self {
            GaussianFactor::Jacobian(f) => f.augmented_information(),
            GaussianFactor::Hessian(f) => f.augmented_information(),
        }
    }

    /// Square-root form; borrowed when the factor already is one.
    pub fn to_jacobian(&self) -> Cow<'_, JacobianFactor<T>> {
        match self {
            GaussianFactor::Jacobian(f) => Cow::Borrowed(f),
            GaussianFactor::Hessian(f) => Cow::Owned(f.to_jacobian()),
        }
    }
}

impl<T> From<JacobianFactor<T>> for GaussianFactor<T> {
    fn from(f: JacobianFactor<T>) -> Self {
        GaussianFactor::Jacobian(f)
    }
}

impl<T> From<HessianFactor<T>> for GaussianFactor<T> {
    fn from(f: HessianFactor<T>) -> Self {
        GaussianFactor::Hessian(f)
    }
}
