//! # gaussian-inference
//!
//! Sparse linear Gaussian inference, no-std compatible (with `alloc`). Turns
//! an unordered collection of linear Gaussian factors into a Bayes net of
//! Gaussian conditionals by QR elimination, solves and differentiates that
//! net by back-substitution, and reduces a solved net onto a subset of its
//! variables.
//!
//! ## Quick start
//!
//! ```
//! use gaussian_inference::{
//!     DynMatrix, DynVector, EliminationSettings, GaussianFactorGraph, NoiseModel, Ordering,
//! };
//!
//! // Prior x1 = 0, odometry x2 - x1 = 2 and x3 - x2 = 2
//! let mut graph = GaussianFactorGraph::new();
//! let model = Some(NoiseModel::isotropic(1, 0.1));
//! let one = || DynMatrix::from_rows(1, 1, &[1.0_f64]);
//! let minus_one = || DynMatrix::from_rows(1, 1, &[-1.0_f64]);
//! graph.add_jacobian(vec![(1, one())], DynVector::from_slice(&[0.0]), model.clone()).unwrap();
//! graph.add_jacobian(vec![(1, minus_one()), (2, one())], DynVector::from_slice(&[2.0]), model.clone()).unwrap();
//! graph.add_jacobian(vec![(2, minus_one()), (3, one())], DynVector::from_slice(&[2.0]), model).unwrap();
//!
//! let ordering = Ordering::new(vec![1, 2, 3]).unwrap();
//! let net = graph.eliminate_sequential(&ordering, &EliminationSettings::default()).unwrap();
//! let x = net.optimize().unwrap();
//! assert!((x.at(3).unwrap()[0] - 4.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`dynmatrix`]: Heap-allocated column-major `DynMatrix<T>` / `DynVector<T>`,
//!   plus [`VerticalBlockMatrix`](dynmatrix::VerticalBlockMatrix): one owned
//!   buffer split into per-variable column blocks, with zero-copy
//!   [`BlockView`](dynmatrix::BlockView)s addressed by offset and length.
//!
//! - [`linalg`]: In-place kernels on `&mut impl MatrixMut<T>`: Householder
//!   triangularization to row-echelon form, weighted Gram-Schmidt for rows
//!   with hard constraints, semidefinite Cholesky, and triangular solves.
//!
//! - [`factor`]: [`JacobianFactor`] (`‖W(A·x − b)‖²`), [`HessianFactor`]
//!   (information form), and the closed variant [`GaussianFactor`].
//!
//! - Elimination: [`eliminate_qr`] removes a set of frontal variables from a
//!   set of factors, producing one [`GaussianConditional`] and one residual
//!   factor. [`GaussianFactorGraph::eliminate_sequential`] repeats it over a
//!   full [`Ordering`] to build a [`GaussianBayesNet`].
//!
//! - Bayes net: [`GaussianBayesNet`] solves by back-substitution, computes
//!   gradients, determinants, the Cauchy point, and the dense `(R, d)` form.
//!
//! - Conditioning: [`condition`], [`condition_bayes_net`], and [`summarize`]
//!   substitute solved values for removed variables;
//!   [`summarize_graph_sequential`] marginalizes by elimination instead.
//!
//! - [`traits`]: Element trait hierarchy:
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`]: real floats (`Scalar + Float`), used by every numerical routine
//!   - [`MatrixRef`] / [`MatrixMut`]: generic read/write access for kernels
//!
//! ## Hard constraints
//!
//! A noise sigma of exactly zero marks a row as a hard constraint. Any factor
//! set containing one is eliminated by weighted Gram-Schmidt instead of
//! Householder QR, and the constraint survives as a zero-sigma row of the
//! conditional (or of the residual factor), so it stays exactly satisfied.
//!
//! ## Cargo features
//!
//! | Feature   | Default  | Description |
//! |-----------|----------|-------------|
//! | `std`     | yes      | Hardware FPU via system libm, `std::error::Error` for [`InferenceError`] |
//! | `libm`    | no       | Pure-Rust software float fallback for `no_std` targets |
//! | `tracing` | no       | `debug`/`trace` events from elimination and conditioning via `tracing` |
//! | `all`     | no       | `std` + `tracing` |
//!
//! One of `std` or `libm` must be enabled.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("enable either the `std` or the `libm` feature for float intrinsics");

extern crate alloc;

mod bayes_net;
mod conditional;
mod conditioning;
pub mod dynmatrix;
mod eliminate;
mod error;
pub mod factor;
mod graph;
pub mod linalg;
mod noise;
mod ordering;
pub mod traits;
mod values;

#[cfg(test)]
mod proptests;

pub use bayes_net::GaussianBayesNet;
pub use conditional::GaussianConditional;
pub use conditioning::{condition, condition_bayes_net, condition_density, summarize, summarize_graph_sequential};
pub use dynmatrix::{DynMatrix, DynVector};
pub use eliminate::{eliminate_qr, EliminationResult, EliminationSettings};
pub use error::InferenceError;
pub use factor::{GaussianFactor, HessianFactor, JacobianFactor};
pub use graph::{GaussianFactorGraph, VariableIndex};
pub use noise::NoiseModel;
pub use ordering::{Key, Ordering};
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
pub use values::VectorValues;
