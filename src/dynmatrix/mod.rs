mod block;
mod ops;
mod vector;

pub use block::{BlockView, VerticalBlockMatrix};
pub use vector::DynVector;

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use crate::traits::{MatrixMut, MatrixRef, Scalar};

/// Dynamically-sized heap-allocated matrix.
///
/// Column-major `Vec<T>` storage. Dimensions are set at runtime.
/// Implements [`MatrixRef`] and [`MatrixMut`], so the generic triangular
/// solvers and QR kernels in [`crate::linalg`] work with `DynMatrix` directly.
///
/// # Examples
///
/// ```
/// use gaussian_inference::DynMatrix;
///
/// let a = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.nrows(), 2);
///
/// let b = DynMatrix::<f64>::eye(3);
/// assert_eq!(b[(0, 0)], 1.0);
/// assert_eq!(b[(0, 1)], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DynMatrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> DynMatrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    ///
    /// ```
    /// use gaussian_inference::DynMatrix;
    /// let m = DynMatrix::<f64>::zeros(2, 3);
    /// assert_eq!(m.ncols(), 3);
    /// assert_eq!(m[(1, 2)], 0.0);
    /// ```
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![T::zero(); nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create an `n x n` identity matrix.
    pub fn eye(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    /// `scale · I` of size `n x n`.
    pub fn scaled_eye(n: usize, scale: T) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = scale;
        }
        m
    }

    /// Square diagonal matrix from a slice of diagonal entries.
    pub fn from_diag(diag: &[T]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &v) in diag.iter().enumerate() {
            m[(i, i)] = v;
        }
        m
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// Transposes the data to column-major internal storage.
    ///
    /// ```
    /// use gaussian_inference::DynMatrix;
    /// let m = DynMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// assert_eq!(m[(0, 2)], 3.0);
    /// assert_eq!(m[(1, 0)], 4.0);
    /// ```
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        let mut data = vec![T::zero(); nrows * ncols];
        for i in 0..nrows {
            for j in 0..ncols {
                data[j * nrows + i] = row_major[i * ncols + j];
            }
        }
        Self { data, nrows, ncols }
    }

    /// Create a matrix from an owned `Vec<T>` in column-major order.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            nrows * ncols,
            "vec length {} does not match {}x{} matrix",
            data.len(),
            nrows,
            ncols,
        );
        Self { data, nrows, ncols }
    }

    /// Copy any [`MatrixRef`] (for instance a [`BlockView`]) into an owned matrix.
    pub fn from_ref(m: &impl MatrixRef<T>) -> Self {
        Self::from_fn(m.nrows(), m.ncols(), |i, j| *m.get(i, j))
    }

    /// Stack matrices with equal column counts on top of each other.
    ///
    /// An empty list produces a `0 x 0` matrix.
    pub fn vstack(parts: &[&DynMatrix<T>]) -> Self {
        let ncols = parts.first().map_or(0, |p| p.ncols);
        let nrows = parts.iter().map(|p| p.nrows).sum();
        let mut out = Self::zeros(nrows, ncols);
        let mut row = 0;
        for p in parts {
            assert_eq!(p.ncols, ncols, "vstack: column count mismatch");
            out.set_block(row, 0, *p);
            row += p.nrows;
        }
        out
    }
}

impl<T> DynMatrix<T> {
    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Whether the matrix holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Create a matrix by calling `f(row, col)` for each element.
    ///
    /// ```
    /// use gaussian_inference::DynMatrix;
    /// let m = DynMatrix::from_fn(3, 3, |i, j| if i == j { 1.0_f64 } else { 0.0 });
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(0, 1)], 0.0);
    /// ```
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// View the column-major storage as a flat slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// View the column-major storage as a flat mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Column `col` from row `row_start` down, as a contiguous slice.
    #[inline]
    pub fn col_slice(&self, col: usize, row_start: usize) -> &[T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &self.data[start..end]
    }

    /// Mutable column `col` from row `row_start` down.
    #[inline]
    pub fn col_slice_mut(&mut self, col: usize, row_start: usize) -> &mut [T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &mut self.data[start..end]
    }
}

impl<T: Scalar> DynMatrix<T> {
    /// Extract a sub-matrix of size `rows x cols` starting at `(i, j)`.
    ///
    /// Panics if the block extends beyond the matrix bounds.
    pub fn block(&self, i: usize, j: usize, rows: usize, cols: usize) -> Self {
        assert!(
            i + rows <= self.nrows && j + cols <= self.ncols,
            "block ({},{}) size {}x{} out of bounds for {}x{} matrix",
            i, j, rows, cols, self.nrows, self.ncols,
        );
        DynMatrix::from_fn(rows, cols, |r, c| self[(i + r, j + c)])
    }

    /// Write a sub-matrix into self starting at position `(i, j)`.
    ///
    /// Panics if the block extends beyond the matrix bounds.
    pub fn set_block(&mut self, i: usize, j: usize, src: &impl MatrixRef<T>) {
        let (rows, cols) = (src.nrows(), src.ncols());
        assert!(
            i + rows <= self.nrows && j + cols <= self.ncols,
            "set_block ({},{}) size {}x{} out of bounds for {}x{} matrix",
            i, j, rows, cols, self.nrows, self.ncols,
        );
        for c in 0..cols {
            for r in 0..rows {
                self[(i + r, j + c)] = *src.get(r, c);
            }
        }
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        DynMatrix::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
    }

    /// Multiply every entry of row `i` by `s`.
    pub fn scale_row(&mut self, i: usize, s: T) {
        for j in 0..self.ncols {
            let v = self[(i, j)];
            self[(i, j)] = v * s;
        }
    }

    /// Diagonal entries (length `min(nrows, ncols)`).
    pub fn diag(&self) -> DynVector<T> {
        let n = self.nrows.min(self.ncols);
        DynVector::from_vec((0..n).map(|i| self[(i, i)]).collect())
    }

    /// Matrix-vector product `A·x`.
    pub fn mul_vec(&self, x: &[T]) -> DynVector<T> {
        assert_eq!(x.len(), self.ncols, "mul_vec: dimension mismatch");
        let mut y = DynVector::zeros(self.nrows);
        for (j, &xj) in x.iter().enumerate() {
            let col = self.col_slice(j, 0);
            for (yi, &a) in y.as_mut_slice().iter_mut().zip(col) {
                *yi = *yi + a * xj;
            }
        }
        y
    }

    /// Transposed matrix-vector product `Aᵀ·x`.
    pub fn tr_mul_vec(&self, x: &[T]) -> DynVector<T> {
        assert_eq!(x.len(), self.nrows, "tr_mul_vec: dimension mismatch");
        let mut y = DynVector::zeros(self.ncols);
        for j in 0..self.ncols {
            let col = self.col_slice(j, 0);
            let mut sum = T::zero();
            for (&a, &xi) in col.iter().zip(x) {
                sum = sum + a * xi;
            }
            y[j] = sum;
        }
        y
    }
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

impl<T> MatrixRef<T> for DynMatrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self.data[col * self.nrows + row]
    }
}

impl<T> MatrixMut<T> for DynMatrix<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for DynMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[col * self.nrows + row]
    }
}

impl<T> IndexMut<(usize, usize)> for DynMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }
}
