use alloc::vec::Vec;
use core::ops::Range;

use crate::traits::{MatrixRef, Scalar};

use super::{DynMatrix, DynVector};

/// Borrowed rectangular window into a [`DynMatrix`].
///
/// Addressed by `(row offset, col offset, rows, cols)`; no data is copied.
/// Implements [`MatrixRef`], so it can be handed to any generic kernel.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a, T> {
    matrix: &'a DynMatrix<T>,
    row0: usize,
    col0: usize,
    nrows: usize,
    ncols: usize,
}

impl<'a, T> BlockView<'a, T> {
    /// View of `rows x cols` elements of `matrix` starting at `(row0, col0)`.
    ///
    /// Panics if the window extends beyond the matrix.
    pub fn new(matrix: &'a DynMatrix<T>, row0: usize, col0: usize, rows: usize, cols: usize) -> Self {
        assert!(
            row0 + rows <= matrix.nrows() && col0 + cols <= matrix.ncols(),
            "block view ({},{}) size {}x{} out of bounds for {}x{} matrix",
            row0, col0, rows, cols, matrix.nrows(), matrix.ncols(),
        );
        Self {
            matrix,
            row0,
            col0,
            nrows: rows,
            ncols: cols,
        }
    }

    /// Restrict to rows `start..start + len` of this view.
    pub fn rows(&self, start: usize, len: usize) -> BlockView<'a, T> {
        assert!(start + len <= self.nrows, "row range out of bounds");
        BlockView {
            matrix: self.matrix,
            row0: self.row0 + start,
            col0: self.col0,
            nrows: len,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar> BlockView<'_, T> {
    /// Copy the viewed elements into an owned matrix.
    pub fn to_matrix(&self) -> DynMatrix<T> {
        DynMatrix::from_ref(self)
    }

    /// Column `j` of the view as an owned vector.
    pub fn column(&self, j: usize) -> DynVector<T> {
        (0..self.nrows).map(|i| *self.get(i, j)).collect()
    }

    /// `y += alpha · V·x`.
    pub fn gemv_add(&self, alpha: T, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols, "gemv: x length mismatch");
        assert_eq!(y.len(), self.nrows, "gemv: y length mismatch");
        for (j, &xj) in x.iter().enumerate() {
            let ax = alpha * xj;
            let col = &self.matrix.col_slice(self.col0 + j, self.row0)[..self.nrows];
            for (yi, &a) in y.iter_mut().zip(col) {
                *yi = *yi + a * ax;
            }
        }
    }

    /// `y += alpha · Vᵀ·x`.
    pub fn gemv_t_add(&self, alpha: T, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows, "gemv_t: x length mismatch");
        assert_eq!(y.len(), self.ncols, "gemv_t: y length mismatch");
        for (j, yj) in y.iter_mut().enumerate() {
            let col = &self.matrix.col_slice(self.col0 + j, self.row0)[..self.nrows];
            let mut dot = T::zero();
            for (&a, &xi) in col.iter().zip(x) {
                dot = dot + a * xi;
            }
            *yj = *yj + alpha * dot;
        }
    }

    /// Whether every element is exactly zero.
    pub fn is_zero(&self) -> bool {
        (0..self.ncols).all(|j| (0..self.nrows).all(|i| *self.get(i, j) == T::zero()))
    }
}

impl<T> MatrixRef<T> for BlockView<'_, T> {
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
        debug_assert!(row < self.nrows && col < self.ncols);
        self.matrix.get(self.row0 + row, self.col0 + col)
    }
}

/// A matrix partitioned into consecutive column blocks.
///
/// One owned column-major buffer; block `i` spans the columns
/// `offsets[i]..offsets[i + 1]`. Factors store `[A₁ … Aₙ | b]` this way and
/// conditionals store `[R S₁ … Sₖ | d]`, so per-variable access is a
/// zero-copy [`BlockView`] into the buffer.
///
/// ```
/// use gaussian_inference::dynmatrix::VerticalBlockMatrix;
///
/// let mut ab = VerticalBlockMatrix::<f64>::zeros(&[2, 3, 1], 2);
/// assert_eq!(ab.nblocks(), 3);
/// assert_eq!(ab.block_range(1), 2..5);
/// ab.full_mut()[(1, 4)] = 7.0;
/// assert_eq!(ab.block(1)[(1, 2)], 7.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalBlockMatrix<T> {
    matrix: DynMatrix<T>,
    offsets: Vec<usize>,
}

impl<T: Scalar> VerticalBlockMatrix<T> {
    /// Zero matrix with the given block widths and row count.
    pub fn zeros(dims: &[usize], rows: usize) -> Self {
        let offsets = Self::offsets_from(dims);
        let cols = *offsets.last().unwrap_or(&0);
        Self {
            matrix: DynMatrix::zeros(rows, cols),
            offsets,
        }
    }

    /// Partition an existing matrix. Panics if the widths do not sum to its column count.
    pub fn from_matrix(matrix: DynMatrix<T>, dims: &[usize]) -> Self {
        let offsets = Self::offsets_from(dims);
        assert_eq!(
            *offsets.last().unwrap_or(&0),
            matrix.ncols(),
            "block widths {:?} do not cover {} columns",
            dims,
            matrix.ncols(),
        );
        Self { matrix, offsets }
    }

    fn offsets_from(dims: &[usize]) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(dims.len() + 1);
        let mut acc = 0;
        offsets.push(0);
        for &d in dims {
            acc += d;
            offsets.push(acc);
        }
        offsets
    }

    /// Copy `src` into block `i` starting at row `row0`.
    pub fn set_block(&mut self, i: usize, row0: usize, src: &impl MatrixRef<T>) {
        assert_eq!(
            src.ncols(),
            self.block_width(i),
            "block {} has width {}, got {} columns",
            i,
            self.block_width(i),
            src.ncols(),
        );
        let col0 = self.offsets[i];
        self.matrix.set_block(row0, col0, src);
    }

    /// Copy a vector into the single-column block `i`.
    pub fn set_column_block(&mut self, i: usize, row0: usize, v: &[T]) {
        assert_eq!(self.block_width(i), 1, "block {} is not a column", i);
        let col = self.offsets[i];
        self.matrix.col_slice_mut(col, row0)[..v.len()].copy_from_slice(v);
    }

    /// Keep only rows `start..start + len`, preserving the block structure.
    pub fn row_range(&self, start: usize, len: usize) -> Self {
        Self {
            matrix: self.matrix.block(start, 0, len, self.matrix.ncols()),
            offsets: self.offsets.clone(),
        }
    }
}

impl<T> VerticalBlockMatrix<T> {
    /// Number of column blocks.
    #[inline]
    pub fn nblocks(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Total number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Width of block `i`.
    #[inline]
    pub fn block_width(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    /// Column range of block `i`.
    #[inline]
    pub fn block_range(&self, i: usize) -> Range<usize> {
        self.offsets[i]..self.offsets[i + 1]
    }

    /// Column offset of block `i` (also valid for `i == nblocks()`).
    #[inline]
    pub fn offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    /// All rows of block `i`.
    pub fn block(&self, i: usize) -> BlockView<'_, T> {
        BlockView::new(&self.matrix, 0, self.offsets[i], self.rows(), self.block_width(i))
    }

    /// All rows of the contiguous blocks `first..last`.
    pub fn blocks(&self, first: usize, last: usize) -> BlockView<'_, T> {
        let c0 = self.offsets[first];
        let c1 = self.offsets[last];
        BlockView::new(&self.matrix, 0, c0, self.rows(), c1 - c0)
    }

    /// The whole backing matrix.
    #[inline]
    pub fn full(&self) -> &DynMatrix<T> {
        &self.matrix
    }

    /// Mutable access to the backing matrix (the block layout is fixed).
    #[inline]
    pub fn full_mut(&mut self) -> &mut DynMatrix<T> {
        &mut self.matrix
    }
}

impl<T> core::ops::Index<(usize, usize)> for BlockView<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        self.get(row, col)
    }
}
