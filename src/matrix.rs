//! Column-major strided matrix views
//!
//! All of cholr operates on column-major (Fortran-order) buffers with an
//! explicit leading dimension: element `(i, j)` lives at `data[i + j * ld]`.
//! The leading dimension may exceed the row count, so a view can describe a
//! sub-block of a larger buffer without copying.
//!
//! Views are borrowed, not owned. Operations that permit in-place aliasing
//! take a single `&mut MatMut`; operations that require disjoint storage take
//! separate `MatRef`/`MatMut` arguments, which the borrow checker keeps
//! disjoint.

use crate::dtype::Element;
use crate::error::{Error, Result};

fn required_len(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    }
}

fn validate_dims(len: usize, rows: usize, cols: usize, ld: usize) -> Result<()> {
    if ld < rows.max(1) {
        return Err(Error::invalid_argument(
            "ld",
            format!("leading dimension {} is smaller than row count {}", ld, rows),
        ));
    }
    let required = required_len(rows, cols, ld);
    if len < required {
        return Err(Error::invalid_argument(
            "data",
            format!(
                "buffer holds {} elements but a {}x{} view with ld {} needs {}",
                len, rows, cols, ld, required
            ),
        ));
    }
    Ok(())
}

/// Shared view of a column-major matrix
#[derive(Clone, Copy)]
pub struct MatRef<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    ld: usize,
}

impl<'a, T: Element> MatRef<'a, T> {
    /// Create a view over `data` with the given shape and leading dimension.
    ///
    /// Fails if `ld < rows` or the buffer is too short for the view.
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize, ld: usize) -> Result<Self> {
        validate_dims(data.len(), rows, cols, ld)?;
        Ok(Self {
            data,
            rows,
            cols,
            ld,
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Leading dimension (stride between columns)
    pub fn ld(&self) -> usize {
        self.ld
    }

    /// Whether the view is square
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Element at `(i, j)`
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i + j * self.ld]
    }

}

/// Mutable view of a column-major matrix
pub struct MatMut<'a, T> {
    data: &'a mut [T],
    rows: usize,
    cols: usize,
    ld: usize,
}

impl<'a, T: Element> MatMut<'a, T> {
    /// Create a mutable view over `data` with the given shape and leading
    /// dimension.
    ///
    /// Fails if `ld < rows` or the buffer is too short for the view.
    pub fn from_slice(data: &'a mut [T], rows: usize, cols: usize, ld: usize) -> Result<Self> {
        validate_dims(data.len(), rows, cols, ld)?;
        Ok(Self {
            data,
            rows,
            cols,
            ld,
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Leading dimension (stride between columns)
    pub fn ld(&self) -> usize {
        self.ld
    }

    /// Whether the view is square
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Element at `(i, j)`
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> T {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i + j * self.ld]
    }

    /// Overwrite the element at `(i, j)`
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: T) {
        debug_assert!(i < self.rows && j < self.cols);
        self.data[i + j * self.ld] = v;
    }

    /// Reborrow as a shared view
    pub fn as_ref(&self) -> MatRef<'_, T> {
        MatRef {
            data: self.data,
            rows: self.rows,
            cols: self.cols,
            ld: self.ld,
        }
    }

    /// Raw pointer to the element at `(i, j)`.
    ///
    /// Used to hand sub-block origins to the staging primitives; dereferencing
    /// is only valid while the view is borrowed.
    pub(crate) fn ptr_at(&mut self, i: usize, j: usize) -> *mut T {
        debug_assert!(i < self.rows && j < self.cols);
        unsafe { self.data.as_mut_ptr().add(i + j * self.ld) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        let len = required_len(self.rows, self.cols, self.ld);
        &mut self.data[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_validation() {
        let buf = vec![0.0f64; 10];
        assert!(MatRef::from_slice(&buf, 3, 3, 3).is_ok());
        assert!(MatRef::from_slice(&buf, 3, 3, 2).is_err()); // ld < rows
        assert!(MatRef::from_slice(&buf, 3, 4, 3).is_err()); // too short
        // ld > rows with exactly enough storage: 4 * 2 + 3 = 11 > 10
        assert!(MatRef::from_slice(&buf, 3, 3, 4).is_err());
        let buf = vec![0.0f64; 11];
        assert!(MatRef::from_slice(&buf, 3, 3, 4).is_ok());
    }

    #[test]
    fn test_indexing_is_column_major() {
        let mut buf: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let m = MatMut::from_slice(&mut buf, 3, 4, 3).unwrap();
        assert_eq!(m.at(0, 0), 0.0);
        assert_eq!(m.at(2, 0), 2.0);
        assert_eq!(m.at(0, 1), 3.0);
        assert_eq!(m.at(2, 3), 11.0);
    }
}
