//! Elementwise and structural operations on matrix triangles

use rayon::prelude::*;

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{MatMut, MatRef};

/// Broadcast axis for [`vec_mul_triang`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Entry `(i, j)` is scaled by `v[i]`
    Row,
    /// Entry `(i, j)` is scaled by `v[j]`
    Col,
}

fn require_square<T: Element>(a: &MatMut<'_, T>) -> Result<usize> {
    if !a.is_square() {
        return Err(Error::invalid_argument(
            "a",
            format!("expected a square matrix, got {}x{}", a.rows(), a.cols()),
        ));
    }
    Ok(a.rows())
}

/// Mirror the populated triangle of `a` into the other, making it symmetric.
///
/// If `upper` is true the upper triangle is the source, otherwise the lower.
/// The diagonal is shared and never touched. Idempotent.
pub fn copy_triang<T: Element>(a: &mut MatMut<'_, T>, upper: bool) -> Result<()> {
    let n = require_square(a)?;
    let ld = a.ld();
    let data = a.as_mut_slice();
    for j in 1..n {
        for i in 0..j {
            // (i, j) is the upper entry, (j, i) its lower mirror
            if upper {
                data[j + i * ld] = data[i + j * ld];
            } else {
                data[i + j * ld] = data[j + i * ld];
            }
        }
    }
    Ok(())
}

/// Scale every entry of the named triangle of `a` by `multiplier`.
///
/// The diagonal belongs to the triangle; pass `preserve_diag` to leave it
/// untouched regardless of the multiplier. A multiplier of zero with
/// `preserve_diag` zeroes the strict triangle, which is how the factorization
/// driver cleans the undefined side of its output.
pub fn mul_triang<T: Element>(
    a: &mut MatMut<'_, T>,
    upper: bool,
    preserve_diag: bool,
    multiplier: f64,
) -> Result<()> {
    let n = require_square(a)?;
    let ld = a.ld();
    let m = T::from_f64(multiplier);
    a.as_mut_slice()
        .par_chunks_mut(ld)
        .enumerate()
        .for_each(|(j, col)| {
            let (lo, hi) = if upper { (0, j + 1) } else { (j, n) };
            for i in lo..hi {
                if preserve_diag && i == j {
                    continue;
                }
                col[i] = col[i] * m;
            }
        });
    Ok(())
}

/// Elementwise-scale the named triangle of `a` by the vector `v`.
///
/// `side` picks the broadcast axis: [`Side::Row`] scales entry `(i, j)` by
/// `v[i]`, [`Side::Col`] by `v[j]`. The diagonal belongs to the triangle.
/// This is diagonal preconditioning without materializing `diag(v)`.
pub fn vec_mul_triang<T: Element>(
    a: &mut MatMut<'_, T>,
    v: &[T],
    upper: bool,
    side: Side,
) -> Result<()> {
    let n = require_square(a)?;
    if v.len() != n {
        return Err(Error::invalid_argument(
            "v",
            format!("expected {} entries to match the matrix order, got {}", n, v.len()),
        ));
    }
    let ld = a.ld();
    a.as_mut_slice()
        .par_chunks_mut(ld)
        .enumerate()
        .for_each(|(j, col)| {
            let (lo, hi) = if upper { (0, j + 1) } else { (j, n) };
            match side {
                Side::Row => {
                    for i in lo..hi {
                        col[i] = col[i] * v[i];
                    }
                }
                Side::Col => {
                    for i in lo..hi {
                        col[i] = col[i] * v[j];
                    }
                }
            }
        });
    Ok(())
}

/// Out-of-place transpose: `output = inputᵗ`.
///
/// Used to restage a block between row-major and column-major consumption.
/// `output` must be `input.cols() x input.rows()`.
pub fn copy_transpose<T: Element>(input: MatRef<'_, T>, output: &mut MatMut<'_, T>) -> Result<()> {
    if output.rows() != input.cols() || output.cols() != input.rows() {
        return Err(Error::invalid_argument(
            "output",
            format!(
                "expected a {}x{} output for a {}x{} input",
                input.cols(),
                input.rows(),
                input.rows(),
                input.cols()
            ),
        ));
    }
    let rows_out = output.rows();
    let ld_out = output.ld();
    output
        .as_mut_slice()
        .par_chunks_mut(ld_out)
        .enumerate()
        .for_each(|(j, col)| {
            // output column j is input row j
            for (i, slot) in col.iter_mut().enumerate().take(rows_out) {
                *slot = input.at(j, i);
            }
        });
    Ok(())
}
