//! LAUUM: product of a triangular factor with its own transpose
//!
//! Reconstructs `A·Aᵗ` from a triangular `A`, restricted to the declared
//! triangle. Out of place, so a factor can be turned back into the
//! covariance-like matrix it came from while the factor stays intact.

use rayon::prelude::*;

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{MatMut, MatRef};

/// Compute `B = A·Aᵗ` restricted to one triangle of `B`.
///
/// `A` is triangular: only its `lower` (or upper) triangle is read, and only
/// the same triangle of `B` is written; the opposite triangle of `B` is left
/// untouched. `A` and `B` carry their own leading dimensions, either of which
/// may exceed the matrix order. The result is exact up to floating-point
/// accumulation order. No pivoting.
pub fn lauum<T: Element>(a: MatRef<'_, T>, b: &mut MatMut<'_, T>, lower: bool) -> Result<()> {
    if !a.is_square() || !b.is_square() {
        return Err(Error::invalid_argument(
            "a",
            format!(
                "expected square matrices, got {}x{} and {}x{}",
                a.rows(),
                a.cols(),
                b.rows(),
                b.cols()
            ),
        ));
    }
    if a.rows() != b.rows() {
        return Err(Error::invalid_argument(
            "b",
            format!(
                "input has order {} but output has order {}",
                a.rows(),
                b.rows()
            ),
        ));
    }

    let n = a.rows();
    let ldb = b.ld();
    b.as_mut_slice()
        .par_chunks_mut(ldb)
        .enumerate()
        .for_each(|(j, col)| {
            if lower {
                // A is lower triangular: A[i, k] is meaningful for k <= i, so
                // B[i, j] for i >= j only accumulates over k <= j.
                for i in j..n {
                    let mut acc = T::zero();
                    for k in 0..=j {
                        acc = acc + a.at(i, k) * a.at(j, k);
                    }
                    col[i] = acc;
                }
            } else {
                // A is upper triangular: rows i and j both populate k >= j
                // when i <= j.
                for i in 0..=j {
                    let mut acc = T::zero();
                    for k in j..n {
                        acc = acc + a.at(i, k) * a.at(j, k);
                    }
                    col[i] = acc;
                }
            }
        });
    Ok(())
}
