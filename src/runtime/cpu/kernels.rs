//! Block-level compute kernels on column-major host memory
//!
//! These are the four operations the blocked factorization composes: panel
//! POTRF, the right-side triangular solve, the symmetric rank-k update and the
//! general rank-k update. All operate on raw column-major storage with an
//! explicit leading dimension, matching what the staging buffers hold.
//!
//! The two GEMM-shaped kernels parallelize over output columns with rayon once
//! the update is large enough to amortize the fork; every output element is
//! still accumulated by a single serial loop, so results are deterministic
//! regardless of thread count.

use rayon::prelude::*;

use crate::dtype::Element;

/// Minimum flop count before the rank-update kernels go parallel
const PAR_FLOP_THRESHOLD: usize = 32_768;

/// In-place unblocked Cholesky of the lower triangle (Cholesky-Banachiewicz).
///
/// Returns 0 on success, or `j + 1` if the leading minor of order `j + 1` is
/// not positive definite.
///
/// # Safety
///
/// `a` must point to a column-major `n x n` block with leading dimension
/// `lda >= n`.
pub(crate) unsafe fn potrf_lower<T: Element>(n: usize, a: *mut T, lda: usize) -> u32 {
    for j in 0..n {
        let mut sum_sq = T::zero();
        for t in 0..j {
            let v = *a.add(j + t * lda);
            sum_sq = sum_sq + v * v;
        }

        let diag = *a.add(j + j * lda) - sum_sq;
        if diag.to_f64() <= 0.0 {
            return (j + 1) as u32;
        }
        let diag = diag.sqrt();
        *a.add(j + j * lda) = diag;

        for i in (j + 1)..n {
            let mut acc = *a.add(i + j * lda);
            for t in 0..j {
                acc = acc - *a.add(i + t * lda) * *a.add(j + t * lda);
            }
            *a.add(i + j * lda) = acc / diag;
        }
    }
    0
}

/// Right-side triangular solve `B := B · L⁻ᵗ`.
///
/// `L` is `n x n` lower triangular with a non-singular diagonal (it comes out
/// of a successful POTRF), `B` is `m x n`. Columns of the result depend on
/// earlier columns, so the outer loop is sequential.
///
/// # Safety
///
/// `l` and `b` must point to column-major blocks of the stated shapes with
/// `ldl >= n`, `ldb >= m`, and must not overlap.
pub(crate) unsafe fn trsm_right_lower_trans<T: Element>(
    m: usize,
    n: usize,
    l: *const T,
    ldl: usize,
    b: *mut T,
    ldb: usize,
) {
    for j in 0..n {
        let bj = b.add(j * ldb);
        for t in 0..j {
            let coef = *l.add(j + t * ldl);
            let bt = b.add(t * ldb);
            for i in 0..m {
                *bj.add(i) = *bj.add(i) - coef * *bt.add(i);
            }
        }
        let inv = T::one() / *l.add(j + j * ldl);
        for i in 0..m {
            *bj.add(i) = *bj.add(i) * inv;
        }
    }
}

/// Symmetric rank-k update `C := alpha · A·Aᵗ + beta · C`, lower triangle only.
///
/// `A` is `n x k`, `C` is `n x n`; entries strictly above the diagonal of `C`
/// are never read or written.
///
/// # Safety
///
/// `a` and `c` must point to column-major blocks of the stated shapes with
/// `lda >= n`, `ldc >= n`, and must not overlap.
pub(crate) unsafe fn syrk_lower<T: Element>(
    n: usize,
    k: usize,
    alpha: T,
    a: *const T,
    lda: usize,
    beta: T,
    c: *mut T,
    ldc: usize,
) {
    if n == 0 {
        return;
    }
    let a_sl = std::slice::from_raw_parts(a, if k == 0 { 0 } else { lda * (k - 1) + n });
    let c_sl = std::slice::from_raw_parts_mut(c, ldc * (n - 1) + n);

    let body = |j: usize, col: &mut [T]| {
        for i in j..n {
            let mut acc = T::zero();
            for t in 0..k {
                acc = acc + a_sl[i + t * lda] * a_sl[j + t * lda];
            }
            col[i] = beta * col[i] + alpha * acc;
        }
    };

    if n >= 4 && n * n * k >= PAR_FLOP_THRESHOLD {
        c_sl.par_chunks_mut(ldc)
            .enumerate()
            .for_each(|(j, col)| body(j, col));
    } else {
        for (j, col) in c_sl.chunks_mut(ldc).enumerate() {
            body(j, col);
        }
    }
}

/// General update `C := alpha · A·Bᵗ + beta · C`.
///
/// `A` is `m x k`, `B` is `n x k`, `C` is `m x n`.
///
/// # Safety
///
/// All three pointers must reference column-major blocks of the stated shapes
/// (`lda >= m`, `ldb >= n`, `ldc >= m`); `c` must not overlap `a` or `b`.
#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn gemm_nt<T: Element>(
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: *const T,
    lda: usize,
    b: *const T,
    ldb: usize,
    beta: T,
    c: *mut T,
    ldc: usize,
) {
    if m == 0 || n == 0 {
        return;
    }
    let a_sl = std::slice::from_raw_parts(a, if k == 0 { 0 } else { lda * (k - 1) + m });
    let b_sl = std::slice::from_raw_parts(b, if k == 0 { 0 } else { ldb * (k - 1) + n });
    let c_sl = std::slice::from_raw_parts_mut(c, ldc * (n - 1) + m);

    let scale_beta = beta.to_f64() != 1.0;
    let body = |j: usize, col: &mut [T]| {
        if scale_beta {
            for slot in col.iter_mut().take(m) {
                *slot = beta * *slot;
            }
        }
        for t in 0..k {
            let coef = alpha * b_sl[j + t * ldb];
            let a_col = &a_sl[t * lda..t * lda + m];
            for i in 0..m {
                col[i] = col[i] + coef * a_col[i];
            }
        }
    };

    if n >= 4 && m * n * k >= PAR_FLOP_THRESHOLD {
        c_sl.par_chunks_mut(ldc)
            .enumerate()
            .for_each(|(j, col)| body(j, col));
    } else {
        for (j, col) in c_sl.chunks_mut(ldc).enumerate() {
            body(j, col);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_potrf_identity_scaled() {
        // 4 * I factors to 2 * I
        let n = 3;
        let mut a = vec![0.0f64; n * n];
        for j in 0..n {
            a[j + j * n] = 4.0;
        }
        let info = unsafe { potrf_lower(n, a.as_mut_ptr(), n) };
        assert_eq!(info, 0);
        for j in 0..n {
            assert!((a[j + j * n] - 2.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_potrf_reports_first_bad_minor() {
        let n = 2;
        // [[1, .], [2, 1]] -> second minor is 1 - 4 < 0
        let mut a = vec![1.0f64, 2.0, 0.0, 1.0];
        let info = unsafe { potrf_lower(n, a.as_mut_ptr(), n) };
        assert_eq!(info, 2);
    }

    #[test]
    fn test_trsm_right_lower_trans() {
        // L = [[2, 0], [1, 3]], B = X * L^T with X = [[1, 2], [3, 4]]
        // B = [[2*1, 1*1 + 3*2], [2*3, 1*3 + 3*4]] = [[2, 7], [6, 15]]
        let l = vec![2.0f64, 1.0, 0.0, 3.0];
        let mut b = vec![2.0f64, 6.0, 7.0, 15.0];
        unsafe { trsm_right_lower_trans(2, 2, l.as_ptr(), 2, b.as_mut_ptr(), 2) };
        assert!((b[0] - 1.0).abs() < 1e-14);
        assert!((b[1] - 3.0).abs() < 1e-14);
        assert!((b[2] - 2.0).abs() < 1e-14);
        assert!((b[3] - 4.0).abs() < 1e-14);
    }

    #[test]
    fn test_syrk_touches_lower_only() {
        let n = 2;
        let k = 1;
        let a = vec![1.0f64, 2.0];
        let mut c = vec![10.0f64, 10.0, 99.0, 10.0];
        unsafe { syrk_lower(n, k, -1.0, a.as_ptr(), n, 1.0, c.as_mut_ptr(), n) };
        assert_eq!(c[0], 9.0); // 10 - 1*1
        assert_eq!(c[1], 8.0); // 10 - 2*1
        assert_eq!(c[2], 99.0); // strictly upper, untouched
        assert_eq!(c[3], 6.0); // 10 - 2*2
    }

    #[test]
    fn test_gemm_nt() {
        // A (2x1) = [1, 2], B (2x1) = [3, 4], C := C - A B^T
        let a = vec![1.0f64, 2.0];
        let b = vec![3.0f64, 4.0];
        let mut c = vec![0.0f64; 4];
        unsafe {
            gemm_nt(
                2,
                2,
                1,
                -1.0,
                a.as_ptr(),
                2,
                b.as_ptr(),
                2,
                1.0,
                c.as_mut_ptr(),
                2,
            )
        };
        assert_eq!(c, vec![-3.0, -6.0, -4.0, -8.0]);
    }
}
