//! Shared helpers for integration tests

#![allow(dead_code)]

/// Build a column-major buffer for an `rows x cols` matrix with leading
/// dimension `ld`, filling entry (i, j) from `f` and padding with zeros.
pub fn col_major<F: Fn(usize, usize) -> f64>(rows: usize, cols: usize, ld: usize, f: F) -> Vec<f64> {
    let len = if rows == 0 || cols == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    };
    let mut buf = vec![0.0; len];
    for j in 0..cols {
        for i in 0..rows {
            buf[i + j * ld] = f(i, j);
        }
    }
    buf
}

/// Element (i, j) of a column-major buffer
pub fn at(buf: &[f64], ld: usize, i: usize, j: usize) -> f64 {
    buf[i + j * ld]
}

/// Deterministic dense factor used to build SPD test matrices
pub fn seed_entry(i: usize, j: usize) -> f64 {
    ((i * 7 + j * 13) % 19) as f64 / 19.0
}

/// Deterministic SPD matrix: `B·Bᵗ + n·I` with `B` from [`seed_entry`].
///
/// Returned column-major with `ld = n`.
pub fn spd_matrix(n: usize) -> Vec<f64> {
    col_major(n, n, n, |i, j| {
        let mut acc = 0.0;
        for k in 0..n {
            acc += seed_entry(i, k) * seed_entry(j, k);
        }
        if i == j {
            acc += n as f64;
        }
        acc
    })
}

/// Infinity norm of a column-major `n x n` matrix
pub fn norm_inf(a: &[f64], n: usize, ld: usize) -> f64 {
    let mut norm: f64 = 0.0;
    for i in 0..n {
        let mut row = 0.0;
        for j in 0..n {
            row += at(a, ld, i, j).abs();
        }
        norm = norm.max(row);
    }
    norm
}

/// Largest entry of `|L·Lᵗ - A|` where `L` is the lower triangle of `factor`
/// (the strict upper triangle of `factor` is ignored).
pub fn reconstruction_error(factor: &[f64], ld_f: usize, a: &[f64], ld_a: usize, n: usize) -> f64 {
    let l = |i: usize, j: usize| if j <= i { at(factor, ld_f, i, j) } else { 0.0 };
    let mut worst: f64 = 0.0;
    for j in 0..n {
        for i in 0..n {
            let mut acc = 0.0;
            for k in 0..=i.min(j) {
                acc += l(i, k) * l(j, k);
            }
            worst = worst.max((acc - at(a, ld_a, i, j)).abs());
        }
    }
    worst
}
