//! Integration tests for the out-of-core blocked Cholesky
//!
//! All tests run on the CPU backend with several logical devices, which
//! exercises the full multi-device schedule (staging, events, per-device
//! workspaces) without requiring an accelerator.

mod common;

use cholr::error::Error;
use cholr::matrix::MatMut;
use cholr::ooc::{cholesky, parallel_potrf, BlockAllocation, BlockPartition, ResourceRegistry};
use cholr::runtime::cpu::CpuRuntime;
use common::{at, norm_inf, reconstruction_error, spd_matrix};

/// Partition from a list of (block size, owning device) pairs
fn partition(specs: &[(usize, usize)]) -> BlockPartition {
    let mut blocks = Vec::with_capacity(specs.len());
    let mut cursor = 0;
    for (id, &(size, device)) in specs.iter().enumerate() {
        blocks.push(BlockAllocation::new(cursor, cursor + size, device, id).unwrap());
        cursor += size;
    }
    BlockPartition::new(blocks).unwrap()
}

fn registry(devices: &[usize]) -> ResourceRegistry<CpuRuntime> {
    ResourceRegistry::<CpuRuntime>::from_devices(devices).unwrap()
}

/// Tolerance scaled by matrix order and norm
fn tolerance(a: &[f64], n: usize) -> f64 {
    100.0 * n as f64 * f64::EPSILON * norm_inf(a, n, n)
}

fn factorize(a: &[f64], n: usize, specs: &[(usize, usize)], devices: &[usize]) -> Vec<f64> {
    let reg = registry(devices);
    let part = partition(specs);
    let mut buf = a.to_vec();
    let mut m = MatMut::from_slice(&mut buf, n, n, n).unwrap();
    parallel_potrf::<CpuRuntime, f64>(&reg, &part, &mut m).unwrap();
    buf
}

#[test]
fn test_single_block_single_device() {
    let n = 8;
    let a = spd_matrix(n);
    let factor = factorize(&a, n, &[(n, 0)], &[0]);
    let err = reconstruction_error(&factor, n, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_one_by_one_blocks() {
    let n = 6;
    let a = spd_matrix(n);
    let factor = factorize(&a, n, &[(1, 0), (1, 1), (1, 0), (1, 1), (1, 0), (1, 1)], &[0, 1]);
    let err = reconstruction_error(&factor, n, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_multi_block_multi_device() {
    let n = 64;
    let a = spd_matrix(n);
    let factor = factorize(&a, n, &[(16, 0), (24, 1), (24, 0)], &[0, 1]);
    let err = reconstruction_error(&factor, n, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_three_devices_uneven_blocks() {
    let n = 40;
    let a = spd_matrix(n);
    let factor = factorize(&a, n, &[(7, 2), (13, 0), (11, 1), (9, 2)], &[0, 1, 2]);
    let err = reconstruction_error(&factor, n, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_partition_invariance() {
    let n = 64;
    let a = spd_matrix(n);
    let f1 = factorize(&a, n, &[(32, 0), (32, 1)], &[0, 1]);
    let f2 = factorize(&a, n, &[(8, 1), (24, 0), (16, 1), (16, 0)], &[0, 1]);

    // Same factor up to floating-point reordering across blockings.
    for j in 0..n {
        for i in j..n {
            let d = (at(&f1, n, i, j) - at(&f2, n, i, j)).abs();
            assert!(d < 1e-9, "factors diverge at ({}, {}): {}", i, j, d);
        }
    }
}

#[test]
fn test_device_assignment_does_not_change_result() {
    // Identical blocking, devices swapped: the arithmetic sequence per entry
    // is unchanged, so the factors match bitwise on the CPU backend.
    let n = 48;
    let a = spd_matrix(n);
    let f1 = factorize(&a, n, &[(16, 0), (16, 1), (16, 0)], &[0, 1]);
    let f2 = factorize(&a, n, &[(16, 1), (16, 0), (16, 1)], &[0, 1]);

    for j in 0..n {
        for i in j..n {
            assert_eq!(at(&f1, n, i, j), at(&f2, n, i, j), "({}, {})", i, j);
        }
    }
}

#[test]
fn test_leading_dimension_exceeds_order() {
    let n = 24;
    let lda = n + 5;
    let a = spd_matrix(n);
    let mut buf = vec![0.0; lda * (n - 1) + n];
    for j in 0..n {
        for i in 0..n {
            buf[i + j * lda] = at(&a, n, i, j);
        }
    }

    let reg = registry(&[0, 1]);
    let part = partition(&[(10, 0), (14, 1)]);
    let mut m = MatMut::from_slice(&mut buf, n, n, lda).unwrap();
    parallel_potrf::<CpuRuntime, f64>(&reg, &part, &mut m).unwrap();

    let err = reconstruction_error(&buf, lda, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_upper_triangle_is_never_read() {
    let n = 32;
    let a = spd_matrix(n);
    let mut poisoned = a.clone();
    for j in 0..n {
        for i in 0..j {
            poisoned[i + j * n] = 555.0;
        }
    }

    let factor = factorize(&poisoned, n, &[(16, 0), (16, 1)], &[0, 1]);
    let err = reconstruction_error(&factor, n, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_not_positive_definite_names_first_failing_block() {
    let n = 32;
    let mut a = spd_matrix(n);
    // Break positive-definiteness inside the third block (rows 20..32).
    a[25 + 25 * n] = -1.0;

    let reg = registry(&[0, 1]);
    let part = partition(&[(10, 0), (10, 1), (12, 0)]);
    let mut buf = a.clone();
    let mut m = MatMut::from_slice(&mut buf, n, n, n).unwrap();
    let err = parallel_potrf::<CpuRuntime, f64>(&reg, &part, &mut m).unwrap_err();

    match err {
        Error::NotPositiveDefinite {
            block_id,
            device_id,
            leading_minor,
        } => {
            assert_eq!(block_id, 2);
            assert_eq!(device_id, 0);
            // Row 25 is the 6th row of the block.
            assert_eq!(leading_minor, 6);
        }
        other => panic!("expected NotPositiveDefinite, got {:?}", other),
    }
}

#[test]
fn test_unregistered_device_is_a_configuration_error() {
    let n = 8;
    let a = spd_matrix(n);
    let reg = registry(&[0, 1]);
    let part = partition(&[(4, 0), (4, 5)]);
    let mut buf = a.clone();
    let mut m = MatMut::from_slice(&mut buf, n, n, n).unwrap();
    let err = parallel_potrf::<CpuRuntime, f64>(&reg, &part, &mut m).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }), "got {:?}", err);
}

#[test]
fn test_partition_matrix_mismatch_rejected() {
    let n = 8;
    let mut buf = spd_matrix(n);
    let reg = registry(&[0]);
    let part = partition(&[(6, 0)]);
    let mut m = MatMut::from_slice(&mut buf, n, n, n).unwrap();
    let err = parallel_potrf::<CpuRuntime, f64>(&reg, &part, &mut m).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "got {:?}", err);
}

#[test]
fn test_cholesky_clean_zeroes_strict_upper() {
    let n = 24;
    let a = spd_matrix(n);
    let reg = registry(&[0, 1]);
    let part = partition(&[(8, 0), (16, 1)]);
    let mut buf = a.clone();
    let mut m = MatMut::from_slice(&mut buf, n, n, n).unwrap();
    cholesky::<CpuRuntime, f64>(&reg, &part, &mut m, true).unwrap();

    for j in 0..n {
        for i in 0..j {
            assert_eq!(at(&buf, n, i, j), 0.0, "({}, {}) not cleaned", i, j);
        }
    }
    let err = reconstruction_error(&buf, n, &a, n, n);
    assert!(err < tolerance(&a, n), "error {} too large", err);
}

#[test]
fn test_f32_factorization() {
    let n = 32;
    let a64 = spd_matrix(n);
    let a32: Vec<f32> = a64.iter().map(|&v| v as f32).collect();

    let reg = registry(&[0, 1]);
    let part = partition(&[(16, 0), (16, 1)]);
    let mut buf = a32.clone();
    let mut m = MatMut::from_slice(&mut buf, n, n, n).unwrap();
    parallel_potrf::<CpuRuntime, f32>(&reg, &part, &mut m).unwrap();

    let factor: Vec<f64> = buf.iter().map(|&v| v as f64).collect();
    let err = reconstruction_error(&factor, n, &a64, n, n);
    let tol = 100.0 * n as f64 * f32::EPSILON as f64 * norm_inf(&a64, n, n);
    assert!(err < tol, "error {} exceeds {}", err, tol);
}
