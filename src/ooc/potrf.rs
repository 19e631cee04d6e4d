//! Out-of-core blocked Cholesky scheduler
//!
//! Implements the blocked right-looking algorithm across devices. The matrix
//! lives in host memory; each device owns a partition of the block-columns and
//! stages them into a fixed workspace (two block-column buffers) as the
//! schedule touches them, so device memory use is bounded regardless of the
//! matrix size.
//!
//! For each block-column k, in ascending `start` order (a correctness
//! dependency, not a heuristic):
//!
//! 1. the owning device stages the column in and factorizes the diagonal
//!    block (POTRF), then applies the panel solve (TRSM) to the rows below;
//! 2. the factorized column is staged back to its home slot in the host
//!    matrix and an event is recorded;
//! 3. every later block-column j is updated on *its* owner: the owner waits
//!    on k's event if the panel crossed devices, stages the panel and its own
//!    trailing blocks in, applies SYRK (diagonal block) and GEMM (blocks
//!    below), and stages the column back out.
//!
//! Trailing columns are visited in ascending block id. Columns with no data
//! dependency may be dispatched in any order with identical results; a fixed
//! order keeps schedules reproducible.
//!
//! A non-positive leading minor anywhere aborts the job: the error names the
//! failing block and device, the matrix contents are undefined, and nothing
//! is retried — refactorizing the same input cannot succeed.

use std::collections::HashMap;

use log::{debug, trace};

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::MatMut;
use crate::runtime::{offset_elems, AllocGuard, Runtime, SolverContext};

use super::allocation::BlockPartition;
use super::registry::ResourceRegistry;
use super::transfer::{HostStaged, TransferStrategy};

/// Per-device staging area: one buffer for the block-column being factorized
/// or updated, one for an incoming panel. Matches the planner's memory model
/// of two whole block-columns per device.
struct Workspace<'r, R: Runtime> {
    solver: &'r R::Solver,
    col: AllocGuard<'r, R>,
    panel: AllocGuard<'r, R>,
}

/// Factorize the SPD matrix `a` in place as `A = L·Lᵗ` across the devices of
/// `registry`, following the block layout in `partition`.
///
/// On success the lower triangle of `a` holds `L`; the strict upper triangle
/// is left undefined. On error the whole buffer is undefined and must be
/// discarded.
///
/// Uses the [`HostStaged`] transfer strategy; see [`parallel_potrf_with`] to
/// inject a different one.
pub fn parallel_potrf<R: Runtime, T: Element>(
    registry: &ResourceRegistry<R>,
    partition: &BlockPartition,
    a: &mut MatMut<'_, T>,
) -> Result<()> {
    parallel_potrf_with::<R, T, HostStaged>(registry, partition, a, &HostStaged)
}

/// [`parallel_potrf`] with an explicit transfer strategy.
pub fn parallel_potrf_with<R: Runtime, T: Element, S: TransferStrategy<R>>(
    registry: &ResourceRegistry<R>,
    partition: &BlockPartition,
    a: &mut MatMut<'_, T>,
    transfers: &S,
) -> Result<()> {
    if !R::is_available() {
        return Err(Error::backend_unavailable(
            R::name(),
            "required acceleration backend is not present in this build or on this machine",
        ));
    }

    let n = partition.n();
    if !a.is_square() || a.rows() != n {
        return Err(Error::invalid_argument(
            "a",
            format!(
                "partition covers a {}x{} matrix but the buffer is {}x{}",
                n,
                n,
                a.rows(),
                a.cols()
            ),
        ));
    }

    let blocks = partition.blocks();
    let max_block = partition.max_block_size();
    let elem = T::DTYPE.size_in_bytes();
    let lda = a.ld();

    debug!(
        "parallel_potrf: n={}, {} blocks on {} devices, max block {}",
        n,
        blocks.len(),
        partition.devices().len(),
        max_block
    );

    // Per-device workspaces, allocated up front so capacity problems surface
    // before any column is touched.
    let mut workspaces: HashMap<usize, Workspace<'_, R>> = HashMap::new();
    for device_id in partition.devices() {
        let solver = registry.solver(device_id)?;
        let bytes = n * max_block * elem;
        let col = AllocGuard::new(solver, bytes)?;
        let panel = AllocGuard::new(solver, bytes)?;
        trace!(
            "device {}: workspace of 2 x {} bytes (free memory {})",
            device_id,
            bytes,
            registry.get(device_id).map(|r| r.free_memory).unwrap_or(0)
        );
        workspaces.insert(device_id, Workspace { solver, col, panel });
    }

    for (k, bk) in blocks.iter().enumerate() {
        let wk = &workspaces[&bk.device];
        let sk = wk.solver;
        let col_rows = n - bk.start;

        debug!(
            "block-column {} (rows {}..{}, device {}): factorize",
            bk.id, bk.start, n, bk.device
        );

        // Stage column k: the diagonal block and everything below it.
        unsafe {
            transfers.stage_in(
                sk,
                col_rows,
                bk.size,
                a.ptr_at(bk.start, bk.start),
                lda,
                wk.col.ptr(),
                col_rows,
            )?;
        }

        let info = sk.potrf_lower::<T>(bk.size, wk.col.ptr(), col_rows)?;
        if info > 0 {
            return Err(Error::NotPositiveDefinite {
                block_id: bk.id,
                device_id: bk.device,
                leading_minor: info as usize,
            });
        }

        let below = col_rows - bk.size;
        if below > 0 {
            sk.trsm_right_lower_trans::<T>(
                below,
                bk.size,
                wk.col.ptr(),
                col_rows,
                offset_elems::<T>(wk.col.ptr(), bk.size),
                col_rows,
            )?;
        }

        // Write the factorized column home and mark it consumable by other
        // devices.
        unsafe {
            transfers.stage_out(
                sk,
                col_rows,
                bk.size,
                wk.col.ptr(),
                col_rows,
                a.ptr_at(bk.start, bk.start),
                lda,
            )?;
        }
        let column_ready = sk.record_event()?;

        // Trailing updates, ascending block id.
        for bj in &blocks[k + 1..] {
            let wj = &workspaces[&bj.device];
            let sj = wj.solver;
            let panel_rows = n - bj.start;

            trace!(
                "block-column {}: apply column {}'s update on device {}",
                bj.id,
                bk.id,
                bj.device
            );

            // The update consumes column k's panel; wait for it only when it
            // was produced on another device. Same-device work is already
            // ordered by the stream.
            if bj.device != bk.device {
                sj.wait_event(&column_ready)?;
            }

            unsafe {
                // Panel rows j.start..n of column k.
                transfers.stage_in(
                    sj,
                    panel_rows,
                    bk.size,
                    a.ptr_at(bj.start, bk.start),
                    lda,
                    wj.panel.ptr(),
                    panel_rows,
                )?;
                // Column j's own trailing blocks.
                transfers.stage_in(
                    sj,
                    panel_rows,
                    bj.size,
                    a.ptr_at(bj.start, bj.start),
                    lda,
                    wj.col.ptr(),
                    panel_rows,
                )?;
            }

            // Diagonal block: symmetric update confined to the lower
            // triangle.
            sj.syrk_lower::<T>(
                bj.size,
                bk.size,
                -1.0,
                wj.panel.ptr(),
                panel_rows,
                1.0,
                wj.col.ptr(),
                panel_rows,
            )?;

            // Blocks below the diagonal.
            let below_j = panel_rows - bj.size;
            if below_j > 0 {
                sj.gemm_nt::<T>(
                    below_j,
                    bj.size,
                    bk.size,
                    -1.0,
                    offset_elems::<T>(wj.panel.ptr(), bj.size),
                    panel_rows,
                    wj.panel.ptr(),
                    panel_rows,
                    1.0,
                    offset_elems::<T>(wj.col.ptr(), bj.size),
                    panel_rows,
                )?;
            }

            unsafe {
                transfers.stage_out(
                    sj,
                    panel_rows,
                    bj.size,
                    wj.col.ptr(),
                    panel_rows,
                    a.ptr_at(bj.start, bj.start),
                    lda,
                )?;
            }
        }
    }

    // The factor must be fully resident in the host buffer before returning
    // it to the caller.
    for ws in workspaces.values() {
        ws.solver.synchronize()?;
    }

    debug!("parallel_potrf: done ({} block-columns)", blocks.len());
    Ok(())
}

/// Factorize `a` and optionally zero the strict upper triangle.
///
/// [`parallel_potrf`] leaves the non-factor triangle undefined; downstream
/// code that treats the buffer as a plain lower-triangular matrix can ask for
/// it to be cleaned here instead of carrying its own pass.
pub fn cholesky<R: Runtime, T: Element>(
    registry: &ResourceRegistry<R>,
    partition: &BlockPartition,
    a: &mut MatMut<'_, T>,
    clean: bool,
) -> Result<()> {
    parallel_potrf::<R, T>(registry, partition, a)?;
    if clean {
        // Zero the strict upper triangle; the diagonal belongs to the factor.
        crate::linalg::mul_triang(a, true, true, 0.0)?;
    }
    Ok(())
}
