//! Transfer strategies for cross-device staging
//!
//! The scheduler never moves bytes itself; it asks an injected
//! [`TransferStrategy`] to stage blocks in and out of device memory. That
//! keeps the block-column algorithm independent of how data travels — through
//! the host, peer-to-peer, pinned buffers — and lets tests interpose on the
//! traffic.

use crate::dtype::Element;
use crate::error::Result;
use crate::runtime::{Runtime, SolverContext};

/// How blocks move between the host matrix and device workspaces.
///
/// Both methods are issued on the target solver's stream and may be
/// asynchronous; ordering against compute is the scheduler's responsibility
/// via events.
pub trait TransferStrategy<R: Runtime>: Send + Sync {
    /// Stage a `rows x cols` host block into device memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`SolverContext::copy_to_device`].
    unsafe fn stage_in<T: Element>(
        &self,
        solver: &R::Solver,
        rows: usize,
        cols: usize,
        src: *const T,
        src_ld: usize,
        dst: u64,
        dst_ld: usize,
    ) -> Result<()>;

    /// Stage a `rows x cols` device block back to host memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`SolverContext::copy_to_host`].
    unsafe fn stage_out<T: Element>(
        &self,
        solver: &R::Solver,
        rows: usize,
        cols: usize,
        src: u64,
        src_ld: usize,
        dst: *mut T,
        dst_ld: usize,
    ) -> Result<()>;
}

/// Default strategy: all cross-device movement goes through the host matrix
/// using the backend's strided 2D copy primitive.
///
/// A block computed on one device becomes visible to another by being written
/// back to its home slot in the host buffer and re-staged from there. Simple,
/// works for any device pair, and matches the memory model the partition was
/// planned for.
pub struct HostStaged;

impl<R: Runtime> TransferStrategy<R> for HostStaged {
    unsafe fn stage_in<T: Element>(
        &self,
        solver: &R::Solver,
        rows: usize,
        cols: usize,
        src: *const T,
        src_ld: usize,
        dst: u64,
        dst_ld: usize,
    ) -> Result<()> {
        solver.copy_to_device(rows, cols, src, src_ld, dst, dst_ld)
    }

    unsafe fn stage_out<T: Element>(
        &self,
        solver: &R::Solver,
        rows: usize,
        cols: usize,
        src: u64,
        src_ld: usize,
        dst: *mut T,
        dst_ld: usize,
    ) -> Result<()> {
        solver.copy_to_host(rows, cols, src, src_ld, dst, dst_ld)
    }
}
