//! Compute backends for the out-of-core scheduler
//!
//! This module defines the backend abstraction the scheduler is generic over
//! and provides implementations for the CPU (reference) and CUDA backends.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific GPU / logical CPU device)
//! ├── Solver (bound solver context: stream, memory, block-level BLAS)
//! └── Event  (dependency token recorded on one device, awaited on another)
//! ```
//!
//! A `Solver` is the typed, non-nullable stand-in for an accelerator solver
//! handle: it is acquired once per device through [`Runtime::solver`] and is
//! only valid for operations issued against its own device. All work for one
//! device goes through its solver's single ordered stream, which also makes
//! the handle safe to drive from the one orchestrating thread the scheduler
//! uses.

pub mod cpu;

#[cfg(feature = "cuda")]
pub mod cuda;

use crate::dtype::Element;
use crate::error::Result;

/// Core trait for compute backends
///
/// `Runtime` abstracts over the machinery one backend needs to participate in
/// an out-of-core factorization. It uses static dispatch via generics; the
/// scheduler is written once and monomorphized per backend.
pub trait Runtime: Send + Sync + 'static {
    /// Device identifier type
    type Device: Device;

    /// Bound per-device solver context
    type Solver: SolverContext<Self>;

    /// Dependency token recorded on a device stream
    type Event: Send;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Whether this backend can run on the current build and machine.
    ///
    /// This is the single capability-negotiation step: entry points check it
    /// once and reject with one diagnostic instead of every operation probing
    /// for support separately.
    fn is_available() -> bool;

    /// Look up the device with the given index
    fn device(index: usize) -> Result<Self::Device>;

    /// Acquire a solver context bound to `device`
    fn solver(device: &Self::Device) -> Result<Self::Solver>;
}

/// Trait for device identification
pub trait Device: Clone + Send + Sync + 'static {
    /// Unique identifier for this device
    fn id(&self) -> usize;

    /// Human-readable name
    fn name(&self) -> String {
        format!("device({})", self.id())
    }
}

/// One device's ordered execution context.
///
/// Memory is addressed through opaque `u64` handles so the scheduler can treat
/// host heap pointers and CUDA device pointers uniformly. Operations are
/// issued in order on the device's stream; they may execute asynchronously.
/// Cross-stream dependencies are expressed with [`record_event`] /
/// [`wait_event`], and [`synchronize`] drains the stream.
///
/// [`record_event`]: SolverContext::record_event
/// [`wait_event`]: SolverContext::wait_event
/// [`synchronize`]: SolverContext::synchronize
pub trait SolverContext<R: Runtime + ?Sized>: Send {
    /// The device this context is bound to
    fn device(&self) -> &R::Device;

    /// Allocate `size_bytes` of device memory.
    ///
    /// Fails with [`crate::error::Error::OutOfMemory`] naming this device and
    /// the requested size.
    fn alloc(&self, size_bytes: usize) -> Result<u64>;

    /// Release memory obtained from [`alloc`](SolverContext::alloc)
    fn dealloc(&self, ptr: u64, size_bytes: usize);

    /// Strided 2D copy, host to device, asynchronous on this device's stream.
    ///
    /// Copies a `rows x cols` column-major block from `src` (leading dimension
    /// `src_ld`) to the device buffer `dst` (leading dimension `dst_ld`).
    ///
    /// # Safety
    ///
    /// `src` must point to a live column-major block of at least
    /// `src_ld * (cols - 1) + rows` elements, and it must stay valid until the
    /// stream has consumed the copy (for synchronous backends, until the call
    /// returns).
    unsafe fn copy_to_device<T: Element>(
        &self,
        rows: usize,
        cols: usize,
        src: *const T,
        src_ld: usize,
        dst: u64,
        dst_ld: usize,
    ) -> Result<()>;

    /// Strided 2D copy, device to host, asynchronous on this device's stream.
    ///
    /// # Safety
    ///
    /// `dst` must point to writable host memory for a column-major
    /// `rows x cols` block with leading dimension `dst_ld`, valid until the
    /// stream has completed the copy.
    unsafe fn copy_to_host<T: Element>(
        &self,
        rows: usize,
        cols: usize,
        src: u64,
        src_ld: usize,
        dst: *mut T,
        dst_ld: usize,
    ) -> Result<()>;

    /// In-place Cholesky factorization of the lower triangle of an `n x n`
    /// device block.
    ///
    /// LAPACK-style status: returns 0 on success, or `i > 0` if the leading
    /// minor of order `i` is not positive definite (the block is left
    /// partially overwritten in that case).
    fn potrf_lower<T: Element>(&self, n: usize, a: u64, lda: usize) -> Result<u32>;

    /// Triangular panel solve `B := B · L⁻ᵗ` where `L` is the `n x n` lower
    /// triangular block at `a` and `B` is `m x n` at `b`.
    fn trsm_right_lower_trans<T: Element>(
        &self,
        m: usize,
        n: usize,
        a: u64,
        lda: usize,
        b: u64,
        ldb: usize,
    ) -> Result<()>;

    /// Symmetric rank-k update confined to the lower triangle:
    /// `C := alpha · A·Aᵗ + beta · C` with `A` of shape `n x k`.
    #[allow(clippy::too_many_arguments)]
    fn syrk_lower<T: Element>(
        &self,
        n: usize,
        k: usize,
        alpha: f64,
        a: u64,
        lda: usize,
        beta: f64,
        c: u64,
        ldc: usize,
    ) -> Result<()>;

    /// General update `C := alpha · A·Bᵗ + beta · C` with `A` of shape
    /// `m x k` and `B` of shape `n x k`.
    #[allow(clippy::too_many_arguments)]
    fn gemm_nt<T: Element>(
        &self,
        m: usize,
        n: usize,
        k: usize,
        alpha: f64,
        a: u64,
        lda: usize,
        b: u64,
        ldb: usize,
        beta: f64,
        c: u64,
        ldc: usize,
    ) -> Result<()>;

    /// Record a completion token for all work issued so far on this stream
    fn record_event(&self) -> Result<R::Event>;

    /// Make this stream wait for `event` before executing later work.
    ///
    /// This is the only suspension point the scheduler uses: a step waits on
    /// the specific transfers it consumes, never on unrelated work.
    fn wait_event(&self, event: &R::Event) -> Result<()>;

    /// Block until all work issued on this stream has completed
    fn synchronize(&self) -> Result<()>;
}

/// RAII guard for a device allocation.
///
/// Frees the buffer through the owning solver when dropped, so workspaces do
/// not leak on early error returns.
pub struct AllocGuard<'a, R: Runtime> {
    solver: &'a R::Solver,
    ptr: u64,
    size_bytes: usize,
}

impl<'a, R: Runtime> AllocGuard<'a, R> {
    /// Allocate `size_bytes` on the solver's device
    pub fn new(solver: &'a R::Solver, size_bytes: usize) -> Result<Self> {
        let ptr = solver.alloc(size_bytes)?;
        Ok(Self {
            solver,
            ptr,
            size_bytes,
        })
    }

    /// The device address of the allocation
    pub fn ptr(&self) -> u64 {
        self.ptr
    }
}

impl<R: Runtime> Drop for AllocGuard<'_, R> {
    fn drop(&mut self) {
        self.solver.dealloc(self.ptr, self.size_bytes);
    }
}

/// Offset a device address by `elems` elements of `T`
#[inline]
pub(crate) fn offset_elems<T: Element>(ptr: u64, elems: usize) -> u64 {
    ptr + (elems * T::DTYPE.size_in_bytes()) as u64
}
