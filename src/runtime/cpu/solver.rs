//! CPU solver context

use std::alloc::{alloc_zeroed, dealloc, Layout};

use super::device::CpuDevice;
use super::kernels;
use super::CpuRuntime;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::{Device, SolverContext};

/// Heap alignment for block buffers (AVX-512 friendly)
const ALIGN: usize = 64;

/// Solver context bound to one logical CPU device.
///
/// Every operation executes synchronously on the calling thread, so the
/// "stream" is trivially ordered and events carry no state.
#[derive(Clone, Debug)]
pub struct CpuSolver {
    device: CpuDevice,
}

impl CpuSolver {
    /// Create a solver context for `device`
    pub fn new(device: CpuDevice) -> Self {
        Self { device }
    }
}

impl SolverContext<CpuRuntime> for CpuSolver {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn alloc(&self, size_bytes: usize) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }
        let layout = Layout::from_size_align(size_bytes, ALIGN)
            .map_err(|e| Error::Backend(format!("invalid allocation layout: {}", e)))?;
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(Error::OutOfMemory {
                device_id: self.device.id(),
                requested: size_bytes,
            });
        }
        Ok(ptr as u64)
    }

    fn dealloc(&self, ptr: u64, size_bytes: usize) {
        if ptr == 0 || size_bytes == 0 {
            return;
        }
        let layout =
            Layout::from_size_align(size_bytes, ALIGN).expect("Invalid allocation layout");
        unsafe {
            dealloc(ptr as *mut u8, layout);
        }
    }

    unsafe fn copy_to_device<T: Element>(
        &self,
        rows: usize,
        cols: usize,
        src: *const T,
        src_ld: usize,
        dst: u64,
        dst_ld: usize,
    ) -> Result<()> {
        let dst = dst as *mut T;
        for j in 0..cols {
            std::ptr::copy_nonoverlapping(src.add(j * src_ld), dst.add(j * dst_ld), rows);
        }
        Ok(())
    }

    unsafe fn copy_to_host<T: Element>(
        &self,
        rows: usize,
        cols: usize,
        src: u64,
        src_ld: usize,
        dst: *mut T,
        dst_ld: usize,
    ) -> Result<()> {
        let src = src as *const T;
        for j in 0..cols {
            std::ptr::copy_nonoverlapping(src.add(j * src_ld), dst.add(j * dst_ld), rows);
        }
        Ok(())
    }

    fn potrf_lower<T: Element>(&self, n: usize, a: u64, lda: usize) -> Result<u32> {
        Ok(unsafe { kernels::potrf_lower::<T>(n, a as *mut T, lda) })
    }

    fn trsm_right_lower_trans<T: Element>(
        &self,
        m: usize,
        n: usize,
        a: u64,
        lda: usize,
        b: u64,
        ldb: usize,
    ) -> Result<()> {
        unsafe {
            kernels::trsm_right_lower_trans::<T>(m, n, a as *const T, lda, b as *mut T, ldb);
        }
        Ok(())
    }

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
    ) -> Result<()> {
        unsafe {
            kernels::syrk_lower::<T>(
                n,
                k,
                T::from_f64(alpha),
                a as *const T,
                lda,
                T::from_f64(beta),
                c as *mut T,
                ldc,
            );
        }
        Ok(())
    }

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
    ) -> Result<()> {
        unsafe {
            kernels::gemm_nt::<T>(
                m,
                n,
                k,
                T::from_f64(alpha),
                a as *const T,
                lda,
                b as *const T,
                ldb,
                T::from_f64(beta),
                c as *mut T,
                ldc,
            );
        }
        Ok(())
    }

    fn record_event(&self) -> Result<()> {
        // Synchronous stream: all prior work has already completed.
        Ok(())
    }

    fn wait_event(&self, _event: &()) -> Result<()> {
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}
