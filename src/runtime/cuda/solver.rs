//! CUDA solver context
//!
//! Owns the context, stream and cuBLAS handle for one GPU. Memory is
//! stream-ordered (`cuMemAllocAsync`/`cuMemFreeAsync`); staging copies and
//! BLAS calls are all issued on the same stream, so per-device work is
//! serialized without host synchronization. Cross-device dependencies are
//! expressed with CUDA events.

use std::ffi::c_void;
use std::sync::Arc;

use cudarc::cublas::sys as cublas_sys;
use cudarc::cublas::CudaBlas;
use cudarc::driver::safe::{CudaContext, CudaStream};
use cudarc::driver::sys as driver_sys;

use super::device::CudaDevice;
use super::CudaRuntime;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::{Device, SolverContext};

/// Check if the CUDA context on the current thread is valid.
///
/// # Safety
///
/// This function calls CUDA driver API directly.
#[inline]
unsafe fn is_cuda_context_valid() -> bool {
    let mut ctx: driver_sys::CUcontext = std::ptr::null_mut();
    // SAFETY: cuCtxGetCurrent is safe to call at any time and writes to the
    // provided pointer.
    let result = unsafe { driver_sys::cuCtxGetCurrent(&mut ctx) };
    result == driver_sys::CUresult::CUDA_SUCCESS && !ctx.is_null()
}

/// Log a CUDA memory operation failure.
#[cold]
#[inline(never)]
fn log_cuda_memory_error(operation: &str, ptr: u64, result: driver_sys::CUresult) {
    eprintln!(
        "[cholr::cuda] {} failed for ptr 0x{:x}: {:?}",
        operation, ptr, result
    );
}

fn cublas_check(status: cublas_sys::cublasStatus_t, what: &'static str) -> Result<()> {
    if status == cublas_sys::cublasStatus_t::CUBLAS_STATUS_SUCCESS {
        Ok(())
    } else {
        Err(Error::Backend(format!("{} failed: {:?}", what, status)))
    }
}

// ============================================================================
// CudaEvent
// ============================================================================

/// Completion token recorded on one device's stream
pub struct CudaEvent {
    raw: driver_sys::CUevent,
}

// The event handle is only passed to driver calls, which are thread-safe.
unsafe impl Send for CudaEvent {}
unsafe impl Sync for CudaEvent {}

impl Drop for CudaEvent {
    fn drop(&mut self) {
        unsafe {
            driver_sys::cuEventDestroy_v2(self.raw);
        }
    }
}

// ============================================================================
// CudaSolver
// ============================================================================

/// Solver context bound to one CUDA device.
///
/// Created once per device per job. All operations launch on the owned
/// stream; issuing from more than one thread is not supported.
pub struct CudaSolver {
    device: CudaDevice,
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    cublas: Arc<CudaBlas>,
}

impl std::fmt::Debug for CudaSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaSolver")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl CudaSolver {
    /// Create a solver context for `device`.
    ///
    /// Initializes the CUDA context, creates a stream and binds a cuBLAS
    /// handle to it.
    pub fn new(device: CudaDevice) -> Result<Self> {
        let context = CudaContext::new(device.index).map_err(|e| {
            Error::Backend(format!(
                "failed to create CUDA context for device {}: {:?}",
                device.index, e
            ))
        })?;

        // Bind context to the orchestrating thread for proper cuBLAS operation.
        context
            .bind_to_thread()
            .map_err(|e| Error::Backend(format!("failed to bind CUDA context to thread: {:?}", e)))?;

        let stream = context
            .new_stream()
            .map_err(|e| Error::Backend(format!("failed to create CUDA stream: {:?}", e)))?;

        let cublas = CudaBlas::new(stream.clone())
            .map_err(|e| Error::Backend(format!("failed to initialize cuBLAS: {:?}", e)))?;

        Ok(Self {
            device,
            context,
            stream,
            cublas: Arc::new(cublas),
        })
    }

    /// The CUDA context owned by this solver
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// The stream all of this solver's work launches on
    pub fn stream(&self) -> &Arc<CudaStream> {
        &self.stream
    }
}

impl SolverContext<CudaRuntime> for CudaSolver {
    fn device(&self) -> &CudaDevice {
        &self.device
    }

    fn alloc(&self, size_bytes: usize) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }
        unsafe {
            let mut ptr: u64 = 0;
            let result =
                driver_sys::cuMemAllocAsync(&mut ptr, size_bytes, self.stream.cu_stream());
            if result != driver_sys::CUresult::CUDA_SUCCESS {
                return Err(Error::OutOfMemory {
                    device_id: self.device.id(),
                    requested: size_bytes,
                });
            }
            Ok(ptr)
        }
    }

    fn dealloc(&self, ptr: u64, _size_bytes: usize) {
        if ptr == 0 {
            return;
        }
        unsafe {
            // The context may already be gone during teardown; the driver
            // reclaims the memory in that case.
            if !is_cuda_context_valid() {
                return;
            }
            let result = driver_sys::cuMemFreeAsync(ptr, self.stream.cu_stream());
            if result != driver_sys::CUresult::CUDA_SUCCESS
                && result != driver_sys::CUresult::CUDA_ERROR_ILLEGAL_ADDRESS
            {
                log_cuda_memory_error("cuMemFreeAsync", ptr, result);
            }
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
        let status = unsafe {
            cublas_sys::cublasSetMatrixAsync(
                rows as i32,
                cols as i32,
                T::DTYPE.size_in_bytes() as i32,
                src as *const c_void,
                src_ld as i32,
                dst as *mut c_void,
                dst_ld as i32,
                self.stream.cu_stream() as _,
            )
        };
        cublas_check(status, "cublasSetMatrixAsync")
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
        let status = unsafe {
            cublas_sys::cublasGetMatrixAsync(
                rows as i32,
                cols as i32,
                T::DTYPE.size_in_bytes() as i32,
                src as *const c_void,
                src_ld as i32,
                dst as *mut c_void,
                dst_ld as i32,
                self.stream.cu_stream() as _,
            )
        };
        cublas_check(status, "cublasGetMatrixAsync")
    }

    fn potrf_lower<T: Element>(&self, n: usize, a: u64, lda: usize) -> Result<u32> {
        // The diagonal panel is an O(1/nb) fraction of the factorization's
        // flops; it is staged to the host and factored there, keeping the
        // device path free of a cuSOLVER dependency. TRSM/SYRK/GEMM, where
        // the work is, stay on-device.
        let mut host = vec![T::zero(); n * n];
        unsafe {
            self.copy_to_host::<T>(n, n, a, lda, host.as_mut_ptr(), n)?;
        }
        self.synchronize()?;

        let info = unsafe { crate::runtime::cpu::kernels::potrf_lower::<T>(n, host.as_mut_ptr(), n) };
        if info != 0 {
            return Ok(info);
        }

        unsafe {
            self.copy_to_device::<T>(n, n, host.as_ptr(), n, a, lda)?;
        }
        // The upload reads `host`, which is dropped on return.
        self.synchronize()?;
        Ok(0)
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
        let handle = *self.cublas.handle();
        let status = unsafe {
            match T::DTYPE {
                DType::F32 => {
                    let alpha: f32 = 1.0;
                    cublas_sys::cublasStrsm_v2(
                        handle,
                        cublas_sys::cublasSideMode_t::CUBLAS_SIDE_RIGHT,
                        cublas_sys::cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
                        cublas_sys::cublasOperation_t::CUBLAS_OP_T,
                        cublas_sys::cublasDiagType_t::CUBLAS_DIAG_NON_UNIT,
                        m as i32,
                        n as i32,
                        &alpha,
                        a as *const f32,
                        lda as i32,
                        b as *mut f32,
                        ldb as i32,
                    )
                }
                DType::F64 => {
                    let alpha: f64 = 1.0;
                    cublas_sys::cublasDtrsm_v2(
                        handle,
                        cublas_sys::cublasSideMode_t::CUBLAS_SIDE_RIGHT,
                        cublas_sys::cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
                        cublas_sys::cublasOperation_t::CUBLAS_OP_T,
                        cublas_sys::cublasDiagType_t::CUBLAS_DIAG_NON_UNIT,
                        m as i32,
                        n as i32,
                        &alpha,
                        a as *const f64,
                        lda as i32,
                        b as *mut f64,
                        ldb as i32,
                    )
                }
            }
        };
        cublas_check(status, "cublasTrsm")
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
        let handle = *self.cublas.handle();
        let status = unsafe {
            match T::DTYPE {
                DType::F32 => {
                    let alpha = alpha as f32;
                    let beta = beta as f32;
                    cublas_sys::cublasSsyrk_v2(
                        handle,
                        cublas_sys::cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
                        cublas_sys::cublasOperation_t::CUBLAS_OP_N,
                        n as i32,
                        k as i32,
                        &alpha,
                        a as *const f32,
                        lda as i32,
                        &beta,
                        c as *mut f32,
                        ldc as i32,
                    )
                }
                DType::F64 => cublas_sys::cublasDsyrk_v2(
                    handle,
                    cublas_sys::cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
                    cublas_sys::cublasOperation_t::CUBLAS_OP_N,
                    n as i32,
                    k as i32,
                    &alpha,
                    a as *const f64,
                    lda as i32,
                    &beta,
                    c as *mut f64,
                    ldc as i32,
                ),
            }
        };
        cublas_check(status, "cublasSyrk")
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
        let handle = *self.cublas.handle();
        let status = unsafe {
            match T::DTYPE {
                DType::F32 => {
                    let alpha = alpha as f32;
                    let beta = beta as f32;
                    cublas_sys::cublasSgemm_v2(
                        handle,
                        cublas_sys::cublasOperation_t::CUBLAS_OP_N,
                        cublas_sys::cublasOperation_t::CUBLAS_OP_T,
                        m as i32,
                        n as i32,
                        k as i32,
                        &alpha,
                        a as *const f32,
                        lda as i32,
                        b as *const f32,
                        ldb as i32,
                        &beta,
                        c as *mut f32,
                        ldc as i32,
                    )
                }
                DType::F64 => cublas_sys::cublasDgemm_v2(
                    handle,
                    cublas_sys::cublasOperation_t::CUBLAS_OP_N,
                    cublas_sys::cublasOperation_t::CUBLAS_OP_T,
                    m as i32,
                    n as i32,
                    k as i32,
                    &alpha,
                    a as *const f64,
                    lda as i32,
                    b as *const f64,
                    ldb as i32,
                    &beta,
                    c as *mut f64,
                    ldc as i32,
                ),
            }
        };
        cublas_check(status, "cublasGemm")
    }

    fn record_event(&self) -> Result<CudaEvent> {
        unsafe {
            let mut raw: driver_sys::CUevent = std::ptr::null_mut();
            let result = driver_sys::cuEventCreate(
                &mut raw,
                driver_sys::CUevent_flags::CU_EVENT_DISABLE_TIMING as u32,
            );
            if result != driver_sys::CUresult::CUDA_SUCCESS {
                return Err(Error::Backend(format!("cuEventCreate failed: {:?}", result)));
            }
            let result = driver_sys::cuEventRecord(raw, self.stream.cu_stream());
            if result != driver_sys::CUresult::CUDA_SUCCESS {
                driver_sys::cuEventDestroy_v2(raw);
                return Err(Error::Backend(format!("cuEventRecord failed: {:?}", result)));
            }
            Ok(CudaEvent { raw })
        }
    }

    fn wait_event(&self, event: &CudaEvent) -> Result<()> {
        unsafe {
            let result = driver_sys::cuStreamWaitEvent(self.stream.cu_stream(), event.raw, 0);
            if result != driver_sys::CUresult::CUDA_SUCCESS {
                return Err(Error::Backend(format!(
                    "cuStreamWaitEvent failed: {:?}",
                    result
                )));
            }
        }
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| Error::Backend(format!("stream synchronization failed: {:?}", e)))
    }
}
