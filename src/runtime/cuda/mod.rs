//! CUDA backend
//!
//! GPU acceleration via NVIDIA CUDA using cudarc: the driver API for
//! contexts, streams, stream-ordered memory and events, and cuBLAS for the
//! panel solve and rank updates. Block staging between host and device uses
//! `cublasSetMatrixAsync`/`cublasGetMatrixAsync`, the strided 2D copy
//! primitive of the CUDA toolkit.
//!
//! Each [`CudaSolver`] owns one context, one stream and one cuBLAS handle for
//! its device. All work for a device is issued in order on that stream, which
//! serializes handle use; the solver is driven from the scheduler's single
//! orchestrating thread and is not meant for concurrent submission.

mod device;
mod solver;

pub use device::CudaDevice;
pub use solver::{CudaEvent, CudaSolver};

use crate::error::Result;
use crate::runtime::Runtime;

/// CUDA backend identity
pub struct CudaRuntime;

impl Runtime for CudaRuntime {
    type Device = CudaDevice;
    type Solver = CudaSolver;
    type Event = CudaEvent;

    fn name() -> &'static str {
        "cuda"
    }

    fn is_available() -> bool {
        if cudarc::driver::result::init().is_err() {
            return false;
        }
        cudarc::driver::result::device::get_count()
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    fn device(index: usize) -> Result<CudaDevice> {
        Ok(CudaDevice::new(index))
    }

    fn solver(device: &CudaDevice) -> Result<CudaSolver> {
        CudaSolver::new(device.clone())
    }
}
