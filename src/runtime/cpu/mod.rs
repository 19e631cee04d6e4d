//! CPU reference backend
//!
//! The CPU backend runs every block operation synchronously on the host. It is
//! the reference implementation the other backends are checked against, and it
//! doubles as a multi-device simulator: each [`CpuDevice`] index is a distinct
//! logical device with its own solver context, so the full out-of-core
//! schedule — staging, dependency ordering, per-device workspaces — is
//! exercised on machines with no accelerator at all.
//!
//! "Device" memory is host heap memory behind the same `u64` handles the GPU
//! backends use. Because the stream is synchronous, events are unit values and
//! every wait is a no-op.

mod device;
pub(crate) mod kernels;
mod solver;

pub use device::CpuDevice;
pub use solver::CpuSolver;

use crate::error::Result;
use crate::runtime::Runtime;

/// CPU backend identity
pub struct CpuRuntime;

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Solver = CpuSolver;
    type Event = ();

    fn name() -> &'static str {
        "cpu"
    }

    fn is_available() -> bool {
        true
    }

    fn device(index: usize) -> Result<CpuDevice> {
        Ok(CpuDevice::new(index))
    }

    fn solver(device: &CpuDevice) -> Result<CpuSolver> {
        Ok(CpuSolver::new(device.clone()))
    }
}
