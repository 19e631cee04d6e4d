//! CUDA device handle

use crate::error::Result;
use crate::runtime::Device;

/// A single CUDA GPU, identified by its driver index (0, 1, 2, ...)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CudaDevice {
    pub(crate) index: usize,
}

impl CudaDevice {
    /// Create a handle for the GPU with the given index
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Get memory information for the current context's device.
    ///
    /// Returns (free_bytes, total_bytes) of global memory. Useful for filling
    /// the informational `free_memory` field of a resource entry.
    pub fn memory_info(&self) -> Result<(u64, u64)> {
        let (free, total) = cudarc::driver::result::mem_get_info()?;
        Ok((free as u64, total as u64))
    }

    /// Get available (free) GPU memory in bytes
    pub fn available_memory(&self) -> Result<u64> {
        let (free, _) = self.memory_info()?;
        Ok(free)
    }
}

impl Device for CudaDevice {
    fn id(&self) -> usize {
        self.index
    }

    fn name(&self) -> String {
        format!("cuda:{}", self.index)
    }
}

impl Default for CudaDevice {
    fn default() -> Self {
        Self::new(0)
    }
}
