//! Logical CPU device

use crate::runtime::Device;

/// A logical CPU device.
///
/// Distinct indices are distinct devices as far as the scheduler is concerned,
/// even though they all address host memory. A block partition that spreads
/// work over CPU devices therefore runs the same staging and synchronization
/// schedule a multi-GPU job would.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuDevice {
    index: usize,
}

impl CpuDevice {
    /// Create a logical device with the given index
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        self.index
    }

    fn name(&self) -> String {
        format!("cpu:{}", self.index)
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new(0)
    }
}
