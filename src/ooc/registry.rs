//! GPU resource registry
//!
//! Maps device ids to the solver contexts a job may issue work through. The
//! solver field is a typed capability acquired through
//! [`Runtime::solver`](crate::runtime::Runtime::solver), so an entry cannot
//! hold an unset handle; the remaining boundary checks are id uniqueness at
//! construction and existence at lookup.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};

/// One device's entry in the registry
pub struct GpuResource<R: Runtime> {
    /// Free memory on the device in bytes, as measured by the external
    /// planner. Informational: admission control already happened there.
    pub free_memory: u64,
    /// Device id this resource describes
    pub id: usize,
    solver: R::Solver,
}

impl<R: Runtime> GpuResource<R> {
    /// Bundle a bound solver context with its device id and capacity figure
    pub fn new(free_memory: u64, solver: R::Solver, id: usize) -> Self {
        Self {
            free_memory,
            id,
            solver,
        }
    }

    /// The bound solver context
    pub fn solver(&self) -> &R::Solver {
        &self.solver
    }
}

impl<R: Runtime> std::fmt::Debug for GpuResource<R>
where
    R::Solver: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResource")
            .field("free_memory", &self.free_memory)
            .field("id", &self.id)
            .field("solver", &self.solver)
            .finish()
    }
}

/// Device-id → solver lookup for one factorization job
pub struct ResourceRegistry<R: Runtime> {
    resources: Vec<GpuResource<R>>,
    by_id: HashMap<usize, usize>,
}

impl<R: Runtime> std::fmt::Debug for ResourceRegistry<R>
where
    R::Solver: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources)
            .field("by_id", &self.by_id)
            .finish()
    }
}

impl<R: Runtime> ResourceRegistry<R> {
    /// Build a registry from resource entries.
    ///
    /// Fails with a configuration error if two entries claim the same device
    /// id.
    pub fn new(resources: Vec<GpuResource<R>>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(resources.len());
        for (slot, res) in resources.iter().enumerate() {
            if by_id.insert(res.id, slot).is_some() {
                return Err(Error::configuration(format!(
                    "duplicate resource entry for device {}",
                    res.id
                )));
            }
        }
        Ok(Self { resources, by_id })
    }

    /// Convenience constructor: acquire a solver for each device index.
    ///
    /// Free-memory figures are recorded as 0 (unknown); they are informational
    /// only.
    pub fn from_devices(indices: &[usize]) -> Result<Self> {
        if !R::is_available() {
            return Err(Error::backend_unavailable(
                R::name(),
                "cannot acquire solver contexts",
            ));
        }
        let mut resources = Vec::with_capacity(indices.len());
        for &index in indices {
            let device = R::device(index)?;
            let solver = R::solver(&device)?;
            resources.push(GpuResource::new(0, solver, device.id()));
        }
        Self::new(resources)
    }

    /// The solver bound to `device_id`
    pub fn solver(&self, device_id: usize) -> Result<&R::Solver> {
        self.get(device_id).map(GpuResource::solver).ok_or_else(|| {
            Error::configuration(format!("no resource registered for device {}", device_id))
        })
    }

    /// The resource entry for `device_id`, if registered
    pub fn get(&self, device_id: usize) -> Option<&GpuResource<R>> {
        self.by_id.get(&device_id).map(|&slot| &self.resources[slot])
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry has no entries
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate over the registered resources
    pub fn iter(&self) -> impl Iterator<Item = &GpuResource<R>> {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::CpuRuntime;

    #[test]
    fn test_duplicate_device_id_rejected() {
        let err = ResourceRegistry::<CpuRuntime>::from_devices(&[0, 1, 0]).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_missing_device_lookup_fails() {
        let reg = ResourceRegistry::<CpuRuntime>::from_devices(&[0]).unwrap();
        assert!(reg.get(0).is_some());
        assert!(matches!(
            reg.solver(3).unwrap_err(),
            Error::Configuration { .. }
        ));
    }
}
