//! # cholr
//!
//! **Out-of-core, multi-device Cholesky factorization for matrices that do not
//! fit on a single accelerator.**
//!
//! cholr factorizes a large symmetric positive-definite (SPD) matrix `A` as
//! `A = L·Lᵗ` by partitioning it into block-columns owned by different devices
//! and driving a blocked right-looking Cholesky across them, staging blocks
//! between host and device memory as the algorithm progresses. The typical
//! consumer is a kernel-method or Gaussian-process library whose covariance
//! matrices exceed the memory of any one GPU.
//!
//! ## What's in the crate
//!
//! - **Out-of-core scheduler**: [`ooc::parallel_potrf`] consumes a validated
//!   [`ooc::BlockPartition`] and a [`ooc::ResourceRegistry`] of per-device
//!   solver contexts and writes the factor into the lower triangle of the
//!   caller's matrix.
//! - **Triangular utilities**: [`linalg::copy_triang`], [`linalg::mul_triang`],
//!   [`linalg::vec_mul_triang`], [`linalg::copy_transpose`] — structural
//!   primitives used around the factorization pipeline.
//! - **LAUUM**: [`linalg::lauum`] reconstructs `A·Aᵗ` from a triangular factor,
//!   restricted to one triangle, out of place.
//! - **Backends**: a CPU reference backend (always available; multiple logical
//!   devices model a multi-GPU machine) and a CUDA backend built on `cudarc`
//!   behind the `cuda` feature.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use cholr::prelude::*;
//!
//! // Two logical devices, blocks split between them by an external planner.
//! let registry = ResourceRegistry::<CpuRuntime>::from_devices(&[0, 1])?;
//! let partition = BlockPartition::new(vec![
//!     BlockAllocation::new(0, 512, 0, 0)?,
//!     BlockAllocation::new(512, 1024, 1, 1)?,
//! ])?;
//!
//! let mut a = MatMut::from_slice(&mut buf, 1024, 1024, 1024)?;
//! ooc::parallel_potrf::<CpuRuntime, f64>(&registry, &partition, &mut a)?;
//! // a's lower triangle now holds L; the upper triangle is undefined.
//! ```
//!
//! ## Layout conventions
//!
//! All matrices are column-major with an explicit leading dimension (`ld`),
//! which may exceed the row count — sub-block views never copy. The
//! factorization operates on the lower triangle; the opposite triangle is left
//! undefined unless cleaned via [`ooc::cholesky`].
//!
//! ## Feature flags
//!
//! - `cuda`: NVIDIA CUDA backend via cudarc (driver API + cuBLAS)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod linalg;
pub mod matrix;
pub mod ooc;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::linalg::{copy_transpose, copy_triang, lauum, mul_triang, vec_mul_triang, Side};
    pub use crate::matrix::{MatMut, MatRef};
    pub use crate::ooc::{
        cholesky, parallel_potrf, BlockAllocation, BlockPartition, GpuResource, ResourceRegistry,
    };
    pub use crate::runtime::{Device, Runtime, SolverContext};

    pub use crate::runtime::cpu::CpuRuntime;

    #[cfg(feature = "cuda")]
    pub use crate::runtime::cuda::CudaRuntime;
}
