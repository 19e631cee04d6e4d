//! Out-of-core blocked Cholesky
//!
//! The pieces of a factorization job:
//!
//! - [`BlockPartition`]: how an external planner split the matrix diagonal
//!   into device-owned blocks. Validated at construction; the core never
//!   re-plans.
//! - [`ResourceRegistry`]: the per-device solver contexts the job may use.
//! - [`TransferStrategy`]: how blocks move between devices. The provided
//!   [`HostStaged`] strategy routes everything through the host matrix.
//! - [`parallel_potrf`]: the block-column scheduler itself.
//! - [`cholesky`]: a small driver that factorizes and optionally cleans the
//!   non-factor triangle.
//!
//! A job is transient: registry, partition and matrix are borrowed for one
//! call and nothing is retained afterwards. On any error the matrix contents
//! are undefined and must be discarded; partial progress is not rolled back.

mod allocation;
mod potrf;
mod registry;
mod transfer;

pub use allocation::{BlockAllocation, BlockPartition};
pub use potrf::{cholesky, parallel_potrf, parallel_potrf_with};
pub use registry::{GpuResource, ResourceRegistry};
pub use transfer::{HostStaged, TransferStrategy};
