//! Error types for cholr

use thiserror::Error;

/// Result type alias using cholr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cholr operations
#[derive(Error, Debug)]
pub enum Error {
    /// A malformed resource or partition description, detected at the boundary
    /// before any compute is issued
    #[error("Configuration error: {reason}")]
    Configuration {
        /// What was wrong with the configuration
        reason: String,
    },

    /// A diagonal block failed positive-definiteness during factorization.
    ///
    /// The job is aborted; the output buffer is left in an undefined state and
    /// must be discarded by the caller.
    #[error(
        "Block {block_id} is not positive definite \
         (leading minor {leading_minor}, device {device_id})"
    )]
    NotPositiveDefinite {
        /// Id of the block whose factorization failed
        block_id: usize,
        /// Device the block was assigned to
        device_id: usize,
        /// 1-based order of the first non-positive leading minor
        leading_minor: usize,
    },

    /// A device could not satisfy an allocation made during execution
    #[error("Out of memory on device {device_id}: failed to allocate {requested} bytes")]
    OutOfMemory {
        /// Device that ran out of memory
        device_id: usize,
        /// Requested size in bytes
        requested: usize,
    },

    /// The requested backend is not usable in this build or on this machine
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        /// Name of the backend
        backend: &'static str,
        /// Why it cannot be used
        reason: String,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),

    /// CUDA driver error
    #[cfg(feature = "cuda")]
    #[error("CUDA error: {0}")]
    Cuda(#[from] cudarc::driver::DriverError),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a backend-unavailable error
    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }
}
