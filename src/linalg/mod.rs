//! Triangular matrix primitives
//!
//! Structural operations on one triangle of a column-major matrix:
//! symmetrization, triangle scaling (scalar and per-row/per-column vector),
//! out-of-place transpose, and LAUUM (product of a triangular factor with its
//! own transpose). The out-of-core factorization pipeline composes these; they
//! are also useful on their own, e.g. for diagonal preconditioning of kernel
//! matrices.
//!
//! All operations are allocation-free beyond their declared output. In-place
//! use is the only mode for [`copy_triang`] and [`mul_triang`] (they take one
//! mutable view); [`copy_transpose`] and [`lauum`] take disjoint input and
//! output views, so aliased calls do not compile.

mod lauum;
mod triangular;

pub use lauum::lauum;
pub use triangular::{copy_transpose, copy_triang, mul_triang, vec_mul_triang, Side};
