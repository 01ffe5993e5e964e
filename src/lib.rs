//! dgblas: reproducible BLAS-style kernels and solvers for discontinuous Galerkin codes
//!
//! This crate provides elementwise vector operations dispatched on compile-time capability
//! classifiers (serial, threaded, device-style, distributed and composite containers), an
//! exactly rounded dot product that is bit-identical for any thread or process count,
//! distributed block-banded matrices with nearest-neighbour halo exchange, and a
//! preconditioned conjugate-gradient solver for the elliptic inversions of implicit time steps.

pub mod parallel;

pub mod blas1;
pub mod blas2;
pub mod config;
pub mod core;
pub mod error;
pub mod matrix;
pub mod reduction;
pub mod solver;
pub mod utils;
pub mod vector;

// Re-exports for convenience
pub use crate::config::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::matrix::*;
pub use crate::reduction::Superaccumulator;
pub use crate::solver::*;
pub use crate::utils::*;
pub use crate::vector::*;
