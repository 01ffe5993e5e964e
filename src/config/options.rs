//! API options for the solvers and the shared-memory thread pool.
//!
//! This module provides `SolverOptions`, which sets the tolerance, iteration
//! budget and norm correction of the conjugate-gradient solvers, and
//! `ThreadOptions`, which sizes the global worker pool used by the threaded and
//! device policies.

use crate::error::DgError;
use log::info;

/// CG stopping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Relative residual tolerance
    pub eps: f64,

    /// Iteration budget before a `ConvergenceFailure`
    pub max_iter: usize,

    /// Added to `||b||` in the stopping test
    pub nrmb_correction: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            eps: 1e-10,
            max_iter: 1000,
            nrmb_correction: 0.0,
        }
    }
}

impl SolverOptions {
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }
    pub fn with_nrmb_correction(mut self, nrmb_correction: f64) -> Self {
        self.nrmb_correction = nrmb_correction;
        self
    }
}

/// Size of the global worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOptions {
    pub num_threads: usize,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        #[cfg(feature = "rayon")]
        let num_threads = num_cpus::get();
        #[cfg(not(feature = "rayon"))]
        let num_threads = 1;
        Self { num_threads }
    }
}

impl ThreadOptions {
    pub fn with_threads(num_threads: usize) -> Self {
        Self { num_threads }
    }

    /// Build the global rayon pool. Fails if it was already initialized.
    #[cfg(feature = "rayon")]
    pub fn install(&self) -> Result<(), DgError> {
        if self.num_threads == 0 {
            return Err(DgError::InvalidArgument("thread count must be positive".into()));
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build_global()
            .map_err(|e| DgError::InvalidArgument(e.to_string()))?;
        info!("worker pool started with {} threads", self.num_threads);
        Ok(())
    }

    /// Without the `rayon` feature every policy runs on the calling thread.
    #[cfg(not(feature = "rayon"))]
    pub fn install(&self) -> Result<(), DgError> {
        if self.num_threads != 1 {
            return Err(DgError::InvalidArgument(
                "multi-threaded execution needs the `rayon` feature".into(),
            ));
        }
        info!("running single-threaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let o = SolverOptions::default()
            .with_eps(1e-6)
            .with_max_iter(20)
            .with_nrmb_correction(1.0);
        assert_eq!(o.eps, 1e-6);
        assert_eq!(o.max_iter, 20);
        assert_eq!(o.nrmb_correction, 1.0);
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(ThreadOptions::with_threads(0).install().is_err());
        assert!(ThreadOptions::default().num_threads >= 1);
    }
}
