use thiserror::Error;

// Unified error type for dgblas

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DgError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// CG exhausted its iteration budget. `achieved` is the relative residual
    /// `||r||_W / ||b||_W` reached after `iterations` steps.
    #[error(
        "conjugate gradient failed to converge to {eps:e} after {iterations} iterations (achieved relative residual {achieved:e})"
    )]
    ConvergenceFailure {
        eps: f64,
        achieved: f64,
        iterations: usize,
    },
    #[error("indefinite matrix detected (p^T A p <= 0)")]
    IndefiniteMatrix,
}

impl DgError {
    /// Residual scale reached by a failed solve, if this is a convergence failure.
    pub fn achieved_residual(&self) -> Option<f64> {
        match self {
            DgError::ConvergenceFailure { achieved, .. } => Some(*achieved),
            _ => None,
        }
    }
}
