//! Iterative solvers for symmetric positive-definite operators.

use crate::utils::convergence::SolveStats;

/// Common interface for any direct or iterative solver.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar;
    /// Solve A·x = b, writing result into `x` (which holds the initial guess).
    /// Returns iteration stats (including convergence info).
    fn solve(&mut self, a: &mut M, b: &V, x: &mut V) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

pub mod implicit;
pub use implicit::ImplicitSolver;

pub mod pcg;
pub use pcg::Pcg;
