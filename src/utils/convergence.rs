//! Convergence tracking & tolerance checks for iterative solvers.

use num_traits::Float;

/// Stopping criteria: stop once `||r|| < eps * (||b|| + nrmb_correction)`.
///
/// The correction keeps the test meaningful when `||b||` is tiny compared to
/// the scale of the solution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence<T> {
    pub eps: T,
    pub max_iters: usize,
    pub nrmb_correction: T,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub iterations: usize,
    /// Relative residual `||r|| / ||b||` at exit.
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Float> Convergence<T> {
    pub fn new(eps: T, max_iters: usize) -> Self {
        Self {
            eps,
            max_iters,
            nrmb_correction: T::zero(),
        }
    }

    /// Absolute residual below which the iteration stops.
    pub fn threshold(&self, nrmb: T) -> T {
        self.eps * (nrmb + self.nrmb_correction)
    }

    /// Returns (should_stop, stats) given current `res_norm` and iteration `i`.
    /// Stops on convergence or once `max_iters` is reached.
    pub fn check(&self, res_norm: T, nrmb: T, i: usize) -> (bool, SolveStats<T>) {
        let converged = res_norm < self.threshold(nrmb);
        let rel = if nrmb > T::zero() { res_norm / nrmb } else { res_norm };
        (
            converged || i >= self.max_iters,
            SolveStats {
                iterations: i,
                final_residual: rel,
                converged,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_loosens_the_threshold() {
        let mut conv = Convergence::new(1e-3, 10);
        assert!(!conv.check(1e-3, 1.0, 1).0);
        conv.nrmb_correction = 1.0;
        let (stop, stats) = conv.check(1e-3, 1.0, 1);
        assert!(stop && stats.converged);
        assert_eq!(stats.final_residual, 1e-3);
    }

    #[test]
    fn stops_without_converging_at_max_iters() {
        let conv = Convergence::new(1e-10, 3);
        let (stop, stats) = conv.check(0.5, 1.0, 3);
        assert!(stop);
        assert!(!stats.converged);
    }
}
