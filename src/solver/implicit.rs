//! Implicit-step solver: inverts `(W + alpha * A)` for a symmetric operator `A`.
//!
//! An implicit time integrator needs `x` with `x + alpha * A x = rhs` in the
//! weighted sense. Multiplying by the weights `W` makes the system symmetric:
//! `(W + alpha * A) x = W rhs`. CG then runs with `A`'s preconditioner and the
//! inverse weights as the norm, so the stopping test measures the residual in
//! the same norm as the plain equation.

use crate::blas1;
use crate::core::traits::{Container, Symv, SymmetricOperator};
use crate::error::DgError;
use crate::solver::pcg::Pcg;
use num_traits::{Float, One, Zero};

/// `y <- s * (W x + alpha * A x) + t * y`
struct ShiftedOperator<'a, M: ?Sized, V: Container> {
    op: &'a mut M,
    alpha: V::Scalar,
    weights: &'a V,
}

impl<M, V> Symv<V> for ShiftedOperator<'_, M, V>
where
    M: Symv<V> + ?Sized,
    V: Container,
{
    fn symv(&mut self, s: V::Scalar, x: &V, t: V::Scalar, y: &mut V) {
        if self.alpha == V::Scalar::zero() {
            blas1::pointwise_dot(s, self.weights, x, t, y);
        } else {
            self.op.symv(s * self.alpha, x, t, y);
            blas1::pointwise_dot(s, self.weights, x, V::Scalar::one(), y);
        }
    }
}

/// Pre-sized solver for `(W + alpha * A) x = W rhs`.
pub struct ImplicitSolver<V: Container> {
    pcg: Pcg<V>,
    rhs: V,
    weights: V,
    inv_weights: V,
    precond: V,
    eps: V::Scalar,
}

impl<V: Container + Clone> ImplicitSolver<V> {
    pub fn new(copyable: &V, max_iter: usize, eps: V::Scalar) -> Self {
        Self {
            pcg: Pcg::new(copyable, max_iter),
            rhs: copyable.clone(),
            weights: copyable.clone(),
            inv_weights: copyable.clone(),
            precond: copyable.clone(),
            eps,
        }
    }

    pub fn eps(&self) -> V::Scalar {
        self.eps
    }

    pub fn set_eps(&mut self, eps: V::Scalar) {
        self.eps = eps;
    }

    /// Solve for `x` (initial guess on entry). Returns the CG iteration count;
    /// a `ConvergenceFailure` must be treated as fatal for the current step.
    pub fn solve<M>(&mut self, alpha: V::Scalar, op: &mut M, x: &mut V, rhs: &V) -> Result<usize, DgError>
    where
        M: SymmetricOperator<V> + ?Sized,
    {
        blas1::copy(op.weights(), &mut self.weights);
        blas1::copy(op.precond(), &mut self.precond);
        blas1::transform(&self.weights, &mut self.inv_weights, |w| w.recip());
        blas1::pointwise_dot(V::Scalar::one(), &self.weights, rhs, V::Scalar::zero(), &mut self.rhs);
        let mut shifted = ShiftedOperator {
            op,
            alpha,
            weights: &self.weights,
        };
        self.pcg
            .solve_with(&mut shifted, x, &self.rhs, &self.precond, &self.inv_weights, self.eps)
    }
}
