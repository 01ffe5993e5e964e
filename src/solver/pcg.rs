//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2, with a
//! Polak–Ribière update of the search direction.
//!
//! The residual is measured in the weighted norm `||r||_W = sqrt(r·W·r)`
//! through the reproducible dot product, so the iteration count does not depend
//! on the thread or process count. The preconditioner is the diagonal
//! `P ≈ A⁻¹`, applied pointwise.

use crate::blas1;
use crate::blas2;
use crate::config::SolverOptions;
use crate::core::traits::{Container, Real, Symv, SymmetricOperator};
use crate::error::DgError;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use log::{debug, info, warn};
use num_traits::{Float, One, Zero};

/// CG solver with a scratch pool sized once at construction.
pub struct Pcg<V: Container> {
    r: V,
    p: V,
    ap: V,
    /// Copies of the operator's weights and preconditioner for [`Pcg::solve`].
    w: V,
    pinv: V,
    conv: Convergence<V::Scalar>,
}

impl<V: Container + Clone> Pcg<V> {
    /// Scratch vectors take the shape (and process group) of `copyable`.
    pub fn new(copyable: &V, max_iter: usize) -> Self {
        Self::with_options(copyable, &SolverOptions::default().with_max_iter(max_iter))
    }

    pub fn with_options(copyable: &V, opts: &SolverOptions) -> Self {
        Self {
            r: copyable.clone(),
            p: copyable.clone(),
            ap: copyable.clone(),
            w: copyable.clone(),
            pinv: copyable.clone(),
            conv: Convergence {
                eps: V::Scalar::narrow(opts.eps),
                max_iters: opts.max_iter,
                nrmb_correction: V::Scalar::narrow(opts.nrmb_correction),
            },
        }
    }

    pub fn max_iter(&self) -> usize {
        self.conv.max_iters
    }

    pub fn set_max_iter(&mut self, max_iter: usize) {
        self.conv.max_iters = max_iter;
    }

    /// Added to `||b||_W` in the stopping test.
    pub fn set_nrmb_correction(&mut self, correction: V::Scalar) {
        self.conv.nrmb_correction = correction;
    }

    /// Solve `A x = b` for a symmetric positive-definite operator, using its
    /// weights for the norm and its preconditioner. `x` holds the initial
    /// guess. Returns the number of iterations used.
    pub fn solve<M>(&mut self, op: &mut M, x: &mut V, b: &V, eps: V::Scalar) -> Result<usize, DgError>
    where
        M: SymmetricOperator<V> + ?Sized,
    {
        self.solve_stats(op, x, b, eps).map(|s| s.iterations)
    }

    /// Like [`solve`](Self::solve), with explicit preconditioner and norm
    /// weights instead of the operator's own.
    pub fn solve_with<M>(
        &mut self,
        a: &mut M,
        x: &mut V,
        b: &V,
        precond: &V,
        weights: &V,
        eps: V::Scalar,
    ) -> Result<usize, DgError>
    where
        M: Symv<V> + ?Sized,
    {
        let mut conv = self.conv;
        conv.eps = eps;
        let Self { r, p, ap, .. } = self;
        iterate(&conv, a, x, b, precond, weights, r, p, ap).map(|s| s.iterations)
    }

    fn solve_stats<M>(&mut self, op: &mut M, x: &mut V, b: &V, eps: V::Scalar) -> Result<SolveStats<V::Scalar>, DgError>
    where
        M: SymmetricOperator<V> + ?Sized,
    {
        blas1::copy(op.weights(), &mut self.w);
        blas1::copy(op.precond(), &mut self.pinv);
        let mut conv = self.conv;
        conv.eps = eps;
        let Self { r, p, ap, w, pinv, .. } = self;
        iterate(&conv, op, x, b, pinv, w, r, p, ap)
    }
}

#[allow(clippy::too_many_arguments)]
fn iterate<V, M>(
    conv: &Convergence<V::Scalar>,
    a: &mut M,
    x: &mut V,
    b: &V,
    pinv: &V,
    w: &V,
    r: &mut V,
    p: &mut V,
    ap: &mut V,
) -> Result<SolveStats<V::Scalar>, DgError>
where
    V: Container,
    M: Symv<V> + ?Sized,
{
    let one = V::Scalar::one();
    let zero = V::Scalar::zero();

    let nrmb = blas2::dot(b, w, b)?.sqrt();
    if nrmb == zero {
        blas1::axpby(one, b, zero, x);
        return Ok(SolveStats {
            iterations: 0,
            final_residual: zero,
            converged: true,
        });
    }

    // r = b - A x
    a.symv(-one, x, zero, r);
    blas1::axpby(one, b, one, r);
    let mut nrmr = blas2::dot(r, w, r)?.sqrt();
    let (stop, stats) = conv.check(nrmr, nrmb, 0);
    if stop && stats.converged {
        return Ok(stats);
    }

    blas1::pointwise_dot(one, pinv, r, zero, p);
    let mut nrm2r_old = blas2::dot(r, pinv, r)?;
    for i in 1..=conv.max_iters {
        a.symv(one, p, zero, ap);
        let pap = blas1::dot(p, ap)?;
        if !(pap > zero) {
            warn!("cg: p·Ap = {:e} at iteration {i}, operator is not positive definite", pap.widen());
            return Err(DgError::IndefiniteMatrix);
        }
        let alpha = nrm2r_old / pap;
        blas1::axpby(alpha, p, one, x);
        blas1::axpby(-alpha, ap, one, r);
        nrmr = blas2::dot(r, w, r)?.sqrt();
        debug!("cg iteration {i}: |r|_W = {:e}", nrmr.widen());

        let (stop, stats) = conv.check(nrmr, nrmb, i);
        if stats.converged {
            info!(
                "cg converged in {i} iterations (relative residual {:e})",
                stats.final_residual.widen()
            );
            return Ok(stats);
        }
        if stop {
            break;
        }

        let nrm2r_new = blas2::dot(r, pinv, r)?;
        let beta = -alpha * blas2::dot(r, pinv, ap)? / nrm2r_old;
        blas1::pointwise_dot(one, pinv, r, beta, p);
        nrm2r_old = nrm2r_new;
    }

    let achieved = (nrmr / nrmb).widen();
    warn!(
        "cg did not reach {:e} in {} iterations (relative residual {achieved:e})",
        conv.eps.widen(),
        conv.max_iters
    );
    Err(DgError::ConvergenceFailure {
        eps: conv.eps.widen(),
        achieved,
        iterations: conv.max_iters,
    })
}

impl<M, V> LinearSolver<M, V> for Pcg<V>
where
    M: SymmetricOperator<V>,
    V: Container + Clone,
{
    type Error = DgError;
    type Scalar = V::Scalar;

    fn solve(&mut self, a: &mut M, b: &V, x: &mut V) -> Result<SolveStats<V::Scalar>, DgError> {
        let eps = self.conv.eps;
        self.solve_stats(a, x, b, eps)
    }
}
