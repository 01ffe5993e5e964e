//! Bundles a matrix with the weights and preconditioner CG needs.

use crate::core::traits::{Container, Symv, SymmetricOperator};

/// Any [`Symv`] matrix plus its weighting and diagonal preconditioner, all of
/// one shape.
pub struct WeightedOperator<M, V> {
    pub matrix: M,
    weights: V,
    precond: V,
}

impl<M, V: Container> WeightedOperator<M, V> {
    /// # Panics
    /// Panics if `weights` and `precond` are not of one shape.
    pub fn new(matrix: M, weights: V, precond: V) -> Self {
        weights.assert_compatible(&precond);
        Self {
            matrix,
            weights,
            precond,
        }
    }
}

impl<M: Symv<V>, V: Container> Symv<V> for WeightedOperator<M, V> {
    fn symv(&mut self, alpha: V::Scalar, x: &V, beta: V::Scalar, y: &mut V) {
        self.matrix.symv(alpha, x, beta, y);
    }
}

impl<M: Symv<V>, V: Container> SymmetricOperator<V> for WeightedOperator<M, V> {
    fn weights(&self) -> &V {
        &self.weights
    }
    fn precond(&self) -> &V {
        &self.precond
    }
}
