//! Matrix–vector products and the weighted inner product.

use crate::core::traits::{Container, Real, Symv};
use crate::error::DgError;
use num_traits::{One, Zero};

/// `y <- alpha * M x + beta * y`
pub fn symv<V, M>(alpha: V::Scalar, m: &mut M, x: &V, beta: V::Scalar, y: &mut V)
where
    V: Container,
    M: Symv<V> + ?Sized,
{
    m.symv(alpha, x, beta, y);
}

/// `y <- M x`
pub fn apply<V, M>(m: &mut M, x: &V, y: &mut V)
where
    V: Container,
    M: Symv<V> + ?Sized,
{
    m.symv(V::Scalar::one(), x, V::Scalar::zero(), y);
}

/// General matrix–vector product. The block operators here are applied the
/// same way whether or not they are symmetric.
pub fn gemv<V, M>(alpha: V::Scalar, m: &mut M, x: &V, beta: V::Scalar, y: &mut V)
where
    V: Container,
    M: Symv<V> + ?Sized,
{
    m.symv(alpha, x, beta, y);
}

/// Exact weighted inner product `Σ x_i w_i y_i`, rounded once.
pub fn dot<V: Container>(x: &V, w: &V, y: &V) -> Result<V::Scalar, DgError> {
    if x.size() == 0 {
        return Err(DgError::InvalidArgument("dot product of empty vectors".into()));
    }
    Ok(V::Scalar::narrow(V::accumulate(x, Some(w), y).round()))
}
