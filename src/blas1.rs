//! Elementwise vector operations and the reproducible dot product.
//!
//! Every function is written once against [`Container`]; the container's
//! classifier picks the loop. All arguments of one call share the same
//! container type, so a distributed vector cannot be mixed with a plain one.
//!
//! Where an operation has the form `y <- ... + beta * y`, a `beta` of exactly
//! zero overwrites `y` without reading it, so uninitialized or NaN contents
//! never leak into the result.

use crate::core::traits::{Container, Real};
use crate::error::DgError;
use num_traits::Zero;

/// Exact `Σ x_i y_i`, rounded once. Bit-identical for any partitioning of the
/// data over threads or processes. Collective for distributed containers.
pub fn dot<V: Container>(x: &V, y: &V) -> Result<V::Scalar, DgError> {
    if x.size() == 0 {
        return Err(DgError::InvalidArgument("dot product of empty vectors".into()));
    }
    Ok(V::Scalar::narrow(V::accumulate(x, None, y).round()))
}

/// `y <- alpha * x + beta * y`
pub fn axpby<V: Container>(alpha: V::Scalar, x: &V, beta: V::Scalar, y: &mut V) {
    let zero = V::Scalar::zero();
    if beta == zero {
        V::kernel2(x, y, &|x, y| *y = alpha * x);
    } else if alpha == zero {
        V::kernel1(y, &|y| *y = beta * *y);
    } else {
        V::kernel2(x, y, &|x, y| *y = alpha * x + beta * *y);
    }
}

/// `z <- alpha * x + beta * y + gamma * z`
pub fn axpbypgz<V: Container>(
    alpha: V::Scalar,
    x: &V,
    beta: V::Scalar,
    y: &V,
    gamma: V::Scalar,
    z: &mut V,
) {
    if gamma == V::Scalar::zero() {
        V::kernel3(x, y, z, &|x, y, z| *z = alpha * x + beta * y);
    } else {
        V::kernel3(x, y, z, &|x, y, z| *z = alpha * x + beta * y + gamma * *z);
    }
}

/// `x <- alpha * x`
pub fn scal<V: Container>(x: &mut V, alpha: V::Scalar) {
    V::kernel1(x, &|x| *x = alpha * *x);
}

/// `x <- x + alpha`
pub fn plus<V: Container>(x: &mut V, alpha: V::Scalar) {
    V::kernel1(x, &|x| *x = *x + alpha);
}

/// `y <- x`
pub fn copy<V: Container>(x: &V, y: &mut V) {
    V::kernel2(x, y, &|x, y| *y = x);
}

/// `y <- alpha * x1 * x2 + beta * y`
pub fn pointwise_dot<V: Container>(alpha: V::Scalar, x1: &V, x2: &V, beta: V::Scalar, y: &mut V) {
    if beta == V::Scalar::zero() {
        V::kernel3(x1, x2, y, &|a, b, y| *y = alpha * a * b);
    } else {
        V::kernel3(x1, x2, y, &|a, b, y| *y = alpha * a * b + beta * *y);
    }
}

/// `y <- alpha * x1 / x2 + beta * y`
pub fn pointwise_divide<V: Container>(
    alpha: V::Scalar,
    x1: &V,
    x2: &V,
    beta: V::Scalar,
    y: &mut V,
) {
    if beta == V::Scalar::zero() {
        V::kernel3(x1, x2, y, &|a, b, y| *y = alpha * a / b);
    } else {
        V::kernel3(x1, x2, y, &|a, b, y| *y = alpha * a / b + beta * *y);
    }
}

/// `y <- f(x)`
pub fn transform<V, F>(x: &V, y: &mut V, f: F)
where
    V: Container,
    F: Fn(V::Scalar) -> V::Scalar + Sync + Send,
{
    V::kernel2(x, y, &|x, y| *y = f(x));
}

/// Apply `f` to every element of `y`.
pub fn subroutine1<V, F>(y: &mut V, f: F)
where
    V: Container,
    F: Fn(&mut V::Scalar) + Sync + Send,
{
    V::kernel1(y, &f);
}

/// Apply `f(x_i, y_i)` elementwise; only the last argument is written.
pub fn subroutine2<V, F>(x: &V, y: &mut V, f: F)
where
    V: Container,
    F: Fn(V::Scalar, &mut V::Scalar) + Sync + Send,
{
    V::kernel2(x, y, &f);
}

pub fn subroutine3<V, F>(x1: &V, x2: &V, y: &mut V, f: F)
where
    V: Container,
    F: Fn(V::Scalar, V::Scalar, &mut V::Scalar) + Sync + Send,
{
    V::kernel3(x1, x2, y, &f);
}

pub fn subroutine4<V, F>(x1: &V, x2: &V, x3: &V, y: &mut V, f: F)
where
    V: Container,
    F: Fn(V::Scalar, V::Scalar, V::Scalar, &mut V::Scalar) + Sync + Send,
{
    V::kernel4(x1, x2, x3, y, &f);
}
