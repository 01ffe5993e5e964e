//! Core linear-algebra traits for dgblas.
//!
//! [`Container`] is the single seam through which every elementwise operation and
//! every reduction is dispatched. Each implementor names its capability
//! [`Classifier`](crate::core::policy::Classifier) as an associated type and routes
//! the generic kernels to the matching loop: a policy kernel for host and device
//! vectors, recursion into the local payload for distributed vectors, and
//! recursion into each component for composite vectors.
//!
//! All arguments of one operation share a single container type `V`, so mixing a
//! distributed vector with a plain one (or a threaded one with a serial one) does
//! not type-check.

use crate::core::policy::Classifier;
use crate::reduction::Superaccumulator;
use num_traits::Float;
use std::fmt::Debug;

/// Floating-point scalar usable in every kernel.
pub trait Real: Float + Default + Debug + Send + Sync + 'static {
    /// Split `a * b` into the rounded product and its exact rounding error, both
    /// as `f64`, so that `p + e == a * b` exactly.
    fn two_product(a: Self, b: Self) -> (f64, f64);
    /// Lossless conversion to `f64`.
    fn widen(self) -> f64;
    /// Conversion from `f64`, rounding to the working precision.
    fn narrow(v: f64) -> Self;
}

impl Real for f64 {
    #[inline]
    fn two_product(a: f64, b: f64) -> (f64, f64) {
        let p = a * b;
        (p, a.mul_add(b, -p))
    }
    #[inline]
    fn widen(self) -> f64 {
        self
    }
    #[inline]
    fn narrow(v: f64) -> f64 {
        v
    }
}

impl Real for f32 {
    // A product of two 24-bit mantissas fits the 53-bit mantissa of an f64.
    #[inline]
    fn two_product(a: f32, b: f32) -> (f64, f64) {
        (a as f64 * b as f64, 0.0)
    }
    #[inline]
    fn widen(self) -> f64 {
        self as f64
    }
    #[inline]
    fn narrow(v: f64) -> f32 {
        v as f32
    }
}

/// A vector-like container the dispatcher knows how to loop over.
///
/// The `kernel*` functions apply a scalar functor elementwise over one output and
/// up to three inputs of the same shape. `accumulate` produces the exact,
/// group-wide partial sum of `x·y` (or `x·w·y`); for distributed containers it
/// already includes the merge across the process group, so it is a collective
/// call.
pub trait Container {
    /// Element type.
    type Scalar: Real;
    /// Compile-time capability classifier.
    type Classifier: Classifier;

    /// Number of locally owned elements.
    fn size(&self) -> usize;

    /// `f(y_i)` for every element.
    fn kernel1<F>(y: &mut Self, f: &F)
    where
        F: Fn(&mut Self::Scalar) + Sync + Send;

    /// `f(x_i, y_i)` for every element.
    fn kernel2<F>(x: &Self, y: &mut Self, f: &F)
    where
        F: Fn(Self::Scalar, &mut Self::Scalar) + Sync + Send;

    /// `f(x1_i, x2_i, y_i)` for every element.
    fn kernel3<F>(x1: &Self, x2: &Self, y: &mut Self, f: &F)
    where
        F: Fn(Self::Scalar, Self::Scalar, &mut Self::Scalar) + Sync + Send;

    /// `f(x1_i, x2_i, x3_i, y_i)` for every element.
    fn kernel4<F>(x1: &Self, x2: &Self, x3: &Self, y: &mut Self, f: &F)
    where
        F: Fn(Self::Scalar, Self::Scalar, Self::Scalar, &mut Self::Scalar) + Sync + Send;

    /// Exact accumulation of `Σ x_i y_i` (or `Σ x_i w_i y_i`).
    fn accumulate(x: &Self, w: Option<&Self>, y: &Self) -> Superaccumulator;

    /// Panics if the two containers do not describe the same layout.
    fn assert_compatible(&self, other: &Self) {
        assert_eq!(self.size(), other.size(), "Containers must have the same length");
    }
}

/// Containers whose elements form one contiguous host slice.
///
/// Halo packing and the block-matrix kernels need direct slice access; the
/// elementwise API never does.
pub trait HostStorage: Container {
    fn from_vec(data: Vec<Self::Scalar>) -> Self;
    fn local_slice(&self) -> &[Self::Scalar];
    fn local_slice_mut(&mut self) -> &mut [Self::Scalar];
}

/// Matrix–vector product: y ← alpha · A x + beta · y.
pub trait Symv<V: Container> {
    fn symv(&mut self, alpha: V::Scalar, x: &V, beta: V::Scalar, y: &mut V);
}

/// The contract the CG solver requires of any operator it inverts: a symmetric
/// matrix–vector product, the weighting vector that defines the norm, and a
/// diagonal preconditioner, all of one shape.
pub trait SymmetricOperator<V: Container>: Symv<V> {
    /// Volume/quadrature weights `W`.
    fn weights(&self) -> &V;
    /// Diagonal approximation of the inverse operator.
    fn precond(&self) -> &V;
}
