//! Trait implementations for plain `Vec<T>` and `faer::Mat<T>`.
//!
//! A `Vec<T>` is the simplest container: host memory, [`Serial`] classifier.
//! A dense `faer::Mat<T>` acts on it through [`Symv`], which makes it the
//! reference operator for checks against faer's direct solvers.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)

use crate::core::policy::{ExecutionPolicy, Serial};
use crate::core::traits::{Container, HostStorage, Real, Symv};
use crate::reduction::Superaccumulator;
use faer::Mat;

impl<T: Real> Container for Vec<T> {
    type Scalar = T;
    type Classifier = Serial;

    fn size(&self) -> usize {
        self.len()
    }

    fn kernel1<F>(y: &mut Self, f: &F)
    where
        F: Fn(&mut T) + Sync + Send,
    {
        Serial::kernel1(y, f);
    }

    fn kernel2<F>(x: &Self, y: &mut Self, f: &F)
    where
        F: Fn(T, &mut T) + Sync + Send,
    {
        y.assert_compatible(x);
        Serial::kernel2(x, y, f);
    }

    fn kernel3<F>(x1: &Self, x2: &Self, y: &mut Self, f: &F)
    where
        F: Fn(T, T, &mut T) + Sync + Send,
    {
        y.assert_compatible(x1);
        y.assert_compatible(x2);
        Serial::kernel3(x1, x2, y, f);
    }

    fn kernel4<F>(x1: &Self, x2: &Self, x3: &Self, y: &mut Self, f: &F)
    where
        F: Fn(T, T, T, &mut T) + Sync + Send,
    {
        y.assert_compatible(x1);
        y.assert_compatible(x2);
        y.assert_compatible(x3);
        Serial::kernel4(x1, x2, x3, y, f);
    }

    fn accumulate(x: &Self, w: Option<&Self>, y: &Self) -> Superaccumulator {
        x.assert_compatible(y);
        if let Some(w) = w {
            x.assert_compatible(w);
        }
        Serial::accumulate(x, w.map(Vec::as_slice), y)
    }
}

impl<T: Real> HostStorage for Vec<T> {
    fn from_vec(data: Vec<T>) -> Self {
        data
    }
    fn local_slice(&self) -> &[T] {
        self
    }
    fn local_slice_mut(&mut self) -> &mut [T] {
        self
    }
}

/// Dense `y = alpha * A x + beta * y`. A zero `beta` ignores the old contents of `y`.
impl<T: Real> Symv<Vec<T>> for Mat<T> {
    fn symv(&mut self, alpha: T, x: &Vec<T>, beta: T, y: &mut Vec<T>) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for (i, yi) in y.iter_mut().enumerate() {
            let mut s = T::zero();
            for (j, &xj) in x.iter().enumerate() {
                s = s + self[(i, j)] * xj;
            }
            *yi = if beta == T::zero() {
                alpha * s
            } else {
                alpha * s + beta * *yi
            };
        }
    }
}
