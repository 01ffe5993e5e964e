//! Host-resident vectors tagged with an execution policy.

use crate::core::policy::{Device, ExecutionPolicy, Serial, Threaded};
use crate::core::traits::{Container, HostStorage, Real};
use crate::reduction::Superaccumulator;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// A contiguous vector whose kernels run under policy `P`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostVector<T, P = Serial> {
    data: Vec<T>,
    policy: PhantomData<P>,
}

pub type SerialVector<T> = HostVector<T, Serial>;
pub type ThreadedVector<T> = HostVector<T, Threaded>;
pub type DeviceVector<T> = HostVector<T, Device>;

impl<T: Real, P: ExecutionPolicy> HostVector<T, P> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            policy: PhantomData,
        }
    }

    pub fn from_elem(len: usize, value: T) -> Self {
        Self::new(vec![value; len])
    }

    pub fn zeros(len: usize) -> Self {
        Self::from_elem(len, T::zero())
    }

    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

impl<T, P> Deref for HostVector<T, P> {
    type Target = [T];
    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T, P> DerefMut for HostVector<T, P> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Real, P: ExecutionPolicy> From<Vec<T>> for HostVector<T, P> {
    fn from(data: Vec<T>) -> Self {
        Self::new(data)
    }
}

impl<T: Real, P: ExecutionPolicy> FromIterator<T> for HostVector<T, P> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Real, P: ExecutionPolicy> Container for HostVector<T, P> {
    type Scalar = T;
    type Classifier = P;

    fn size(&self) -> usize {
        self.data.len()
    }

    fn kernel1<F>(y: &mut Self, f: &F)
    where
        F: Fn(&mut T) + Sync + Send,
    {
        P::kernel1(&mut y.data, f);
    }

    fn kernel2<F>(x: &Self, y: &mut Self, f: &F)
    where
        F: Fn(T, &mut T) + Sync + Send,
    {
        y.assert_compatible(x);
        P::kernel2(&x.data, &mut y.data, f);
    }

    fn kernel3<F>(x1: &Self, x2: &Self, y: &mut Self, f: &F)
    where
        F: Fn(T, T, &mut T) + Sync + Send,
    {
        y.assert_compatible(x1);
        y.assert_compatible(x2);
        P::kernel3(&x1.data, &x2.data, &mut y.data, f);
    }

    fn kernel4<F>(x1: &Self, x2: &Self, x3: &Self, y: &mut Self, f: &F)
    where
        F: Fn(T, T, T, &mut T) + Sync + Send,
    {
        y.assert_compatible(x1);
        y.assert_compatible(x2);
        y.assert_compatible(x3);
        P::kernel4(&x1.data, &x2.data, &x3.data, &mut y.data, f);
    }

    fn accumulate(x: &Self, w: Option<&Self>, y: &Self) -> Superaccumulator {
        x.assert_compatible(y);
        if let Some(w) = w {
            x.assert_compatible(w);
        }
        P::accumulate(&x.data, w.map(|w| w.data.as_slice()), &y.data)
    }
}

impl<T: Real, P: ExecutionPolicy> HostStorage for HostVector<T, P> {
    fn from_vec(data: Vec<T>) -> Self {
        Self::new(data)
    }
    fn local_slice(&self) -> &[T] {
        &self.data
    }
    fn local_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
