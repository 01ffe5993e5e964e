//! Distributed vectors: a local block, its shape, and the process group.
//!
//! Elementwise kernels act on the local block only and need no communication.
//! Reductions are collective: the local superaccumulator is normalized into its
//! integer image, summed over the group with an integer all-reduce, and rebuilt
//! on every process, so all ranks hold the identical exact sum before rounding.

use crate::core::policy::Distributed;
use crate::core::traits::{Container, HostStorage};
use crate::parallel::{CartesianComm, NDIMS, Topology};
use crate::reduction::Superaccumulator;
use crate::vector::shape::LocalShape;
use std::sync::Arc;

pub struct DistVector<V, C> {
    local: V,
    comm: Arc<C>,
    shape: LocalShape,
}

impl<V: HostStorage, C: CartesianComm> DistVector<V, C> {
    /// # Panics
    /// Panics if the payload length does not match `shape`.
    pub fn new(local: V, comm: Arc<C>, shape: LocalShape) -> Self {
        assert_eq!(
            local.size(),
            shape.len(),
            "local payload length does not match its block shape"
        );
        Self { local, comm, shape }
    }

    pub fn from_elem(comm: Arc<C>, shape: LocalShape, value: V::Scalar) -> Self {
        Self::new(V::from_vec(vec![value; shape.len()]), comm, shape)
    }

    /// Local block of the global function `f(global point)`.
    pub fn from_global_fn<F>(comm: Arc<C>, shape: LocalShape, f: F) -> Self
    where
        F: Fn([usize; NDIMS]) -> V::Scalar,
    {
        let topology = comm.topology().clone();
        let data = (0..shape.len())
            .map(|i| f(shape.global_point(&topology, shape.point(i))))
            .collect();
        Self::new(V::from_vec(data), comm, shape)
    }

    pub fn local(&self) -> &V {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut V {
        &mut self.local
    }

    pub fn into_local(self) -> V {
        self.local
    }

    pub fn comm(&self) -> &Arc<C> {
        &self.comm
    }

    pub fn shape(&self) -> &LocalShape {
        &self.shape
    }

    pub fn topology(&self) -> &Topology {
        self.comm.topology()
    }

    /// Local values paired with their global point coordinates.
    pub fn global_entries(&self) -> Vec<([usize; NDIMS], V::Scalar)> {
        let topology = self.topology();
        self.local
            .local_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.shape.global_point(topology, self.shape.point(i)), v))
            .collect()
    }
}

impl<V: Clone, C> Clone for DistVector<V, C> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            comm: Arc::clone(&self.comm),
            shape: self.shape,
        }
    }
}

impl<V: std::fmt::Debug, C> std::fmt::Debug for DistVector<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistVector")
            .field("shape", &self.shape)
            .field("local", &self.local)
            .finish()
    }
}

impl<V: HostStorage, C: CartesianComm> Container for DistVector<V, C> {
    type Scalar = V::Scalar;
    type Classifier = Distributed<V::Classifier>;

    fn size(&self) -> usize {
        self.local.size()
    }

    fn kernel1<F>(y: &mut Self, f: &F)
    where
        F: Fn(&mut V::Scalar) + Sync + Send,
    {
        V::kernel1(&mut y.local, f);
    }

    fn kernel2<F>(x: &Self, y: &mut Self, f: &F)
    where
        F: Fn(V::Scalar, &mut V::Scalar) + Sync + Send,
    {
        y.assert_compatible(x);
        V::kernel2(&x.local, &mut y.local, f);
    }

    fn kernel3<F>(x1: &Self, x2: &Self, y: &mut Self, f: &F)
    where
        F: Fn(V::Scalar, V::Scalar, &mut V::Scalar) + Sync + Send,
    {
        y.assert_compatible(x1);
        y.assert_compatible(x2);
        V::kernel3(&x1.local, &x2.local, &mut y.local, f);
    }

    fn kernel4<F>(x1: &Self, x2: &Self, x3: &Self, y: &mut Self, f: &F)
    where
        F: Fn(V::Scalar, V::Scalar, V::Scalar, &mut V::Scalar) + Sync + Send,
    {
        y.assert_compatible(x1);
        y.assert_compatible(x2);
        y.assert_compatible(x3);
        V::kernel4(&x1.local, &x2.local, &x3.local, &mut y.local, f);
    }

    fn accumulate(x: &Self, w: Option<&Self>, y: &Self) -> Superaccumulator {
        x.assert_compatible(y);
        if let Some(w) = w {
            x.assert_compatible(w);
        }
        let local = V::accumulate(&x.local, w.map(|w| &w.local), &y.local);
        let mut words = local.to_words();
        x.comm.all_reduce_sum_i64(&mut words);
        Superaccumulator::from_words(&words)
    }

    fn assert_compatible(&self, other: &Self) {
        assert!(
            Arc::ptr_eq(&self.comm, &other.comm) || self.topology() == other.topology(),
            "distributed vectors live on different process grids"
        );
        assert_eq!(self.shape, other.shape, "distributed vectors have different block shapes");
    }
}
