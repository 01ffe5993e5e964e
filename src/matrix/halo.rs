//! Ghost-extended copy of a distributed vector's local block.
//!
//! The buffer pads the local block with one cell of ghost points on each side
//! of every direction. Before a block product, the interior is refreshed from
//! the input vector and, for each coupled direction, the boundary layers are
//! swapped with the two Cartesian neighbours:
//!
//! 1. the high layer goes to the `+1` neighbour while the low ghost layer is
//!    filled from the `-1` neighbour;
//! 2. the low layer goes to the `-1` neighbour while the high ghost layer is
//!    filled from the `+1` neighbour.
//!
//! A missing neighbour (non-periodic edge) leaves a zero ghost layer.
//! Layers travel as `f64`, which is lossless for every supported scalar.

use crate::core::traits::Real;
use crate::matrix::Coupling;
use crate::parallel::{CartesianComm, NDIMS};
use crate::vector::LocalShape;

#[derive(Debug, Clone)]
pub struct HaloBuffer<T> {
    shape: LocalShape,
    ext: Vec<T>,
    send: Vec<f64>,
    recv: Vec<f64>,
}

impl<T: Real> HaloBuffer<T> {
    pub fn new(shape: LocalShape) -> Self {
        let layer = (0..NDIMS).map(|d| layer_len(&shape, d)).max().unwrap_or(0);
        Self {
            shape,
            ext: vec![T::zero(); shape.extended_len()],
            send: vec![0.0; layer],
            recv: vec![0.0; layer],
        }
    }

    /// The ghost-extended block, laid out like [`LocalShape::index`] over
    /// [`LocalShape::extended`].
    pub fn data(&self) -> &[T] {
        &self.ext
    }

    /// Index into [`data`](Self::data) of extended coordinates `e`.
    #[inline]
    pub fn index(&self, e: [usize; NDIMS]) -> usize {
        let ext = self.shape.extended();
        (e[2] * ext[1] + e[1]) * ext[0] + e[0]
    }

    /// Copy `x` into the interior and exchange ghost layers along every
    /// direction in `coupling`. Collective over the process group.
    pub fn refresh<C: CartesianComm + ?Sized>(&mut self, x: &[T], coupling: Coupling, comm: &C) {
        assert_eq!(x.len(), self.shape.len(), "input does not match the halo block shape");
        let m0 = self.shape.points(0);
        let m1 = self.shape.points(1);
        let g = self.shape.coeffs;
        for pz in 0..self.shape.points(2) {
            for py in 0..m1 {
                let src = (pz * m1 + py) * m0;
                let dst = self.index([g[0], py + g[1], pz + g[2]]);
                self.ext[dst..dst + m0].copy_from_slice(&x[src..src + m0]);
            }
        }
        for d in 0..NDIMS {
            if coupling.contains(Coupling::along(d)) {
                self.exchange(d, comm);
            }
        }
    }

    fn exchange<C: CartesianComm + ?Sized>(&mut self, d: usize, comm: &C) {
        let g = self.shape.coeffs[d];
        let m = self.shape.points(d);
        let n = layer_len(&self.shape, d);

        let (minus, plus) = comm.shift(d, 1);
        self.pack(d, m, n);
        comm.send_recv(&self.send[..n], plus, &mut self.recv[..n], minus);
        self.unpack(d, 0, n, minus.is_some());

        let (plus, minus) = comm.shift(d, -1);
        self.pack(d, g, n);
        comm.send_recv(&self.send[..n], minus, &mut self.recv[..n], plus);
        self.unpack(d, g + m, n, plus.is_some());
    }

    fn pack(&mut self, d: usize, start: usize, n: usize) {
        let ext = &self.ext;
        for (slot, idx) in self.send[..n].iter_mut().zip(slab(&self.shape, d, start)) {
            *slot = ext[idx].widen();
        }
    }

    fn unpack(&mut self, d: usize, start: usize, n: usize, received: bool) {
        for (k, idx) in slab(&self.shape, d, start).enumerate().take(n) {
            self.ext[idx] = if received {
                T::narrow(self.recv[k])
            } else {
                T::zero()
            };
        }
    }
}

/// Points in one ghost layer normal to `d`: one cell thick along `d`,
/// the interior extent in the other directions.
fn layer_len(shape: &LocalShape, d: usize) -> usize {
    (0..NDIMS)
        .map(|e| if e == d { shape.coeffs[e] } else { shape.points(e) })
        .product()
}

/// Extended-buffer indices of the layer starting at extended coordinate
/// `start` along `d`, in a fixed order shared by sender and receiver.
fn slab(shape: &LocalShape, d: usize, start: usize) -> impl Iterator<Item = usize> {
    let ext = shape.extended();
    let mut lo = shape.coeffs;
    let mut hi = [0; NDIMS];
    for e in 0..NDIMS {
        hi[e] = lo[e] + shape.points(e);
    }
    lo[d] = start;
    hi[d] = start + shape.coeffs[d];
    (lo[2]..hi[2]).flat_map(move |z| {
        (lo[1]..hi[1]).flat_map(move |y| (lo[0]..hi[0]).map(move |x| (z * ext[1] + y) * ext[0] + x))
    })
}
