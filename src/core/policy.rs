//! Capability classifiers and the execution policies behind them.
//!
//! A classifier is a zero-sized type that describes where a container's data lives
//! and whether it wraps other containers. The three leaf classifiers double as
//! execution policies and carry the actual slice kernels:
//!
//! - [`Serial`]: one thread, plain loops.
//! - [`Threaded`]: shared-memory parallel. The index range is cut into one
//!   contiguous chunk per worker, so each thread owns a disjoint range.
//! - [`Device`]: accelerator-style, one logical work item per element.
//!
//! [`Distributed`] and [`Composite`] wrap another classifier. The set is sealed.
//!
//! Without the `rayon` feature the parallel policies run the serial loops.

use crate::core::traits::Real;
use crate::reduction::Superaccumulator;
use std::marker::PhantomData;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

mod sealed {
    pub trait Sealed {}
}

/// Where a container's elements are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySpace {
    /// Host memory touched by one thread.
    Host,
    /// Host memory shared by a pool of worker threads.
    SharedHost,
    /// Accelerator memory.
    Device,
}

/// Compile-time capability metadata of a container.
pub trait Classifier: sealed::Sealed + 'static {
    /// Memory space of the innermost payload.
    const SPACE: MemorySpace;
    /// Whether the container is a local block plus a process group.
    const DISTRIBUTED: bool = false;
    /// Whether the container is a fixed tuple of component containers.
    const COMPOSITE: bool = false;
    /// Human-readable description, e.g. `distributed<threaded>`.
    fn describe() -> String;
}

/// Single-threaded host execution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Serial;

/// Multi-threaded host execution over contiguous per-worker ranges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Threaded;

/// Accelerator-style execution: embarrassingly parallel over elements.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Device;

/// A local payload classified by `I` plus a process group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Distributed<I>(PhantomData<I>);

/// A fixed-arity tuple of containers classified by `I`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Composite<I>(PhantomData<I>);

impl sealed::Sealed for Serial {}
impl sealed::Sealed for Threaded {}
impl sealed::Sealed for Device {}
impl<I: Classifier> sealed::Sealed for Distributed<I> {}
impl<I: Classifier> sealed::Sealed for Composite<I> {}

impl Classifier for Serial {
    const SPACE: MemorySpace = MemorySpace::Host;
    fn describe() -> String {
        "serial".into()
    }
}

impl Classifier for Threaded {
    const SPACE: MemorySpace = MemorySpace::SharedHost;
    fn describe() -> String {
        "threaded".into()
    }
}

impl Classifier for Device {
    const SPACE: MemorySpace = MemorySpace::Device;
    fn describe() -> String {
        "device".into()
    }
}

impl<I: Classifier> Classifier for Distributed<I> {
    const SPACE: MemorySpace = I::SPACE;
    const DISTRIBUTED: bool = true;
    const COMPOSITE: bool = I::COMPOSITE;
    fn describe() -> String {
        format!("distributed<{}>", I::describe())
    }
}

impl<I: Classifier> Classifier for Composite<I> {
    const SPACE: MemorySpace = I::SPACE;
    const DISTRIBUTED: bool = I::DISTRIBUTED;
    const COMPOSITE: bool = true;
    fn describe() -> String {
        format!("composite<{}>", I::describe())
    }
}

/// Slice kernels of a leaf classifier.
pub trait ExecutionPolicy: Classifier + Default + Copy + Send + Sync {
    fn kernel1<T: Real, F>(y: &mut [T], f: &F)
    where
        F: Fn(&mut T) + Sync + Send;

    fn kernel2<T: Real, F>(x: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, &mut T) + Sync + Send;

    fn kernel3<T: Real, F>(x1: &[T], x2: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, &mut T) + Sync + Send;

    fn kernel4<T: Real, F>(x1: &[T], x2: &[T], x3: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, T, &mut T) + Sync + Send;

    /// Call `f(row_index, row)` for every row of length `row_len` in `y`.
    fn rows<T: Real, F>(y: &mut [T], row_len: usize, f: &F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send;

    /// Exact `Σ x_i y_i` or `Σ x_i w_i y_i` over the slice.
    fn accumulate<T: Real>(x: &[T], w: Option<&[T]>, y: &[T]) -> Superaccumulator;
}

impl ExecutionPolicy for Serial {
    fn kernel1<T: Real, F>(y: &mut [T], f: &F)
    where
        F: Fn(&mut T) + Sync + Send,
    {
        y.iter_mut().for_each(f);
    }

    fn kernel2<T: Real, F>(x: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, &mut T) + Sync + Send,
    {
        for (yi, &xi) in y.iter_mut().zip(x) {
            f(xi, yi);
        }
    }

    fn kernel3<T: Real, F>(x1: &[T], x2: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, &mut T) + Sync + Send,
    {
        for ((yi, &a), &b) in y.iter_mut().zip(x1).zip(x2) {
            f(a, b, yi);
        }
    }

    fn kernel4<T: Real, F>(x1: &[T], x2: &[T], x3: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, T, &mut T) + Sync + Send,
    {
        for (((yi, &a), &b), &c) in y.iter_mut().zip(x1).zip(x2).zip(x3) {
            f(a, b, c, yi);
        }
    }

    fn rows<T: Real, F>(y: &mut [T], row_len: usize, f: &F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        assert!(row_len > 0, "row length must be positive");
        for (i, row) in y.chunks_mut(row_len).enumerate() {
            f(i, row);
        }
    }

    fn accumulate<T: Real>(x: &[T], w: Option<&[T]>, y: &[T]) -> Superaccumulator {
        let mut acc = Superaccumulator::new();
        match w {
            None => x.iter().zip(y).for_each(|(&a, &b)| acc.add_product(a, b)),
            Some(w) => x
                .iter()
                .zip(w)
                .zip(y)
                .for_each(|((&a, &wi), &b)| acc.add_weighted(a, wi, b)),
        }
        acc
    }
}

/// Length of the contiguous range owned by each worker.
#[cfg(feature = "rayon")]
fn worker_chunk(len: usize) -> usize {
    len.div_ceil(rayon::current_num_threads()).max(1)
}

impl ExecutionPolicy for Threaded {
    fn kernel1<T: Real, F>(y: &mut [T], f: &F)
    where
        F: Fn(&mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            let chunk = worker_chunk(y.len());
            y.par_chunks_mut(chunk)
                .for_each(|yc| Serial::kernel1(yc, f));
        }
        #[cfg(not(feature = "rayon"))]
        Serial::kernel1(y, f);
    }

    fn kernel2<T: Real, F>(x: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, &mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            let chunk = worker_chunk(y.len());
            y.par_chunks_mut(chunk)
                .zip(x.par_chunks(chunk))
                .for_each(|(yc, xc)| Serial::kernel2(xc, yc, f));
        }
        #[cfg(not(feature = "rayon"))]
        Serial::kernel2(x, y, f);
    }

    fn kernel3<T: Real, F>(x1: &[T], x2: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, &mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            let chunk = worker_chunk(y.len());
            y.par_chunks_mut(chunk)
                .zip(x1.par_chunks(chunk))
                .zip(x2.par_chunks(chunk))
                .for_each(|((yc, ac), bc)| Serial::kernel3(ac, bc, yc, f));
        }
        #[cfg(not(feature = "rayon"))]
        Serial::kernel3(x1, x2, y, f);
    }

    fn kernel4<T: Real, F>(x1: &[T], x2: &[T], x3: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, T, &mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            let chunk = worker_chunk(y.len());
            y.par_chunks_mut(chunk)
                .zip(x1.par_chunks(chunk))
                .zip(x2.par_chunks(chunk))
                .zip(x3.par_chunks(chunk))
                .for_each(|(((yc, ac), bc), cc)| Serial::kernel4(ac, bc, cc, yc, f));
        }
        #[cfg(not(feature = "rayon"))]
        Serial::kernel4(x1, x2, x3, y, f);
    }

    fn rows<T: Real, F>(y: &mut [T], row_len: usize, f: &F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        assert!(row_len > 0, "row length must be positive");
        #[cfg(feature = "rayon")]
        {
            let per_worker = worker_chunk(y.len() / row_len);
            y.par_chunks_mut(per_worker * row_len)
                .enumerate()
                .for_each(|(w, block)| {
                    for (k, row) in block.chunks_mut(row_len).enumerate() {
                        f(w * per_worker + k, row);
                    }
                });
        }
        #[cfg(not(feature = "rayon"))]
        Serial::rows(y, row_len, f);
    }

    fn accumulate<T: Real>(x: &[T], w: Option<&[T]>, y: &[T]) -> Superaccumulator {
        #[cfg(feature = "rayon")]
        {
            let chunk = worker_chunk(x.len());
            match w {
                None => x
                    .par_chunks(chunk)
                    .zip(y.par_chunks(chunk))
                    .map(|(xc, yc)| Serial::accumulate(xc, None, yc))
                    .reduce(Superaccumulator::new, Superaccumulator::merge),
                Some(w) => x
                    .par_chunks(chunk)
                    .zip(w.par_chunks(chunk))
                    .zip(y.par_chunks(chunk))
                    .map(|((xc, wc), yc)| Serial::accumulate(xc, Some(wc), yc))
                    .reduce(Superaccumulator::new, Superaccumulator::merge),
            }
        }
        #[cfg(not(feature = "rayon"))]
        Serial::accumulate(x, w, y)
    }
}

impl ExecutionPolicy for Device {
    fn kernel1<T: Real, F>(y: &mut [T], f: &F)
    where
        F: Fn(&mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        y.par_iter_mut().for_each(f);
        #[cfg(not(feature = "rayon"))]
        Serial::kernel1(y, f);
    }

    fn kernel2<T: Real, F>(x: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, &mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        y.par_iter_mut()
            .zip(x.par_iter())
            .for_each(|(yi, &xi)| f(xi, yi));
        #[cfg(not(feature = "rayon"))]
        Serial::kernel2(x, y, f);
    }

    fn kernel3<T: Real, F>(x1: &[T], x2: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, &mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        y.par_iter_mut()
            .zip(x1.par_iter())
            .zip(x2.par_iter())
            .for_each(|((yi, &a), &b)| f(a, b, yi));
        #[cfg(not(feature = "rayon"))]
        Serial::kernel3(x1, x2, y, f);
    }

    fn kernel4<T: Real, F>(x1: &[T], x2: &[T], x3: &[T], y: &mut [T], f: &F)
    where
        F: Fn(T, T, T, &mut T) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        y.par_iter_mut()
            .zip(x1.par_iter())
            .zip(x2.par_iter())
            .zip(x3.par_iter())
            .for_each(|(((yi, &a), &b), &c)| f(a, b, c, yi));
        #[cfg(not(feature = "rayon"))]
        Serial::kernel4(x1, x2, x3, y, f);
    }

    fn rows<T: Real, F>(y: &mut [T], row_len: usize, f: &F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        assert!(row_len > 0, "row length must be positive");
        #[cfg(feature = "rayon")]
        y.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
        #[cfg(not(feature = "rayon"))]
        Serial::rows(y, row_len, f);
    }

    fn accumulate<T: Real>(x: &[T], w: Option<&[T]>, y: &[T]) -> Superaccumulator {
        #[cfg(feature = "rayon")]
        {
            match w {
                None => x
                    .par_iter()
                    .zip(y.par_iter())
                    .fold(Superaccumulator::new, |mut acc, (&a, &b)| {
                        acc.add_product(a, b);
                        acc
                    })
                    .reduce(Superaccumulator::new, Superaccumulator::merge),
                Some(w) => x
                    .par_iter()
                    .zip(w.par_iter())
                    .zip(y.par_iter())
                    .fold(Superaccumulator::new, |mut acc, ((&a, &wi), &b)| {
                        acc.add_weighted(a, wi, b);
                        acc
                    })
                    .reduce(Superaccumulator::new, Superaccumulator::merge),
            }
        }
        #[cfg(not(feature = "rayon"))]
        Serial::accumulate(x, w, y)
    }
}
