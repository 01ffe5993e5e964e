//! Block matrix products across process grids.
//!
//! A 2-D grid of 4x4 cells with 2x2 coefficients per cell is multiplied on one
//! process and on a 2x2 process grid. Ghost layers carry exact copies and the
//! per-point summation order is fixed, so both runs must agree bit for bit.

use approx::assert_relative_eq;
use dgblas::blas1;
use dgblas::core::Symv;
use dgblas::matrix::{BlockMatrix, Direction};
use dgblas::parallel::{CartesianComm, ChannelComm, SerialComm, NDIMS};
use dgblas::vector::{DistVector, LocalShape};
use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const CELLS: [usize; NDIMS] = [4, 4, 1];
const COEFFS: [usize; NDIMS] = [2, 2, 1];
const PERIODIC: [bool; NDIMS] = [true, true, false];

type Grid<C> = DistVector<Vec<f64>, C>;

/// `(B_-1, B_0, B_+1)` along `axis` with `B_-1 = B_+1^T` and `B_0` symmetric.
fn blocks(axis: usize) -> (Mat<f64>, Mat<f64>, Mat<f64>) {
    let upper = Mat::from_fn(2, 2, |i, j| -((1 + i + 2 * j + axis) as f64));
    let lower = Mat::from_fn(2, 2, |i, j| upper[(j, i)]);
    let mid = Mat::from_fn(2, 2, |i, j| if i == j { 12.0 + axis as f64 } else { 1.0 });
    (lower, mid, upper)
}

fn stencil<C: CartesianComm>(comm: Arc<C>, shape: LocalShape) -> BlockMatrix<f64, C> {
    let mut b = BlockMatrix::builder(comm, shape);
    for dir in [Direction::X, Direction::Y] {
        let (lower, mid, upper) = blocks(dir.axis());
        b = b.diagonal(dir, -1, lower).diagonal(dir, 0, mid).diagonal(dir, 1, upper);
    }
    b.build().unwrap()
}

fn field(seed: u64) -> impl Fn([usize; NDIMS]) -> f64 + Sync {
    field_on(LocalShape::new(CELLS, COEFFS), seed)
}

/// Random values indexed by global point.
fn field_on(global: LocalShape, seed: u64) -> impl Fn([usize; NDIMS]) -> f64 + Sync {
    let mut rng = StdRng::seed_from_u64(seed);
    let values: Vec<f64> = (0..global.len()).map(|_| rng.r#gen::<f64>() - 0.5).collect();
    move |p| values[global.index(p)]
}

fn sorted_bits(mut entries: Vec<([usize; NDIMS], f64)>) -> Vec<([usize; NDIMS], u64)> {
    entries.sort_by_key(|e| e.0);
    entries.into_iter().map(|(p, v)| (p, v.to_bits())).collect()
}

#[test]
fn constant_vector_gives_block_row_sums() {
    let out = ChannelComm::run([2, 2, 1], PERIODIC, |comm| {
        let comm = Arc::new(comm);
        let shape = LocalShape::split(CELLS, COEFFS, comm.topology());
        let mut a = stencil(comm.clone(), shape);
        let x: Grid<_> = DistVector::from_elem(comm.clone(), shape, 1.0);
        let mut y: Grid<_> = DistVector::from_elem(comm, shape, 0.0);
        a.symv(1.0, &x, 0.0, &mut y);
        y.global_entries()
    });
    let row_sum = |axis: usize, k: usize| {
        let (l, m, u) = blocks(axis);
        (0..2).map(|j| l[(k, j)] + m[(k, j)] + u[(k, j)]).sum::<f64>()
    };
    for (p, v) in out.into_iter().flatten() {
        assert_eq!(v, row_sum(0, p[0] % 2) + row_sum(1, p[1] % 2), "point {p:?}");
    }
}

#[test]
fn symmetric_blocks_give_a_symmetric_operator() {
    let (fx, fy) = (field(11), field(12));
    let out = ChannelComm::run([2, 2, 1], PERIODIC, |comm| {
        let comm = Arc::new(comm);
        let shape = LocalShape::split(CELLS, COEFFS, comm.topology());
        let mut a = stencil(comm.clone(), shape);
        let x: Grid<_> = DistVector::from_global_fn(comm.clone(), shape, &fx);
        let y: Grid<_> = DistVector::from_global_fn(comm.clone(), shape, &fy);
        let (mut ax, mut ay) = (x.clone(), y.clone());
        a.symv(1.0, &x, 0.0, &mut ax);
        a.symv(1.0, &y, 0.0, &mut ay);
        (blas1::dot(&x, &ay).unwrap(), blas1::dot(&y, &ax).unwrap())
    });
    for (xay, yax) in out {
        assert_relative_eq!(xay, yax, max_relative = 1e-13);
    }
}

#[test]
fn decomposition_does_not_change_the_product() {
    let (fx, fy) = (field(21), field(22));
    let (alpha, beta) = (0.75, -1.25);

    let comm = Arc::new(SerialComm::new(PERIODIC));
    let shape = LocalShape::new(CELLS, COEFFS);
    let mut a = stencil(comm.clone(), shape);
    let x: Grid<_> = DistVector::from_global_fn(comm.clone(), shape, &fx);
    let mut y: Grid<_> = DistVector::from_global_fn(comm, shape, &fy);
    a.symv(alpha, &x, beta, &mut y);
    let serial = sorted_bits(y.global_entries());

    for dims in [[2, 1, 1], [1, 2, 1], [2, 2, 1], [4, 2, 1]] {
        let out = ChannelComm::run(dims, PERIODIC, |comm| {
            let comm = Arc::new(comm);
            let shape = LocalShape::split(CELLS, COEFFS, comm.topology());
            let mut a = stencil(comm.clone(), shape);
            let x: Grid<_> = DistVector::from_global_fn(comm.clone(), shape, &fx);
            let mut y: Grid<_> = DistVector::from_global_fn(comm, shape, &fy);
            a.symv(alpha, &x, beta, &mut y);
            y.global_entries()
        });
        let distributed = sorted_bits(out.into_iter().flatten().collect());
        assert_eq!(distributed, serial, "process grid {dims:?}");
    }
}

/// Couples x and z only, with two coefficients along each.
fn xz_stencil<C: CartesianComm>(comm: Arc<C>, shape: LocalShape) -> BlockMatrix<f64, C> {
    let mut b = BlockMatrix::builder(comm, shape);
    for dir in [Direction::Z, Direction::X] {
        let (lower, mid, upper) = blocks(dir.axis());
        b = b.diagonal(dir, -1, lower).diagonal(dir, 0, mid).diagonal(dir, 1, upper);
    }
    b.build().unwrap()
}

#[test]
fn splitting_along_z_does_not_change_the_product() {
    let cells = [2, 1, 4];
    let coeffs = [2, 1, 2];
    let periods = [true, false, true];
    let global = LocalShape::new(cells, coeffs);
    let (fx, fy) = (field_on(global, 31), field_on(global, 32));
    let (alpha, beta) = (1.5, 0.5);

    let comm = Arc::new(SerialComm::new(periods));
    let mut a = xz_stencil(comm.clone(), global);
    let x: Grid<_> = DistVector::from_global_fn(comm.clone(), global, &fx);
    let mut y: Grid<_> = DistVector::from_global_fn(comm, global, &fy);
    a.symv(alpha, &x, beta, &mut y);
    let serial = sorted_bits(y.global_entries());

    for dims in [[1, 1, 2], [2, 1, 4], [1, 1, 4]] {
        let out = ChannelComm::run(dims, periods, |comm| {
            let comm = Arc::new(comm);
            let shape = LocalShape::split(cells, coeffs, comm.topology());
            let mut a = xz_stencil(comm.clone(), shape);
            let x: Grid<_> = DistVector::from_global_fn(comm.clone(), shape, &fx);
            let mut y: Grid<_> = DistVector::from_global_fn(comm, shape, &fy);
            a.symv(alpha, &x, beta, &mut y);
            y.global_entries()
        });
        let distributed = sorted_bits(out.into_iter().flatten().collect());
        assert_eq!(distributed, serial, "process grid {dims:?}");
    }
}

/// Open 1-D line of six cells with boundary rows on both ends and a
/// cell-local coupling in y, which the boundary rows drop.
fn bounded<C: CartesianComm>(comm: Arc<C>, shape: LocalShape) -> BlockMatrix<f64, C> {
    let (lower, mid, upper) = blocks(0);
    let edge = Mat::from_fn(2, 2, |i, j| (i + 1) as f64 * if j == 0 { 3.0 } else { -1.0 });
    BlockMatrix::builder(comm, shape)
        .diagonal(Direction::X, -1, lower)
        .diagonal(Direction::X, 0, mid)
        .diagonal(Direction::X, 1, upper.clone())
        .diagonal(Direction::Y, 0, Mat::from_fn(1, 1, |_, _| 0.5))
        .boundary_term(Direction::X, 0, 0, edge.clone())
        .boundary_term(Direction::X, 0, 1, upper)
        .boundary_term(Direction::X, 5, 0, edge)
        .build()
        .unwrap()
}

#[test]
fn boundary_terms_follow_global_cells() {
    let cells = [6, 1, 1];
    let coeffs = [2, 1, 1];
    let open = [false; NDIMS];
    let global = LocalShape::new(cells, coeffs);
    let fx = move |p: [usize; NDIMS]| (global.index(p) as f64 * 0.37).sin();

    let comm = Arc::new(SerialComm::new(open));
    let mut a = bounded(comm.clone(), global);
    let x: Grid<_> = DistVector::from_global_fn(comm.clone(), global, fx);
    let mut y: Grid<_> = DistVector::from_elem(comm.clone(), global, 0.0);
    a.symv(1.0, &x, 0.0, &mut y);
    let serial = sorted_bits(y.global_entries());

    let out = ChannelComm::run([2, 1, 1], open, |comm| {
        let comm = Arc::new(comm);
        let shape = LocalShape::split(cells, coeffs, comm.topology());
        let mut a = bounded(comm.clone(), shape);
        let x: Grid<_> = DistVector::from_global_fn(comm.clone(), shape, fx);
        let mut y: Grid<_> = DistVector::from_elem(comm, shape, 0.0);
        a.symv(1.0, &x, 0.0, &mut y);
        y.global_entries()
    });
    assert_eq!(sorted_bits(out.into_iter().flatten().collect()), serial);

    // the last cell keeps only its boundary block, the y coupling is dropped
    let ones: Grid<_> = DistVector::from_elem(comm.clone(), global, 1.0);
    a.symv(1.0, &ones, 0.0, &mut y);
    assert_eq!(y.local()[10], 3.0 - 1.0);
    assert_eq!(y.local()[11], 6.0 - 2.0);
    // interior cells keep both
    let (l, m, u) = blocks(0);
    let row_sum: f64 = (0..2).map(|j| l[(0, j)] + m[(0, j)] + u[(0, j)]).sum();
    assert_eq!(y.local()[4], row_sum + 0.5);
}

#[test]
#[should_panic(expected = "different process grid")]
fn vectors_from_another_grid_are_rejected() {
    let shape = LocalShape::new(CELLS, COEFFS);
    let mut a = stencil(Arc::new(SerialComm::new(PERIODIC)), shape);
    let other = Arc::new(SerialComm::new([false; NDIMS]));
    let x: Grid<_> = DistVector::from_elem(other.clone(), shape, 1.0);
    let mut y: Grid<_> = DistVector::from_elem(other, shape, 0.0);
    a.symv(1.0, &x, 0.0, &mut y);
}
