//! Conjugate gradient on block matrices and dense operators.
//!
//! The block-matrix tests solve a 1-D Dirichlet Laplacian, on one process and
//! split over two, and check that the iteration count and the solution bits do
//! not depend on the split. The dense test compares against a direct LU solve
//! on a random SPD system.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use dgblas::blas1;
use dgblas::core::Symv;
use dgblas::matrix::{BlockMatrix, Direction, WeightedOperator};
use dgblas::parallel::{CartesianComm, ChannelComm, SerialComm, NDIMS};
use dgblas::solver::{ImplicitSolver, LinearSolver, Pcg};
use dgblas::vector::{DistVector, LocalShape};
use dgblas::{DgError, SolverOptions};
use faer::Mat;
use faer::linalg::solvers::SolveCore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const N: usize = 10;
const OPEN: [bool; NDIMS] = [false; NDIMS];

type Line<C> = DistVector<Vec<f64>, C>;
type Laplacian<C> = WeightedOperator<BlockMatrix<f64, C>, Line<C>>;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scalar(v: f64) -> Mat<f64> {
    Mat::from_fn(1, 1, |_, _| v)
}

/// `tridiag(-1, 2, -1)` with zero Dirichlet values beyond both ends.
fn laplacian<C: CartesianComm>(comm: Arc<C>, shape: LocalShape) -> Laplacian<C> {
    let a = BlockMatrix::builder(comm.clone(), shape)
        .diagonal(Direction::X, -1, scalar(-1.0))
        .diagonal(Direction::X, 0, scalar(2.0))
        .diagonal(Direction::X, 1, scalar(-1.0))
        .build()
        .unwrap();
    let weights = DistVector::from_elem(comm.clone(), shape, 1.0);
    let precond = DistVector::from_elem(comm, shape, 0.5);
    WeightedOperator::new(a, weights, precond)
}

fn residual_norm<C: CartesianComm>(op: &mut Laplacian<C>, x: &Line<C>, b: &Line<C>) -> f64 {
    let mut r = b.clone();
    op.symv(-1.0, x, 1.0, &mut r);
    blas1::dot(&r, &r).unwrap().sqrt()
}

#[test]
fn dirichlet_laplacian_converges() {
    init_logs();
    let comm = Arc::new(SerialComm::new(OPEN));
    let shape = LocalShape::new([N, 1, 1], [1, 1, 1]);
    let mut op = laplacian(comm.clone(), shape);
    let b: Line<_> = DistVector::from_elem(comm.clone(), shape, 1.0);
    let mut x: Line<_> = DistVector::from_elem(comm, shape, 0.0);

    let mut cg = Pcg::new(&x, 100);
    let iters = cg.solve(&mut op, &mut x, &b, 1e-10).unwrap();
    assert!(iters <= N, "{iters} iterations");
    let nrmb = blas1::dot(&b, &b).unwrap().sqrt();
    assert!(residual_norm(&mut op, &x, &b) < 1e-9 * nrmb);
    // x_i = (i + 1)(N - i) / 2
    for (i, xi) in x.local().iter().enumerate() {
        assert_relative_eq!(*xi, ((i + 1) * (N - i)) as f64 / 2.0, max_relative = 1e-9);
    }
}

#[test]
fn split_solve_matches_single_process() {
    let comm = Arc::new(SerialComm::new(OPEN));
    let shape = LocalShape::new([N, 1, 1], [1, 1, 1]);
    let mut op = laplacian(comm.clone(), shape);
    let b: Line<_> = DistVector::from_global_fn(comm.clone(), shape, |p| 1.0 + p[0] as f64 * 0.1);
    let mut x: Line<_> = DistVector::from_elem(comm, shape, 0.0);
    let serial_iters = Pcg::new(&x, 100).solve(&mut op, &mut x, &b, 1e-10).unwrap();
    let serial: Vec<u64> = x.local().iter().map(|v| v.to_bits()).collect();

    let out = ChannelComm::run([2, 1, 1], OPEN, |comm| {
        let comm = Arc::new(comm);
        let shape = LocalShape::split([N, 1, 1], [1, 1, 1], comm.topology());
        let mut op = laplacian(comm.clone(), shape);
        let b: Line<_> = DistVector::from_global_fn(comm.clone(), shape, |p| 1.0 + p[0] as f64 * 0.1);
        let mut x: Line<_> = DistVector::from_elem(comm, shape, 0.0);
        let iters = Pcg::new(&x, 100).solve(&mut op, &mut x, &b, 1e-10).unwrap();
        (iters, x.global_entries())
    });

    let mut entries = Vec::new();
    for (iters, local) in out {
        assert_eq!(iters, serial_iters);
        entries.extend(local);
    }
    entries.sort_by_key(|e| e.0);
    let split: Vec<u64> = entries.into_iter().map(|(_, v)| v.to_bits()).collect();
    assert_eq!(split, serial);
}

#[test]
fn exhausted_budget_is_an_error() {
    let comm = Arc::new(SerialComm::new(OPEN));
    let shape = LocalShape::new([N, 1, 1], [1, 1, 1]);
    let mut op = laplacian(comm.clone(), shape);
    let b: Line<_> = DistVector::from_elem(comm.clone(), shape, 1.0);
    let mut x: Line<_> = DistVector::from_elem(comm, shape, 0.0);
    let mut cg = Pcg::new(&x, 1);
    match cg.solve(&mut op, &mut x, &b, 1e-10) {
        Err(DgError::ConvergenceFailure {
            eps,
            achieved,
            iterations,
        }) => {
            assert_eq!(iterations, 1);
            assert_eq!(eps, 1e-10);
            assert!(achieved > eps);
        }
        other => panic!("expected a convergence failure, got {other:?}"),
    }
    blas1::scal(&mut x, 0.0);
    let err = Pcg::new(&x, 1).solve(&mut op, &mut x, &b, 1e-10).unwrap_err();
    assert!(err.achieved_residual().is_some_and(|r| r > 1e-10));
    assert_eq!(DgError::IndefiniteMatrix.achieved_residual(), None);
}

/// `A = Mᵀ M + I` for a random `M`, and a random right-hand side.
fn random_spd(n: usize, seed: u64) -> (Mat<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    let m = Mat::from_fn(n, n, |i, j| data[j * n + i]);
    let m_t = m.transpose();
    let a = &m_t * &m + Mat::<f64>::identity(n, n);
    let b: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    (a, b)
}

#[test]
fn jacobi_cg_matches_direct_lu() {
    init_logs();
    let n = 20;
    let (a, b) = random_spd(n, 42);
    let jacobi: Vec<f64> = (0..n).map(|i| 1.0 / a[(i, i)]).collect();

    let mut x_direct = b.clone();
    let lus = faer::linalg::solvers::FullPivLu::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x_direct, n, 1);
    lus.solve_in_place_with_conj(faer::Conj::No, x_mat);

    let mut op = WeightedOperator::new(a, vec![1.0; n], jacobi);
    let mut x_cg = vec![0.0; n];
    let mut solver = Pcg::with_options(&x_cg, &SolverOptions::default().with_eps(1e-12).with_max_iter(500));
    let stats = LinearSolver::solve(&mut solver, &mut op, &b, &mut x_cg).unwrap();
    assert!(stats.converged);
    assert!(stats.iterations <= 500);
    for i in 0..n {
        assert_abs_diff_eq!(x_cg[i], x_direct[i], epsilon = 1e-6);
    }
}

#[test]
fn implicit_step_inverts_the_shifted_operator() {
    let comm = Arc::new(SerialComm::new(OPEN));
    let shape = LocalShape::new([N, 1, 1], [1, 1, 1]);
    let mut op = laplacian(comm.clone(), shape);
    let rhs: Line<_> = DistVector::from_global_fn(comm.clone(), shape, |p| (p[0] as f64).cos());
    let mut x: Line<_> = DistVector::from_elem(comm, shape, 0.0);
    let alpha = 0.3;

    let mut solver = ImplicitSolver::new(&x, 100, 1e-4);
    solver.solve(alpha, &mut op, &mut x, &rhs).unwrap();
    solver.set_eps(1e-12);
    assert_eq!(solver.eps(), 1e-12);
    // the loose solution is the starting guess for the tight one
    solver.solve(alpha, &mut op, &mut x, &rhs).unwrap();

    // x + alpha * A x = rhs
    let mut lhs = x.clone();
    op.symv(alpha, &x, 1.0, &mut lhs);
    for (l, r) in lhs.local().iter().zip(rhs.local()) {
        assert_abs_diff_eq!(*l, *r, epsilon = 1e-10);
    }
}
