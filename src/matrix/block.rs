//! Distributed block-banded matrix.
//!
//! Applying the matrix to a distributed vector runs four stages:
//!
//! 1. **Exchange**: ghost layers are swapped with the Cartesian neighbours,
//!    only along directions where the structure couples neighbouring cells.
//! 2. **Local apply**: every point sums, direction by direction, the
//!    contributions of that direction's diagonals.
//! 3. **Boundary correction**: direction by direction, every point of a cell
//!    named by a boundary term is reset to zero and then receives only that
//!    direction's boundary entries. The stencil sums of all directions are
//!    dropped there, and along a later direction a boundary row also replaces
//!    an earlier one (corner cells keep the last direction's row).
//! 4. **Scale**: an optional diagonal weighting multiplies the result.
//!
//! Only then is `y <- alpha * Ax + beta * y` formed. The structure (which
//! diagonals and boundary terms exist) is fixed by the builder; coefficient
//! blocks can be swapped later with [`BlockMatrix::update_block`].
//!
//! Within a point the summation order is fixed (directions, then entries in
//! insertion order, then block columns), so the product is bit-identical for
//! every decomposition of the same global grid.

use crate::core::policy::ExecutionPolicy;
use crate::core::traits::{HostStorage, Real, Symv};
use crate::error::DgError;
use crate::matrix::boundary::{BoundaryTable, BoundaryTerm};
use crate::matrix::halo::HaloBuffer;
use crate::matrix::{Coupling, Direction};
use crate::parallel::{CartesianComm, NDIMS};
use crate::vector::{DistVector, LocalShape};
use faer::Mat;
use log::debug;
use num_traits::Zero;
use std::sync::Arc;

/// One band of a direction's operator: output cell `c` reads cell
/// `c + offset` through `block`.
#[derive(Debug, Clone)]
pub struct Diagonal<T> {
    pub direction: Direction,
    pub offset: isize,
    pub block: Mat<T>,
}

pub struct BlockMatrixBuilder<T, C> {
    comm: Arc<C>,
    shape: LocalShape,
    diagonals: Vec<Diagonal<T>>,
    boundary: Vec<BoundaryTerm<T>>,
    scale: Option<Vec<T>>,
}

impl<T: Real, C: CartesianComm> BlockMatrixBuilder<T, C> {
    pub fn diagonal(mut self, direction: Direction, offset: isize, block: Mat<T>) -> Self {
        self.diagonals.push(Diagonal {
            direction,
            offset,
            block,
        });
        self
    }

    /// Boundary entry for the **global** cell `cell` along `direction`.
    pub fn boundary_term(mut self, direction: Direction, cell: usize, offset: isize, block: Mat<T>) -> Self {
        self.boundary.push(BoundaryTerm {
            direction,
            cell,
            offset,
            block,
        });
        self
    }

    /// Diagonal weighting applied after the boundary correction, one value per
    /// local point.
    pub fn scale(mut self, diag: Vec<T>) -> Self {
        self.scale = Some(diag);
        self
    }

    pub fn build(self) -> Result<BlockMatrix<T, C>, DgError> {
        let topology = self.comm.topology().clone();
        let global = self.shape.global(&topology);
        let mut coupling = Coupling::empty();
        let mut diagonals: [Vec<Diagonal<T>>; NDIMS] = Default::default();
        for dg in self.diagonals {
            check_block(&self.shape, dg.direction, dg.offset, &dg.block)?;
            if diagonals[dg.direction.axis()].iter().any(|d| d.offset == dg.offset) {
                return Err(DgError::InvalidArgument(format!(
                    "{:?} diagonal with offset {} given twice",
                    dg.direction, dg.offset
                )));
            }
            if dg.offset != 0 {
                coupling |= Coupling::from(dg.direction);
            }
            diagonals[dg.direction.axis()].push(dg);
        }
        for term in &self.boundary {
            check_block(&self.shape, term.direction, term.offset, &term.block)?;
            let cells = global.cells[term.direction.axis()];
            if term.cell >= cells {
                return Err(DgError::InvalidArgument(format!(
                    "boundary cell {} outside the {cells} global cells along {:?}",
                    term.cell, term.direction
                )));
            }
            if term.offset != 0 {
                coupling |= Coupling::from(term.direction);
            }
        }
        if let Some(s) = &self.scale {
            check_scale(&self.shape, s)?;
        }
        debug!(
            "block matrix on {:?} x {:?}: {} boundary terms, exchanging along {:?}",
            self.shape.cells,
            self.shape.coeffs,
            self.boundary.len(),
            coupling
        );
        Ok(BlockMatrix {
            boundary: BoundaryTable::new(self.boundary, &self.shape, &topology),
            halo: HaloBuffer::new(self.shape),
            ax: vec![T::zero(); self.shape.len()],
            comm: self.comm,
            shape: self.shape,
            diagonals,
            scale: self.scale,
            coupling,
        })
    }
}

fn check_block<T>(shape: &LocalShape, direction: Direction, offset: isize, block: &Mat<T>) -> Result<(), DgError> {
    let n = shape.coeffs[direction.axis()];
    if !(-1..=1).contains(&offset) {
        return Err(DgError::InvalidArgument(format!(
            "offset {offset} along {direction:?} reaches beyond the neighbouring cell"
        )));
    }
    if block.nrows() != n || block.ncols() != n {
        return Err(DgError::InvalidArgument(format!(
            "{direction:?} block is {}x{}, expected {n}x{n}",
            block.nrows(),
            block.ncols()
        )));
    }
    Ok(())
}

fn check_scale<T>(shape: &LocalShape, diag: &[T]) -> Result<(), DgError> {
    if diag.len() != shape.len() {
        return Err(DgError::InvalidArgument(format!(
            "scale has {} entries, expected {}",
            diag.len(),
            shape.len()
        )));
    }
    Ok(())
}

pub struct BlockMatrix<T, C> {
    comm: Arc<C>,
    shape: LocalShape,
    diagonals: [Vec<Diagonal<T>>; NDIMS],
    boundary: BoundaryTable<T>,
    scale: Option<Vec<T>>,
    coupling: Coupling,
    halo: HaloBuffer<T>,
    ax: Vec<T>,
}

impl<T: Real, C: CartesianComm> BlockMatrix<T, C> {
    pub fn builder(comm: Arc<C>, shape: LocalShape) -> BlockMatrixBuilder<T, C> {
        BlockMatrixBuilder {
            comm,
            shape,
            diagonals: Vec::new(),
            boundary: Vec::new(),
            scale: None,
        }
    }

    pub fn shape(&self) -> &LocalShape {
        &self.shape
    }

    pub fn comm(&self) -> &Arc<C> {
        &self.comm
    }

    /// Directions along which a product exchanges halos.
    pub fn coupling(&self) -> Coupling {
        self.coupling
    }

    pub fn diagonals(&self, direction: Direction) -> &[Diagonal<T>] {
        &self.diagonals[direction.axis()]
    }

    pub fn boundary_terms(&self) -> &[BoundaryTerm<T>] {
        self.boundary.terms()
    }

    /// Replace the block of the existing `(direction, offset)` diagonal.
    pub fn update_block(&mut self, direction: Direction, offset: isize, block: Mat<T>) -> Result<(), DgError> {
        check_block(&self.shape, direction, offset, &block)?;
        match self.diagonals[direction.axis()]
            .iter_mut()
            .find(|dg| dg.offset == offset)
        {
            Some(dg) => {
                dg.block = block;
                Ok(())
            }
            None => Err(DgError::InvalidArgument(format!(
                "no {direction:?} diagonal with offset {offset}; the structure is fixed after build"
            ))),
        }
    }

    /// Replace the diagonal weighting. Only allowed if one was built in.
    pub fn update_scale(&mut self, diag: Vec<T>) -> Result<(), DgError> {
        check_scale(&self.shape, &diag)?;
        match &mut self.scale {
            Some(s) => {
                *s = diag;
                Ok(())
            }
            None => Err(DgError::InvalidArgument(
                "matrix was built without a scale; the structure is fixed after build".into(),
            )),
        }
    }

    fn check<V: HostStorage<Scalar = T>>(&self, v: &DistVector<V, C>, name: &str) {
        assert!(
            v.topology() == self.comm.topology(),
            "{name} lives on a different process grid than the matrix"
        );
        assert_eq!(v.shape(), &self.shape, "{name} does not match the matrix block shape");
    }

    /// Stages 1 to 4: leaves `A x` in `self.ax`.
    fn apply_local<P: ExecutionPolicy>(&mut self, x: &[T]) {
        self.halo.refresh(x, self.coupling, &*self.comm);
        let Self {
            shape,
            diagonals,
            boundary,
            scale,
            halo,
            ax,
            ..
        } = self;
        let shape = *shape;
        let (halo, diagonals, boundary) = (&*halo, &*diagonals, &*boundary);
        let m1 = shape.points(1);

        P::rows(ax.as_mut_slice(), shape.points(0), &|r, row: &mut [T]| {
            for (p0, out) in row.iter_mut().enumerate() {
                let p = [p0, r % m1, r / m1];
                let mut s = T::zero();
                for axis in 0..NDIMS {
                    let n = shape.coeffs[axis];
                    let (cell, k) = (p[axis] / n, p[axis] % n);
                    for dg in &diagonals[axis] {
                        s = s + band(halo, &shape, p, axis, cell, k, dg.offset, &dg.block);
                    }
                }
                // a boundary row discards everything accumulated so far,
                // including other directions and earlier boundary rows
                for axis in 0..NDIMS {
                    let n = shape.coeffs[axis];
                    let (cell, k) = (p[axis] / n, p[axis] % n);
                    if let Some(terms) = boundary.overrides(axis, cell) {
                        s = T::zero();
                        for (offset, block) in terms {
                            s = s + band(halo, &shape, p, axis, cell, k, offset, block);
                        }
                    }
                }
                *out = s;
            }
        });

        if let Some(s) = scale {
            P::kernel2(s.as_slice(), ax.as_mut_slice(), &|s, a| *a = s * *a);
        }
    }
}

/// Row `k` of `block` against the `n` points of cell `cell + offset` along
/// `axis`, all other coordinates of `p` fixed.
#[allow(clippy::too_many_arguments)]
#[inline]
fn band<T: Real>(
    halo: &HaloBuffer<T>,
    shape: &LocalShape,
    p: [usize; NDIMS],
    axis: usize,
    cell: usize,
    k: usize,
    offset: isize,
    block: &Mat<T>,
) -> T {
    let n = shape.coeffs[axis];
    let mut e = [p[0] + shape.coeffs[0], p[1] + shape.coeffs[1], p[2] + shape.coeffs[2]];
    // one ghost cell on the low side
    let first = (cell as isize + offset + 1) as usize * n;
    let x = halo.data();
    let mut s = T::zero();
    for l in 0..n {
        e[axis] = first + l;
        s = s + block[(k, l)] * x[halo.index(e)];
    }
    s
}

impl<V, C> Symv<DistVector<V, C>> for BlockMatrix<V::Scalar, C>
where
    V: HostStorage,
    V::Classifier: ExecutionPolicy,
    C: CartesianComm,
{
    /// Collective: every process of the group must call it.
    fn symv(&mut self, alpha: V::Scalar, x: &DistVector<V, C>, beta: V::Scalar, y: &mut DistVector<V, C>) {
        self.check(x, "input vector");
        self.check(y, "output vector");
        self.apply_local::<V::Classifier>(x.local().local_slice());
        let y = y.local_mut().local_slice_mut();
        if beta == V::Scalar::zero() {
            <V::Classifier as ExecutionPolicy>::kernel2(&self.ax, y, &|a, y| *y = alpha * a);
        } else {
            <V::Classifier as ExecutionPolicy>::kernel2(&self.ax, y, &|a, y| *y = alpha * a + beta * *y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialComm;

    fn scalar(v: f64) -> Mat<f64> {
        Mat::from_fn(1, 1, |_, _| v)
    }

    fn line(periodic: bool, cells: usize) -> (Arc<SerialComm>, LocalShape) {
        (
            Arc::new(SerialComm::new([periodic, false, false])),
            LocalShape::new([cells, 1, 1], [1, 1, 1]),
        )
    }

    #[test]
    fn coupling_follows_structure() {
        let (comm, shape) = line(true, 4);
        let m = BlockMatrix::builder(comm, shape)
            .diagonal(Direction::X, 0, scalar(2.0))
            .diagonal(Direction::Y, 0, scalar(1.0))
            .boundary_term(Direction::X, 0, 1, scalar(1.0))
            .build()
            .unwrap();
        assert_eq!(m.coupling(), Coupling::X);
        assert_eq!(m.diagonals(Direction::Y).len(), 1);
        assert_eq!(m.boundary_terms().len(), 1);
    }

    #[test]
    fn malformed_structure_is_rejected() {
        let (comm, shape) = line(false, 4);
        let far = BlockMatrix::builder(comm.clone(), shape)
            .diagonal(Direction::X, 2, scalar(1.0))
            .build();
        assert!(matches!(far, Err(DgError::InvalidArgument(_))));
        let wide = BlockMatrix::builder(comm.clone(), shape)
            .diagonal(Direction::X, 0, Mat::<f64>::zeros(2, 2))
            .build();
        assert!(wide.is_err());
        let outside = BlockMatrix::builder(comm, shape)
            .boundary_term(Direction::X, 4, 0, scalar(1.0))
            .build();
        assert!(outside.is_err());
    }

    #[test]
    fn boundary_rows_replace_the_stencil() {
        let (comm, shape) = line(true, 4);
        let mut m = BlockMatrix::builder(comm.clone(), shape)
            .diagonal(Direction::X, -1, scalar(-1.0))
            .diagonal(Direction::X, 0, scalar(2.0))
            .diagonal(Direction::X, 1, scalar(-1.0))
            .boundary_term(Direction::X, 0, 0, scalar(1.0))
            .scale(vec![1.0, 1.0, 1.0, 0.5])
            .build()
            .unwrap();
        let x: DistVector<Vec<f64>, _> =
            DistVector::new(vec![1.0, 2.0, 4.0, 8.0], comm.clone(), shape);
        let mut y = DistVector::from_elem(comm, shape, 0.0);
        m.symv(1.0, &x, 0.0, &mut y);
        // cell 0 reads only itself; cell 3 wraps to cell 0 and is halved
        assert_eq!(y.local(), &vec![1.0, -1.0, -2.0, 5.5]);
    }

    #[test]
    fn update_block_keeps_structure() {
        let (comm, shape) = line(false, 3);
        let mut m = BlockMatrix::builder(comm.clone(), shape)
            .diagonal(Direction::X, 0, scalar(1.0))
            .build()
            .unwrap();
        m.update_block(Direction::X, 0, scalar(3.0)).unwrap();
        assert!(m.update_block(Direction::X, 1, scalar(3.0)).is_err());
        assert!(m.update_scale(vec![1.0; 3]).is_err());
        let x: DistVector<Vec<f64>, _> = DistVector::from_elem(comm.clone(), shape, 2.0);
        let mut y = DistVector::from_elem(comm, shape, 1.0);
        m.symv(0.5, &x, 2.0, &mut y);
        assert_eq!(y.local(), &vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn duplicate_diagonals_are_rejected() {
        let (comm, shape) = line(false, 3);
        let twice = BlockMatrix::builder(comm, shape)
            .diagonal(Direction::X, 0, scalar(1.0))
            .diagonal(Direction::X, 1, scalar(1.0))
            .diagonal(Direction::X, 0, scalar(2.0))
            .build();
        assert!(matches!(twice, Err(DgError::InvalidArgument(_))));
    }

    #[test]
    fn boundary_rows_discard_every_direction() {
        let comm = Arc::new(SerialComm::new([false; NDIMS]));
        let shape = LocalShape::new([3, 3, 1], [1, 1, 1]);
        let mut m = BlockMatrix::builder(comm.clone(), shape)
            .diagonal(Direction::X, 0, scalar(2.0))
            .diagonal(Direction::Y, 0, scalar(4.0))
            .boundary_term(Direction::X, 0, 0, scalar(1.0))
            .boundary_term(Direction::Y, 0, 0, scalar(7.0))
            .build()
            .unwrap();
        let x: DistVector<Vec<f64>, _> = DistVector::from_elem(comm.clone(), shape, 1.0);
        let mut y = DistVector::from_elem(comm, shape, 0.0);
        m.symv(1.0, &x, 0.0, &mut y);
        // row y = 0 takes the y boundary row, corner included; column x = 0
        // takes the x boundary row; the interior keeps both stencils
        assert_eq!(y.local(), &vec![7.0, 7.0, 7.0, 1.0, 6.0, 6.0, 1.0, 6.0, 6.0]);
    }
}
