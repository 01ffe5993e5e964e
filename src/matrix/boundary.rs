//! Boundary terms: per-cell replacements of the whole stencil.
//!
//! Entries address cells by their global index, so each process applies
//! exactly the entries for the cells it owns and the product does not depend
//! on the decomposition. All entries naming the same `(direction, cell)`
//! together form the complete output row of every point in that cell: the
//! sums of every direction's diagonals are discarded there.

use crate::core::traits::Real;
use crate::matrix::Direction;
use crate::parallel::{NDIMS, Topology};
use crate::vector::LocalShape;
use faer::Mat;

/// One block of a boundary row: output cell `cell` reads input cell
/// `cell + offset` through `block`.
#[derive(Debug, Clone)]
pub struct BoundaryTerm<T> {
    pub direction: Direction,
    /// Global cell index along `direction`.
    pub cell: usize,
    pub offset: isize,
    pub block: Mat<T>,
}

/// Boundary terms resolved against one process's block.
#[derive(Debug, Clone)]
pub(crate) struct BoundaryTable<T> {
    terms: Vec<BoundaryTerm<T>>,
    /// Per axis and local cell: indices into `terms` overriding that cell.
    by_cell: [Vec<Vec<usize>>; NDIMS],
}

impl<T: Real> BoundaryTable<T> {
    pub(crate) fn new(terms: Vec<BoundaryTerm<T>>, shape: &LocalShape, topology: &Topology) -> Self {
        let mut by_cell: [Vec<Vec<usize>>; NDIMS] =
            std::array::from_fn(|d| vec![Vec::new(); shape.cells[d]]);
        for (i, term) in terms.iter().enumerate() {
            let d = term.direction.axis();
            let first = shape.cell_offset(topology, d);
            if (first..first + shape.cells[d]).contains(&term.cell) {
                by_cell[d][term.cell - first].push(i);
            }
        }
        Self { terms, by_cell }
    }

    /// The entries replacing the stencil of local `cell` along `axis`, if any.
    #[inline]
    pub(crate) fn overrides(&self, axis: usize, cell: usize) -> Option<impl Iterator<Item = (isize, &Mat<T>)>> {
        let ids = &self.by_cell[axis][cell];
        if ids.is_empty() {
            return None;
        }
        Some(ids.iter().map(|&i| (self.terms[i].offset, &self.terms[i].block)))
    }

    pub(crate) fn terms(&self) -> &[BoundaryTerm<T>] {
        &self.terms
    }
}
