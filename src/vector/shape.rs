//! Local block shape of a distributed grid vector.

use crate::parallel::{NDIMS, Topology};

/// Cells and polynomial coefficients per cell in each direction of the block
/// owned by one process.
///
/// Point `(px, py, pz)` with `p_d = cell_d * coeffs_d + k_d` lives at index
/// `(pz * m1 + py) * m0 + px`, where `m_d = cells_d * coeffs_d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalShape {
    pub cells: [usize; NDIMS],
    pub coeffs: [usize; NDIMS],
}

impl LocalShape {
    pub fn new(cells: [usize; NDIMS], coeffs: [usize; NDIMS]) -> Self {
        assert!(
            cells.iter().chain(coeffs.iter()).all(|&c| c > 0),
            "cells and coefficients must be positive, got {cells:?} x {coeffs:?}"
        );
        Self { cells, coeffs }
    }

    /// Block of a global grid divided evenly over the process grid `topology`.
    pub fn split(global_cells: [usize; NDIMS], coeffs: [usize; NDIMS], topology: &Topology) -> Self {
        let mut cells = [0; NDIMS];
        for d in 0..NDIMS {
            assert_eq!(
                global_cells[d] % topology.dims[d],
                0,
                "{} cells do not divide evenly over {} processes in direction {d}",
                global_cells[d],
                topology.dims[d]
            );
            cells[d] = global_cells[d] / topology.dims[d];
        }
        Self::new(cells, coeffs)
    }

    /// Points along direction `d`.
    pub fn points(&self, d: usize) -> usize {
        self.cells[d] * self.coeffs[d]
    }

    pub fn len(&self) -> usize {
        (0..NDIMS).map(|d| self.points(d)).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, p: [usize; NDIMS]) -> usize {
        (p[2] * self.points(1) + p[1]) * self.points(0) + p[0]
    }

    pub fn point(&self, index: usize) -> [usize; NDIMS] {
        let m0 = self.points(0);
        let m1 = self.points(1);
        [index % m0, (index / m0) % m1, index / (m0 * m1)]
    }

    /// Extent of the ghost-extended block: one cell of ghosts on each side.
    pub fn extended(&self) -> [usize; NDIMS] {
        let mut e = [0; NDIMS];
        for (d, e) in e.iter_mut().enumerate() {
            *e = self.points(d) + 2 * self.coeffs[d];
        }
        e
    }

    pub fn extended_len(&self) -> usize {
        self.extended().iter().product()
    }

    /// First global cell owned by this process along `d`.
    pub fn cell_offset(&self, topology: &Topology, d: usize) -> usize {
        topology.coords[d] * self.cells[d]
    }

    /// Global point coordinates of local point `p`.
    pub fn global_point(&self, topology: &Topology, p: [usize; NDIMS]) -> [usize; NDIMS] {
        let mut g = p;
        for (d, g) in g.iter_mut().enumerate() {
            *g += topology.coords[d] * self.points(d);
        }
        g
    }

    /// Shape of the whole grid.
    pub fn global(&self, topology: &Topology) -> LocalShape {
        let mut cells = self.cells;
        for (d, c) in cells.iter_mut().enumerate() {
            *c *= topology.dims[d];
        }
        LocalShape::new(cells, self.coeffs)
    }
}
