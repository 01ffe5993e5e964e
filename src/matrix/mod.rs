//! Block-structured operators on distributed grid vectors.
//!
//! A [`BlockMatrix`] is a sum of per-direction banded operators. Each direction
//! carries a few diagonals, and every diagonal is one small dense block shared by
//! all grid points, coupling a cell to itself (`offset = 0`) or to its neighbour
//! (`offset = ±1`). Boundary terms override the stencil on selected cells.

pub mod block;
pub mod boundary;
pub mod halo;
pub mod operator;

pub use block::{BlockMatrix, BlockMatrixBuilder, Diagonal};
pub use boundary::BoundaryTerm;
pub use halo::HaloBuffer;
pub use operator::WeightedOperator;

use bitflags::bitflags;

/// Grid direction a diagonal acts along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    X,
    Y,
    Z,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    pub fn axis(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }
}

bitflags! {
    /// Directions in which an operator reaches into neighbouring cells, and
    /// therefore needs a halo exchange before it is applied.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Coupling: u8 {
        const X = 0b001;
        const Y = 0b010;
        const Z = 0b100;
    }
}

impl Coupling {
    pub fn along(axis: usize) -> Coupling {
        match axis {
            0 => Coupling::X,
            1 => Coupling::Y,
            2 => Coupling::Z,
            _ => Coupling::empty(),
        }
    }
}

impl From<Direction> for Coupling {
    fn from(d: Direction) -> Self {
        Coupling::along(d.axis())
    }
}
