//! Process groups and Cartesian topologies.
//!
//! Every distributed vector and matrix is handed an explicit communicator at
//! construction; nothing in the crate creates or looks up a global one.
//! All collectives follow the usual discipline: every process in the group
//! must call them in the same order, or the group deadlocks.

pub mod channel_comm;
pub mod serial_comm;

pub use channel_comm::ChannelComm;
pub use serial_comm::SerialComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// Number of spatial dimensions of a process grid.
pub const NDIMS: usize = 3;

/// A group of processes with blocking collectives.
pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Sum of `x` over the group. Every process receives the same value.
    fn all_reduce(&self, x: f64) -> f64;
    /// Element-wise integer sum of `words` over the group, in place.
    fn all_reduce_sum_i64(&self, words: &mut [i64]);
}

/// A process group laid out on a Cartesian grid.
pub trait CartesianComm: Comm {
    fn topology(&self) -> &Topology;

    /// `(source, dest)` ranks for a shift of `disp` along `dim`, as in
    /// `MPI_Cart_shift`. `None` marks a non-periodic edge.
    fn shift(&self, dim: usize, disp: isize) -> (Option<usize>, Option<usize>) {
        self.topology().shift(dim, disp)
    }

    /// Blocking combined send/receive. `send` goes to `dest`, `recv` is filled
    /// from `source`. A `None` peer skips that half; `recv` is then untouched.
    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>);
}

/// Shape, periodicity and the local coordinates of a Cartesian process grid.
///
/// Ranks are numbered row-major: the last dimension varies fastest, as in MPI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub dims: [usize; NDIMS],
    pub periods: [bool; NDIMS],
    pub coords: [usize; NDIMS],
}

impl Topology {
    /// Topology seen by `rank`.
    pub fn new(dims: [usize; NDIMS], periods: [bool; NDIMS], rank: usize) -> Self {
        assert!(dims.iter().all(|&d| d > 0), "process grid dimensions must be positive");
        let size: usize = dims.iter().product();
        assert!(rank < size, "rank {rank} outside a process grid of size {size}");
        let mut coords = [0; NDIMS];
        let mut rest = rank;
        for d in (0..NDIMS).rev() {
            coords[d] = rest % dims[d];
            rest /= dims[d];
        }
        Self { dims, periods, coords }
    }

    /// A single process, with the given periodicity.
    pub fn single(periods: [bool; NDIMS]) -> Self {
        Self::new([1; NDIMS], periods, 0)
    }

    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Rank of the process at `coords`.
    pub fn rank_of(&self, coords: [usize; NDIMS]) -> usize {
        coords
            .iter()
            .zip(self.dims.iter())
            .fold(0, |r, (&c, &d)| r * d + c)
    }

    pub fn rank(&self) -> usize {
        self.rank_of(self.coords)
    }

    /// Rank displaced by `disp` along `dim`, wrapping on periodic dimensions.
    pub fn neighbour(&self, dim: usize, disp: isize) -> Option<usize> {
        let n = self.dims[dim] as isize;
        let mut c = self.coords[dim] as isize + disp;
        if self.periods[dim] {
            c = c.rem_euclid(n);
        } else if c < 0 || c >= n {
            return None;
        }
        let mut coords = self.coords;
        coords[dim] = c as usize;
        Some(self.rank_of(coords))
    }

    pub fn shift(&self, dim: usize, disp: isize) -> (Option<usize>, Option<usize>) {
        (self.neighbour(dim, -disp), self.neighbour(dim, disp))
    }
}
