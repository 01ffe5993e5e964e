//! MPI-backed Cartesian communicator.
//!
//! Wraps a Cartesian communicator that the caller created (and keeps alive
//! together with the MPI universe); this module never initializes MPI itself.
//! Only available with the `mpi` feature.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")] {
//! use mpi::traits::*;
//! use dgblas::parallel::{Comm, MpiComm};
//! let universe = mpi::initialize().expect("MPI init");
//! let world = universe.world();
//! let cart = world
//!     .create_cartesian_communicator(&[world.size(), 1, 1], &[true, true, false], false)
//!     .expect("cartesian communicator");
//! let comm = MpiComm::new(cart);
//! println!("Rank: {} / {}", comm.rank(), comm.size());
//! # }
//! ```
//!
//! # References
//! - [MPI Standard](https://www.mpi-forum.org/)
use super::{CartesianComm, Comm, NDIMS, Topology};
use mpi::collective::SystemOperation;
use mpi::point_to_point::send_receive_into;
use mpi::topology::CartesianCommunicator;
use mpi::traits::*;

pub struct MpiComm {
    /// The Cartesian communicator handed in by the caller.
    pub cart: CartesianCommunicator,
    topology: Topology,
}

impl MpiComm {
    /// # Panics
    /// Panics if the communicator has more than three dimensions.
    pub fn new(cart: CartesianCommunicator) -> Self {
        let layout = cart.get_layout();
        assert!(layout.dims.len() <= NDIMS, "at most {NDIMS} process grid dimensions");
        let mut dims = [1; NDIMS];
        let mut periods = [false; NDIMS];
        let mut coords = [0; NDIMS];
        for d in 0..layout.dims.len() {
            dims[d] = layout.dims[d] as usize;
            periods[d] = layout.periods[d];
            coords[d] = layout.coords[d] as usize;
        }
        MpiComm {
            cart,
            topology: Topology { dims, periods, coords },
        }
    }
}

impl Comm for MpiComm {
    fn rank(&self) -> usize {
        self.cart.rank() as usize
    }
    fn size(&self) -> usize {
        self.cart.size() as usize
    }
    fn barrier(&self) {
        self.cart.barrier();
    }
    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.cart.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }
    fn all_reduce_sum_i64(&self, words: &mut [i64]) {
        let local = words.to_vec();
        self.cart
            .all_reduce_into(&local[..], words, &SystemOperation::sum());
    }
}

impl CartesianComm for MpiComm {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>) {
        match (dest, source) {
            (Some(d), Some(s)) => {
                let dest = self.cart.process_at_rank(d as i32);
                let source = self.cart.process_at_rank(s as i32);
                send_receive_into(send, &dest, recv, &source);
            }
            (Some(d), None) => self.cart.process_at_rank(d as i32).send(send),
            (None, Some(s)) => {
                self.cart.process_at_rank(s as i32).receive_into(recv);
            }
            (None, None) => {}
        }
    }
}
