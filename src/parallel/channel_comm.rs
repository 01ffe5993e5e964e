//! In-process message passing: one OS thread per rank.
//!
//! Every ordered pair of ranks owns an unbounded `crossbeam_channel`, so
//! messages between two ranks arrive in the order they were sent. Sends never
//! block; receives block until the matching message arrives. Collectives are
//! built from point-to-point messages and are combined in rank order, so every
//! rank sees bit-identical results.
//!
//! Use [`ChannelComm::run`] to launch a closure on a whole process grid:
//!
//! ```
//! use dgblas::parallel::{ChannelComm, Comm};
//! let sums = ChannelComm::run([2, 2, 1], [true; 3], |comm| comm.all_reduce(comm.rank() as f64));
//! assert!(sums.iter().all(|&s| s == 6.0));
//! ```

use super::{CartesianComm, Comm, NDIMS, Topology};
use crossbeam_channel::{Receiver, Sender, unbounded};

#[derive(Debug)]
enum Packet {
    Barrier,
    Scalar(f64),
    Words(Vec<i64>),
    Halo(Vec<f64>),
}

/// One rank of an in-process Cartesian process group.
pub struct ChannelComm {
    topology: Topology,
    rank: usize,
    /// Indexed by destination rank.
    outbox: Vec<Sender<Packet>>,
    /// Indexed by source rank.
    inbox: Vec<Receiver<Packet>>,
}

impl ChannelComm {
    /// Build the connected communicators of a full process grid, one per rank.
    pub fn group(dims: [usize; NDIMS], periods: [bool; NDIMS]) -> Vec<ChannelComm> {
        let size: usize = dims.iter().product();
        let mut outboxes: Vec<Vec<Sender<Packet>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Packet>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        for outbox in outboxes.iter_mut() {
            for inbox in inboxes.iter_mut() {
                let (tx, rx) = unbounded();
                outbox.push(tx);
                inbox.push(rx);
            }
        }
        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| ChannelComm {
                topology: Topology::new(dims, periods, rank),
                rank,
                outbox,
                inbox,
            })
            .collect()
    }

    /// Run `f` on every rank of a process grid, each on its own thread, and
    /// return the results in rank order. A panic on any rank is re-raised.
    pub fn run<R, F>(dims: [usize; NDIMS], periods: [bool; NDIMS], f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(ChannelComm) -> R + Sync,
    {
        let comms = Self::group(dims, periods);
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    fn post(&self, dest: usize, packet: Packet) {
        if self.outbox[dest].send(packet).is_err() {
            panic!("rank {dest} left the process group");
        }
    }

    fn take(&self, source: usize) -> Packet {
        match self.inbox[source].recv() {
            Ok(p) => p,
            Err(_) => panic!("rank {source} left the process group"),
        }
    }

    fn broadcast(&self, packet: impl Fn() -> Packet) {
        for dest in 0..self.outbox.len() {
            self.post(dest, packet());
        }
    }
}

impl Comm for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outbox.len()
    }

    fn barrier(&self) {
        self.broadcast(|| Packet::Barrier);
        for source in 0..self.size() {
            match self.take(source) {
                Packet::Barrier => {}
                other => panic!("collective mismatch: expected barrier, got {other:?}"),
            }
        }
    }

    fn all_reduce(&self, x: f64) -> f64 {
        self.broadcast(|| Packet::Scalar(x));
        (0..self.size()).fold(0.0, |sum, source| match self.take(source) {
            Packet::Scalar(v) => sum + v,
            other => panic!("collective mismatch: expected scalar, got {other:?}"),
        })
    }

    fn all_reduce_sum_i64(&self, words: &mut [i64]) {
        self.broadcast(|| Packet::Words(words.to_vec()));
        words.iter_mut().for_each(|w| *w = 0);
        for source in 0..self.size() {
            match self.take(source) {
                Packet::Words(v) if v.len() == words.len() => {
                    words.iter_mut().zip(v).for_each(|(w, v)| *w += v);
                }
                other => panic!("collective mismatch: expected {} words, got {other:?}", words.len()),
            }
        }
    }
}

impl CartesianComm for ChannelComm {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>) {
        if let Some(dest) = dest {
            self.post(dest, Packet::Halo(send.to_vec()));
        }
        if let Some(source) = source {
            match self.take(source) {
                Packet::Halo(v) if v.len() == recv.len() => recv.copy_from_slice(&v),
                other => panic!("halo mismatch: expected {} values, got {other:?}", recv.len()),
            }
        }
    }
}
