//! Reproducible reductions.
//!
//! The only reduction state is the [`Superaccumulator`]; policies build one per
//! worker, merge them, and distributed containers sum their integer images over
//! the process group before the single final rounding.

pub mod accumulator;

pub use accumulator::{LIMBS, Superaccumulator, WORDS};
