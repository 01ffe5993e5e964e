//! Core traits, capability classifiers and the dense reference wrappers.

pub mod policy;
pub mod traits;
pub mod wrappers;

pub use policy::{
    Classifier, Composite, Device, Distributed, ExecutionPolicy, MemorySpace, Serial, Threaded,
};
pub use traits::{Container, HostStorage, Real, Symv, SymmetricOperator};
