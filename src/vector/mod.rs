//! Vector containers: host vectors per execution policy, distributed vectors
//! and fixed-arity composites.

pub mod composite;
pub mod distributed;
pub mod host;
pub mod shape;

pub use distributed::DistVector;
pub use host::{DeviceVector, HostVector, SerialVector, ThreadedVector};
pub use shape::LocalShape;
