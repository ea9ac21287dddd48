//! Model types for inertial parameter identification.
//!
//! `Model` is the static description of a fixed-base robot: topology, joint
//! rest transforms and the prior inertial parameters of every link.

pub mod joint;
pub mod link;
pub mod model;

pub use joint::{Joint, JointType};
pub use link::Link;
pub use model::{Model, ModelBuilder};
