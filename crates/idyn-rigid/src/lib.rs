//! Featherstone rigid body dynamics for fixed-base identification.
//!
//! Implements:
//! - Forward pass (link transforms, velocities, accelerations)
//! - Recursive Newton-Euler Algorithm (RNEA) from a standard parameter vector
//! - Joint-torque regressor, linear in the inertial parameters
//! - Fixed-base identifiable subspace
//! - Barycentric inverse dynamics with a link-offset table

pub mod barycentric;
pub mod error;
pub mod kinematics;
pub mod regressor;
pub mod rnea;
pub mod subspace;

pub use barycentric::{BarycentricParams, barycentric_inverse_dynamics};
pub use error::{DynamicsError, Result};
pub use kinematics::{LinkMotion, link_motion};
pub use regressor::joint_torque_regressor;
pub use rnea::inverse_dynamics;
pub use subspace::{SubspaceOptions, identifiable_subspace};
