//! idyn: inertial parameter identification of fixed-base robots.
//!
//! This is the umbrella crate that re-exports the identification pipeline
//! and core types from sub-crates.

pub use idyn_ident::{
    self, EngineFailurePolicy, Identification, IdentificationConfig, IdentificationResult,
    IdentificationRun, Measurements, ParameterReport, RegressorMode, RigidBodyBackend,
    TorqueSourceMode, bott_duffin, check_physical_consistency, to_barycentric, to_link_frame,
    torque_residual,
};
pub use idyn_math::{self, DMat, DVec, Vec3};
pub use idyn_model::{self, Joint, Model, ModelBuilder};
pub use idyn_rigid::{self, identifiable_subspace, inverse_dynamics, joint_torque_regressor};
pub use idyn_urdf::{self, RegressorStructure, UrdfLoader, rewrite_inertials};

/// Load a URDF document and identify its parameters from `measurements`.
pub fn identify_urdf(
    xml: &str,
    measurements: &Measurements,
    config: IdentificationConfig,
) -> idyn_ident::Result<IdentificationRun> {
    Identification::from_urdf_str(xml, config)?.run(measurements)
}
