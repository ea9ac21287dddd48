//! Inertial parameter identification for fixed-base robots.
//!
//! Stacks joint-torque regressors over a recorded (or simulated) trajectory,
//! projects them on the identifiable subspace of the model and solves for
//! the base parameters by least squares.
//!
//! ```no_run
//! use idyn_ident::{Identification, IdentificationConfig, Measurements};
//!
//! # fn main() -> idyn_ident::Result<()> {
//! let ident = Identification::from_urdf_file("robot.urdf", IdentificationConfig::default())?;
//! let measurements = Measurements::from_file("trajectory.json")?;
//! let run = ident.run(&measurements)?;
//! println!("{} base parameters", run.result.num_base_params());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod estimator;
pub mod measurements;
pub mod params;
pub mod pipeline;
pub mod regressor;
pub mod report;
pub mod torque;

pub use backend::{
    BarycentricEngine, EngineError, EngineResult, InverseDynamics, RegressorEvaluator,
    RigidBodyBackend, SubspaceProvider, SymbolicRegressor,
};
pub use config::{
    EngineFailurePolicy, IdentificationConfig, RegressorMode, SubspaceConfig, TorqueSourceMode,
};
pub use error::{IdentError, Result};
pub use estimator::{BaseEstimate, BaseParameterEstimator, project, pseudo_inverse};
pub use measurements::{Measurements, Sample};
pub use params::{bott_duffin, check_physical_consistency, to_barycentric, to_link_frame};
pub use pipeline::{Identification, IdentificationResult, IdentificationRun};
pub use regressor::{RegressorBuilder, RegressorSource, RegressorStacks};
pub use report::{
    ParameterReport, ParameterRow, parameter_descriptions, reshape_samples, torque_residual,
};
pub use torque::{TorqueSource, pack_barycentric};
