//! Dynamics engines consumed by the identification pipeline.
//!
//! The pipeline talks to engines through these traits only. [`RigidBodyBackend`]
//! implements all of them except [`SymbolicRegressor`] on top of
//! `idyn-rigid`; generated symbolic code plugs in the same way.

use idyn_math::{DMat, DVec, Vec3};
use idyn_model::Model;
use idyn_rigid::{BarycentricParams, DynamicsError, SubspaceOptions};
use thiserror::Error;

/// Failure reported by an engine for one evaluation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl From<DynamicsError> for EngineError {
    fn from(e: DynamicsError) -> Self {
        EngineError(e.to_string())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Standard joint-torque regressor of one system state.
pub trait RegressorEvaluator {
    /// `(num_dof, num_params)` matrix `Y` with `Y · x_std = tau`.
    fn regressor(&self, q: &DVec, dq: &DVec, ddq: &DVec, gravity: &Vec3) -> EngineResult<DMat>;
}

/// Inverse dynamics from a link-frame parameter vector.
pub trait InverseDynamics {
    /// Joint torques for state `(q, dq, ddq)` with no external wrench.
    fn inverse_dynamics(
        &self,
        params: &DVec,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        gravity: &Vec3,
    ) -> EngineResult<DVec>;
}

/// Basis of the identifiable parameter subspace.
pub trait SubspaceProvider {
    /// Orthonormal `(num_params, num_base)` basis.
    fn identifiable_subspace(&self, gravity: &Vec3) -> EngineResult<DMat>;
}

/// Inverse dynamics from the barycentric layout and a link-offset table.
pub trait BarycentricEngine {
    /// Joint torques for state `(q, dq, ddq)` with no external wrench.
    fn barycentric_inverse_dynamics(
        &self,
        params: &BarycentricParams,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        gravity: &Vec3,
    ) -> EngineResult<DVec>;
}

/// Base regressor evaluated from generated symbolic code.
///
/// Blocks have [`num_columns`](SymbolicRegressor::num_columns) columns, of
/// which the configured redundant ones are dropped; what remains must line
/// up with the base parameters of the identifiable subspace.
pub trait SymbolicRegressor {
    /// Width of an unreduced block.
    fn num_columns(&self) -> usize;

    /// `(num_dof, num_columns)` block for one state and link-offset table.
    fn regressor(
        &self,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        link_offsets: &[Vec3],
    ) -> EngineResult<DMat>;
}

/// Engines backed by the recursive Newton-Euler implementation of `idyn-rigid`.
#[derive(Debug, Clone)]
pub struct RigidBodyBackend {
    model: Model,
    subspace: SubspaceOptions,
}

impl RigidBodyBackend {
    /// Backend with the default subspace sampling.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            subspace: SubspaceOptions::default(),
        }
    }

    pub fn with_subspace_options(mut self, subspace: SubspaceOptions) -> Self {
        self.subspace = subspace;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

impl RegressorEvaluator for RigidBodyBackend {
    fn regressor(&self, q: &DVec, dq: &DVec, ddq: &DVec, gravity: &Vec3) -> EngineResult<DMat> {
        Ok(idyn_rigid::joint_torque_regressor(&self.model, q, dq, ddq, gravity)?)
    }
}

impl InverseDynamics for RigidBodyBackend {
    fn inverse_dynamics(
        &self,
        params: &DVec,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        gravity: &Vec3,
    ) -> EngineResult<DVec> {
        Ok(idyn_rigid::inverse_dynamics(&self.model, params, q, dq, ddq, gravity)?)
    }
}

impl SubspaceProvider for RigidBodyBackend {
    fn identifiable_subspace(&self, gravity: &Vec3) -> EngineResult<DMat> {
        Ok(idyn_rigid::identifiable_subspace(&self.model, gravity, &self.subspace)?)
    }
}

impl BarycentricEngine for RigidBodyBackend {
    fn barycentric_inverse_dynamics(
        &self,
        params: &BarycentricParams,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        gravity: &Vec3,
    ) -> EngineResult<DVec> {
        Ok(idyn_rigid::barycentric_inverse_dynamics(&self.model, params, q, dq, ddq, gravity)?)
    }
}
