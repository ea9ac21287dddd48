//! Per-sample joint torques: recorded, or simulated from the prior model.

use crate::backend::{BarycentricEngine, EngineResult, InverseDynamics};
use crate::config::TorqueSourceMode;
use crate::measurements::Sample;
use crate::params::to_barycentric;
use crate::{IdentError, Result};
use idyn_math::{DVec, PARAMS_PER_LINK, Vec3, symmetric_from_params};
use idyn_rigid::BarycentricParams;

/// One torque acquisition mode, bound to its engine and parameters.
pub enum TorqueSource<'e> {
    /// Recorded torques of the sample.
    Measured,
    /// Inverse dynamics of the primary engine.
    Primary {
        engine: &'e dyn InverseDynamics,
        /// Link-frame parameters to simulate.
        params: DVec,
    },
    /// Inverse dynamics of the barycentric engine.
    Alternate {
        engine: &'e dyn BarycentricEngine,
        /// Packed once from the link-frame parameters.
        params: BarycentricParams,
    },
}

impl<'e> TorqueSource<'e> {
    /// Simulate the link-frame parameters `x_std` with `engine`.
    pub fn primary(engine: &'e dyn InverseDynamics, x_std: &DVec) -> Self {
        TorqueSource::Primary {
            engine,
            params: x_std.clone(),
        }
    }

    /// Simulate with the barycentric engine, packing the link-frame
    /// parameters `x_std` into its layout once.
    pub fn alternate(
        engine: &'e dyn BarycentricEngine,
        x_std: &DVec,
        link_offsets: Vec<Vec3>,
    ) -> Result<Self> {
        Ok(TorqueSource::Alternate {
            engine,
            params: pack_barycentric(x_std, link_offsets)?,
        })
    }

    /// Configuration mode this source implements.
    pub fn mode(&self) -> TorqueSourceMode {
        match self {
            TorqueSource::Measured => TorqueSourceMode::Measured,
            TorqueSource::Primary { .. } => TorqueSourceMode::SimulatePrimary,
            TorqueSource::Alternate { .. } => TorqueSourceMode::SimulateAlternate,
        }
    }

    /// Joint torques of `sample`, zero external wrench.
    pub fn torques(&self, sample: &Sample, gravity: &Vec3) -> EngineResult<DVec> {
        match self {
            TorqueSource::Measured => Ok(sample.tau.clone()),
            TorqueSource::Primary { engine, params } => {
                engine.inverse_dynamics(params, &sample.q, &sample.dq, &sample.ddq, gravity)
            }
            TorqueSource::Alternate { engine, params } => {
                let (q, dq, ddq) = (&sample.q, &sample.dq, &sample.ddq);
                engine.barycentric_inverse_dynamics(params, q, dq, ddq, gravity)
            }
        }
    }
}

/// Pack link-frame parameters into the barycentric engine's layout.
pub fn pack_barycentric(x_std: &DVec, link_offsets: Vec<Vec3>) -> Result<BarycentricParams> {
    let bary = to_barycentric(x_std)?;
    let nlinks = bary.len() / PARAMS_PER_LINK;
    if link_offsets.len() != nlinks {
        return Err(IdentError::Dimension(format!(
            "{} link offsets for {nlinks} links",
            link_offsets.len()
        )));
    }

    let mut params = BarycentricParams {
        link_offsets,
        ..Default::default()
    };
    for p in bary.as_slice().chunks_exact(PARAMS_PER_LINK) {
        params.masses.push(p[0]);
        params.coms.push(Vec3::new(p[1], p[2], p[3]));
        params.inertias.push(symmetric_from_params(&p[4..]));
    }
    Ok(params)
}
