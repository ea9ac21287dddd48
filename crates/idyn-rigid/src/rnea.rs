//! Recursive Newton-Euler Algorithm (RNEA) for inverse dynamics.
//!
//! Given (q, dq, ddq) and a standard parameter vector, compute the joint
//! torques of the fixed-base robot with zero external wrench.

use crate::kinematics::{LinkMotion, link_motion};
use crate::{DynamicsError, Result};
use idyn_math::{DVec, Mat6, SpatialVec, Vec3, link_inertia_matrix, param_block};
use idyn_model::Model;

/// Run RNEA with link-frame parameters `params` (`10 * nlinks` entries).
pub fn inverse_dynamics(
    model: &Model,
    params: &DVec,
    q: &DVec,
    dq: &DVec,
    ddq: &DVec,
    gravity: &Vec3,
) -> Result<DVec> {
    if params.len() != model.nparams() {
        return Err(DynamicsError::Dimension {
            what: "parameter vector",
            expected: model.nparams(),
            got: params.len(),
        });
    }
    let motion = link_motion(model, q, dq, ddq, gravity)?;
    let inertias: Vec<Mat6> = (0..model.nlinks())
        .map(|i| link_inertia_matrix(&param_block(params.as_slice(), i)))
        .collect();
    Ok(backward_pass(model, &motion, &inertias))
}

/// Accumulate link forces from the leaves to the base and project them on
/// the joint axes.
pub(crate) fn backward_pass(model: &Model, motion: &LinkMotion, inertias: &[Mat6]) -> DVec {
    let nl = model.nlinks();
    let mut tau = DVec::zeros(model.ndof);

    let mut forces: Vec<SpatialVec> = (0..nl)
        .map(|i| {
            let ia = &inertias[i];
            let iv = SpatialVec {
                data: ia * motion.vel[i].data,
            };
            SpatialVec {
                data: ia * motion.acc[i].data,
            } + motion.vel[i].cross_force(&iv)
        })
        .collect();

    for i in (0..nl).rev() {
        let link = &model.links[i];
        if link.joint.ndof() == 1 {
            tau[model.dof_offsets[i]] = link.joint.motion_subspace().dot(&forces[i]);
        }
        if link.parent >= 0 {
            let pi = link.parent as usize;
            forces[pi] = forces[pi] + motion.x_tree[i].inv_apply_force(&forces[i]);
        }
    }

    tau
}
