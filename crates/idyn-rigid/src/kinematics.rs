//! Forward pass shared by inverse dynamics and the regressor: link
//! transforms, velocities and accelerations for one system state.

use crate::{DynamicsError, Result};
use idyn_math::{DVec, SpatialTransform, SpatialVec, Vec3};
use idyn_model::Model;

/// Per-link motion of one system state, expressed in link coordinates.
#[derive(Debug, Clone)]
pub struct LinkMotion {
    /// Tree transform parent → link.
    pub x_tree: Vec<SpatialTransform>,
    /// Spatial velocity of each link.
    pub vel: Vec<SpatialVec>,
    /// Spatial acceleration of each link, offset by the (negated) gravity
    /// acceleration of the base.
    pub acc: Vec<SpatialVec>,
}

/// Run the forward pass with the model's own joint placements.
pub fn link_motion(
    model: &Model,
    q: &DVec,
    dq: &DVec,
    ddq: &DVec,
    gravity: &Vec3,
) -> Result<LinkMotion> {
    let placements: Vec<SpatialTransform> = model
        .links
        .iter()
        .map(|l| l.joint.parent_to_joint)
        .collect();
    link_motion_with(model, &placements, q, dq, ddq, gravity)
}

/// Run the forward pass with substituted joint placements (parent → joint
/// frame, one per link).
pub(crate) fn link_motion_with(
    model: &Model,
    placements: &[SpatialTransform],
    q: &DVec,
    dq: &DVec,
    ddq: &DVec,
    gravity: &Vec3,
) -> Result<LinkMotion> {
    check_state(model, q, dq, ddq)?;

    let nl = model.nlinks();
    let mut x_tree = vec![SpatialTransform::identity(); nl];
    let mut vel = vec![SpatialVec::zero(); nl];
    let mut acc = vec![SpatialVec::zero(); nl];

    // Base acceleration trick: accelerate the base upwards instead of
    // applying gravity to every link.
    let a0 = SpatialVec::new(Vec3::zeros(), -gravity);

    for i in 0..nl {
        let link = &model.links[i];
        let joint = &link.joint;
        let k = model.dof_offsets[i];
        let (qi, dqi, ddqi) = if joint.ndof() == 1 {
            (q[k], dq[k], ddq[k])
        } else {
            (0.0, 0.0, 0.0)
        };

        x_tree[i] = joint.joint_transform(qi).compose(&placements[i]);

        let s = joint.motion_subspace();
        let v_joint = s * dqi;
        let a_joint = s * ddqi;

        if link.parent < 0 {
            vel[i] = v_joint;
            acc[i] = x_tree[i].apply_motion(&a0) + a_joint;
        } else {
            let pi = link.parent as usize;
            vel[i] = x_tree[i].apply_motion(&vel[pi]) + v_joint;
            acc[i] = x_tree[i].apply_motion(&acc[pi]) + vel[i].cross_motion(&v_joint) + a_joint;
        }
    }

    Ok(LinkMotion { x_tree, vel, acc })
}

fn check_state(model: &Model, q: &DVec, dq: &DVec, ddq: &DVec) -> Result<()> {
    for (what, v) in [("q", q), ("dq", dq), ("ddq", ddq)] {
        if v.len() != model.ndof {
            return Err(DynamicsError::Dimension {
                what,
                expected: model.ndof,
                got: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(DynamicsError::NonFinite(what));
        }
    }
    Ok(())
}
