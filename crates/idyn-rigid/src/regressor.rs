//! Joint-torque regressor: the matrix `Y(q, dq, ddq)` with `Y · p = tau`
//! for every standard (link-frame) parameter vector `p`.

use crate::Result;
use crate::kinematics::link_motion;
use idyn_math::{DMat, DVec, Mat6x10, PARAMS_PER_LINK, SpatialVec, Vec3, link_inertia_matrix};
use idyn_model::Model;

/// Compute the `(ndof, 10 * nlinks)` regressor of one system state.
pub fn joint_torque_regressor(
    model: &Model,
    q: &DVec,
    dq: &DVec,
    ddq: &DVec,
    gravity: &Vec3,
) -> Result<DMat> {
    let motion = link_motion(model, q, dq, ddq, gravity)?;
    let mut y = DMat::zeros(model.ndof, model.nparams());

    for i in 0..model.nlinks() {
        // Force columns of link i, carried towards the base; each moving
        // joint on the way picks up its axis projection.
        let mut f = link_force_basis(&motion.vel[i], &motion.acc[i]);
        let mut j = i;
        loop {
            let link = &model.links[j];
            if link.joint.ndof() == 1 {
                let row = link.joint.motion_subspace().data.transpose() * f;
                y.fixed_view_mut::<1, PARAMS_PER_LINK>(model.dof_offsets[j], i * PARAMS_PER_LINK)
                    .copy_from(&row);
            }
            if link.parent < 0 {
                break;
            }
            f = motion.x_tree[j].to_motion_matrix().transpose() * f;
            j = link.parent as usize;
        }
    }

    Ok(y)
}

/// Linear map from a link's parameter block to its spatial force
/// `I a + v ×* (I v)`, column by column.
fn link_force_basis(v: &SpatialVec, a: &SpatialVec) -> Mat6x10 {
    let mut k = Mat6x10::zeros();
    for c in 0..PARAMS_PER_LINK {
        let mut unit = [0.0; PARAMS_PER_LINK];
        unit[c] = 1.0;
        let inertia = link_inertia_matrix(&unit);
        let iv = SpatialVec {
            data: inertia * v.data,
        };
        let f = SpatialVec {
            data: inertia * a.data,
        } + v.cross_force(&iv);
        k.set_column(c, &f.data);
    }
    k
}
