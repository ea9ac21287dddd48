//! Alternate inverse-dynamics engine working directly on barycentric
//! parameters and a link-offset table.
//!
//! Joint orientations and axes come from the model; joint positions come
//! from `link_offsets`, so a caller can evaluate a geometry that differs
//! from the loaded description without rebuilding the model.

use crate::kinematics::link_motion_with;
use crate::rnea::backward_pass;
use crate::{DynamicsError, Result};
use idyn_math::{DVec, Mat3, Mat6, SpatialInertia, SpatialTransform, Vec3};
use idyn_model::Model;

/// Parameter layout of the barycentric engine, one entry per link.
#[derive(Debug, Clone, Default)]
pub struct BarycentricParams {
    pub masses: Vec<f64>,
    /// Center of mass in the link frame.
    pub coms: Vec<Vec3>,
    /// Rotational inertia about the center of mass.
    pub inertias: Vec<Mat3>,
    /// Joint position relative to the parent link.
    pub link_offsets: Vec<Vec3>,
}

impl BarycentricParams {
    fn check(&self, nlinks: usize) -> Result<()> {
        let lengths = [
            ("masses", self.masses.len()),
            ("coms", self.coms.len()),
            ("inertias", self.inertias.len()),
            ("link offsets", self.link_offsets.len()),
        ];
        for (what, got) in lengths {
            if got != nlinks {
                return Err(DynamicsError::Dimension {
                    what,
                    expected: nlinks,
                    got,
                });
            }
        }
        if self.masses.iter().any(|m| !m.is_finite()) {
            return Err(DynamicsError::NonFinite("masses"));
        }
        Ok(())
    }
}

/// Joint torques for `(q, dq, ddq)` with zero external wrench.
pub fn barycentric_inverse_dynamics(
    model: &Model,
    params: &BarycentricParams,
    q: &DVec,
    dq: &DVec,
    ddq: &DVec,
    gravity: &Vec3,
) -> Result<DVec> {
    params.check(model.nlinks())?;

    let placements: Vec<SpatialTransform> = model
        .links
        .iter()
        .zip(&params.link_offsets)
        .map(|(l, d)| SpatialTransform::new(l.joint.parent_to_joint.rot, *d))
        .collect();
    let motion = link_motion_with(model, &placements, q, dq, ddq, gravity)?;

    let inertias: Vec<Mat6> = (0..model.nlinks())
        .map(|i| {
            SpatialInertia::new(params.masses[i], params.coms[i], params.inertias[i]).to_matrix()
        })
        .collect();
    Ok(backward_pass(model, &motion, &inertias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inverse_dynamics;
    use approx::assert_relative_eq;
    use idyn_math::GRAVITY;
    use idyn_model::{Joint, ModelBuilder};

    fn two_link() -> Model {
        let inertia = SpatialInertia::new(
            1.5,
            Vec3::new(0.02, 0.0, 0.2),
            Mat3::from_diagonal(&Vec3::new(0.03, 0.03, 0.004)),
        );
        ModelBuilder::new("arm", "base")
            .add_link(
                "upper",
                -1,
                Joint::revolute(
                    "shoulder",
                    SpatialTransform::translation(Vec3::new(0.0, 0.0, 0.1)),
                    Vec3::y(),
                ),
                inertia,
            )
            .add_link(
                "lower",
                0,
                Joint::revolute(
                    "elbow",
                    SpatialTransform::translation(Vec3::new(0.0, 0.0, 0.4)),
                    Vec3::x(),
                ),
                inertia,
            )
            .build()
    }

    fn layout(model: &Model) -> BarycentricParams {
        BarycentricParams {
            masses: model.links.iter().map(|l| l.inertia.mass).collect(),
            coms: model.links.iter().map(|l| l.inertia.com).collect(),
            inertias: model.links.iter().map(|l| l.inertia.inertia).collect(),
            link_offsets: model.link_offsets(),
        }
    }

    #[test]
    fn agrees_with_link_frame_rnea() {
        let model = two_link();
        let gravity = Vec3::new(0.0, 0.0, -GRAVITY);
        let q = DVec::from_vec(vec![0.4, -1.0]);
        let dq = DVec::from_vec(vec![0.7, 2.0]);
        let ddq = DVec::from_vec(vec![-1.0, 0.25]);
        let reference =
            inverse_dynamics(&model, &model.parameters(), &q, &dq, &ddq, &gravity).unwrap();
        let params = layout(&model);
        let tau = barycentric_inverse_dynamics(&model, &params, &q, &dq, &ddq, &gravity).unwrap();
        assert_relative_eq!(tau, reference, epsilon = 1e-10);
    }

    #[test]
    fn link_offsets_override_geometry() {
        let model = two_link();
        let gravity = Vec3::new(0.0, 0.0, -GRAVITY);
        let q = DVec::from_vec(vec![0.5, 0.0]);
        let z = DVec::zeros(2);
        let mut params = layout(&model);
        let base = barycentric_inverse_dynamics(&model, &params, &q, &z, &z, &gravity).unwrap();
        params.link_offsets[1] = Vec3::new(0.0, 0.0, 0.8);
        let longer = barycentric_inverse_dynamics(&model, &params, &q, &z, &z, &gravity).unwrap();
        assert!(longer[0].abs() > base[0].abs());
    }

    #[test]
    fn layout_length_is_checked() {
        let model = two_link();
        let mut params = layout(&model);
        params.coms.pop();
        let z = DVec::zeros(2);
        let err = barycentric_inverse_dynamics(&model, &params, &z, &z, &z, &Vec3::zeros());
        assert!(matches!(err, Err(DynamicsError::Dimension { what: "coms", .. })));
    }
}
