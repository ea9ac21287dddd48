//! Joint types and definitions.

use idyn_math::{Mat3, SpatialTransform, SpatialVec, Vec3, skew};

/// Joint type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    /// Single rotational DOF about an axis (URDF `revolute` and `continuous`).
    Revolute,
    /// Single translational DOF along an axis.
    Prismatic,
    /// 0 DOF rigid attachment.
    Fixed,
}

/// A joint connecting a link to its parent.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    /// Rest transform from parent link frame to joint frame (constant).
    pub parent_to_joint: SpatialTransform,
    /// Unit joint axis in the joint frame.
    pub axis: Vec3,
}

impl Joint {
    /// Revolute joint about `axis`. The axis is normalized.
    pub fn revolute(name: &str, parent_to_joint: SpatialTransform, axis: Vec3) -> Self {
        Self {
            name: name.to_string(),
            joint_type: JointType::Revolute,
            parent_to_joint,
            axis: axis.normalize(),
        }
    }

    /// Prismatic joint along `axis`. The axis is normalized.
    pub fn prismatic(name: &str, parent_to_joint: SpatialTransform, axis: Vec3) -> Self {
        Self {
            name: name.to_string(),
            joint_type: JointType::Prismatic,
            parent_to_joint,
            axis: axis.normalize(),
        }
    }

    pub fn fixed(name: &str, parent_to_joint: SpatialTransform) -> Self {
        Self {
            name: name.to_string(),
            joint_type: JointType::Fixed,
            parent_to_joint,
            axis: Vec3::zeros(),
        }
    }

    /// Number of degrees of freedom for this joint type.
    pub fn ndof(&self) -> usize {
        match self.joint_type {
            JointType::Revolute | JointType::Prismatic => 1,
            JointType::Fixed => 0,
        }
    }

    /// Plücker transform from joint frame to successor (link) frame at
    /// position `q`. Fixed joints ignore `q`.
    pub fn joint_transform(&self, q: f64) -> SpatialTransform {
        match self.joint_type {
            JointType::Revolute => {
                // Passive rotation: negate angle for coordinate transform
                let (s, c) = (-q).sin_cos();
                let ax = skew(&self.axis);
                let rot = Mat3::identity() + ax * s + ax * ax * (1.0 - c);
                SpatialTransform::new(rot, Vec3::zeros())
            }
            JointType::Prismatic => SpatialTransform::translation(self.axis * q),
            JointType::Fixed => SpatialTransform::identity(),
        }
    }

    /// Motion subspace S. Fixed joints return a zero vector.
    pub fn motion_subspace(&self) -> SpatialVec {
        match self.joint_type {
            JointType::Revolute => SpatialVec::new(self.axis, Vec3::zeros()),
            JointType::Prismatic => SpatialVec::new(Vec3::zeros(), self.axis),
            JointType::Fixed => SpatialVec::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn revolute_transform_rotates_parent_axes() {
        let j = Joint::revolute("j", SpatialTransform::identity(), Vec3::z());
        let xf = j.joint_transform(std::f64::consts::FRAC_PI_2);
        // Parent x expressed in a frame turned +90° about z reads as -y.
        assert_relative_eq!(xf.rot * Vec3::x(), -Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn prismatic_moves_along_axis() {
        let j = Joint::prismatic("p", SpatialTransform::identity(), Vec3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(j.axis, Vec3::y(), epsilon = 1e-12);
        assert_relative_eq!(j.joint_transform(0.3).pos, Vec3::new(0.0, 0.3, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn fixed_joint_has_no_dof() {
        let j = Joint::fixed("f", SpatialTransform::translation(Vec3::x()));
        assert_eq!(j.ndof(), 0);
        assert_eq!(j.motion_subspace().data.norm(), 0.0);
        assert_relative_eq!(j.joint_transform(1.0).pos, Vec3::zeros(), epsilon = 1e-12);
    }
}
