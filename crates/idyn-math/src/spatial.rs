//! 6D spatial algebra following Featherstone's "Rigid Body Dynamics Algorithms".
//!
//! Convention: spatial vectors are [angular; linear] (Featherstone order).
//! A spatial motion vector (twist): [ω; v]
//! A spatial force vector (wrench): [τ; f]

use crate::{Mat3, Mat6, PARAMS_PER_LINK, Vec3, Vec6, skew, symmetric_from_params};
use nalgebra as na;

/// 6D spatial vector, either a motion vector (twist) or force vector (wrench).
#[derive(Debug, Clone, Copy)]
pub struct SpatialVec {
    /// The underlying 6D vector [angular(3); linear(3)].
    pub data: Vec6,
}

impl SpatialVec {
    /// Create from angular and linear parts.
    #[inline]
    pub fn new(angular: Vec3, linear: Vec3) -> Self {
        Self {
            data: Vec6::new(
                angular.x, angular.y, angular.z, linear.x, linear.y, linear.z,
            ),
        }
    }

    /// Zero spatial vector.
    #[inline]
    pub fn zero() -> Self {
        Self {
            data: Vec6::zeros(),
        }
    }

    /// Angular part (top 3 components).
    #[inline]
    pub fn angular(&self) -> Vec3 {
        Vec3::new(self.data[0], self.data[1], self.data[2])
    }

    /// Linear part (bottom 3 components).
    #[inline]
    pub fn linear(&self) -> Vec3 {
        Vec3::new(self.data[3], self.data[4], self.data[5])
    }

    /// Spatial cross product for motion vectors: v ×ₘ w
    pub fn cross_motion(&self, other: &SpatialVec) -> SpatialVec {
        let w = self.angular();
        let v = self.linear();
        let w2 = other.angular();
        let v2 = other.linear();
        SpatialVec::new(w.cross(&w2), w.cross(&v2) + v.cross(&w2))
    }

    /// Spatial cross product for force vectors: v ×f f
    pub fn cross_force(&self, other: &SpatialVec) -> SpatialVec {
        let w = self.angular();
        let v = self.linear();
        let t = other.angular();
        let f = other.linear();
        SpatialVec::new(w.cross(&t) + v.cross(&f), w.cross(&f))
    }

    /// Pairing of a motion and a force vector (power), e.g. `Sᵀ f`.
    #[inline]
    pub fn dot(&self, other: &SpatialVec) -> f64 {
        self.data.dot(&other.data)
    }
}

impl std::ops::Add for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn add(self, rhs: SpatialVec) -> SpatialVec {
        SpatialVec {
            data: self.data + rhs.data,
        }
    }
}

impl std::ops::Mul<f64> for SpatialVec {
    type Output = SpatialVec;
    #[inline]
    fn mul(self, rhs: f64) -> SpatialVec {
        SpatialVec {
            data: self.data * rhs,
        }
    }
}

/// Plücker transform: rigid body coordinate transformation acting on spatial vectors.
///
/// Represents a coordinate transform from frame A to frame B.
/// Stored as rotation E (A coordinates → B coordinates) and translation p
/// (position of B's origin expressed in A).
#[derive(Debug, Clone, Copy)]
pub struct SpatialTransform {
    /// Rotation from frame A coordinates to frame B coordinates.
    pub rot: Mat3,
    /// Position of frame B's origin expressed in frame A.
    pub pos: Vec3,
}

impl SpatialTransform {
    /// Create from rotation (A → B coordinates) and B's origin in A.
    pub fn new(rot: Mat3, pos: Vec3) -> Self {
        Self { rot, pos }
    }

    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            rot: Mat3::identity(),
            pos: Vec3::zeros(),
        }
    }

    /// Pure translation.
    pub fn translation(pos: Vec3) -> Self {
        Self {
            rot: Mat3::identity(),
            pos,
        }
    }

    /// Transform to a child frame placed at `xyz` with fixed-axis roll/pitch/yaw
    /// `rpy` relative to the parent (URDF `<origin>` convention).
    pub fn from_xyz_rpy(xyz: Vec3, rpy: Vec3) -> Self {
        let pose = na::Rotation3::from_euler_angles(rpy.x, rpy.y, rpy.z);
        Self {
            rot: pose.matrix().transpose(),
            pos: xyz,
        }
    }

    /// 6x6 Plücker matrix for motion vectors.
    ///
    /// X = | E      0 |
    ///     | -E[p]× E |
    pub fn to_motion_matrix(&self) -> Mat6 {
        let r = self.rot;
        let neg_rpx = -r * skew(&self.pos);

        let mut m = Mat6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        m.fixed_view_mut::<3, 3>(3, 0).copy_from(&neg_rpx);
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
        m
    }

    /// Transform a spatial motion vector from frame A to frame B.
    pub fn apply_motion(&self, v: &SpatialVec) -> SpatialVec {
        let w = v.angular();
        let vel = v.linear();
        SpatialVec::new(self.rot * w, self.rot * (vel - self.pos.cross(&w)))
    }

    /// Inverse transform a spatial force vector (from B back to A).
    ///
    /// Equal to `X_motionᵀ · f`; used to carry child link forces to the
    /// parent in the backward pass.
    pub fn inv_apply_force(&self, f: &SpatialVec) -> SpatialVec {
        let rt = self.rot.transpose();
        let force = rt * f.linear();
        SpatialVec::new(rt * f.angular() + self.pos.cross(&force), force)
    }

    /// Compose two transforms: `self ∘ other` (apply `other` first).
    pub fn compose(&self, other: &SpatialTransform) -> SpatialTransform {
        SpatialTransform {
            rot: self.rot * other.rot,
            pos: other.pos + other.rot.transpose() * self.pos,
        }
    }
}

/// Spatial inertia of a rigid body in barycentric form.
///
/// Mass, center of mass in the body frame, and rotational inertia about the
/// center of mass (the URDF convention).
#[derive(Debug, Clone, Copy)]
pub struct SpatialInertia {
    pub mass: f64,
    /// Center of mass position in body frame.
    pub com: Vec3,
    /// Rotational inertia about the center of mass (3x3 symmetric).
    pub inertia: Mat3,
}

impl SpatialInertia {
    /// Create from mass, center of mass and rotational inertia about the
    /// center of mass.
    pub fn new(mass: f64, com: Vec3, inertia: Mat3) -> Self {
        Self { mass, com, inertia }
    }

    /// Point mass at `pos`: no rotational inertia about its own center.
    pub fn point_mass(mass: f64, pos: Vec3) -> Self {
        Self {
            mass,
            com: pos,
            inertia: Mat3::zeros(),
        }
    }

    /// Rebuild from a link-frame parameter block
    /// `[m, m·c, I_origin(xx, xy, xz, yy, yz, zz)]`.
    ///
    /// A massless block maps to a center of mass at the origin, and its
    /// rotational inertia is taken as already COM-relative.
    pub fn from_link_params(p: &[f64; PARAMS_PER_LINK]) -> Self {
        let mass = p[0];
        let com = if mass != 0.0 {
            Vec3::new(p[1] / mass, p[2] / mass, p[3] / mass)
        } else {
            Vec3::zeros()
        };
        let cx = skew(&com);
        // Huygens-Steiner: I_o = I_c - m [c]×[c]×
        let inertia = symmetric_from_params(&p[4..]) + cx * cx * mass;
        Self { mass, com, inertia }
    }

    /// Link-frame parameter block: first moment of mass and rotational
    /// inertia about the body frame origin.
    pub fn to_link_params(&self) -> [f64; PARAMS_PER_LINK] {
        let h = self.com * self.mass;
        let io = self.origin_inertia();
        [
            self.mass,
            h.x,
            h.y,
            h.z,
            io[(0, 0)],
            io[(0, 1)],
            io[(0, 2)],
            io[(1, 1)],
            io[(1, 2)],
            io[(2, 2)],
        ]
    }

    /// Rotational inertia about the body frame origin.
    pub fn origin_inertia(&self) -> Mat3 {
        let cx = skew(&self.com);
        self.inertia - cx * cx * self.mass
    }

    /// 6x6 spatial inertia matrix about the body frame origin.
    ///
    /// I_spatial = | I_o     m[c]× |
    ///             | m[c]×ᵀ  mE    |
    pub fn to_matrix(&self) -> Mat6 {
        link_inertia_matrix(&self.to_link_params())
    }
}

/// 6x6 spatial inertia matrix from a link-frame parameter block.
///
/// The map is linear in `p`, so it is also defined for blocks that are not
/// physically consistent (unit vectors, differences of estimates).
pub fn link_inertia_matrix(p: &[f64; PARAMS_PER_LINK]) -> Mat6 {
    let hx = skew(&Vec3::new(p[1], p[2], p[3]));
    let mut mat = Mat6::zeros();
    mat.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&symmetric_from_params(&p[4..]));
    mat.fixed_view_mut::<3, 3>(0, 3).copy_from(&hx);
    mat.fixed_view_mut::<3, 3>(3, 0).copy_from(&hx.transpose());
    mat.fixed_view_mut::<3, 3>(3, 3)
        .copy_from(&(Mat3::identity() * p[0]));
    mat
}
