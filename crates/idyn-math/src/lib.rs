//! Spatial algebra and math primitives for inertial parameter identification.
//!
//! Implements 6D spatial vectors, Plücker transforms, and spatial inertia
//! following Featherstone's conventions, plus the 10-element inertial
//! parameter layout shared by the dynamics engine and the estimator.

pub mod spatial;

pub use spatial::{SpatialInertia, SpatialTransform, SpatialVec, link_inertia_matrix};

use nalgebra as na;

/// 3D vector alias.
pub type Vec3 = na::Vector3<f64>;
/// 3x3 matrix alias.
pub type Mat3 = na::Matrix3<f64>;
/// 6D vector alias.
pub type Vec6 = na::Vector6<f64>;
/// 6x6 matrix alias.
pub type Mat6 = na::Matrix6<f64>;
/// One link's block of the regressor before it is projected onto joint axes.
pub type Mat6x10 = na::SMatrix<f64, 6, 10>;
/// Dynamic vector.
pub type DVec = na::DVector<f64>;
/// Dynamic matrix.
pub type DMat = na::DMatrix<f64>;

/// Number of inertial parameters per link:
/// `[m, h_x, h_y, h_z, I_xx, I_xy, I_xz, I_yy, I_yz, I_zz]`.
pub const PARAMS_PER_LINK: usize = 10;

/// Standard gravity (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Cross-product matrix: [v]× such that [v]× w = v × w.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Copy link `link`'s parameter block out of a standard parameter vector.
///
/// Panics if `params` is shorter than `10 * (link + 1)`.
pub fn param_block(params: &[f64], link: usize) -> [f64; PARAMS_PER_LINK] {
    let mut block = [0.0; PARAMS_PER_LINK];
    block.copy_from_slice(&params[link * PARAMS_PER_LINK..(link + 1) * PARAMS_PER_LINK]);
    block
}

/// Build a symmetric 3x3 matrix from `[xx, xy, xz, yy, yz, zz]`.
///
/// Panics if `p` has fewer than 6 elements.
#[inline]
pub fn symmetric_from_params(p: &[f64]) -> Mat3 {
    Mat3::new(p[0], p[1], p[2], p[1], p[3], p[4], p[2], p[4], p[5])
}

/// Upper triangle of a 3x3 matrix as `[xx, xy, xz, yy, yz, zz]`.
#[inline]
pub fn symmetric_to_params(m: &Mat3) -> [f64; 6] {
    [
        m[(0, 0)],
        m[(0, 1)],
        m[(0, 2)],
        m[(1, 1)],
        m[(1, 2)],
        m[(2, 2)],
    ]
}
