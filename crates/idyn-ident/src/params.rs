//! Conversions between the link-frame and barycentric parameter encodings,
//! plus a constrained generalized inverse.
//!
//! Link frame: `[m, m·c_x, m·c_y, m·c_z, I_xx, I_xy, I_xz, I_yy, I_yz, I_zz]`
//! with the rotational inertia about the link origin.
//! Barycentric: `[m, c_x, c_y, c_z, ...]` with the rotational inertia about
//! the center of mass (URDF convention).

use crate::{IdentError, Result};
use idyn_math::{
    DMat, DVec, Mat3, PARAMS_PER_LINK, SpatialInertia, Vec3, symmetric_from_params,
    symmetric_to_params,
};

fn check_blocks(params: &DVec) -> Result<()> {
    if params.len() % PARAMS_PER_LINK != 0 {
        return Err(IdentError::Dimension(format!(
            "parameter vector of length {} is not a multiple of {PARAMS_PER_LINK}",
            params.len()
        )));
    }
    Ok(())
}

/// Barycentric inertia of each link block.
pub(crate) fn link_inertias(params: &DVec) -> Result<Vec<SpatialInertia>> {
    check_blocks(params)?;
    Ok(params
        .as_slice()
        .chunks_exact(PARAMS_PER_LINK)
        .map(|chunk| {
            let mut block = [0.0; PARAMS_PER_LINK];
            block.copy_from_slice(chunk);
            SpatialInertia::from_link_params(&block)
        })
        .collect())
}

/// Convert link-frame parameters to barycentric form.
///
/// Massless links get their center of mass at the origin.
pub fn to_barycentric(params: &DVec) -> Result<DVec> {
    let inertias = link_inertias(params)?;
    let mut out = DVec::zeros(params.len());
    for (i, si) in inertias.iter().enumerate() {
        let mut block = out.rows_mut(i * PARAMS_PER_LINK, PARAMS_PER_LINK);
        block[0] = si.mass;
        block[1] = si.com.x;
        block[2] = si.com.y;
        block[3] = si.com.z;
        for (k, v) in symmetric_to_params(&si.inertia).into_iter().enumerate() {
            block[4 + k] = v;
        }
    }
    Ok(out)
}

/// Convert barycentric parameters back to link-frame form.
pub fn to_link_frame(params: &DVec) -> Result<DVec> {
    check_blocks(params)?;
    let mut out = DVec::zeros(params.len());
    for (i, p) in params.as_slice().chunks_exact(PARAMS_PER_LINK).enumerate() {
        let com = Vec3::new(p[1], p[2], p[3]);
        let si = SpatialInertia::new(p[0], com, symmetric_from_params(&p[4..]));
        out.rows_mut(i * PARAMS_PER_LINK, PARAMS_PER_LINK)
            .copy_from_slice(&si.to_link_params());
    }
    Ok(out)
}

/// Bott-Duffin inverse of `m` constrained to the orthogonal complement of
/// `v`: `C (M C + P)⁻¹` with `P = v vᵀ / (vᵀ v)` and `C = I - P`.
///
/// The result maps `v` to zero.
pub fn bott_duffin(m: &DMat, v: &DVec) -> Result<DMat> {
    let n = v.len();
    if m.shape() != (n, n) {
        return Err(IdentError::Shape(format!(
            "matrix of shape {:?} does not match vector of length {n}",
            m.shape()
        )));
    }
    let v_dot_v = v.dot(v);
    if v_dot_v == 0.0 {
        return Err(IdentError::DegenerateInput("expected nonzero v".to_string()));
    }

    let p = v * v.transpose() / v_dot_v;
    let c = DMat::identity(n, n) - &p;
    let inner = (m * &c + &p)
        .try_inverse()
        .ok_or_else(|| IdentError::DegenerateInput("M·C + P is singular".to_string()))?;
    Ok(c * inner)
}

/// Per link, whether the link-frame block describes a physical rigid body:
/// positive mass, and a COM-relative inertia that is positive semidefinite
/// with principal moments obeying the triangle inequalities.
pub fn check_physical_consistency(params: &DVec) -> Result<Vec<bool>> {
    Ok(link_inertias(params)?
        .iter()
        .map(|si| si.mass > 0.0 && inertia_is_consistent(&si.inertia))
        .collect())
}

fn inertia_is_consistent(inertia: &Mat3) -> bool {
    let ev = inertia.symmetric_eigenvalues();
    let tol = 1e-12 * ev.amax().max(1.0);
    let (a, b, c) = (ev[0], ev[1], ev[2]);
    ev.iter().all(|&l| l >= -tol) && a + b >= c - tol && b + c >= a - tol && a + c >= b - tol
}
