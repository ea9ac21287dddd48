//! Fixed-base identifiable subspace.
//!
//! The columns of the returned basis `B` span the row space of the
//! regressor over all system states: `Y · p == Y · B · Bᵀ · p` for every
//! state. It depends on the model topology only, so it is computed from
//! regressors at random states rather than from the measurement data.

use crate::regressor::joint_torque_regressor;
use crate::{DynamicsError, Result};
use idyn_math::{DMat, DVec, Vec3};
use idyn_model::Model;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Sampling options for [`identifiable_subspace`].
#[derive(Debug, Clone)]
pub struct SubspaceOptions {
    /// Number of random states (raised to the minimum that can reach full rank).
    pub samples: usize,
    pub seed: u64,
    /// Singular values below `tolerance * σ_max` are treated as zero.
    pub tolerance: f64,
    /// Positions are drawn from `[-r, r]`.
    pub position_range: f64,
    pub velocity_range: f64,
    pub acceleration_range: f64,
}

impl Default for SubspaceOptions {
    fn default() -> Self {
        Self {
            samples: 40,
            seed: 0x1d,
            tolerance: 1e-8,
            position_range: std::f64::consts::PI,
            velocity_range: 2.0,
            acceleration_range: 5.0,
        }
    }
}

/// Compute an orthonormal `(nparams, nbase)` basis of the identifiable
/// parameter subspace, columns ordered by decreasing singular value.
pub fn identifiable_subspace(
    model: &Model,
    gravity: &Vec3,
    opts: &SubspaceOptions,
) -> Result<DMat> {
    let n = model.ndof;
    let p = model.nparams();
    if n == 0 || p == 0 {
        return Err(DynamicsError::Subspace("model has no moving joints".to_string()));
    }

    let samples = opts.samples.max(p.div_ceil(n) + 1);
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut stack = DMat::zeros(n * samples, p);
    for s in 0..samples {
        let q = DVec::from_fn(n, |_, _| rng.gen_range(-opts.position_range..=opts.position_range));
        let dq = DVec::from_fn(n, |_, _| rng.gen_range(-opts.velocity_range..=opts.velocity_range));
        let ddq = DVec::from_fn(n, |_, _| {
            rng.gen_range(-opts.acceleration_range..=opts.acceleration_range)
        });
        let y = joint_torque_regressor(model, &q, &dq, &ddq, gravity)?;
        stack.view_mut((s * n, 0), (n, p)).copy_from(&y);
    }

    let svd = stack.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        DynamicsError::Subspace("SVD returned no right singular vectors".to_string())
    })?;
    let singular_values = &svd.singular_values;

    let sigma_max = singular_values.iter().copied().fold(0.0, f64::max);
    if !(sigma_max > 0.0) {
        return Err(DynamicsError::Subspace(
            "regressor vanishes at every sampled state".to_string(),
        ));
    }

    // Sort by decreasing singular value.
    let mut ranked: Vec<(f64, usize)> = singular_values
        .iter()
        .enumerate()
        .filter(|(_, s)| **s > opts.tolerance * sigma_max)
        .map(|(i, &s)| (s, i))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut basis = DMat::zeros(p, ranked.len());
    for (col, &(_, row)) in ranked.iter().enumerate() {
        basis.set_column(col, &v_t.row(row).transpose());
    }

    debug!(
        rank = ranked.len(),
        params = p,
        samples,
        sigma_max,
        "computed identifiable subspace"
    );
    Ok(basis)
}
