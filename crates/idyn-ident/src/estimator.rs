//! Least-squares estimation of the base parameters.

use crate::{IdentError, Result};
use idyn_math::{DMat, DVec};
use tracing::debug;

/// Project a standard regressor on the identifiable subspace:
/// `Y_base = Y_std · B`.
pub fn project(y_std: &DMat, basis: &DMat) -> Result<DMat> {
    if y_std.ncols() != basis.nrows() {
        return Err(IdentError::Shape(format!(
            "regressor with {} columns cannot be projected on a basis with {} rows",
            y_std.ncols(),
            basis.nrows()
        )));
    }
    Ok(y_std * basis)
}

/// Moore-Penrose pseudo-inverse through the SVD.
///
/// Singular values at or below `rcond · σ_max` are treated as zero;
/// without `rcond` the cutoff is `max(rows, cols) · ε · σ_max`.
pub fn pseudo_inverse(a: &DMat, rcond: Option<f64>) -> Result<DMat> {
    let (rows, cols) = a.shape();
    if rows == 0 || cols == 0 {
        return Ok(DMat::zeros(cols, rows));
    }
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let rcond = rcond.unwrap_or(rows.max(cols) as f64 * f64::EPSILON);
    svd.pseudo_inverse(rcond * sigma_max)
        .map_err(|e| IdentError::DegenerateInput(e.to_string()))
}

/// Result of the least-squares solve.
#[derive(Debug, Clone)]
pub struct BaseEstimate {
    pub x_base: DVec,
    /// `B · x_base`, only the identifiable combinations are meaningful.
    pub x_std: DVec,
    /// `Y_base · x_base`
    pub tau_est: DVec,
}

/// Base-parameter estimator for one identifiable subspace.
#[derive(Debug, Clone)]
pub struct BaseParameterEstimator {
    basis: DMat,
    rcond: Option<f64>,
}

impl BaseParameterEstimator {
    pub fn new(basis: DMat, rcond: Option<f64>) -> Self {
        Self { basis, rcond }
    }

    pub fn basis(&self) -> &DMat {
        &self.basis
    }

    /// Estimate from a standard regressor stack.
    pub fn estimate_standard(&self, y_std: &DMat, tau: &DVec) -> Result<BaseEstimate> {
        let y_base = project(y_std, &self.basis)?;
        debug!(rows = y_base.nrows(), cols = y_base.ncols(), "projected regressor");
        self.estimate_base(&y_base, tau)
    }

    /// Estimate from a regressor already expressed in base parameters.
    pub fn estimate_base(&self, y_base: &DMat, tau: &DVec) -> Result<BaseEstimate> {
        if y_base.ncols() != self.basis.ncols() {
            return Err(IdentError::Shape(format!(
                "base regressor has {} columns, basis has {}",
                y_base.ncols(),
                self.basis.ncols()
            )));
        }
        if y_base.nrows() != tau.len() {
            return Err(IdentError::Shape(format!(
                "regressor has {} rows, torque stack has {}",
                y_base.nrows(),
                tau.len()
            )));
        }

        let pinv = pseudo_inverse(y_base, self.rcond)?;
        let x_base = pinv * tau;
        let x_std = &self.basis * &x_base;
        let tau_est = y_base * &x_base;
        Ok(BaseEstimate { x_base, x_std, tau_est })
    }
}
