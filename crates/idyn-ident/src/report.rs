//! Human-readable comparison of prior and identified parameters, and
//! per-sample torque views for plotting.

use crate::params::to_barycentric;
use crate::pipeline::IdentificationResult;
use crate::{IdentError, Result};
use idyn_math::{DMat, DVec, PARAMS_PER_LINK};
use std::fmt;

const COLUMN_WIDTHS: [usize; 4] = [15, 15, 7, 45];
const PRECISIONS: [usize; 3] = [8, 8, 3];

const PARAMETER_LABELS: [&str; PARAMS_PER_LINK] = [
    "Mass",
    "center of mass x",
    "center of mass y",
    "center of mass z",
    "Ixx w.r.t. COM",
    "Ixy w.r.t. COM",
    "Ixz w.r.t. COM",
    "Iyy w.r.t. COM",
    "Iyz w.r.t. COM",
    "Izz w.r.t. COM",
];

/// One line of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    /// Prior value from the model description.
    pub model: f64,
    pub estimated: f64,
    /// `model - estimated`
    pub error: f64,
    pub description: String,
}

/// Barycentric prior and estimate side by side, one row per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterReport {
    pub rows: Vec<ParameterRow>,
}

impl ParameterReport {
    /// Compare two link-frame parameter vectors. Neither input is modified.
    pub fn new(x_model: &DVec, x_estimated: &DVec, link_names: &[String]) -> Result<Self> {
        if x_model.len() != x_estimated.len() {
            return Err(IdentError::Dimension(format!(
                "model has {} parameters, estimate has {}",
                x_model.len(),
                x_estimated.len()
            )));
        }
        let model = to_barycentric(x_model)?;
        let estimated = to_barycentric(x_estimated)?;
        let descriptions = parameter_descriptions(link_names);
        if descriptions.len() != model.len() {
            return Err(IdentError::Dimension(format!(
                "{} link names for {} parameters",
                link_names.len(),
                model.len()
            )));
        }

        let rows = model
            .iter()
            .zip(estimated.iter())
            .zip(descriptions)
            .map(|((&old, &new), description)| ParameterRow {
                model: old,
                estimated: new,
                error: old - new,
                description,
            })
            .collect();
        Ok(Self { rows })
    }
}

impl fmt::Display for ParameterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [w0, w1, w2, w3] = COLUMN_WIDTHS;
        let [p0, p1, p2] = PRECISIONS;
        writeln!(f, "|{:w0$}|{:w1$}|{:w2$}|{:w3$}", "Model", "Approx", "Error", "Description")?;
        for row in &self.rows {
            writeln!(
                f,
                "|{:w0$.p0$}|{:w1$.p1$}|{:w2$.p2$}|{:w3$}",
                row.model, row.estimated, row.error, row.description
            )?;
        }
        Ok(())
    }
}

/// Description of every standard parameter, in vector order.
pub fn parameter_descriptions(link_names: &[String]) -> Vec<String> {
    link_names
        .iter()
        .flat_map(|name| PARAMETER_LABELS.iter().map(move |label| (name, label)))
        .enumerate()
        .map(|(idx, (name, label))| format!("# {idx}: {label} of link {name}"))
        .collect()
}

/// Reshape a stacked per-sample vector into a `(samples, num_outputs)` matrix.
pub fn reshape_samples(stacked: &DVec, num_outputs: usize) -> Result<DMat> {
    if num_outputs == 0 || stacked.len() % num_outputs != 0 {
        return Err(IdentError::Shape(format!(
            "stack of length {} does not split into rows of {num_outputs}",
            stacked.len()
        )));
    }
    Ok(DMat::from_row_slice(
        stacked.len() / num_outputs,
        num_outputs,
        stacked.as_slice(),
    ))
}

/// RMS of `tau_measured - tau_est` for each output.
pub fn torque_residual(result: &IdentificationResult) -> DVec {
    let diff = &result.tau_measured - &result.tau_est;
    let n = diff.nrows().max(1) as f64;
    DVec::from_iterator(
        diff.ncols(),
        diff.column_iter().map(|c| (c.norm_squared() / n).sqrt()),
    )
}
