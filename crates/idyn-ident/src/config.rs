//! Run configuration.

use crate::{IdentError, Result};
use idyn_math::{GRAVITY, Vec3};
use idyn_rigid::SubspaceOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the torque of each sample comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorqueSourceMode {
    /// Recorded joint torques.
    #[default]
    Measured,
    /// Inverse dynamics of the prior model with the primary engine.
    SimulatePrimary,
    /// Inverse dynamics of the prior model with the barycentric engine.
    SimulateAlternate,
}

impl TorqueSourceMode {
    /// Simulation modes read the target kinematics.
    pub fn simulates(self) -> bool {
        !matches!(self, TorqueSourceMode::Measured)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressorMode {
    /// Standard regressor from the dynamics engine, projected on the basis.
    #[default]
    Numeric,
    /// Base regressor from a symbolic evaluator.
    Symbolic,
}

/// What to do when an engine fails on one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineFailurePolicy {
    /// Leave the sample out of both stacks.
    #[default]
    SkipSample,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubspaceConfig {
    pub samples: usize,
    pub seed: u64,
    pub tolerance: f64,
}

impl Default for SubspaceConfig {
    fn default() -> Self {
        let opts = SubspaceOptions::default();
        Self {
            samples: opts.samples,
            seed: opts.seed,
            tolerance: opts.tolerance,
        }
    }
}

impl SubspaceConfig {
    pub fn options(&self) -> SubspaceOptions {
        SubspaceOptions {
            samples: self.samples,
            seed: self.seed,
            tolerance: self.tolerance,
            ..SubspaceOptions::default()
        }
    }
}

/// Immutable configuration of one identification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentificationConfig {
    pub torque_source: TorqueSourceMode,
    pub regressor: RegressorMode,
    /// Number of leading samples to skip.
    pub start_offset: usize,
    pub gravity: [f64; 3],
    pub on_engine_failure: EngineFailurePolicy,
    /// Columns removed from every symbolic regressor block.
    pub symbolic_redundant_columns: Vec<usize>,
    pub subspace: SubspaceConfig,
    /// Relative singular value cutoff of the pseudo-inverse. `None` uses
    /// `max(rows, cols) · ε`.
    pub pinv_rcond: Option<f64>,
    /// Also produce the parameter report.
    pub explain: bool,
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            torque_source: TorqueSourceMode::default(),
            regressor: RegressorMode::default(),
            start_offset: 200,
            gravity: [0.0, 0.0, -GRAVITY],
            on_engine_failure: EngineFailurePolicy::default(),
            symbolic_redundant_columns: vec![0, 3, 5],
            subspace: SubspaceConfig::default(),
            pinv_rcond: None,
            explain: false,
        }
    }
}

impl IdentificationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn gravity_vector(&self) -> Vec3 {
        Vec3::from(self.gravity)
    }

    /// Check the configuration against the data and collaborators of a run.
    pub fn validate(&self, num_samples: usize, has_symbolic: bool) -> Result<()> {
        if self.start_offset >= num_samples {
            return Err(IdentError::Config(format!(
                "start offset {} leaves no samples out of {num_samples}",
                self.start_offset
            )));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(IdentError::Config("gravity must be finite".to_string()));
        }
        if let Some(rcond) = self.pinv_rcond {
            if !(rcond.is_finite() && rcond >= 0.0) {
                return Err(IdentError::Config(format!("invalid pinv_rcond {rcond}")));
            }
        }
        if !(self.subspace.tolerance > 0.0 && self.subspace.tolerance < 1.0) {
            return Err(IdentError::Config(format!(
                "subspace tolerance {} outside (0, 1)",
                self.subspace.tolerance
            )));
        }
        if self.regressor == RegressorMode::Symbolic {
            if !has_symbolic {
                return Err(IdentError::Config(
                    "symbolic regressor mode without a symbolic evaluator".to_string(),
                ));
            }
            if self.symbolic_redundant_columns.is_empty() {
                return Err(IdentError::Config(
                    "symbolic regressor mode needs redundant columns".to_string(),
                ));
            }
            let mut cols = self.symbolic_redundant_columns.clone();
            cols.sort_unstable();
            cols.dedup();
            if cols.len() != self.symbolic_redundant_columns.len() {
                return Err(IdentError::Config("duplicate redundant column".to_string()));
            }
        }
        Ok(())
    }
}
