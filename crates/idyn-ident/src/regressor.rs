//! Stacking per-sample regressors and torques.

use crate::backend::{RegressorEvaluator, SymbolicRegressor};
use crate::config::{EngineFailurePolicy, IdentificationConfig, RegressorMode};
use crate::measurements::{Measurements, Sample};
use crate::torque::TorqueSource;
use crate::{IdentError, Result};
use idyn_math::{DMat, DVec, Vec3};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Regressor and torque stacks of the retained samples.
///
/// Row block `k` (`num_outputs` rows) belongs to sample `samples[k]`.
#[derive(Debug, Clone)]
pub struct RegressorStacks {
    /// Which regressor the stack holds.
    pub mode: RegressorMode,
    /// Standard regressor in numeric mode, base regressor in symbolic mode.
    pub regressor: DMat,
    /// Torque stack, aligned row for row with `regressor`.
    pub torques: DVec,
    /// Rows per sample block.
    pub num_outputs: usize,
    /// Measurement rows that produced a block, in order.
    pub samples: Vec<usize>,
    /// Measurement rows left out after an engine failure.
    pub skipped: Vec<usize>,
    /// Time spent evaluating regressors.
    pub elapsed: Duration,
}

impl RegressorStacks {
    /// Number of samples that made it into the stacks.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Where the regressor blocks come from.
pub enum RegressorSource<'e> {
    /// Standard `(num_dof, num_params)` blocks, projected on the basis later.
    Numeric(&'e dyn RegressorEvaluator),
    /// Base-parameter blocks from generated code.
    Symbolic {
        evaluator: &'e dyn SymbolicRegressor,
        /// Joint positions relative to the parent link, one per link.
        link_offsets: Vec<Vec3>,
        /// Columns dropped from every block.
        redundant_columns: Vec<usize>,
    },
}

/// Builds [`RegressorStacks`] from measurements.
pub struct RegressorBuilder<'e> {
    source: RegressorSource<'e>,
    torques: TorqueSource<'e>,
    /// DOF of each output row.
    outputs: Vec<usize>,
    num_dof: usize,
    num_params: usize,
    start_offset: usize,
    gravity: Vec3,
    policy: EngineFailurePolicy,
}

impl<'e> RegressorBuilder<'e> {
    /// Builder over every DOF. Skip count, gravity and failure policy are
    /// taken from `config`.
    pub fn new(
        config: &IdentificationConfig,
        source: RegressorSource<'e>,
        torques: TorqueSource<'e>,
        num_dof: usize,
        num_params: usize,
    ) -> Self {
        Self {
            source,
            torques,
            outputs: (0..num_dof).collect(),
            num_dof,
            num_params,
            start_offset: config.start_offset,
            gravity: config.gravity_vector(),
            policy: config.on_engine_failure,
        }
    }

    /// Restrict the torque rows to the given DOFs.
    pub fn with_outputs(mut self, outputs: Vec<usize>) -> Self {
        self.outputs = outputs;
        self
    }

    fn num_columns(&self) -> usize {
        match &self.source {
            RegressorSource::Numeric(_) => self.num_params,
            RegressorSource::Symbolic {
                evaluator,
                redundant_columns,
                ..
            } => evaluator.num_columns().saturating_sub(redundant_columns.len()),
        }
    }

    /// Evaluate every retained sample and stack the results.
    pub fn build(&self, measurements: &Measurements) -> Result<RegressorStacks> {
        let total = measurements.num_samples();
        if self.start_offset >= total {
            return Err(IdentError::Config(format!(
                "start offset {} leaves no samples out of {total}",
                self.start_offset
            )));
        }
        if let Some(&dof) = self.outputs.iter().find(|&&d| d >= self.num_dof) {
            return Err(IdentError::Shape(format!("output DOF {dof} out of {}", self.num_dof)));
        }
        if let RegressorSource::Symbolic {
            evaluator,
            redundant_columns,
            ..
        } = &self.source
        {
            if let Some(&c) = redundant_columns.iter().find(|&&c| c >= evaluator.num_columns()) {
                return Err(IdentError::Shape(format!(
                    "redundant column {c} out of {}",
                    evaluator.num_columns()
                )));
            }
        }

        let retained = total - self.start_offset;
        let n_out = self.outputs.len();
        let mut regressor = DMat::zeros(n_out * retained, self.num_columns());
        let mut torques = DVec::zeros(n_out * retained);
        let mut samples = Vec::with_capacity(retained);
        let mut skipped = Vec::new();
        let mut elapsed = Duration::ZERO;
        let use_targets = self.torques.mode().simulates();

        for row in self.start_offset..total {
            let sample = measurements.sample(row, use_targets)?;
            match self.evaluate(&sample, &mut elapsed) {
                Ok((y, tau)) => {
                    let start = samples.len() * n_out;
                    regressor.rows_mut(start, n_out).copy_from(&y);
                    torques.rows_mut(start, n_out).copy_from(&tau);
                    samples.push(row);
                }
                Err(EvalError::Shape(msg)) => return Err(IdentError::Shape(msg)),
                Err(EvalError::Engine(reason)) => match self.policy {
                    EngineFailurePolicy::Abort => {
                        return Err(IdentError::EngineComputation { sample: row, reason });
                    }
                    EngineFailurePolicy::SkipSample => {
                        warn!(sample = row, %reason, "engine failed, skipping sample");
                        skipped.push(row);
                    }
                },
            }
        }

        if samples.is_empty() {
            return Err(IdentError::DegenerateInput(
                "every sample failed in the dynamics engine".to_string(),
            ));
        }
        if samples.len() < retained {
            let rows = samples.len() * n_out;
            regressor = regressor.resize_vertically(rows, 0.0);
            torques = torques.resize_vertically(rows, 0.0);
        }

        let mode = match self.source {
            RegressorSource::Numeric(_) => RegressorMode::Numeric,
            RegressorSource::Symbolic { .. } => RegressorMode::Symbolic,
        };
        info!(
            mode = ?mode,
            samples = samples.len(),
            skipped = skipped.len(),
            rows = regressor.nrows(),
            cols = regressor.ncols(),
            secs = elapsed.as_secs_f64(),
            "stacked regressors"
        );

        Ok(RegressorStacks {
            mode,
            regressor,
            torques,
            num_outputs: n_out,
            samples,
            skipped,
            elapsed,
        })
    }

    /// Output rows of one sample's regressor block and torques.
    fn evaluate(
        &self,
        sample: &Sample,
        elapsed: &mut Duration,
    ) -> std::result::Result<(DMat, DVec), EvalError> {
        let tau = self
            .torques
            .torques(sample, &self.gravity)
            .map_err(|e| EvalError::Engine(e.to_string()))?;
        if tau.len() != self.num_dof {
            return Err(EvalError::Shape(format!(
                "torque vector of length {}, expected {}",
                tau.len(),
                self.num_dof
            )));
        }

        let start = Instant::now();
        let y = match &self.source {
            RegressorSource::Numeric(evaluator) => {
                evaluator.regressor(&sample.q, &sample.dq, &sample.ddq, &self.gravity)
            }
            RegressorSource::Symbolic {
                evaluator,
                link_offsets,
                ..
            } => evaluator.regressor(&sample.q, &sample.dq, &sample.ddq, link_offsets),
        };
        *elapsed += start.elapsed();
        let y = y.map_err(|e| EvalError::Engine(e.to_string()))?;

        let y = match &self.source {
            RegressorSource::Numeric(_) => y,
            RegressorSource::Symbolic {
                redundant_columns, ..
            } => {
                let mut drop = redundant_columns.clone();
                drop.sort_unstable();
                if y.ncols() <= drop.last().copied().unwrap_or(0) {
                    return Err(EvalError::Shape(format!(
                        "symbolic block has {} columns",
                        y.ncols()
                    )));
                }
                y.remove_columns_at(&drop)
            }
        };
        if y.shape() != (self.num_dof, self.num_columns()) {
            return Err(EvalError::Shape(format!(
                "regressor block of shape {:?}, expected {:?}",
                y.shape(),
                (self.num_dof, self.num_columns())
            )));
        }

        Ok((y.select_rows(self.outputs.iter()), tau.select_rows(self.outputs.iter())))
    }
}

enum EvalError {
    Shape(String),
    Engine(String),
}
