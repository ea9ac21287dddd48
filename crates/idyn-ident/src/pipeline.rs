//! End-to-end identification run.

use crate::backend::{BarycentricEngine, RigidBodyBackend, SubspaceProvider, SymbolicRegressor};
use crate::config::{IdentificationConfig, RegressorMode, TorqueSourceMode};
use crate::estimator::BaseParameterEstimator;
use crate::measurements::Measurements;
use crate::params::{check_physical_consistency, to_barycentric};
use crate::regressor::{RegressorBuilder, RegressorSource, RegressorStacks};
use crate::report::{ParameterReport, reshape_samples};
use crate::torque::TorqueSource;
use crate::{IdentError, Result};
use idyn_math::{DMat, DVec, Vec3};
use idyn_model::Model;
use idyn_urdf::{RegressorStructure, UrdfLoader, rewrite_inertials};
use std::path::Path;
use tracing::{debug, info, warn};

/// Identified parameters and the torque trajectories they explain.
#[derive(Debug, Clone)]
pub struct IdentificationResult {
    /// Base parameters, `pinv(Y_base) · tau`.
    pub x_base: DVec,
    /// Link-frame standard parameters `B · x_base`.
    pub x_std: DVec,
    /// `(samples, num_outputs)`
    pub tau_est: DMat,
    /// Torques the estimate was fitted to, same layout as `tau_est`.
    pub tau_measured: DMat,
    /// Identifiable subspace `B`, `(num_params, num_base)`.
    pub basis: DMat,
    /// Measurement rows behind each torque row.
    pub samples: Vec<usize>,
}

impl IdentificationResult {
    pub fn num_base_params(&self) -> usize {
        self.x_base.len()
    }
}

/// Everything one [`Identification::run`] produces.
#[derive(Debug, Clone)]
pub struct IdentificationRun {
    pub stacks: RegressorStacks,
    pub result: IdentificationResult,
    /// Present when the configuration asks for it.
    pub report: Option<ParameterReport>,
}

/// Identification of one robot under one configuration.
pub struct Identification {
    config: IdentificationConfig,
    backend: RigidBodyBackend,
    alternate: Option<Box<dyn BarycentricEngine>>,
    symbolic: Option<Box<dyn SymbolicRegressor>>,
    /// DOF of each torque output.
    outputs: Vec<usize>,
    /// Prior parameters of the model, link frame.
    x_std_model: DVec,
    link_offsets: Vec<Vec3>,
}

impl Identification {
    /// Set up a run on `model`; its current inertials become the prior.
    ///
    /// Every DOF produces a torque output until a regressor structure
    /// narrows the selection.
    pub fn new(model: Model, config: IdentificationConfig) -> Self {
        let massless = model.links.iter().filter(|l| l.inertia.mass == 0.0).count();
        info!(
            robot = %model.name,
            dofs = model.ndof,
            params = model.nparams(),
            links = model.nlinks(),
            massless,
            "loaded model"
        );
        let x_std_model = model.parameters();
        let link_offsets = model.link_offsets();
        let outputs = (0..model.ndof).collect();
        let backend = RigidBodyBackend::new(model).with_subspace_options(config.subspace.options());
        Self {
            config,
            backend,
            alternate: None,
            symbolic: None,
            outputs,
            x_std_model,
            link_offsets,
        }
    }

    /// Load the model from a URDF document.
    pub fn from_urdf_str(xml: &str, config: IdentificationConfig) -> Result<Self> {
        let model = UrdfLoader::from_xml_str(xml)?.build_model()?;
        Ok(Self::new(model, config))
    }

    pub fn from_urdf_file<P: AsRef<Path>>(path: P, config: IdentificationConfig) -> Result<Self> {
        let model = UrdfLoader::from_file(path)?.build_model()?;
        Ok(Self::new(model, config))
    }

    /// Select the torque outputs from a regressor structure description.
    pub fn with_regressor_structure(mut self, structure: &RegressorStructure) -> Result<Self> {
        self.outputs = structure.output_dofs(self.model())?;
        info!(outputs = self.outputs.len(), "selected regressor outputs");
        Ok(self)
    }

    /// Use `engine` instead of the built-in barycentric engine when simulating
    /// with the alternate engine.
    pub fn with_alternate_engine(mut self, engine: Box<dyn BarycentricEngine>) -> Self {
        self.alternate = Some(engine);
        self
    }

    pub fn with_symbolic_regressor(mut self, evaluator: Box<dyn SymbolicRegressor>) -> Self {
        self.symbolic = Some(evaluator);
        self
    }

    pub fn config(&self) -> &IdentificationConfig {
        &self.config
    }

    pub fn model(&self) -> &Model {
        self.backend.model()
    }

    pub fn x_std_model(&self) -> &DVec {
        &self.x_std_model
    }

    /// Position of each joint relative to its parent link.
    pub fn link_offsets(&self) -> &[Vec3] {
        &self.link_offsets
    }

    pub fn dof_names(&self) -> Vec<String> {
        self.model().dof_names()
    }

    /// Joint names of the torque outputs, in row order.
    pub fn output_names(&self) -> Vec<String> {
        let names = self.dof_names();
        self.outputs.iter().map(|&d| names[d].clone()).collect()
    }

    /// Validate the inputs and stack one regressor block per retained sample.
    pub fn compute_regressors(&self, measurements: &Measurements) -> Result<RegressorStacks> {
        let model = self.model();
        let simulates = self.config.torque_source.simulates();
        measurements.validate(model.ndof, !simulates)?;
        self.config
            .validate(measurements.num_samples(), self.symbolic.is_some())?;
        info!(
            loaded = measurements.num_samples(),
            used = measurements.num_samples() - self.config.start_offset,
            torque_source = ?self.config.torque_source,
            regressor = ?self.config.regressor,
            "computing regressors"
        );

        let torques = match self.config.torque_source {
            TorqueSourceMode::Measured => TorqueSource::Measured,
            TorqueSourceMode::SimulatePrimary => {
                TorqueSource::primary(&self.backend, &self.x_std_model)
            }
            TorqueSourceMode::SimulateAlternate => {
                let engine: &dyn BarycentricEngine = match &self.alternate {
                    Some(engine) => &**engine,
                    None => &self.backend,
                };
                TorqueSource::alternate(engine, &self.x_std_model, self.link_offsets.clone())?
            }
        };

        let source = match self.config.regressor {
            RegressorMode::Numeric => RegressorSource::Numeric(&self.backend),
            RegressorMode::Symbolic => RegressorSource::Symbolic {
                evaluator: self
                    .symbolic
                    .as_deref()
                    .ok_or_else(|| IdentError::Config("no symbolic evaluator".to_string()))?,
                link_offsets: self.link_offsets.clone(),
                redundant_columns: self.config.symbolic_redundant_columns.clone(),
            },
        };

        RegressorBuilder::new(&self.config, source, torques, model.ndof, model.nparams())
            .with_outputs(self.outputs.clone())
            .build(measurements)
    }

    /// Solve for the base parameters of `stacks`.
    ///
    /// Fails with [`IdentError::BasisComputation`] when the identifiable
    /// subspace cannot be computed. Physically inconsistent links are only
    /// logged.
    pub fn identify(&self, stacks: &RegressorStacks) -> Result<IdentificationResult> {
        let basis = self
            .backend
            .identifiable_subspace(&self.config.gravity_vector())
            .map_err(|e| IdentError::BasisComputation(e.to_string()))?;
        debug!(
            params = basis.nrows(),
            base_params = basis.ncols(),
            "identifiable subspace"
        );

        let estimator = BaseParameterEstimator::new(basis, self.config.pinv_rcond);
        let (y, tau) = (&stacks.regressor, &stacks.torques);
        let estimate = match stacks.mode {
            RegressorMode::Numeric => estimator.estimate_standard(y, tau)?,
            RegressorMode::Symbolic => estimator.estimate_base(y, tau)?,
        };

        let link_names = self.model().link_names();
        for (name, consistent) in link_names
            .iter()
            .zip(check_physical_consistency(&estimate.x_std)?)
        {
            if !consistent {
                warn!(link = %name, "identified parameters are not physically consistent");
            }
        }

        let result = IdentificationResult {
            tau_est: reshape_samples(&estimate.tau_est, stacks.num_outputs)?,
            tau_measured: reshape_samples(&stacks.torques, stacks.num_outputs)?,
            x_base: estimate.x_base,
            x_std: estimate.x_std,
            basis: estimator.basis().clone(),
            samples: stacks.samples.clone(),
        };
        info!(
            base_params = result.num_base_params(),
            samples = result.samples.len(),
            "identified base parameters"
        );
        Ok(result)
    }

    /// Compare the prior model with `result` in barycentric form.
    pub fn explain(&self, result: &IdentificationResult) -> Result<ParameterReport> {
        ParameterReport::new(&self.x_std_model, &result.x_std, &self.model().link_names())
    }

    /// `xml` with every link's inertial replaced by the identified values.
    pub fn identified_urdf(&self, xml: &str, result: &IdentificationResult) -> Result<String> {
        let bary = to_barycentric(&result.x_std)?;
        Ok(rewrite_inertials(xml, bary.as_slice(), &self.model().link_names())?)
    }

    /// [`compute_regressors`](Self::compute_regressors), then
    /// [`identify`](Self::identify), then the report if configured.
    pub fn run(&self, measurements: &Measurements) -> Result<IdentificationRun> {
        let stacks = self.compute_regressors(measurements)?;
        let result = self.identify(&stacks)?;
        let report = if self.config.explain {
            Some(self.explain(&result)?)
        } else {
            None
        };
        Ok(IdentificationRun { stacks, result, report })
    }
}
