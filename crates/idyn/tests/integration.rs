//! End-to-end identification scenarios.

use approx::assert_relative_eq;
use idyn::idyn_ident::{
    BarycentricEngine, EngineResult, IdentError, SymbolicRegressor, parameter_descriptions,
};
use idyn::idyn_math::{GRAVITY, Mat3, SpatialInertia, SpatialTransform};
use idyn::idyn_rigid::{BarycentricParams, SubspaceOptions};
use idyn::{
    DMat, DVec, EngineFailurePolicy, Identification, IdentificationConfig, Joint, Measurements,
    Model, ModelBuilder, RegressorMode, RegressorStructure, RigidBodyBackend, TorqueSourceMode,
    UrdfLoader, Vec3, identifiable_subspace, inverse_dynamics, joint_torque_regressor,
    torque_residual,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn gravity() -> Vec3 {
    Vec3::new(0.0, 0.0, -GRAVITY)
}

/// Hinge about y at the base, COM 0.5 m up the link.
fn pendulum(mass: f64, com_z: f64, inertia: Vec3) -> Model {
    ModelBuilder::new("pendulum", "base")
        .add_link(
            "link",
            -1,
            Joint::revolute("hinge", SpatialTransform::identity(), Vec3::y()),
            SpatialInertia::new(mass, Vec3::new(0.0, 0.0, com_z), Mat3::from_diagonal(&inertia)),
        )
        .build()
}

fn true_pendulum() -> Model {
    pendulum(2.0, 0.5, Vec3::new(0.1, 0.1, 0.01))
}

const ARM_URDF: &str = r#"<?xml version="1.0"?>
<robot name="two_link_arm">
  <link name="base_link"/>
  <link name="upper_arm">
    <inertial>
      <origin xyz="0.01 0 0.2" rpy="0 0 0"/>
      <mass value="2.0"/>
      <inertia ixx="0.03" ixy="0.001" ixz="0" iyy="0.028" iyz="0" izz="0.004"/>
    </inertial>
    <visual>
      <origin xyz="0 0 0.2"/>
      <geometry><cylinder radius="0.03" length="0.4"/></geometry>
    </visual>
  </link>
  <link name="forearm">
    <inertial>
      <origin xyz="0 0.02 0.15" rpy="0.1 0 0"/>
      <mass value="1.2"/>
      <inertia ixx="0.012" ixy="0" ixz="0" iyy="0.011" iyz="0" izz="0.002"/>
    </inertial>
  </link>
  <link name="tool">
    <inertial>
      <origin xyz="0.05 0 0"/>
      <mass value="0.3"/>
      <inertia ixx="0.0002" ixy="0" ixz="0" iyy="0.0003" iyz="0" izz="0.0003"/>
    </inertial>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base_link"/>
    <child link="upper_arm"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2" upper="2" effort="50" velocity="3"/>
  </joint>
  <joint name="elbow" type="revolute">
    <parent link="upper_arm"/>
    <child link="forearm"/>
    <origin xyz="0 0 0.4" rpy="0 0 0.3"/>
    <axis xyz="1 0 0"/>
  </joint>
  <joint name="flange" type="fixed">
    <parent link="forearm"/>
    <child link="tool"/>
    <origin xyz="0 0 0.3"/>
  </joint>
</robot>"#;

fn arm() -> Model {
    UrdfLoader::from_xml_str(ARM_URDF).unwrap().build_model().unwrap()
}

/// Multi-sine kinematics for every DOF, sampled at 100 Hz.
fn excitation(ndof: usize, n: usize) -> (Vec<f64>, Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let times: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
    let mut pos = Vec::with_capacity(n);
    let mut vel = Vec::with_capacity(n);
    let mut acc = Vec::with_capacity(n);
    for &t in &times {
        let mut q = Vec::with_capacity(ndof);
        let mut dq = Vec::with_capacity(ndof);
        let mut ddq = Vec::with_capacity(ndof);
        for j in 0..ndof {
            let (w1, w2) = (1.3 + 0.7 * j as f64, 3.1 + 1.1 * j as f64);
            let (a1, a2, phase) = (1.0, 0.4, 0.5 * j as f64);
            q.push(a1 * (w1 * t + phase).sin() + a2 * (w2 * t).sin());
            dq.push(a1 * w1 * (w1 * t + phase).cos() + a2 * w2 * (w2 * t).cos());
            ddq.push(-a1 * w1 * w1 * (w1 * t + phase).sin() - a2 * w2 * w2 * (w2 * t).sin());
        }
        pos.push(q);
        vel.push(dq);
        acc.push(ddq);
    }
    (times, pos, vel, acc)
}

/// Noise-free measurements of `model` following the excitation trajectory.
fn measure(model: &Model, n: usize) -> Measurements {
    let (times, positions, velocities, accelerations) = excitation(model.ndof, n);
    let x = model.parameters();
    let torques = (0..n)
        .map(|i| {
            let tau = inverse_dynamics(
                model,
                &x,
                &DVec::from_column_slice(&positions[i]),
                &DVec::from_column_slice(&velocities[i]),
                &DVec::from_column_slice(&accelerations[i]),
                &gravity(),
            )
            .unwrap();
            tau.iter().copied().collect()
        })
        .collect();
    Measurements {
        positions,
        velocities,
        accelerations,
        torques,
        times,
        ..Default::default()
    }
}

/// Same trajectory as commanded targets, with no recorded torques.
fn targets_only(ndof: usize, n: usize) -> Measurements {
    let (times, positions, velocities, accelerations) = excitation(ndof, n);
    Measurements {
        positions: positions.clone(),
        velocities: velocities.clone(),
        accelerations: accelerations.clone(),
        torques: Vec::new(),
        times,
        target_positions: Some(positions),
        target_velocities: Some(velocities),
        target_accelerations: Some(accelerations),
    }
}

fn config(start_offset: usize) -> IdentificationConfig {
    IdentificationConfig {
        start_offset,
        ..Default::default()
    }
}

#[test]
fn pendulum_base_parameters_are_recovered() {
    let truth = true_pendulum();
    let x_true = truth.parameters();
    let measurements = measure(&truth, 400);

    // Start from a deliberately wrong prior.
    let prior = pendulum(1.0, 0.3, Vec3::new(0.05, 0.05, 0.005));
    let ident = Identification::new(prior, config(200));
    let stacks = ident.compute_regressors(&measurements).unwrap();
    assert_eq!(stacks.regressor.shape(), (200, 10));

    let result = ident.identify(&stacks).unwrap();
    assert_eq!(result.num_base_params(), 3);
    let expected = result.basis.transpose() * &x_true;
    assert_relative_eq!(result.x_base, expected, max_relative = 1e-6, epsilon = 1e-9);

    // Only h_x, h_z and I_yy about the hinge are identifiable.
    assert_relative_eq!(result.x_std[1], 0.0, epsilon = 1e-6);
    assert_relative_eq!(result.x_std[3], 1.0, max_relative = 1e-6);
    assert_relative_eq!(result.x_std[7], 0.6, max_relative = 1e-6);

    assert_eq!(result.tau_est.shape(), (200, 1));
    assert_relative_eq!(result.tau_est, result.tau_measured, epsilon = 1e-8);
    assert!(torque_residual(&result)[0] < 1e-8);
}

#[test]
fn two_link_arm_from_urdf() {
    let model = arm();
    assert_eq!(model.dof_names(), ["shoulder", "elbow"]);
    assert_eq!(model.nparams(), 30);
    let measurements = measure(&model, 300);

    let cfg = IdentificationConfig {
        explain: true,
        ..config(50)
    };
    let ident = Identification::from_urdf_str(ARM_URDF, cfg).unwrap();
    let run = ident.run(&measurements).unwrap();

    assert_eq!(run.stacks.regressor.shape(), (2 * 250, 30));
    let result = &run.result;
    assert!(result.num_base_params() < 30);
    assert_relative_eq!(result.tau_est, result.tau_measured, epsilon = 1e-7);

    // The estimate explains the data as well as the true parameters do.
    let y = joint_torque_regressor(
        &model,
        &DVec::from_vec(vec![0.3, -0.8]),
        &DVec::from_vec(vec![0.5, 1.0]),
        &DVec::from_vec(vec![-1.0, 2.0]),
        &gravity(),
    )
    .unwrap();
    assert_relative_eq!(&y * &result.x_std, &y * model.parameters(), epsilon = 1e-7);

    let report = run.report.expect("explain was requested");
    assert_eq!(report.rows.len(), 30);
    assert_eq!(
        report.rows[10].description,
        parameter_descriptions(&model.link_names())[10]
    );
    // Prior column is the URDF's barycentric values.
    assert_relative_eq!(report.rows[0].model, 2.0, epsilon = 1e-12);
    assert_relative_eq!(report.rows[3].model, 0.2, epsilon = 1e-12);
    let table = report.to_string();
    assert!(table.starts_with("|Model"));
    assert_eq!(table.lines().count(), 31);

    let rewritten = ident.identified_urdf(ARM_URDF, result).unwrap();
    let reloaded = UrdfLoader::from_xml_str(&rewritten).unwrap().build_model().unwrap();
    assert_eq!(reloaded.link_names(), model.link_names());
    assert_eq!(reloaded.dof_names(), model.dof_names());
    assert!(rewritten.contains(r#"<cylinder radius="0.03" length="0.4"/>"#));
}

#[test]
fn regressor_structure_selects_outputs() {
    let model = arm();
    let measurements = measure(&model, 120);
    let structure = RegressorStructure::from_xml_str(
        r#"<regressor>
          <jointTorqueDynamics><joints><joint>elbow</joint></joints></jointTorqueDynamics>
        </regressor>"#,
    )
    .unwrap();
    let ident = Identification::new(model, config(20))
        .with_regressor_structure(&structure)
        .unwrap();
    assert_eq!(ident.output_names(), ["elbow"]);

    let stacks = ident.compute_regressors(&measurements).unwrap();
    assert_eq!(stacks.regressor.nrows(), 100);
    assert_relative_eq!(stacks.torques[0], measurements.torques[20][1], epsilon = 0.0);

    let result = ident.identify(&stacks).unwrap();
    assert_eq!(result.tau_est.shape(), (100, 1));
    assert_relative_eq!(result.tau_est, result.tau_measured, epsilon = 1e-7);
}

#[test]
fn simulation_engines_agree() {
    let model = arm();
    let measurements = targets_only(model.ndof, 150);

    let run = |mode| {
        let cfg = IdentificationConfig {
            torque_source: mode,
            ..config(30)
        };
        Identification::new(model.clone(), cfg).run(&measurements).unwrap().result
    };
    let primary = run(TorqueSourceMode::SimulatePrimary);
    let alternate = run(TorqueSourceMode::SimulateAlternate);

    // Simulated from the prior: the prior's base parameters come back.
    let expected = primary.basis.transpose() * model.parameters();
    assert_relative_eq!(primary.x_base, expected, max_relative = 1e-6, epsilon = 1e-9);
    assert_relative_eq!(alternate.x_base, primary.x_base, epsilon = 1e-8);
    assert_relative_eq!(alternate.tau_measured, primary.tau_measured, epsilon = 1e-9);
}

/// Barycentric engine that records the link offsets it is given.
struct Recording {
    inner: RigidBodyBackend,
    calls: Arc<AtomicUsize>,
    offsets: Vec<Vec3>,
}

impl BarycentricEngine for Recording {
    fn barycentric_inverse_dynamics(
        &self,
        params: &BarycentricParams,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        gravity: &Vec3,
    ) -> EngineResult<DVec> {
        assert_eq!(params.link_offsets, self.offsets);
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.barycentric_inverse_dynamics(params, q, dq, ddq, gravity)
    }
}

#[test]
fn alternate_engine_is_pluggable() {
    let model = arm();
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Recording {
        inner: RigidBodyBackend::new(model.clone()),
        calls: calls.clone(),
        offsets: model.link_offsets(),
    };
    let cfg = IdentificationConfig {
        torque_source: TorqueSourceMode::SimulateAlternate,
        ..config(10)
    };
    let ident = Identification::new(model.clone(), cfg).with_alternate_engine(Box::new(engine));
    let stacks = ident.compute_regressors(&targets_only(model.ndof, 40)).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 30);
    assert_eq!(stacks.num_samples(), 30);
}

/// Stand-in for generated code: the base regressor `Y · B` with zero
/// columns inserted at 0, 3 and 5.
struct PaddedBaseRegressor {
    model: Model,
    basis: DMat,
}

const PADDING: [usize; 3] = [0, 3, 5];

impl SymbolicRegressor for PaddedBaseRegressor {
    fn num_columns(&self) -> usize {
        self.basis.ncols() + PADDING.len()
    }

    fn regressor(
        &self,
        q: &DVec,
        dq: &DVec,
        ddq: &DVec,
        link_offsets: &[Vec3],
    ) -> EngineResult<DMat> {
        assert_eq!(link_offsets, self.model.link_offsets().as_slice());
        let y_base = joint_torque_regressor(&self.model, q, dq, ddq, &gravity())? * &self.basis;
        let mut out = DMat::zeros(y_base.nrows(), self.num_columns());
        let mut src = 0;
        for col in 0..self.num_columns() {
            if !PADDING.contains(&col) {
                out.set_column(col, &y_base.column(src));
                src += 1;
            }
        }
        Ok(out)
    }
}

#[test]
fn symbolic_regressor_matches_numeric() {
    let model = arm();
    let measurements = measure(&model, 160);
    let cfg = config(40);
    let basis = identifiable_subspace(&model, &gravity(), &cfg.subspace.options()).unwrap();
    assert_eq!(cfg.subspace.options().samples, SubspaceOptions::default().samples);

    let numeric = Identification::new(model.clone(), cfg.clone()).run(&measurements).unwrap();

    let symbolic_cfg = IdentificationConfig {
        regressor: RegressorMode::Symbolic,
        ..cfg.clone()
    };
    // Symbolic mode without an evaluator is a configuration error.
    let missing =
        Identification::new(model.clone(), symbolic_cfg.clone()).compute_regressors(&measurements);
    assert!(matches!(missing, Err(IdentError::Config(_))));

    let ident = Identification::new(model.clone(), symbolic_cfg)
        .with_symbolic_regressor(Box::new(PaddedBaseRegressor { model, basis: basis.clone() }));
    let symbolic = ident.run(&measurements).unwrap();

    assert_eq!(symbolic.stacks.regressor.ncols(), basis.ncols());
    assert_relative_eq!(symbolic.result.x_base, numeric.result.x_base, epsilon = 1e-8);
    assert_relative_eq!(symbolic.result.x_std, numeric.result.x_std, epsilon = 1e-8);
    assert_relative_eq!(symbolic.result.tau_est, numeric.result.tau_est, epsilon = 1e-8);
}

#[test]
fn leading_sample_skip_preserves_order() {
    let truth = true_pendulum();
    let measurements = measure(&truth, 100);
    let stacks = |s| {
        Identification::new(truth.clone(), config(s))
            .compute_regressors(&measurements)
            .unwrap()
    };
    let short = stacks(10);
    let long = stacks(25);
    assert_eq!(short.regressor.nrows(), 90);
    assert_eq!(long.regressor.nrows(), 75);
    assert_eq!(long.samples.first(), Some(&25));
    assert_relative_eq!(short.regressor.rows(15, 75).into_owned(), long.regressor, epsilon = 0.0);
    assert_relative_eq!(short.torques.rows(15, 75).into_owned(), long.torques, epsilon = 0.0);
}

#[test]
fn failing_samples_are_excluded() {
    let truth = true_pendulum();
    let mut measurements = measure(&truth, 200);
    measurements.positions[60][0] = f64::NAN;
    measurements.velocities[61][0] = f64::INFINITY;

    let ident = Identification::new(truth.clone(), config(50));
    let run = ident.run(&measurements).unwrap();
    assert_eq!(run.stacks.skipped, vec![60, 61]);
    assert_eq!(run.stacks.regressor.nrows(), 148);
    assert!(!run.result.samples.contains(&60));
    assert!(run.result.tau_est.iter().all(|t| t.is_finite()));
    let expected = run.result.basis.transpose() * truth.parameters();
    assert_relative_eq!(run.result.x_base, expected, max_relative = 1e-6, epsilon = 1e-9);

    let abort = IdentificationConfig {
        on_engine_failure: EngineFailurePolicy::Abort,
        ..config(50)
    };
    let err = Identification::new(truth, abort).run(&measurements);
    assert!(matches!(err, Err(IdentError::EngineComputation { sample: 60, .. })));
}

#[test]
fn every_sample_failing_is_degenerate() {
    let truth = true_pendulum();
    let mut measurements = measure(&truth, 30);
    for q in &mut measurements.positions {
        q[0] = f64::NAN;
    }
    let run = Identification::new(truth, config(5)).run(&measurements);
    assert!(matches!(run, Err(IdentError::DegenerateInput(_))));
}

#[test]
fn welded_model_has_no_basis() {
    let truth = true_pendulum();
    let stacks = Identification::new(truth.clone(), config(10))
        .compute_regressors(&measure(&truth, 40))
        .unwrap();

    let welded = ModelBuilder::new("welded", "base")
        .add_link(
            "plate",
            -1,
            Joint::fixed("weld", SpatialTransform::identity()),
            SpatialInertia::point_mass(1.0, Vec3::z()),
        )
        .build();
    assert_eq!(welded.ndof, 0);
    let result = Identification::new(welded, config(10)).identify(&stacks);
    assert!(matches!(result, Err(IdentError::BasisComputation(_))));
}

#[test]
fn symbolic_width_must_match_rank() {
    let model = true_pendulum();
    let cfg = IdentificationConfig {
        regressor: RegressorMode::Symbolic,
        ..config(10)
    };
    // Full standard block: 10 columns after the padding is dropped, rank 3.
    let evaluator = PaddedBaseRegressor {
        model: model.clone(),
        basis: DMat::identity(10, 10),
    };
    let ident =
        Identification::new(model.clone(), cfg).with_symbolic_regressor(Box::new(evaluator));
    let stacks = ident.compute_regressors(&measure(&model, 40)).unwrap();
    assert_eq!(stacks.regressor.ncols(), 10);
    assert!(matches!(ident.identify(&stacks), Err(IdentError::Shape(_))));
}

#[test]
fn json_inputs_drive_a_run() {
    let truth = true_pendulum();
    let json = serde_json::to_string(&measure(&truth, 60)).unwrap();
    let measurements = Measurements::from_json_str(&json).unwrap();
    let cfg =
        IdentificationConfig::from_json_str(r#"{ "start_offset": 10, "explain": true }"#).unwrap();

    let xml = r#"<robot name="pendulum">
      <link name="base"/>
      <link name="link">
        <inertial>
          <origin xyz="0 0 0.5"/>
          <mass value="2.0"/>
          <inertia ixx="0.1" ixy="0" ixz="0" iyy="0.1" iyz="0" izz="0.01"/>
        </inertial>
      </link>
      <joint name="hinge" type="continuous">
        <parent link="base"/><child link="link"/><axis xyz="0 1 0"/>
      </joint>
    </robot>"#;
    let run = idyn::identify_urdf(xml, &measurements, cfg).unwrap();
    assert_eq!(run.stacks.num_samples(), 50);
    assert!(run.report.is_some());
    assert_relative_eq!(run.result.x_std[3], 1.0, max_relative = 1e-6);

    let bad = IdentificationConfig::from_json_str(r#"{ "start_offset": 60 }"#).unwrap();
    assert!(matches!(
        idyn::identify_urdf(xml, &measurements, bad),
        Err(IdentError::Config(_))
    ));
}
