//! Recorded trajectories.

use crate::{IdentError, Result};
use idyn_math::DVec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Measurement archive: one row per time sample, one column per DOF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub positions: Vec<Vec<f64>>,
    pub velocities: Vec<Vec<f64>>,
    pub accelerations: Vec<Vec<f64>>,
    /// Recorded joint torques. Only measured-torque runs read them.
    #[serde(default)]
    pub torques: Vec<Vec<f64>>,
    pub times: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_positions: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_velocities: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_accelerations: Option<Vec<Vec<f64>>>,
}

/// One system state as consumed by the regressor builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub q: DVec,
    pub dq: DVec,
    pub ddq: DVec,
    pub tau: DVec,
}

impl Measurements {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn num_samples(&self) -> usize {
        self.positions.len()
    }

    /// Check that every array has one row per sample and `num_dof` columns.
    ///
    /// `torques` is checked only with `needs_torques`; simulated runs may
    /// leave it empty.
    pub fn validate(&self, num_dof: usize, needs_torques: bool) -> Result<()> {
        let n = self.num_samples();
        if self.times.len() != n {
            return Err(IdentError::Shape(format!(
                "times has {} entries, positions has {n}",
                self.times.len()
            )));
        }
        let mut arrays = vec![
            ("positions", &self.positions),
            ("velocities", &self.velocities),
            ("accelerations", &self.accelerations),
        ];
        if needs_torques {
            arrays.push(("torques", &self.torques));
        }
        for (what, target) in [
            ("target_positions", &self.target_positions),
            ("target_velocities", &self.target_velocities),
            ("target_accelerations", &self.target_accelerations),
        ] {
            if let Some(rows) = target {
                arrays.push((what, rows));
            }
        }

        for (what, rows) in arrays {
            if rows.len() != n {
                return Err(IdentError::Shape(format!(
                    "{what} has {} rows, expected {n}",
                    rows.len()
                )));
            }
            if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != num_dof) {
                return Err(IdentError::Shape(format!(
                    "{what} row {row} has {} columns, expected {num_dof}",
                    r.len()
                )));
            }
        }
        Ok(())
    }

    /// Sample `row`.
    ///
    /// With `use_targets` the kinematics come from the target arrays where
    /// present and the sample carries no recorded torque (`tau` is empty).
    pub fn sample(&self, row: usize, use_targets: bool) -> Result<Sample> {
        let pick = |what: &str, measured: &[Vec<f64>], target: &Option<Vec<Vec<f64>>>| {
            let rows = match target {
                Some(t) if use_targets => t.as_slice(),
                _ => measured,
            };
            rows.get(row)
                .map(|r| DVec::from_column_slice(r))
                .ok_or_else(|| IdentError::Shape(format!("{what} has no row {row}")))
        };
        let tau = if use_targets {
            DVec::zeros(0)
        } else {
            pick("torques", &self.torques, &None)?
        };
        Ok(Sample {
            q: pick("positions", &self.positions, &self.target_positions)?,
            dq: pick("velocities", &self.velocities, &self.target_velocities)?,
            ddq: pick("accelerations", &self.accelerations, &self.target_accelerations)?,
            tau,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_samples() -> Measurements {
        Measurements {
            positions: vec![vec![0.0, 1.0], vec![0.1, 1.1]],
            velocities: vec![vec![0.0; 2]; 2],
            accelerations: vec![vec![0.0; 2]; 2],
            torques: vec![vec![5.0, 6.0], vec![7.0, 8.0]],
            times: vec![0.0, 0.01],
            ..Default::default()
        }
    }

    #[test]
    fn sample_reads_rows() {
        let m = two_samples();
        m.validate(2, true).unwrap();
        let s = m.sample(1, false).unwrap();
        assert_eq!(s.q.as_slice(), &[0.1, 1.1]);
        assert_eq!(s.tau.as_slice(), &[7.0, 8.0]);
        assert!(m.sample(2, false).is_err());
    }

    #[test]
    fn targets_replace_measured_kinematics() {
        let mut m = two_samples();
        m.target_positions = Some(vec![vec![9.0, 9.0], vec![8.0, 8.0]]);
        let s = m.sample(0, true).unwrap();
        assert_eq!(s.q.as_slice(), &[9.0, 9.0]);
        // No target velocities: fall back to the measured ones.
        assert_eq!(s.dq.as_slice(), &[0.0, 0.0]);
        assert_eq!(m.sample(0, false).unwrap().q.as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn validate_catches_ragged_arrays() {
        let mut m = two_samples();
        m.torques[1].pop();
        assert!(matches!(m.validate(2, true), Err(IdentError::Shape(_))));

        let mut m = two_samples();
        m.times.push(0.02);
        assert!(m.validate(2, true).is_err());

        let mut m = two_samples();
        m.target_accelerations = Some(vec![vec![0.0, 0.0]]);
        assert!(m.validate(2, true).is_err());
        assert!(two_samples().validate(3, true).is_err());
    }

    #[test]
    fn simulated_runs_need_no_torques() {
        let json = r#"{
            "positions": [[0.0], [0.1]],
            "velocities": [[1.0], [1.0]],
            "accelerations": [[0.0], [0.0]],
            "times": [0.0, 0.1]
        }"#;
        let m = Measurements::from_json_str(json).unwrap();
        assert!(m.torques.is_empty());
        m.validate(1, false).unwrap();
        assert!(matches!(m.validate(1, true), Err(IdentError::Shape(_))));

        let s = m.sample(1, true).unwrap();
        assert_eq!(s.q.as_slice(), &[0.1]);
        assert!(s.tau.is_empty());
        assert!(m.sample(1, false).is_err());
    }

    #[test]
    fn json_roundtrip_keeps_optional_targets_out() {
        let json = serde_json::to_string(&two_samples()).unwrap();
        assert!(!json.contains("target_positions"));
        assert_eq!(Measurements::from_json_str(&json).unwrap(), two_samples());
    }
}
