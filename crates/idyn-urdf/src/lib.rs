//! URDF robot descriptions for idyn.
//!
//! Loads `<robot>` documents into a fixed-base [`idyn_model::Model`], parses
//! regressor structure descriptions, and writes identified inertial
//! parameters back into a URDF document.

mod parser;
mod regressor;
mod rewrite;

pub use parser::UrdfLoader;
pub use regressor::{RegressorStructure, TorqueOutputs};
pub use rewrite::rewrite_inertials;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UrdfError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid URDF: {0}")]
    InvalidUrdf(String),

    #[error("Invalid regressor description: {0}")]
    InvalidRegressor(String),

    #[error("XML write error: {0}")]
    WriteError(String),
}

pub type Result<T> = std::result::Result<T, UrdfError>;

/// Parse a whitespace separated triple such as `"0 0.1 -0.2"`.
pub(crate) fn parse_vec3(what: &str, value: &str) -> Result<idyn_math::Vec3> {
    let parts = value
        .split_whitespace()
        .map(|s| parse_f64(what, s))
        .collect::<Result<Vec<f64>>>()?;
    if parts.len() != 3 {
        return Err(UrdfError::InvalidUrdf(format!(
            "{what}: expected 3 numbers, got \"{value}\""
        )));
    }
    Ok(idyn_math::Vec3::new(parts[0], parts[1], parts[2]))
}

pub(crate) fn parse_f64(what: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| UrdfError::InvalidUrdf(format!("{what}: malformed number \"{value}\"")))
}
