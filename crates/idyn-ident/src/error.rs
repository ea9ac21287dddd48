//! Error types for idyn-ident.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentError {
    /// A parameter vector whose length is not a whole number of link blocks.
    #[error("dimension error: {0}")]
    Dimension(String),

    /// Matrices or stacks whose shapes do not line up.
    #[error("shape error: {0}")]
    Shape(String),

    /// Zero constraint direction, singular system, or no usable sample.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("engine computation failed at sample {sample}: {reason}")]
    EngineComputation { sample: usize, reason: String },

    #[error("identifiable subspace computation failed: {0}")]
    BasisComputation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URDF error: {0}")]
    Urdf(#[from] idyn_urdf::UrdfError),
}

pub type Result<T> = std::result::Result<T, IdentError>;
