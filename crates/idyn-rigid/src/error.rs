//! Error types for idyn-rigid.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DynamicsError {
    #[error("{what} has length {got}, expected {expected}")]
    Dimension {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("identifiable subspace: {0}")]
    Subspace(String),
}

pub type Result<T> = std::result::Result<T, DynamicsError>;
