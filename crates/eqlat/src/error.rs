//! Error types for the equivalent latitude engine.

use thiserror::Error;

/// Result type alias using EqLatError.
pub type Result<T> = std::result::Result<T, EqLatError>;

#[derive(Debug, Error)]
pub enum EqLatError {
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("No valid potential temperature/vorticity data: {0}")]
    NoValidData(String),

    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Grid(#[from] grid_processor::GridError),
}
