//! Error types for grid indexing and interpolation.

use thiserror::Error;

/// Interpolation axis, used in extrapolation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Time,
    Latitude,
    Longitude,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Time => write!(f, "time"),
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// Errors that can occur during grid processing.
#[derive(Error, Debug)]
pub enum GridError {
    /// A coordinate axis is too short, not monotonic, or not evenly spaced.
    #[error("invalid {axis} axis: {message}")]
    InvalidAxis { axis: String, message: String },

    /// Array dimensions do not match what the operation requires.
    #[error("unexpected dimensions for {name}: expected {expected}, got {actual:?}")]
    UnexpectedDimensions {
        name: String,
        expected: String,
        actual: Vec<usize>,
    },

    /// The target lies further outside the grid than the configured margin.
    #[error("excessive {axis} extrapolation: fractional step {fraction:.3} beyond the allowed margin of {limit} step(s)")]
    ExcessiveExtrapolation { axis: Axis, fraction: f64, limit: f64 },

    /// A requested time index is not present in the field.
    #[error("time index {index} out of range for field {name} with {n_times} time(s)")]
    TimeIndexOutOfRange {
        name: String,
        index: usize,
        n_times: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl GridError {
    /// Create an InvalidAxis error.
    pub fn invalid_axis(axis: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAxis {
            axis: axis.into(),
            message: message.into(),
        }
    }

    /// Create an UnexpectedDimensions error.
    pub fn unexpected_dimensions(name: impl Into<String>, expected: impl Into<String>, actual: &[usize]) -> Self {
        Self::UnexpectedDimensions {
            name: name.into(),
            expected: expected.into(),
            actual: actual.to_vec(),
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridError>;
