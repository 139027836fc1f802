//! Error types for profile assembly and output.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ProfileError.
pub type Result<T> = std::result::Result<T, ProfileError>;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("All variables to patch must share one mask; {variable} differs from {reference}")]
    InconsistentMask {
        variable: &'static str,
        reference: &'static str,
    },

    #[error("Pressure levels have masked elements; they must all be valid")]
    MaskedPressure,

    #[error("Profile has no valid level to extrapolate from")]
    NoValidLevel,

    #[error("No valid level above the surface pressure {surface_pressure} hPa")]
    NoLevelAboveSurface { surface_pressure: f64 },

    #[error("Profile variable {variable} has {actual} levels, expected {expected}")]
    LevelCountMismatch {
        variable: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
