//! Error types for NetCDF input operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF input.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the NetCDF library
    #[error("NetCDF error in {path}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    /// Missing required variable or attribute
    #[error("Missing required data in {path}: {what}")]
    MissingData { path: PathBuf, what: String },

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// A variable does not have the `(time, [lev,] lat, lon)` layout
    #[error("Variable {variable} has unexpected dimensions {dims:?}; expected (time, lat, lon) or (time, lev, lat, lon)")]
    UnexpectedDimensions { variable: String, dims: Vec<String> },

    /// No input files for the requested date range
    #[error("No {kind} files found in {dir} between {start} and {end}")]
    InputUnavailable {
        kind: String,
        dir: PathBuf,
        start: String,
        end: String,
    },

    /// Companion file lists do not cover the same times
    #[error("Dates of {left} files do not match dates of {right} files")]
    DateMismatch { left: String, right: String },

    /// A native-level file where fixed pressure levels were expected, or vice versa
    #[error("{path} is {actual} but {expected} was expected")]
    LevelTypeMismatch {
        path: PathBuf,
        actual: &'static str,
        expected: &'static str,
    },

    /// Bad time metadata
    #[error(transparent)]
    Time(#[from] met_common::MetError),

    /// Bad coordinate axes
    #[error(transparent)]
    Grid(#[from] grid_processor::GridError),
}

impl NetCdfError {
    pub(crate) fn missing(path: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        Self::MissingData {
            path: path.into(),
            what: what.into(),
        }
    }
}
