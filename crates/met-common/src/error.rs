//! Error types shared by the mod-maker crates.

use thiserror::Error;

/// Result type alias using MetError.
pub type MetResult<T> = Result<T, MetError>;

/// Errors raised by the shared site/time helpers.
#[derive(Debug, Error)]
pub enum MetError {
    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid time units '{0}': expected '<unit> since <epoch>'")]
    InvalidTimeUnits(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Site '{site}' has no location valid at {time}")]
    NoLocationForTime { site: String, time: String },

    #[error("Invalid site definition for '{site}': {message}")]
    InvalidSite { site: String, message: String },
}
