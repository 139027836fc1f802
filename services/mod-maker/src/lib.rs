//! Library side of the `mod-maker` binary.
//!
//! [`ModMaker`] ties the workspace crates together: it discovers GEOS
//! files for a date range, builds the equivalent latitude functions for
//! every timestamp, interpolates the fields to each site and writes the
//! `.mod` files.

pub mod config;
pub mod fields;
pub mod pipeline;
pub mod slant;

pub use config::{load_config, parse_config, ModMakerConfig, SourceLayout};
pub use pipeline::{ModMaker, RunSummary, SiteSummary};
pub use slant::{solar_zenith_angle, SlantPath, SlantPathSolver, VerticalPath};
