//! Common types and utilities shared across the mod-maker crates.
//!
//! - [`site`]: site locations, time-varying relocations and the registry trait
//! - [`time`]: CF-style time axes and date-range helpers
//! - [`physics`]: moist-air thermodynamics used when building profiles
//! - [`error`]: the shared error type

pub mod error;
pub mod physics;
pub mod site;
pub mod time;

pub use error::{MetError, MetResult};
pub use site::{lon_180_to_360, lon_360_to_180, ResolvedSite, SiteLocation, SiteRegistry, StaticSiteRegistry, TimeSpan};
pub use time::{parse_date_arg, TimeRange, TimeUnit, TimeUnits};
