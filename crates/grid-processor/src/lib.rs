//! Grid indexing and interpolation for gridded meteorological fields.
//!
//! Fields are held as [`GriddedField`]s indexed `(time, level, lat, lon)`.
//! This crate locates the grid cell bracketing a site and interpolates
//! fields to it, either bilinearly for many sites sharing one snapshot or
//! trilinearly in space and time for a single site.
//!
//! # Architecture
//!
//! ```text
//! GridAxes + (lat, lon)
//!      │
//!      ▼
//! locate() ──► GridCellBox
//!      │
//!      ├─► PointSetInterpolator   (one snapshot, many sites)
//!      │
//!      └─► TrilinearInterpolator  (regular lat/lon/time grid, one site)
//!               │
//!               ▼
//!          MaskedProfile per site (values + validity)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{GridAxes, PointSetInterpolator};
//!
//! let axes = GridAxes::new(lats, lons)?;
//! let interp = PointSetInterpolator::new(axes, &[(36.604, -97.486)]);
//! let profiles = interp.interpolate(&temperature, 0)?;
//! ```

pub mod config;
pub mod error;
pub mod indexer;
pub mod interpolation;
pub mod interpolator;
pub mod types;

// Re-export commonly used types at crate root
pub use config::GridConfig;
pub use error::{Axis, GridError, Result};
pub use indexer::{locate, nearest_index, GridCellBox};
pub use interpolation::{bilinear_cell, interp_clamped, interp_or_nan, lin_interp, linear_through};
pub use interpolator::{LocatedTarget, PointSetInterpolator, TrilinearInterpolator, TrilinearWeights};
pub use types::{check_increasing, check_regular, GridAxes, GriddedField, MaskedProfile, FILL_THRESHOLD};
