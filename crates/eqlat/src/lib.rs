//! Equivalent latitude diagnostics.
//!
//! Given potential vorticity and temperature on a global grid, the
//! [`EquivalentLatitudeEngine`] builds an [`EqLatInterpolator`] that maps
//! (PV in PVU, potential temperature in K) to the latitude of the polar cap
//! whose area equals the area enclosed by that PV contour. Building one is
//! expensive, so [`EquivalentLatitudeMap`] computes them once per timestamp,
//! in parallel, and the pipeline reuses them for every site.
//!
//! ```text
//! T, p ──► PT ─┐
//!              ├─► PV on PT levels ─► area sweep ─► EL(PV) per level ─► (PV, PT) table
//! EPV ─────────┘
//! ```

pub mod area;
pub mod engine;
pub mod error;
pub mod grids;
pub mod interpolator;
pub mod map;

pub use area::{cell_areas, snap_equator};
pub use engine::{backfill_columns, cap_latitude, EqLatInput, EquivalentLatitudeEngine, LevelPressure, PVU_PER_SI};
pub use error::{EqLatError, Result};
pub use interpolator::EqLatInterpolator;
pub use map::EquivalentLatitudeMap;
