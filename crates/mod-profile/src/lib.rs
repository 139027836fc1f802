//! Per-site profile records and their GGG `.mod` text form.
//!
//! Interpolated fields for one site and time flow through:
//!
//! ```text
//! ProfileFields ──► ProfileAssembler::profile ──► SiteProfile
//!                                                     │
//!                              extrapolate_to_surface ┤  (fixed pressure levels)
//!                                                     ▼
//! SurfaceFields ──► ProfileAssembler::surface ──► ProfileAssembler::finalize
//!                                                     │  humidity bounds, MMW, PT, EqL
//!                                                     ▼
//!                                               ProfileRecord ──► ProfileSerializer
//! ```

pub mod assembler;
pub mod error;
pub mod extrapolate;
pub mod format;
pub mod naming;
pub mod record;
pub mod serializer;

pub use assembler::{HumidityBounds, ProfileAssembler};
pub use error::{ProfileError, Result};
pub use extrapolate::{extrapolate_to_surface, fixed_level_companions, Companion, FIXED_LEVEL_COMPANIONS};
pub use format::NumberFormat;
pub use naming::{local_solar_time, mod_file_name, OutputLayout};
pub use record::{
    ProfileFields, ProfileRecord, ProfileVariable, SiteProfile, SurfaceFields, SurfaceRecord, SurfaceVariable,
};
pub use serializer::{column_order, render, ModColumn, ModConstants, ProfileSerializer, ProfileSummary, VERSION};
