//! NetCDF input for the mod-maker pipeline.
//!
//! Reads GEOS FP/FP-IT and MERRA-2 files (profile, surface and chemistry
//! collections) into [`grid_processor::GriddedField`]s. Each file is opened
//! through a [`DatasetReader`] that owns the handle for as long as the caller
//! needs it; nothing is cached between reads.
//!
//! ```ignore
//! use netcdf_parser::DatasetReader;
//!
//! let reader = DatasetReader::open("GEOS.fpit.asm.inst3_3d_asm_Np.GEOS5124.20180101_0000.V01.nc4")?;
//! let axes = reader.axes()?;
//! let temperature = reader.read_profile_field("T")?;
//! ```

pub mod error;
pub mod files;
pub mod native;
pub mod reader;

pub use error::{NetCdfError, NetCdfResult};
pub use files::{datetime_from_geos_filename, ensure_matching_dates, GeosFile, GeosFileList};
pub use native::{
    is_native_level_count, pressure_field_from_delp, pressure_field_from_delp_surface_first,
    pressure_from_delp, silence_hdf5_errors, NATIVE_LEVEL_COUNT,
};
pub use reader::DatasetReader;
