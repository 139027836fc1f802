//! Scoped reading of GEOS/MERRA NetCDF files into gridded fields.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use grid_processor::{GridAxes, GriddedField};
use met_common::TimeUnits;
use ndarray::Array4;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{
    get_f64_attr, get_global_f64, get_string_attr, is_native_level_count,
    pressure_field_from_delp_surface_first, silence_hdf5_errors,
};

/// An open input file.
///
/// The underlying handle is released when the reader is dropped, so callers
/// open one reader per file and let it go out of scope after the fields
/// they need have been read.
pub struct DatasetReader {
    path: PathBuf,
    file: netcdf::File,
}

impl std::fmt::Debug for DatasetReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetReader").field("path", &self.path).finish()
    }
}

impl DatasetReader {
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path).map_err(|source| NetCdfError::Library {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Opened dataset");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn library_error(&self, source: netcdf::Error) -> NetCdfError {
        NetCdfError::Library {
            path: self.path.clone(),
            source,
        }
    }

    fn variable(&self, name: &str) -> NetCdfResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| NetCdfError::missing(&self.path, format!("variable '{}'", name)))
    }

    fn read_1d(&self, name: &str) -> NetCdfResult<Vec<f64>> {
        self.variable(name)?
            .get_values::<f64, _>(..)
            .map_err(|e| self.library_error(e))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    /// Latitude/longitude axes of the file.
    pub fn axes(&self) -> NetCdfResult<GridAxes> {
        let lats = self.read_1d("lat")?;
        let lons = self.read_1d("lon")?;
        Ok(GridAxes::new(lats, lons)?)
    }

    /// Length of the `lev` dimension, 1 for files without one.
    pub fn n_levels(&self) -> usize {
        self.file.dimension("lev").map(|d| d.len()).unwrap_or(1)
    }

    /// The `lev` coordinate in file order, if present.
    pub fn levels(&self) -> NetCdfResult<Option<Vec<f64>>> {
        if !self.has_variable("lev") {
            return Ok(None);
        }
        self.read_1d("lev").map(Some)
    }

    /// Whether the file is on native model levels.
    pub fn is_native(&self) -> bool {
        is_native_level_count(self.n_levels())
    }

    /// Fail unless the level type matches what the caller expects.
    pub fn ensure_level_type(&self, native: bool) -> NetCdfResult<()> {
        let describe = |native: bool| if native { "native-level" } else { "fixed pressure level" };
        if self.is_native() != native {
            return Err(NetCdfError::LevelTypeMismatch {
                path: self.path.clone(),
                actual: describe(self.is_native()),
                expected: describe(native),
            });
        }
        Ok(())
    }

    pub fn time_units(&self) -> NetCdfResult<TimeUnits> {
        let var = self.variable("time")?;
        let units = get_string_attr(&var, "units")
            .ok_or_else(|| NetCdfError::missing(&self.path, "time units"))?;
        Ok(TimeUnits::parse(&units)?)
    }

    /// Decoded timestamps of the `time` coordinate.
    pub fn times(&self) -> NetCdfResult<Vec<DateTime<Utc>>> {
        let units = self.time_units()?;
        Ok(self.read_1d("time")?.into_iter().map(|v| units.decode(v)).collect())
    }

    /// The `time` coordinate as hours since its epoch, plus the parsed units.
    pub fn time_hours(&self) -> NetCdfResult<(Vec<f64>, TimeUnits)> {
        let units = self.time_units()?;
        let hours = self.read_1d("time")?.into_iter().map(|v| units.to_hours(v)).collect();
        Ok((hours, units))
    }

    /// `(LatitudeResolution, LongitudeResolution)` in degrees.
    pub fn resolution(&self) -> NetCdfResult<(f64, f64)> {
        let get = |name: &str| {
            get_global_f64(&self.file, name).ok_or_else(|| NetCdfError::missing(&self.path, name))
        };
        Ok((get("LatitudeResolution")?, get("LongitudeResolution")?))
    }

    /// Read a variable in file order.
    ///
    /// Accepts `(time, lat, lon)` and `(time, lev, lat, lon)` variables; the
    /// first gets a single level. Values stay raw, with the scale factor,
    /// offset and fill value recorded on the field.
    pub fn read_field(&self, name: &str) -> NetCdfResult<GriddedField> {
        let var = self.variable(name)?;
        let dims: Vec<(String, usize)> = var.dimensions().iter().map(|d| (d.name(), d.len())).collect();

        let shape = match dims.as_slice() {
            [(_, t), (_, y), (_, x)] => (*t, 1, *y, *x),
            [(_, t), (_, z), (_, y), (_, x)] => (*t, *z, *y, *x),
            _ => {
                return Err(NetCdfError::UnexpectedDimensions {
                    variable: name.to_string(),
                    dims: dims.into_iter().map(|(n, _)| n).collect(),
                })
            }
        };

        let values = var.get_values::<f64, _>(..).map_err(|e| self.library_error(e))?;
        let data = Array4::from_shape_vec(shape, values)
            .map_err(|e| NetCdfError::InvalidFormat(format!("{}: {}", name, e)))?;

        let scale_factor = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
        let fill_value = get_f64_attr(&var, "_FillValue").or_else(|| get_f64_attr(&var, "missing_value"));
        let units = get_string_attr(&var, "units").unwrap_or_default();

        debug!(
            variable = name,
            shape = ?shape,
            scale_factor,
            add_offset,
            "Read variable"
        );

        Ok(GriddedField::new(name, data)
            .with_units(units)
            .with_scale_offset(scale_factor, add_offset)
            .with_fill_value(fill_value))
    }

    /// Read a variable with its levels ordered surface to space.
    ///
    /// Native files store levels space to surface and are flipped here;
    /// fixed pressure level files already run from the surface up.
    pub fn read_profile_field(&self, name: &str) -> NetCdfResult<GriddedField> {
        let mut field = self.read_field(name)?;
        if self.is_native() && field.n_levels() > 1 {
            field.flip_levels();
        }
        Ok(field)
    }

    /// Mid-layer pressure (hPa) of a native file, surface to space.
    pub fn read_native_pressure(&self) -> NetCdfResult<GriddedField> {
        let delp = self.read_profile_field("DELP")?;
        Ok(pressure_field_from_delp_surface_first(&delp))
    }
}
