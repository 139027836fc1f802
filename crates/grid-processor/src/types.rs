//! Core types for grid processing.

use ndarray::{s, Array4, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Magnitude at and above which a raw value is treated as a fill value.
/// GEOS and MERRA files use 1e15.
pub const FILL_THRESHOLD: f64 = 1.0e14;

/// Tolerance used when checking that an axis is evenly spaced.
const SPACING_TOLERANCE: f64 = 1.0e-6;

/// Latitude/longitude coordinates of a rectilinear grid.
///
/// Latitudes increase monotonically. Longitudes increase monotonically and
/// may use either the [-180, 180) or the [0, 360) convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl GridAxes {
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        check_increasing("latitude", &lats)?;
        check_increasing("longitude", &lons)?;
        Ok(Self { lats, lons })
    }

    pub fn n_lats(&self) -> usize {
        self.lats.len()
    }

    pub fn n_lons(&self) -> usize {
        self.lons.len()
    }

    pub fn lat_step(&self) -> f64 {
        self.lats[1] - self.lats[0]
    }

    pub fn lon_step(&self) -> f64 {
        self.lons[1] - self.lons[0]
    }

    /// Whether the longitudes cover the full circle, so the last column
    /// neighbors the first.
    pub fn is_periodic(&self) -> bool {
        let span = self.lons[self.lons.len() - 1] - self.lons[0] + self.lon_step();
        (span - 360.0).abs() < 1.0e-3
    }

    /// Check that both axes are evenly spaced, as the spatiotemporal mode requires.
    pub fn ensure_regular(&self) -> Result<()> {
        check_regular("latitude", &self.lats)?;
        check_regular("longitude", &self.lons)
    }

    /// Shift a longitude into the grid's convention when the grid is periodic.
    pub fn normalize_lon(&self, lon: f64) -> f64 {
        if self.is_periodic() {
            self.lons[0] + (lon - self.lons[0]).rem_euclid(360.0)
        } else {
            lon
        }
    }
}

/// Check that `values` has at least two points and strictly increases.
pub fn check_increasing(axis: &str, values: &[f64]) -> Result<()> {
    if values.len() < 2 {
        return Err(GridError::invalid_axis(axis, format!("need at least 2 points, got {}", values.len())));
    }
    if !values.windows(2).all(|w| w[1] > w[0]) {
        return Err(GridError::invalid_axis(axis, "values must be strictly increasing"));
    }
    Ok(())
}

/// Check that `values` is evenly spaced.
pub fn check_regular(axis: &str, values: &[f64]) -> Result<()> {
    check_increasing(axis, values)?;
    let step = values[1] - values[0];
    let tolerance = SPACING_TOLERANCE * step.abs().max(1.0);
    if values.windows(2).any(|w| ((w[1] - w[0]) - step).abs() > tolerance) {
        return Err(GridError::invalid_axis(axis, "values must be evenly spaced"));
    }
    Ok(())
}

/// A gridded variable indexed `(time, level, lat, lon)`.
///
/// Surface fields have a single level. Values are stored raw; the scale
/// factor and offset are applied after interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    pub name: String,
    pub units: String,
    pub data: Array4<f64>,
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: Option<f64>,
}

impl GriddedField {
    /// A field with unit scale, zero offset and no declared fill value.
    pub fn new(name: impl Into<String>, data: Array4<f64>) -> Self {
        Self {
            name: name.into(),
            units: String::new(),
            data,
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_scale_offset(mut self, scale_factor: f64, add_offset: f64) -> Self {
        self.scale_factor = scale_factor;
        self.add_offset = add_offset;
        self
    }

    pub fn with_fill_value(mut self, fill_value: Option<f64>) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_levels(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_lats(&self) -> usize {
        self.data.dim().2
    }

    pub fn n_lons(&self) -> usize {
        self.data.dim().3
    }

    /// Whether a raw value is real data rather than a fill marker.
    pub fn is_valid_raw(&self, raw: f64) -> bool {
        if !raw.is_finite() || raw.abs() >= FILL_THRESHOLD {
            return false;
        }
        match self.fill_value {
            Some(fill) => raw != fill,
            None => true,
        }
    }

    /// Apply scale and offset to a raw (or interpolated raw) value.
    pub fn to_physical(&self, raw: f64) -> f64 {
        raw * self.scale_factor + self.add_offset
    }

    /// Check that the horizontal shape matches a grid.
    pub fn ensure_matches(&self, axes: &GridAxes) -> Result<()> {
        if self.n_lats() != axes.n_lats() || self.n_lons() != axes.n_lons() {
            return Err(GridError::unexpected_dimensions(
                &self.name,
                format!("(time, level, {}, {})", axes.n_lats(), axes.n_lons()),
                self.data.shape(),
            ));
        }
        Ok(())
    }

    /// Check that a time index exists.
    pub fn ensure_time(&self, index: usize) -> Result<()> {
        if index >= self.n_times() {
            return Err(GridError::TimeIndexOutOfRange {
                name: self.name.clone(),
                index,
                n_times: self.n_times(),
            });
        }
        Ok(())
    }

    /// Reverse the level axis in place.
    pub fn flip_levels(&mut self) {
        self.data.invert_axis(ndarray::Axis(1));
    }

    /// Raw values of one column.
    pub fn column(&self, time: usize, lat: usize, lon: usize) -> ArrayView1<'_, f64> {
        self.data.slice(s![time, .., lat, lon])
    }

    /// Physical values with fills replaced by NaN.
    pub fn physical_values(&self) -> Array4<f64> {
        self.data
            .mapv(|raw| if self.is_valid_raw(raw) { self.to_physical(raw) } else { f64::NAN })
    }
}

/// A vertical profile with an explicit per-level validity flag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskedProfile {
    pub values: Vec<f64>,
    pub valid: Vec<bool>,
}

impl MaskedProfile {
    pub fn new(values: Vec<f64>, valid: Vec<bool>) -> Self {
        debug_assert_eq!(values.len(), valid.len());
        Self { values, valid }
    }

    /// All levels valid.
    pub fn filled(values: Vec<f64>) -> Self {
        let valid = vec![true; values.len()];
        Self { values, valid }
    }

    /// Valid wherever the value is finite.
    pub fn from_finite(values: Vec<f64>) -> Self {
        let valid = values.iter().map(|v| v.is_finite()).collect();
        Self { values, valid }
    }

    /// A profile with every level masked.
    pub fn masked(len: usize) -> Self {
        Self {
            values: vec![f64::NAN; len],
            valid: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a level, if valid.
    pub fn get(&self, level: usize) -> Option<f64> {
        match self.valid.get(level) {
            Some(true) => Some(self.values[level]),
            _ => None,
        }
    }

    /// Set a level and mark it valid.
    pub fn set(&mut self, level: usize, value: f64) {
        self.values[level] = value;
        self.valid[level] = true;
    }

    pub fn mask(&mut self, level: usize) {
        self.valid[level] = false;
    }

    pub fn all_valid(&self) -> bool {
        self.valid.iter().all(|&v| v)
    }

    pub fn any_masked(&self) -> bool {
        !self.all_valid()
    }

    /// Index of the first valid level.
    pub fn first_valid(&self) -> Option<usize> {
        self.valid.iter().position(|&v| v)
    }

    /// Mask every level where `mask` is true.
    pub fn mask_where(&mut self, mask: &[bool]) {
        for (valid, &masked) in self.valid.iter_mut().zip(mask) {
            if masked {
                *valid = false;
            }
        }
    }

    /// Apply a function to every valid value.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let values = self
            .values
            .iter()
            .zip(&self.valid)
            .map(|(&v, &ok)| if ok { f(v) } else { v })
            .collect();
        Self {
            values,
            valid: self.valid.clone(),
        }
    }

    /// Whether two profiles are masked at exactly the same levels.
    pub fn same_mask(&self, other: &MaskedProfile) -> bool {
        self.valid == other.valid
    }

    /// Values with masked levels replaced by NaN.
    pub fn to_nan_filled(&self) -> Vec<f64> {
        self.values
            .iter()
            .zip(&self.valid)
            .map(|(&v, &ok)| if ok { v } else { f64::NAN })
            .collect()
    }
}
