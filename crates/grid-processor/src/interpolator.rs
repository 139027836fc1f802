//! Interpolation of gridded fields to site locations.
//!
//! Two modes are provided:
//!
//! - [`PointSetInterpolator`]: many `(lat, lon)` targets sharing one field
//!   snapshot. Each target uses its own [`GridCellBox`] and a local bilinear
//!   blend; an invalid corner masks the result at that level.
//! - [`TrilinearInterpolator`]: one target in latitude, longitude and time on
//!   an evenly spaced grid, with explicit handling of extrapolation.
//!
//! In both modes scale and offset are applied after interpolation.

use tracing::warn;

use crate::config::GridConfig;
use crate::error::{Axis, GridError, Result};
use crate::indexer::{locate, GridCellBox};
use crate::interpolation::{bilinear_cell, lin_interp};
use crate::types::{check_regular, GridAxes, GriddedField, MaskedProfile};

/// A target location with its bracketing grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedTarget {
    pub lat: f64,
    /// Longitude in the grid's convention
    pub lon: f64,
    pub cell: GridCellBox,
}

/// Bilinear interpolation of one field snapshot to a fixed set of targets.
#[derive(Debug, Clone)]
pub struct PointSetInterpolator {
    axes: GridAxes,
    targets: Vec<LocatedTarget>,
}

impl PointSetInterpolator {
    /// Locate every `(lat, lon)` target on the grid.
    ///
    /// Targets that fall outside their cell (beyond the outermost grid rows)
    /// are kept and logged; their values come from the edge of the grid.
    pub fn new(axes: GridAxes, targets: &[(f64, f64)]) -> Self {
        let targets = targets
            .iter()
            .map(|&(lat, lon)| {
                let lon = axes.normalize_lon(lon);
                let cell = locate(&axes, lat, lon);
                if !cell.brackets(&axes, lat, lon) {
                    warn!(lat, lon, ?cell, "Target is not bracketed by its grid cell; using edge values");
                }
                LocatedTarget { lat, lon, cell }
            })
            .collect();
        Self { axes, targets }
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    pub fn targets(&self) -> &[LocatedTarget] {
        &self.targets
    }

    /// Interpolate every level of `field` at `time_index` to each target.
    ///
    /// Returns one profile per target, in target order.
    pub fn interpolate(&self, field: &GriddedField, time_index: usize) -> Result<Vec<MaskedProfile>> {
        field.ensure_matches(&self.axes)?;
        field.ensure_time(time_index)?;

        Ok(self
            .targets
            .iter()
            .map(|target| self.interpolate_target(field, time_index, target))
            .collect())
    }

    fn interpolate_target(&self, field: &GriddedField, time_index: usize, target: &LocatedTarget) -> MaskedProfile {
        let cell = target.cell;
        let lat_bounds = (self.axes.lats[cell.lat_lo], self.axes.lats[cell.lat_hi]);
        let lon_lo = self.axes.lons[cell.lon_lo];
        let mut lon_hi = self.axes.lons[cell.lon_hi];
        let mut lon = target.lon;
        if cell.wraps() {
            lon_hi += 360.0;
            if lon < lon_lo {
                lon += 360.0;
            }
        }

        let nlev = field.n_levels();
        let mut profile = MaskedProfile::masked(nlev);
        for level in 0..nlev {
            let raw = |j: usize, i: usize| {
                let v = field.data[[time_index, level, j, i]];
                if field.is_valid_raw(v) {
                    v
                } else {
                    f64::NAN
                }
            };
            let corners = [
                [raw(cell.lat_lo, cell.lon_lo), raw(cell.lat_lo, cell.lon_hi)],
                [raw(cell.lat_hi, cell.lon_lo), raw(cell.lat_hi, cell.lon_hi)],
            ];
            let value = bilinear_cell(corners, lat_bounds, (lon_lo, lon_hi), target.lat, lon);
            if value.is_finite() {
                profile.set(level, field.to_physical(value));
            }
        }
        profile
    }
}

/// Fractional position of one target on a regular (time, lat, lon) grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrilinearWeights {
    pub time_lo: usize,
    pub time_hi: usize,
    pub lat_lo: usize,
    pub lon_lo: usize,
    pub lon_hi: usize,
    pub time_frac: f64,
    pub lat_frac: f64,
    pub lon_frac: f64,
}

/// Trilinear (lat, lon, time) interpolation on an evenly spaced grid.
#[derive(Debug, Clone)]
pub struct TrilinearInterpolator {
    axes: GridAxes,
    times: Vec<f64>,
    max_extrapolation_steps: f64,
}

impl TrilinearInterpolator {
    /// Build an interpolator over `axes` and a time coordinate (any unit, but
    /// consistent with the times passed to [`Self::weights`]).
    pub fn new(axes: GridAxes, times: Vec<f64>, config: &GridConfig) -> Result<Self> {
        axes.ensure_regular()?;
        if times.is_empty() {
            return Err(GridError::invalid_axis("time", "no time steps"));
        }
        if times.len() > 1 {
            check_regular("time", &times)?;
        }
        Ok(Self {
            axes,
            times,
            max_extrapolation_steps: config.max_extrapolation_steps,
        })
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Compute bracketing indices and fractional weights for a target.
    ///
    /// Fractions outside `[0, 1]` are logged as extrapolation; fractions more
    /// than the configured number of steps outside are an error.
    pub fn weights(&self, lat: f64, lon: f64, time: f64) -> Result<TrilinearWeights> {
        let nlat = self.axes.n_lats();
        let nlon = self.axes.n_lons();

        let xx = if self.axes.is_periodic() {
            (lon - self.axes.lons[0]).rem_euclid(360.0) / self.axes.lon_step()
        } else {
            (lon - self.axes.lons[0]) / self.axes.lon_step()
        };
        let (lon_lo, lon_hi) = if self.axes.is_periodic() {
            let lo = (xx.trunc() as usize).min(nlon - 1);
            (lo, (lo + 1) % nlon)
        } else {
            let lo = (xx.trunc().max(0.0) as usize).min(nlon - 2);
            (lo, lo + 1)
        };
        let lon_frac = xx - lon_lo as f64;

        let yy = (lat - self.axes.lats[0]) / self.axes.lat_step();
        let lat_lo = (yy.trunc().max(0.0) as usize).min(nlat - 2);
        let lat_frac = yy - lat_lo as f64;

        let (time_lo, time_hi, time_frac) = if self.times.len() == 1 {
            if time != self.times[0] {
                warn!(time, available = self.times[0], "Single time step available; using it without time interpolation");
            }
            (0, 0, 0.0)
        } else {
            let nt = self.times.len();
            let tt = (time - self.times[0]) / (self.times[1] - self.times[0]);
            let lo = (tt.trunc().max(0.0) as usize).min(nt - 2);
            (lo, lo + 1, tt - lo as f64)
        };

        self.check_fraction(Axis::Time, time_frac)?;
        self.check_fraction(Axis::Longitude, lon_frac)?;
        self.check_fraction(Axis::Latitude, lat_frac)?;

        Ok(TrilinearWeights {
            time_lo,
            time_hi,
            lat_lo,
            lon_lo,
            lon_hi,
            time_frac,
            lat_frac,
            lon_frac,
        })
    }

    fn check_fraction(&self, axis: Axis, fraction: f64) -> Result<()> {
        let limit = self.max_extrapolation_steps;
        if fraction < -limit || fraction > 1.0 + limit {
            return Err(GridError::ExcessiveExtrapolation { axis, fraction, limit });
        }
        if !(0.0..=1.0).contains(&fraction) {
            warn!(%axis, fraction, "Extrapolating outside the grid");
        }
        Ok(())
    }

    /// Interpolate every level of `field` with precomputed weights.
    pub fn interpolate(&self, field: &GriddedField, w: &TrilinearWeights) -> Result<MaskedProfile> {
        field.ensure_matches(&self.axes)?;
        if field.n_times() != self.times.len() {
            return Err(GridError::unexpected_dimensions(
                &field.name,
                format!("{} time steps", self.times.len()),
                field.data.shape(),
            ));
        }

        let nlev = field.n_levels();
        let mut profile = MaskedProfile::masked(nlev);
        for level in 0..nlev {
            let mut corners = [0.0_f64; 8];
            let mut all_valid = true;
            for (n, corner) in corners.iter_mut().enumerate() {
                let t = if n & 4 == 0 { w.time_lo } else { w.time_hi };
                let j = if n & 2 == 0 { w.lat_lo } else { w.lat_lo + 1 };
                let i = if n & 1 == 0 { w.lon_lo } else { w.lon_hi };
                let v = field.data[[t, level, j, i]];
                all_valid &= field.is_valid_raw(v);
                *corner = v;
            }
            if !all_valid {
                continue;
            }

            let blend = |base: usize| {
                let south = lin_interp(corners[base], corners[base + 1], w.lon_frac);
                let north = lin_interp(corners[base + 2], corners[base + 3], w.lon_frac);
                lin_interp(south, north, w.lat_frac)
            };
            let value = lin_interp(blend(0), blend(4), w.time_frac);
            profile.set(level, field.to_physical(value));
        }
        Ok(profile)
    }

    /// Weights and interpolation in one call.
    pub fn interpolate_at(&self, field: &GriddedField, lat: f64, lon: f64, time: f64) -> Result<MaskedProfile> {
        let w = self.weights(lat, lon, time)?;
        self.interpolate(field, &w)
    }
}
