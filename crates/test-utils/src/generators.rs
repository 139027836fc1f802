//! Test data generators for creating synthetic meteorological fields.
//!
//! Fields generated here are exact linear functions of their coordinates, so
//! any multilinear interpolation of them inside a grid cell must reproduce
//! the analytic value to floating-point precision.

use ndarray::Array4;

/// A field that is linear in time, level, latitude and longitude.
///
/// # Example
///
/// ```
/// use test_utils::LinearField;
///
/// let field = LinearField { base: 1.0, per_time: 0.0, per_level: 0.0, per_lat: 2.0, per_lon: 0.5 };
/// assert_eq!(field.value(0.0, 0.0, 10.0, 4.0), 23.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearField {
    pub base: f64,
    pub per_time: f64,
    pub per_level: f64,
    pub per_lat: f64,
    pub per_lon: f64,
}

impl LinearField {
    /// A field with the same slope on every axis.
    pub fn uniform(base: f64, slope: f64) -> Self {
        Self {
            base,
            per_time: slope,
            per_level: slope,
            per_lat: slope,
            per_lon: slope,
        }
    }

    /// Analytic value at a coordinate.
    pub fn value(&self, time: f64, level: f64, lat: f64, lon: f64) -> f64 {
        self.base + self.per_time * time + self.per_level * level + self.per_lat * lat + self.per_lon * lon
    }

    /// Sample on a `(time, level, lat, lon)` grid.
    pub fn sample(&self, times: &[f64], levels: &[f64], lats: &[f64], lons: &[f64]) -> Array4<f64> {
        Array4::from_shape_fn((times.len(), levels.len(), lats.len(), lons.len()), |(t, k, j, i)| {
            self.value(times[t], levels[k], lats[j], lons[i])
        })
    }

    /// Sample a surface field: a single level at coordinate 0.
    pub fn sample_surface(&self, times: &[f64], lats: &[f64], lons: &[f64]) -> Array4<f64> {
        self.sample(times, &[0.0], lats, lons)
    }
}

/// `n` evenly spaced values starting at `start`.
///
/// ```
/// use test_utils::regular_axis;
///
/// assert_eq!(regular_axis(-90.0, 45.0, 5), vec![-90.0, -45.0, 0.0, 45.0, 90.0]);
/// ```
pub fn regular_axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Global latitude axis from -90 to 90 inclusive.
pub fn global_lat_axis(step: f64) -> Vec<f64> {
    let n = (180.0 / step).round() as usize + 1;
    regular_axis(-90.0, step, n)
}

/// Global GEOS-style longitude axis from -180 (inclusive) to 180 (exclusive).
pub fn global_lon_axis(step: f64) -> Vec<f64> {
    let n = (360.0 / step).round() as usize;
    regular_axis(-180.0, step, n)
}

/// Flatten an array to `f32` in logical (row-major) order, for NetCDF writers.
pub fn to_f32_vec(data: &Array4<f64>) -> Vec<f32> {
    data.iter().map(|&v| v as f32).collect()
}
