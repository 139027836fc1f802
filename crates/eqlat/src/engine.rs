//! Equivalent latitude from potential vorticity on isentropic surfaces.
//!
//! For each potential temperature level the PV field is swept through 100
//! thresholds between its minimum and maximum. The area where PV meets or
//! exceeds a threshold is converted to the latitude of a polar cap of the
//! same area, giving an EL(PV) curve per level. The curves are resampled
//! onto a common PV grid to form the lookup table of an
//! [`EqLatInterpolator`].

use grid_processor::{interp_clamped, GridAxes, GriddedField};
use met_common::physics::potential_temperature;
use ndarray::{s, Array2, Array3, Axis};
use tracing::debug;

use crate::area::cell_areas;
use crate::error::{EqLatError, Result};
use crate::grids::{linspace, potential_temperature_grid, potential_vorticity_grid};
use crate::interpolator::EqLatInterpolator;

/// Potential vorticity units per SI unit (K m² kg⁻¹ s⁻¹).
pub const PVU_PER_SI: f64 = 1.0e6;

/// Number of PV thresholds swept per potential temperature level.
const N_THRESHOLDS: usize = 100;

/// Potential temperatures above this (K) come from fill values.
const PT_LIMIT: f64 = 1.0e4;

/// Potential vorticities above this (PVU) come from fill values.
const PV_LIMIT: f64 = 1.0e8;

/// Pressure of every model level.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelPressure {
    /// Fixed pressure levels (hPa), one per level
    Fixed(Vec<f64>),
    /// Pressure (hPa) at every grid point, `(level, lat, lon)`
    Field(Array3<f64>),
}

impl LevelPressure {
    /// Pressure field of one time step of a gridded field.
    pub fn from_field(field: &GriddedField, time: usize) -> Result<Self> {
        field.ensure_time(time)?;
        Ok(Self::Field(field.physical_values().index_axis(Axis(0), time).to_owned()))
    }
}

/// Inputs for one timestamp, levels ordered surface to space.
#[derive(Debug, Clone, PartialEq)]
pub struct EqLatInput {
    /// Ertel potential vorticity (K m² kg⁻¹ s⁻¹), `(level, lat, lon)`
    pub epv: Array3<f64>,
    /// Temperature (K), `(level, lat, lon)`
    pub temperature: Array3<f64>,
    pub pressure: LevelPressure,
}

impl EqLatInput {
    /// Take one time step of EPV and temperature fields, fills as NaN.
    pub fn from_fields(
        epv: &GriddedField,
        temperature: &GriddedField,
        pressure: LevelPressure,
        time: usize,
    ) -> Result<Self> {
        epv.ensure_time(time)?;
        temperature.ensure_time(time)?;
        let slice = |f: &GriddedField| f.physical_values().index_axis(Axis(0), time).to_owned();
        Ok(Self {
            epv: slice(epv),
            temperature: slice(temperature),
            pressure,
        })
    }

    /// Potential temperature at every grid point.
    pub fn potential_temperature(&self) -> Result<Array3<f64>> {
        let (nlev, nlat, nlon) = self.temperature.dim();
        match &self.pressure {
            LevelPressure::Fixed(levels) => {
                if levels.len() != nlev {
                    return Err(EqLatError::ShapeMismatch {
                        what: "pressure levels",
                        expected: vec![nlev],
                        actual: vec![levels.len()],
                    });
                }
                Ok(Array3::from_shape_fn((nlev, nlat, nlon), |(k, j, i)| {
                    potential_temperature(self.temperature[[k, j, i]], levels[k])
                }))
            }
            LevelPressure::Field(pressure) => {
                if pressure.dim() != self.temperature.dim() {
                    return Err(EqLatError::ShapeMismatch {
                        what: "pressure field",
                        expected: self.temperature.shape().to_vec(),
                        actual: pressure.shape().to_vec(),
                    });
                }
                Ok(ndarray::Zip::from(&self.temperature)
                    .and(pressure)
                    .map_collect(|&t, &p| potential_temperature(t, p)))
            }
        }
    }
}

/// Replace NaN with the next valid value above it in each column.
///
/// Levels run along axis 0; NaNs above the topmost valid value stay NaN.
pub fn backfill_columns(data: &mut Array3<f64>) {
    for mut column in data.lanes_mut(Axis(0)) {
        let mut above = f64::NAN;
        for value in column.iter_mut().rev() {
            if value.is_nan() {
                *value = above;
            } else {
                above = *value;
            }
        }
    }
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Area-weighted equivalent latitude calculator for one horizontal grid.
#[derive(Debug, Clone)]
pub struct EquivalentLatitudeEngine {
    area: Array2<f64>,
}

impl EquivalentLatitudeEngine {
    /// Engine for a grid with the given resolution (degrees).
    pub fn new(axes: &GridAxes, lat_res: f64, lon_res: f64, quiet: bool) -> Self {
        Self {
            area: cell_areas(&axes.lats, axes.n_lons(), lat_res, lon_res, quiet),
        }
    }

    pub fn from_area(area: Array2<f64>) -> Self {
        Self { area }
    }

    /// Cell areas (steradians), `(lat, lon)`.
    pub fn area(&self) -> &Array2<f64> {
        &self.area
    }

    fn check_horizontal(&self, what: &'static str, data: &Array3<f64>) -> Result<()> {
        let (_, nlat, nlon) = data.dim();
        if (nlat, nlon) != self.area.dim() {
            return Err(EqLatError::ShapeMismatch {
                what,
                expected: self.area.shape().to_vec(),
                actual: vec![nlat, nlon],
            });
        }
        Ok(())
    }

    /// PV (PVU) and PT (K) with fills removed and gaps filled from above.
    fn prepare(&self, input: &EqLatInput) -> Result<(Array3<f64>, Array3<f64>)> {
        if input.epv.dim() != input.temperature.dim() {
            return Err(EqLatError::ShapeMismatch {
                what: "EPV",
                expected: input.temperature.shape().to_vec(),
                actual: input.epv.shape().to_vec(),
            });
        }
        self.check_horizontal("temperature", &input.temperature)?;

        let mut pt = input.potential_temperature()?;
        pt.mapv_inplace(|v| if v > PT_LIMIT { f64::NAN } else { v });
        let mut pv = input.epv.mapv(|v| {
            let pvu = v * PVU_PER_SI;
            if pvu > PV_LIMIT {
                f64::NAN
            } else {
                pvu
            }
        });
        backfill_columns(&mut pt);
        backfill_columns(&mut pv);
        Ok((pv, pt))
    }

    /// Build the (PV, PT) → equivalent latitude interpolator for one timestamp.
    pub fn compute(&self, input: &EqLatInput) -> Result<EqLatInterpolator> {
        let (pv, pt) = self.prepare(input)?;
        let (_, nlat, nlon) = pv.dim();

        let (min_pt, max_pt) = finite_range(pt.iter().copied())
            .ok_or_else(|| EqLatError::NoValidData("potential temperature is all fill".into()))?;
        let pt_levels = potential_temperature_grid(min_pt, max_pt);
        let n_pt = pt_levels.len();

        // PV on the isentropic levels, column by column
        let mut pv_on_pt = Array3::<f64>::from_elem((n_pt, nlat, nlon), f64::NAN);
        for j in 0..nlat {
            for i in 0..nlon {
                let (xp, fp): (Vec<f64>, Vec<f64>) = pt
                    .slice(s![.., j, i])
                    .iter()
                    .zip(pv.slice(s![.., j, i]).iter())
                    .filter(|(t, v)| t.is_finite() && v.is_finite())
                    .map(|(&t, &v)| (t, v))
                    .unzip();
                if xp.is_empty() {
                    continue;
                }
                for (k, &level) in pt_levels.iter().enumerate() {
                    pv_on_pt[[k, j, i]] = interp_clamped(&xp, &fp, level);
                }
            }
        }

        let mut thresholds = Vec::with_capacity(n_pt);
        let mut eq_lats = Vec::with_capacity(n_pt);
        for k in 0..n_pt {
            let layer = pv_on_pt.index_axis(Axis(0), k);
            let (t, el) = self.sweep_level(layer.iter().copied())?;
            thresholds.push(t);
            eq_lats.push(el);
        }

        let (min_pv, max_pv) = finite_range(thresholds.iter().flatten().copied())
            .ok_or_else(|| EqLatError::NoValidData("potential vorticity is all fill".into()))?;
        let pv_grid = potential_vorticity_grid(min_pv, max_pv);

        let mut table = Array2::<f64>::zeros((n_pt, pv_grid.len()));
        for (k, mut row) in table.axis_iter_mut(Axis(0)).enumerate() {
            for (cell, &pv_value) in row.iter_mut().zip(&pv_grid) {
                *cell = interp_clamped(&thresholds[k], &eq_lats[k], pv_value);
            }
        }

        debug!(pt_levels = n_pt, pv_samples = pv_grid.len(), "Built equivalent latitude table");
        EqLatInterpolator::new(pv_grid, pt_levels, table)
    }

    /// Thresholds and equivalent latitudes of one isentropic PV layer.
    fn sweep_level(&self, layer: impl Iterator<Item = f64>) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut cells: Vec<(f64, f64)> = layer
            .zip(self.area.iter().copied())
            .filter(|(pv, _)| pv.is_finite())
            .collect();
        let (min_pv, max_pv) = finite_range(cells.iter().map(|c| c.0))
            .ok_or_else(|| EqLatError::NoValidData("isentropic level without PV".into()))?;

        // Descending PV, with running area totals
        cells.sort_by(|a, b| b.0.total_cmp(&a.0));
        let mut cumulative = Vec::with_capacity(cells.len() + 1);
        cumulative.push(0.0);
        let mut total = 0.0;
        for &(_, a) in &cells {
            total += a;
            cumulative.push(total);
        }

        let thresholds = linspace(min_pv, max_pv, N_THRESHOLDS);
        let eq_lats = thresholds
            .iter()
            .map(|&threshold| {
                let count = cells.partition_point(|c| c.0 >= threshold);
                cap_latitude(cumulative[count])
            })
            .collect();
        Ok((thresholds, eq_lats))
    }

    /// Equivalent latitude at every grid point of the input.
    pub fn compute_field(&self, input: &EqLatInput) -> Result<Array3<f64>> {
        let interpolator = self.compute(input)?;
        let pt = input.potential_temperature()?;
        let pv = input.epv.mapv(|v| v * PVU_PER_SI);
        interpolator.evaluate_field(&pv, &pt)
    }
}

/// Latitude (degrees) of the southern edge of a northern polar cap with
/// the given area on the unit sphere.
pub fn cap_latitude(area: f64) -> f64 {
    let x = (1.0 - area / (2.0 * std::f64::consts::PI)).clamp(-1.0, 1.0);
    x.asin().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_cap_latitude() {
        assert_approx_eq!(cap_latitude(0.0), 90.0, 1e-12);
        assert_approx_eq!(cap_latitude(2.0 * std::f64::consts::PI), 0.0, 1e-12);
        assert_approx_eq!(cap_latitude(4.0 * std::f64::consts::PI), -90.0, 1e-12);
    }

    #[test]
    fn test_backfill_columns() {
        let mut data = array![[[f64::NAN]], [[f64::NAN]], [[3.0]], [[f64::NAN]], [[5.0]], [[f64::NAN]]];
        backfill_columns(&mut data);
        let column: Vec<f64> = data.iter().copied().collect();
        assert_eq!(&column[..5], &[3.0, 3.0, 3.0, 5.0, 5.0]);
        assert!(column[5].is_nan());
    }

    #[test]
    fn test_pressure_shapes_checked() {
        let input = EqLatInput {
            epv: Array3::zeros((2, 1, 1)),
            temperature: Array3::from_elem((2, 1, 1), 300.0),
            pressure: LevelPressure::Fixed(vec![1000.0]),
        };
        assert!(matches!(
            input.potential_temperature(),
            Err(EqLatError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_sweep_is_monotonic() {
        let area = Array2::from_elem((2, 2), std::f64::consts::PI);
        let engine = EquivalentLatitudeEngine::from_area(area);
        let (thresholds, el) = engine.sweep_level([1.0, 2.0, 3.0, 4.0].into_iter()).unwrap();
        assert_eq!(thresholds.len(), 100);
        assert_approx_eq!(el[0], -90.0, 1e-9);
        assert!(el.windows(2).all(|w| w[1] >= w[0]));
        assert!(el[99] > 0.0);
    }
}
