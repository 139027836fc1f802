//! Gridded inputs for one file and their sampling at sites.

use std::path::Path;

use anyhow::{Context, Result};
use grid_processor::{
    interp_or_nan, GridAxes, GriddedField, MaskedProfile, PointSetInterpolator, TrilinearInterpolator,
    TrilinearWeights,
};
use mod_profile::{ProfileFields, SurfaceFields};
use netcdf_parser::DatasetReader;

use crate::slant::SlantPath;

/// Surface variables read from the surface collection, in [`SurfaceFields`] order.
pub const SURFACE_VARIABLES: [&str; 8] = ["PS", "T2M", "QV2M", "SLP", "TROPPB", "TROPPV", "TROPPT", "TROPT"];

/// Pressure of the profile levels.
#[derive(Debug, Clone)]
pub enum LevelPressureSource {
    /// Fixed pressure levels (hPa)
    Levels(Vec<f64>),
    /// Mid-layer pressure (hPa) of native levels
    Field(GriddedField),
}

/// Profile variables of one profile file, levels surface to space.
#[derive(Debug, Clone)]
pub struct ProfileSnapshot {
    pub axes: GridAxes,
    pub pressure: LevelPressureSource,
    pub temperature: GriddedField,
    pub height: GriddedField,
    pub qv: GriddedField,
    pub rh: GriddedField,
    pub epv: GriddedField,
    pub o3: GriddedField,
    /// Surface geopotential
    pub phis: GriddedField,
}

impl ProfileSnapshot {
    /// Read a profile file, checking that its level type is the expected one.
    pub fn load(path: &Path, native: bool) -> Result<Self> {
        let reader = DatasetReader::open(path)?;
        reader.ensure_level_type(native)?;

        let pressure = if native {
            LevelPressureSource::Field(reader.read_native_pressure()?)
        } else {
            let levels = reader
                .levels()?
                .with_context(|| format!("{} has no pressure level coordinate", path.display()))?;
            LevelPressureSource::Levels(levels)
        };

        Ok(Self {
            axes: reader.axes()?,
            pressure,
            temperature: reader.read_profile_field("T")?,
            height: reader.read_profile_field("H")?,
            qv: reader.read_profile_field("QV")?,
            rh: reader.read_profile_field("RH")?,
            epv: reader.read_profile_field("EPV")?,
            o3: reader.read_profile_field("O3")?,
            phis: reader.read_field("PHIS")?,
        })
    }

    /// Bilinearly interpolate one time step to every target.
    pub fn sample(&self, targets: &[(f64, f64)], time_index: usize) -> Result<Vec<ProfileFields>> {
        let interp = PointSetInterpolator::new(self.axes.clone(), targets);
        let sample = |field: &GriddedField| interp.interpolate(field, time_index);

        let pressure = match &self.pressure {
            LevelPressureSource::Levels(levels) => vec![MaskedProfile::filled(levels.clone()); targets.len()],
            LevelPressureSource::Field(field) => sample(field)?,
        };
        let columns = [
            sample(&self.temperature)?,
            sample(&self.height)?,
            sample(&self.qv)?,
            sample(&self.rh)?,
            sample(&self.epv)?,
            sample(&self.o3)?,
        ];

        let mut sites = Vec::with_capacity(targets.len());
        let mut columns = columns.map(Vec::into_iter);
        for pressure in pressure {
            let mut next = |i: usize| columns[i].next().unwrap_or_default();
            sites.push(ProfileFields {
                pressure,
                temperature: next(0),
                height: next(1),
                qv: next(2),
                rh: next(3),
                epv: next(4),
                o3: next(5),
                co: None,
            });
        }
        Ok(sites)
    }

    /// Surface geopotential at every target.
    pub fn sample_phis(&self, targets: &[(f64, f64)], time_index: usize) -> Result<Vec<f64>> {
        let interp = PointSetInterpolator::new(self.axes.clone(), targets);
        Ok(interp.interpolate(&self.phis, time_index)?.iter().map(surface_value).collect())
    }

    /// Interpolate along a solar ray.
    ///
    /// Level `k` comes from the column interpolated at ray point `k`.
    /// Pressure is that of the vertical profile and height is the ray
    /// altitude.
    pub fn sample_slant(&self, vertical: &ProfileFields, ray: &SlantPath, time_index: usize) -> Result<ProfileFields> {
        ensure_ray_matches(ray, vertical.pressure.len())?;
        let targets: Vec<(f64, f64)> = ray.lats.iter().copied().zip(ray.lons.iter().copied()).collect();
        let columns = self.sample(&targets, time_index)?;

        Ok(ProfileFields {
            pressure: vertical.pressure.clone(),
            temperature: diagonal(&columns, |c| &c.temperature),
            height: MaskedProfile::from_finite(ray.alts.iter().map(|km| km * 1000.0).collect()),
            qv: diagonal(&columns, |c| &c.qv),
            rh: diagonal(&columns, |c| &c.rh),
            epv: diagonal(&columns, |c| &c.epv),
            o3: diagonal(&columns, |c| &c.o3),
            co: None,
        })
    }

    /// Profile variables at one site from trilinear weights.
    pub fn sample_trilinear(&self, interp: &TrilinearInterpolator, w: &TrilinearWeights) -> Result<ProfileFields> {
        let pressure = match &self.pressure {
            LevelPressureSource::Levels(levels) => MaskedProfile::filled(levels.clone()),
            LevelPressureSource::Field(field) => interp.interpolate(field, w)?,
        };
        Ok(ProfileFields {
            pressure,
            temperature: interp.interpolate(&self.temperature, w)?,
            height: interp.interpolate(&self.height, w)?,
            qv: interp.interpolate(&self.qv, w)?,
            rh: interp.interpolate(&self.rh, w)?,
            epv: interp.interpolate(&self.epv, w)?,
            o3: interp.interpolate(&self.o3, w)?,
            co: None,
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self.pressure, LevelPressureSource::Field(_))
    }
}

/// Surface variables of one surface file.
#[derive(Debug, Clone)]
pub struct SurfaceSnapshot {
    pub axes: GridAxes,
    /// One field per entry of [`SURFACE_VARIABLES`]
    pub fields: Vec<GriddedField>,
}

impl SurfaceSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = DatasetReader::open(path)?;
        let fields = SURFACE_VARIABLES
            .iter()
            .map(|name| reader.read_field(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            axes: reader.axes()?,
            fields,
        })
    }

    /// Surface values at every target; `phis` comes from the profile file.
    pub fn sample(&self, targets: &[(f64, f64)], phis: &[f64], time_index: usize) -> Result<Vec<SurfaceFields>> {
        let interp = PointSetInterpolator::new(self.axes.clone(), targets);
        let mut values = vec![[f64::NAN; 8]; targets.len()];
        for (v, field) in self.fields.iter().enumerate() {
            for (site, profile) in interp.interpolate(field, time_index)?.iter().enumerate() {
                values[site][v] = surface_value(profile);
            }
        }
        Ok(values
            .into_iter()
            .zip(phis)
            .map(|(v, &phis)| surface_fields(v, phis))
            .collect())
    }

    /// Surface values at one site from trilinear weights.
    pub fn sample_trilinear(
        &self,
        interp: &TrilinearInterpolator,
        w: &TrilinearWeights,
        phis: f64,
    ) -> Result<SurfaceFields> {
        let mut values = [f64::NAN; 8];
        for (value, field) in values.iter_mut().zip(&self.fields) {
            *value = surface_value(&interp.interpolate(field, w)?);
        }
        Ok(surface_fields(values, phis))
    }
}

fn surface_fields(v: [f64; 8], phis: f64) -> SurfaceFields {
    SurfaceFields {
        ps: v[0],
        t2m: v[1],
        qv2m: v[2],
        slp: v[3],
        troppb: v[4],
        troppv: v[5],
        troppt: v[6],
        tropt: v[7],
        phis,
    }
}

/// The single level of a surface profile, NaN when masked.
pub fn surface_value(profile: &MaskedProfile) -> f64 {
    profile.get(0).unwrap_or(f64::NAN)
}

/// CO and its native-level pressure from one chemistry file.
#[derive(Debug, Clone)]
pub struct ChemistrySnapshot {
    pub axes: GridAxes,
    pub co: GriddedField,
    pub pressure: GriddedField,
}

impl ChemistrySnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = DatasetReader::open(path)?;
        reader.ensure_level_type(true)?;
        Ok(Self {
            axes: reader.axes()?,
            co: reader.read_profile_field("CO")?,
            pressure: reader.read_native_pressure()?,
        })
    }

    /// CO at every target, on `levels` when the met data are on fixed
    /// pressure levels, or on the native levels otherwise.
    pub fn sample(
        &self,
        targets: &[(f64, f64)],
        levels: Option<&[f64]>,
        time_index: usize,
    ) -> Result<Vec<MaskedProfile>> {
        let interp = PointSetInterpolator::new(self.axes.clone(), targets);
        let co = interp.interpolate(&self.co, time_index)?;
        let Some(levels) = levels else {
            return Ok(co);
        };
        let pressure = interp.interpolate(&self.pressure, time_index)?;
        Ok(pressure
            .iter()
            .zip(&co)
            .map(|(p, co)| co_on_levels(p, co, levels))
            .collect())
    }
}

/// Interpolate CO onto pressure levels, linear in log(p)-log(CO).
///
/// Levels outside the chemistry column come out masked, except that
/// levels below its lowest valid point repeat that point's value.
pub fn co_on_levels(pressure: &MaskedProfile, co: &MaskedProfile, levels: &[f64]) -> MaskedProfile {
    // Native columns run surface to space, so ln p decreases; reverse it.
    let mut points: Vec<(f64, f64)> = (0..pressure.len())
        .filter_map(|k| match (pressure.get(k), co.get(k)) {
            (Some(p), Some(c)) if p > 0.0 && c > 0.0 => Some((p.ln(), c.ln())),
            _ => None,
        })
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.dedup_by(|a, b| a.0 == b.0);

    let xp: Vec<f64> = points.iter().map(|p| p.0).collect();
    let fp: Vec<f64> = points.iter().map(|p| p.1).collect();

    let mut out = MaskedProfile::from_finite(levels.iter().map(|&p| interp_or_nan(&xp, &fp, p.ln()).exp()).collect());
    if let (Some(&bottom_lnp), Some(&bottom_co)) = (xp.last(), fp.last()) {
        for (k, &p) in levels.iter().enumerate() {
            if p.ln() > bottom_lnp {
                out.set(k, bottom_co.exp());
            }
        }
    }
    out
}

/// Level `k` of each variable taken from column `k`.
fn diagonal(columns: &[ProfileFields], var: impl Fn(&ProfileFields) -> &MaskedProfile) -> MaskedProfile {
    let mut out = MaskedProfile::masked(columns.len());
    for (k, column) in columns.iter().enumerate() {
        if let Some(v) = var(column).get(k) {
            out.set(k, v);
        }
    }
    out
}

/// A ray must give one position per vertical level.
fn ensure_ray_matches(ray: &SlantPath, n_levels: usize) -> Result<()> {
    anyhow::ensure!(!ray.is_empty(), "Slant path is empty");
    anyhow::ensure!(
        ray.len() == n_levels && ray.lats.len() == n_levels && ray.lons.len() == n_levels,
        "Slant path has {} altitudes, {} latitudes and {} longitudes for {} levels",
        ray.len(),
        ray.lats.len(),
        ray.lons.len(),
        n_levels
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_slice_approx_eq};

    #[test]
    fn test_co_log_log_interpolation() {
        let pressure = MaskedProfile::filled(vec![980.0, 800.0, 500.0, 100.0]);
        let co = MaskedProfile::filled(vec![1.2e-7, 1.0e-7, 8.0e-8, 4.0e-8]);
        let out = co_on_levels(&pressure, &co, &[1000.0, 980.0, 700.0, 100.0, 50.0]);

        // Below the lowest chemistry level the bottom value is held
        assert_approx_eq!(out.get(0).unwrap(), 1.2e-7, 1e-20);
        assert_approx_eq!(out.get(1).unwrap(), 1.2e-7, 1e-20);
        let frac = (700.0_f64.ln() - 800.0_f64.ln()) / (500.0_f64.ln() - 800.0_f64.ln());
        let expected = (1.0e-7_f64.ln() + frac * (8.0e-8_f64.ln() - 1.0e-7_f64.ln())).exp();
        assert_approx_eq!(out.get(2).unwrap(), expected, 1e-20);
        assert_approx_eq!(out.get(3).unwrap(), 4.0e-8, 1e-20);
        // Above the chemistry column stays masked
        assert_eq!(out.get(4), None);
    }

    #[test]
    fn test_co_skips_invalid_points() {
        let pressure = MaskedProfile::filled(vec![900.0, 500.0, 100.0]);
        let co = MaskedProfile::new(vec![1.0e-7, f64::NAN, 5.0e-8], vec![true, false, true]);
        let out = co_on_levels(&pressure, &co, &[500.0]);
        let frac = (500.0_f64.ln() - 900.0_f64.ln()) / (100.0_f64.ln() - 900.0_f64.ln());
        let expected = (1.0e-7_f64.ln() + frac * (5.0e-8_f64.ln() - 1.0e-7_f64.ln())).exp();
        assert_slice_approx_eq!(&out.values, &[expected], 1e-20);
    }

    #[test]
    fn test_diagonal() {
        let column = |v: f64| ProfileFields {
            temperature: MaskedProfile::filled(vec![v, v + 1.0, v + 2.0]),
            ..Default::default()
        };
        let columns = [column(10.0), column(20.0), column(30.0)];
        let out = diagonal(&columns, |c| &c.temperature);
        assert_eq!(out.values, vec![10.0, 21.0, 32.0]);
        assert!(out.all_valid());
    }

    fn ray(lats: usize, alts: usize) -> SlantPath {
        SlantPath {
            lats: vec![10.0; lats],
            lons: vec![20.0; lats],
            alts: vec![1.0; alts],
            sza: 30.0,
        }
    }

    #[test]
    fn test_ray_must_cover_every_level() {
        assert!(ensure_ray_matches(&ray(3, 3), 3).is_ok());

        let err = ensure_ray_matches(&ray(3, 2), 3).unwrap_err();
        assert!(err.to_string().contains("2 altitudes"), "{}", err);
        assert!(ensure_ray_matches(&ray(2, 3), 3).is_err());
        assert!(ensure_ray_matches(&ray(0, 0), 0).unwrap_err().to_string().contains("empty"));
    }
}
