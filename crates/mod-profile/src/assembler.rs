//! Merging interpolated fields into per-site profile records.

use eqlat::{EqLatInterpolator, PVU_PER_SI};
use met_common::physics::{
    geopotential_height_to_altitude, h2o_dmf_from_specific_humidity, h2o_dmf_from_wmf, h2o_wmf_from_dmf,
    mean_molecular_weight, potential_temperature, relative_humidity, svp_wv_over_ice, G0,
};
use tracing::info;

use crate::error::Result;
use crate::record::{ProfileFields, ProfileRecord, SiteProfile, SurfaceFields, SurfaceRecord};

/// Lower-troposphere relative humidity limits.
///
/// Within `[min_pressure, max_pressure]` hPa, fractional RH is held between
/// `floor_numerator / p` and 1. Levels outside that range are left untouched,
/// including any supersaturation above `min_pressure`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityBounds {
    pub min_pressure: f64,
    pub max_pressure: f64,
    pub floor_numerator: f64,
}

impl Default for HumidityBounds {
    fn default() -> Self {
        Self {
            min_pressure: 300.0,
            max_pressure: 1000.0,
            floor_numerator: 30.0,
        }
    }
}

impl HumidityBounds {
    pub fn applies(&self, pressure: f64) -> bool {
        self.min_pressure <= pressure && pressure <= self.max_pressure
    }

    /// Smallest fractional RH allowed at a pressure (hPa).
    pub fn floor(&self, pressure: f64) -> f64 {
        self.floor_numerator / pressure
    }

    /// Clamp RH in place and recompute the dry mole fraction of clamped levels.
    ///
    /// Returns the number of levels changed. Applying twice changes nothing
    /// the second time.
    pub fn apply(&self, profile: &mut SiteProfile, quiet: bool) -> usize {
        let mut clamped = 0;
        for k in 0..profile.n_levels() {
            let (Some(p), Some(t), Some(rh)) = (profile.pressure.get(k), profile.temperature.get(k), profile.rh.get(k))
            else {
                continue;
            };
            if !self.applies(p) {
                continue;
            }

            let floor = self.floor(p);
            let target = if rh < floor {
                floor
            } else if rh > 1.0 {
                1.0
            } else {
                continue;
            };

            let before_dmf = profile.h2o_dmf.values[k];
            let wmf = svp_wv_over_ice(t) * target / p;
            let dmf = h2o_dmf_from_wmf(wmf);
            profile.rh.set(k, target);
            profile.h2o_dmf.set(k, dmf);
            clamped += 1;

            if !quiet {
                info!(
                    pressure = p,
                    rh_before = rh,
                    rh_after = target,
                    h2o_dmf_before = before_dmf,
                    h2o_dmf_after = dmf,
                    "Clamped relative humidity"
                );
            }
        }
        clamped
    }
}

/// Builds surface records and profiles for one site and time.
#[derive(Debug, Clone, Default)]
pub struct ProfileAssembler {
    pub bounds: HumidityBounds,
    pub quiet: bool,
}

impl ProfileAssembler {
    pub fn new(bounds: HumidityBounds, quiet: bool) -> Self {
        Self { bounds, quiet }
    }

    /// Convert surface fields and derive the surface humidity and height.
    ///
    /// `site_alt` is in meters; the surface height comes from the surface
    /// geopotential converted to geometric altitude at the site.
    pub fn surface(&self, fields: &SurfaceFields, site_lat: f64, site_alt: f64, sza: f64) -> SurfaceRecord {
        let pressure = fields.ps / 100.0;
        let h2o_dmf = h2o_dmf_from_specific_humidity(fields.qv2m);
        let h2o_wmf = h2o_wmf_from_dmf(h2o_dmf);
        let gph_km = fields.phis / G0 / 1000.0;

        SurfaceRecord {
            pressure,
            temperature: fields.t2m,
            qv: fields.qv2m,
            height: geopotential_height_to_altitude(gph_km, site_lat, site_alt / 1000.0),
            h2o_dmf,
            h2o_wmf,
            rh: relative_humidity(fields.t2m, h2o_wmf, pressure) / 100.0,
            mmw: mean_molecular_weight(h2o_wmf),
            slp: fields.slp / 100.0,
            tropp_blended: fields.troppb / 100.0,
            tropp_pv: fields.troppv / 100.0,
            tropp_thermal: fields.troppt / 100.0,
            tropt: fields.tropt,
            sza,
        }
    }

    /// Convert interpolated profile fields and mask levels without data.
    ///
    /// A level is without data when its temperature is invalid or zero; CO
    /// takes exactly the temperature mask.
    pub fn profile(&self, fields: ProfileFields) -> Result<SiteProfile> {
        fields.ensure_level_counts()?;
        let ProfileFields {
            pressure,
            mut temperature,
            height,
            mut qv,
            mut rh,
            mut epv,
            mut o3,
            co,
        } = fields;

        let no_data: Vec<bool> = temperature
            .valid
            .iter()
            .zip(&temperature.values)
            .map(|(&ok, &t)| !ok || t == 0.0)
            .collect();

        let mut height = height.map(|h| h / 1000.0);
        for p in [&mut temperature, &mut height, &mut qv, &mut rh, &mut epv, &mut o3] {
            p.mask_where(&no_data);
        }
        let co = co.map(|mut co| {
            co.valid = temperature.valid.clone();
            co
        });

        let mut profile = SiteProfile {
            pressure,
            temperature,
            height,
            qv,
            rh,
            epv,
            o3,
            co,
            h2o_dmf: Default::default(),
        };
        profile.refresh_h2o_dmf();
        Ok(profile)
    }

    /// Apply the humidity bounds and derive the remaining columns.
    pub fn finalize(
        &self,
        mut profile: SiteProfile,
        surface: &SurfaceRecord,
        site_lat: f64,
        eq_lat: Option<&EqLatInterpolator>,
    ) -> ProfileRecord {
        self.bounds.apply(&mut profile, self.quiet);

        let pressure = profile.pressure.to_nan_filled();
        let temperature = profile.temperature.to_nan_filled();
        let h2o_dmf = profile.h2o_dmf.to_nan_filled();
        let epv = profile.epv.to_nan_filled();

        let mmw = h2o_dmf
            .iter()
            .map(|&dmf| mean_molecular_weight(h2o_wmf_from_dmf(dmf)))
            .collect();
        let pt: Vec<f64> = temperature
            .iter()
            .zip(&pressure)
            .map(|(&t, &p)| potential_temperature(t, p))
            .collect();
        let eq_lat = eq_lat.map(|interp| {
            epv.iter()
                .zip(&pt)
                .map(|(&pv, &theta)| interp.evaluate(pv * PVU_PER_SI, theta))
                .collect()
        });

        ProfileRecord {
            site_lat,
            height: profile.height.to_nan_filled(),
            rh: profile.rh.to_nan_filled(),
            o3: profile.o3.to_nan_filled(),
            co: profile.co.as_ref().map(|co| co.to_nan_filled()),
            pressure,
            temperature,
            mmw,
            h2o_dmf,
            epv,
            pt,
            eq_lat,
            surface: *surface,
        }
    }
}
