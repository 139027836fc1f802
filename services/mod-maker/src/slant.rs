//! Sun-ray geometry for slant profiles.
//!
//! A slant profile samples the atmosphere along the line of sight to the sun
//! rather than straight above the site. The pipeline only needs the
//! per-level positions, so the geometry sits behind [`SlantPathSolver`].

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};
use met_common::ResolvedSite;

/// Positions along the solar ray, one per vertical level.
#[derive(Debug, Clone, PartialEq)]
pub struct SlantPath {
    pub lats: Vec<f64>,
    /// Longitudes in [-180, 180)
    pub lons: Vec<f64>,
    /// Altitudes (km)
    pub alts: Vec<f64>,
    /// Solar zenith angle at the site (degrees)
    pub sza: f64,
}

impl SlantPath {
    pub fn len(&self) -> usize {
        self.alts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alts.is_empty()
    }
}

/// Solves the sun-ray geometry for a site.
pub trait SlantPathSolver {
    /// Trace the ray through the vertical altitude grid (km).
    ///
    /// `surface_pressure` is in hPa and `surface_temperature` in K; solvers
    /// that model refraction use them, others may ignore them.
    fn solve(
        &self,
        time: DateTime<Utc>,
        site: &ResolvedSite,
        altitudes: &[f64],
        surface_pressure: f64,
        surface_temperature: f64,
    ) -> SlantPath;

    /// Solar zenith angle at the site (degrees).
    fn solar_zenith_angle(&self, time: DateTime<Utc>, site: &ResolvedSite) -> f64 {
        solar_zenith_angle(time, site.lat, site.lon_180)
    }
}

/// A solver that keeps every level above the site.
///
/// Refraction and ray bending are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticalPath;

impl SlantPathSolver for VerticalPath {
    fn solve(
        &self,
        time: DateTime<Utc>,
        site: &ResolvedSite,
        altitudes: &[f64],
        _surface_pressure: f64,
        _surface_temperature: f64,
    ) -> SlantPath {
        let n = altitudes.len();
        SlantPath {
            lats: vec![site.lat; n],
            lons: vec![site.lon_180; n],
            alts: altitudes.to_vec(),
            sza: self.solar_zenith_angle(time, site),
        }
    }
}

/// Solar zenith angle (degrees) from a low-precision solar position.
///
/// Uses the fractional year to get the equation of time and the solar
/// declination, then the hour angle from true solar time. Good to a few
/// tenths of a degree.
pub fn solar_zenith_angle(time: DateTime<Utc>, lat: f64, lon: f64) -> f64 {
    let days_in_year = if time.date_naive().leap_year() { 366.0 } else { 365.0 };
    let hour = time.hour() as f64 + time.minute() as f64 / 60.0 + time.second() as f64 / 3600.0;
    let gamma = 2.0 * PI / days_in_year * (time.ordinal0() as f64 + (hour - 12.0) / 24.0);

    // minutes
    let eqtime = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    let decl = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin() - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    let true_solar_minutes = hour * 60.0 + eqtime + 4.0 * lon;
    let hour_angle = (true_solar_minutes / 4.0 - 180.0).to_radians();

    let lat = lat.to_radians();
    let cos_zen = lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos();
    cos_zen.clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn site(lat: f64, lon: f64) -> ResolvedSite {
        ResolvedSite {
            id: "xx".to_string(),
            name: "test".to_string(),
            lat,
            lon_180: lon,
            lon_360: met_common::lon_180_to_360(lon),
            alt: 0.0,
        }
    }

    #[test]
    fn test_equinox_noon_overhead() {
        let t = Utc.with_ymd_and_hms(2018, 3, 20, 12, 0, 0).unwrap();
        assert!(solar_zenith_angle(t, 0.0, 0.0) < 3.0);
        let midnight = Utc.with_ymd_and_hms(2018, 3, 20, 0, 0, 0).unwrap();
        assert!(solar_zenith_angle(midnight, 0.0, 0.0) > 170.0);
    }

    #[test]
    fn test_solstice_tropic() {
        let t = Utc.with_ymd_and_hms(2018, 6, 21, 12, 0, 0).unwrap();
        assert!(solar_zenith_angle(t, 23.44, 0.0) < 2.0);
        let sza = solar_zenith_angle(t, -66.56, 0.0);
        assert!((sza - 90.0).abs() < 2.0, "{}", sza);
    }

    #[test]
    fn test_longitude_shifts_noon() {
        // Local noon at 90W is 18 UTC
        let t = Utc.with_ymd_and_hms(2018, 3, 20, 18, 0, 0).unwrap();
        assert!(solar_zenith_angle(t, 0.0, -90.0) < 3.0);
        assert!(solar_zenith_angle(t, 0.0, 90.0) > 170.0);
    }

    #[test]
    fn test_vertical_path_repeats_site() {
        let t = Utc.with_ymd_and_hms(2018, 3, 20, 18, 0, 0).unwrap();
        let site = site(36.6, -97.5);
        let path = VerticalPath.solve(t, &site, &[0.3, 1.0, 5.0], 980.0, 290.0);
        assert_eq!(path.len(), 3);
        assert_eq!(path.lats, vec![36.6; 3]);
        assert_eq!(path.lons, vec![-97.5; 3]);
        assert_eq!(path.alts, vec![0.3, 1.0, 5.0]);
        assert_eq!(path.sza, VerticalPath.solar_zenith_angle(t, &site));
        assert!(path.sza < 90.0);
    }
}
