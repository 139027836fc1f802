//! Moist-air thermodynamics and geodesy used to build profile records.
//!
//! Pressures are in hPa, temperatures in K, altitudes in km unless noted.

/// Molar mass of dry air (kg/mol)
pub const MASS_DRY_AIR: f64 = 28.9644e-3;

/// Molar mass of water (kg/mol)
pub const MASS_H2O: f64 = 18.01528e-3;

/// Dry-air to water molar mass ratio
pub const RATIO_MOLEC_MASS: f64 = MASS_DRY_AIR / MASS_H2O;

/// Molar mass of water used in the mean molecular weight blend (g/mol)
pub const MMW_H2O_G: f64 = 18.02;

/// Poisson constant R/cp used for potential temperature
pub const KAPPA: f64 = 0.286;

/// Reference pressure for potential temperature (hPa)
pub const P0_HPA: f64 = 1000.0;

/// Standard gravity (m/s2)
pub const G0: f64 = 9.80665;

/// Triple point of water (K)
const T_TRIPLE: f64 = 273.16;

/// H2O dry mole fraction from specific humidity.
pub fn h2o_dmf_from_specific_humidity(qv: f64) -> f64 {
    RATIO_MOLEC_MASS * qv / (1.0 - qv)
}

/// H2O wet mole fraction from dry mole fraction.
pub fn h2o_wmf_from_dmf(dmf: f64) -> f64 {
    dmf / (1.0 + dmf)
}

/// H2O dry mole fraction from wet mole fraction.
pub fn h2o_dmf_from_wmf(wmf: f64) -> f64 {
    wmf / (1.0 - wmf)
}

/// Saturation vapor pressure of water vapor over ice (hPa), Goff-Gratch.
pub fn svp_wv_over_ice(temperature: f64) -> f64 {
    let tr = T_TRIPLE / temperature;
    let yy = -9.09718 * (tr - 1.0) - 3.56654 * tr.log10() + 0.876793 * (1.0 - 1.0 / tr);
    6.1173 * 10f64.powf(yy)
}

/// Relative humidity in percent from temperature, wet mole fraction and pressure.
pub fn relative_humidity(temperature: f64, h2o_wmf: f64, pressure: f64) -> f64 {
    100.0 * h2o_wmf * pressure / svp_wv_over_ice(temperature)
}

/// Mean molecular weight of moist air (g/mol).
pub fn mean_molecular_weight(h2o_wmf: f64) -> f64 {
    1e3 * MASS_DRY_AIR * (1.0 - h2o_wmf) + MMW_H2O_G * h2o_wmf
}

/// Potential temperature (K) referenced to 1000 hPa.
pub fn potential_temperature(temperature: f64, pressure: f64) -> f64 {
    temperature * (P0_HPA / pressure).powf(KAPPA)
}

/// Gravity (m/s2) and distance from the Earth's center (km) at a geodetic
/// latitude (degrees) and altitude (km).
///
/// Includes the centrifugal term and the second harmonic of the geopotential.
pub fn gravity(geodetic_lat: f64, altitude_km: f64) -> (f64, f64) {
    // Gravitational constant times Earth's mass (m3/s2)
    const GM: f64 = 3.9861363e14;
    // Earth's angular rotation rate (rad/s)
    const OMEGA: f64 = 7.292116e-5;
    // (a/b)^2 - 1 for the equatorial/polar radii
    const CON: f64 = 0.006738;
    // Second harmonic coefficient of the gravity field
    const SHC: f64 = 1.6235e-3;
    // Equatorial radius (m)
    const EQRAD: f64 = 6378178.0;

    let gclat = (geodetic_lat.to_radians().tan() / (1.0 + CON)).atan();
    let radius = 1000.0 * altitude_km + EQRAD / (1.0 + CON * gclat.sin().powi(2)).sqrt();
    let ff = (radius / EQRAD).powi(2);
    let hh = radius * OMEGA.powi(2);
    let ge = GM / EQRAD.powi(2);
    let (s, c) = gclat.sin_cos();
    let g = (ge * (1.0 - SHC * (3.0 * s.powi(2) - 1.0) / ff) / ff - hh * c.powi(2))
        * (1.0 + 0.5 * (s * c * (hh / ge + 2.0 * SHC / ff.powi(2))).powi(2));

    (g, radius / 1000.0)
}

/// Geometric altitude (km) from geopotential height (km) at a site.
pub fn geopotential_height_to_altitude(gph_km: f64, lat: f64, site_alt_km: f64) -> f64 {
    let (g, r) = gravity(lat, site_alt_km);
    r * gph_km / (r * g / G0 - gph_km)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_dmf_wmf_inverse() {
        let dmf = h2o_dmf_from_specific_humidity(0.01);
        assert_approx_eq!(dmf, RATIO_MOLEC_MASS * 0.01 / 0.99, 1e-15);
        assert_approx_eq!(h2o_dmf_from_wmf(h2o_wmf_from_dmf(dmf)), dmf, 1e-15);
    }

    #[test]
    fn test_svp_at_triple_point() {
        assert_approx_eq!(svp_wv_over_ice(T_TRIPLE), 6.1173, 1e-12);
        // Vapor pressure drops steeply with temperature
        assert!(svp_wv_over_ice(230.0) < 0.1);
    }

    #[test]
    fn test_mmw_limits() {
        assert_approx_eq!(mean_molecular_weight(0.0), 28.9644, 1e-12);
        assert_approx_eq!(mean_molecular_weight(1.0), 18.02, 1e-12);
    }

    #[test]
    fn test_potential_temperature() {
        assert_eq!(potential_temperature(300.0, 1000.0), 300.0);
        assert!(potential_temperature(220.0, 100.0) > 400.0);
    }

    #[test]
    fn test_gravity_reasonable() {
        let (g_eq, r_eq) = gravity(0.0, 0.0);
        let (g_pole, r_pole) = gravity(90.0, 0.0);
        assert!(g_eq > 9.77 && g_eq < 9.79, "g_eq = {}", g_eq);
        assert!(g_pole > 9.82 && g_pole < 9.84, "g_pole = {}", g_pole);
        assert!(r_eq > r_pole);
    }

    #[test]
    fn test_geopotential_to_altitude_small_heights() {
        // Near the surface geometric and geopotential heights differ by well under a percent
        let z = geopotential_height_to_altitude(0.32, 36.6, 0.32);
        assert!((z - 0.32).abs() < 0.005, "z = {}", z);
        assert_eq!(geopotential_height_to_altitude(0.0, 36.6, 0.32), 0.0);
    }
}
