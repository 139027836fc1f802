//! Per-site profile and surface records.

use grid_processor::MaskedProfile;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// Profile variables as interpolated from the input files.
///
/// Levels run surface to space. Units are those of the files: pressure in
/// hPa, height in m, humidity as specific humidity and fractional RH.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileFields {
    pub pressure: MaskedProfile,
    pub temperature: MaskedProfile,
    pub height: MaskedProfile,
    pub qv: MaskedProfile,
    pub rh: MaskedProfile,
    pub epv: MaskedProfile,
    pub o3: MaskedProfile,
    pub co: Option<MaskedProfile>,
}

impl ProfileFields {
    pub fn n_levels(&self) -> usize {
        self.pressure.len()
    }

    /// Check that every variable has as many levels as the pressure.
    pub fn ensure_level_counts(&self) -> Result<()> {
        let expected = self.n_levels();
        let mut variables = vec![
            ("T", &self.temperature),
            ("H", &self.height),
            ("QV", &self.qv),
            ("RH", &self.rh),
            ("EPV", &self.epv),
            ("O3", &self.o3),
        ];
        if let Some(co) = &self.co {
            variables.push(("CO", co));
        }
        for (variable, profile) in variables {
            if profile.len() != expected {
                return Err(ProfileError::LevelCountMismatch {
                    variable,
                    expected,
                    actual: profile.len(),
                });
            }
        }
        Ok(())
    }
}

/// Surface variables as interpolated from the input files (SI units).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceFields {
    /// Surface pressure (Pa)
    pub ps: f64,
    /// 2 m temperature (K)
    pub t2m: f64,
    /// 2 m specific humidity (kg/kg)
    pub qv2m: f64,
    /// Sea level pressure (Pa)
    pub slp: f64,
    /// Blended tropopause pressure (Pa)
    pub troppb: f64,
    /// PV-based tropopause pressure (Pa)
    pub troppv: f64,
    /// Thermal tropopause pressure (Pa)
    pub troppt: f64,
    /// Tropopause temperature (K)
    pub tropt: f64,
    /// Surface geopotential (m2/s2)
    pub phis: f64,
}

/// Profile variables after unit conversion, ready for surface patching.
///
/// Height is in km and water is carried both as specific humidity and
/// as dry mole fraction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteProfile {
    pub pressure: MaskedProfile,
    pub temperature: MaskedProfile,
    pub height: MaskedProfile,
    pub qv: MaskedProfile,
    pub rh: MaskedProfile,
    pub epv: MaskedProfile,
    pub o3: MaskedProfile,
    pub co: Option<MaskedProfile>,
    pub h2o_dmf: MaskedProfile,
}

/// A profile variable that surface patching can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVariable {
    Rh,
    Qv,
    Temperature,
    Height,
    Epv,
    O3,
    Co,
}

impl ProfileVariable {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rh => "RH",
            Self::Qv => "QV",
            Self::Temperature => "T",
            Self::Height => "H",
            Self::Epv => "EPV",
            Self::O3 => "O3",
            Self::Co => "CO",
        }
    }
}

impl SiteProfile {
    pub fn n_levels(&self) -> usize {
        self.pressure.len()
    }

    pub fn variable(&self, variable: ProfileVariable) -> Option<&MaskedProfile> {
        match variable {
            ProfileVariable::Rh => Some(&self.rh),
            ProfileVariable::Qv => Some(&self.qv),
            ProfileVariable::Temperature => Some(&self.temperature),
            ProfileVariable::Height => Some(&self.height),
            ProfileVariable::Epv => Some(&self.epv),
            ProfileVariable::O3 => Some(&self.o3),
            ProfileVariable::Co => self.co.as_ref(),
        }
    }

    pub fn variable_mut(&mut self, variable: ProfileVariable) -> Option<&mut MaskedProfile> {
        match variable {
            ProfileVariable::Rh => Some(&mut self.rh),
            ProfileVariable::Qv => Some(&mut self.qv),
            ProfileVariable::Temperature => Some(&mut self.temperature),
            ProfileVariable::Height => Some(&mut self.height),
            ProfileVariable::Epv => Some(&mut self.epv),
            ProfileVariable::O3 => Some(&mut self.o3),
            ProfileVariable::Co => self.co.as_mut(),
        }
    }

    /// Recompute the dry mole fraction from specific humidity.
    pub fn refresh_h2o_dmf(&mut self) {
        self.h2o_dmf = self.qv.map(met_common::physics::h2o_dmf_from_specific_humidity);
    }
}

/// A surface variable that can anchor the patching of a profile variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceVariable {
    Rh,
    Qv,
    Temperature,
    Height,
}

/// Surface values at one site, converted to the units of the `.mod` header.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceRecord {
    /// Surface pressure (hPa)
    pub pressure: f64,
    /// 2 m temperature (K)
    pub temperature: f64,
    /// 2 m specific humidity (kg/kg)
    pub qv: f64,
    /// Surface geometric altitude (km)
    pub height: f64,
    pub h2o_dmf: f64,
    pub h2o_wmf: f64,
    /// Fractional relative humidity
    pub rh: f64,
    /// Mean molecular weight (g/mol)
    pub mmw: f64,
    /// Sea level pressure (hPa)
    pub slp: f64,
    /// Blended tropopause pressure (hPa)
    pub tropp_blended: f64,
    /// PV tropopause pressure (hPa)
    pub tropp_pv: f64,
    /// Thermal tropopause pressure (hPa)
    pub tropp_thermal: f64,
    /// Tropopause temperature (K)
    pub tropt: f64,
    /// Solar zenith angle (degrees)
    pub sza: f64,
}

impl SurfaceRecord {
    pub fn value(&self, variable: SurfaceVariable) -> f64 {
        match variable {
            SurfaceVariable::Rh => self.rh,
            SurfaceVariable::Qv => self.qv,
            SurfaceVariable::Temperature => self.temperature,
            SurfaceVariable::Height => self.height,
        }
    }

    /// Relative humidity in percent, as written to the header.
    pub fn rh_percent(&self) -> f64 {
        100.0 * self.rh
    }
}

/// The final per-site, per-time record written to a `.mod` file.
///
/// Every profile column has one value per level; levels without data hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub site_lat: f64,
    /// Pressure (hPa)
    pub pressure: Vec<f64>,
    /// Temperature (K)
    pub temperature: Vec<f64>,
    /// Geometric altitude (km)
    pub height: Vec<f64>,
    /// Mean molecular weight (g/mol)
    pub mmw: Vec<f64>,
    pub h2o_dmf: Vec<f64>,
    /// Fractional relative humidity
    pub rh: Vec<f64>,
    /// Ertel potential vorticity (K m2 kg-1 s-1)
    pub epv: Vec<f64>,
    /// Potential temperature (K)
    pub pt: Vec<f64>,
    /// Equivalent latitude (degrees), when an interpolator was available
    pub eq_lat: Option<Vec<f64>>,
    /// Ozone mass mixing ratio (kg/kg)
    pub o3: Vec<f64>,
    /// CO mole fraction, when chemistry was loaded
    pub co: Option<Vec<f64>>,
    pub surface: SurfaceRecord,
}

impl ProfileRecord {
    pub fn n_levels(&self) -> usize {
        self.pressure.len()
    }
}
