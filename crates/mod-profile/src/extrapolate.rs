//! Filling of profile levels that lie below the model surface.
//!
//! On fixed pressure levels, levels with a pressure greater than the
//! local surface pressure have no data. They are patched in pressure space
//! from the surface value and the first valid level above it; variables
//! without a surface counterpart repeat that level's value downward.

use grid_processor::linear_through;
use tracing::debug;

use crate::error::{ProfileError, Result};
use crate::record::{ProfileVariable, SiteProfile, SurfaceRecord, SurfaceVariable};

/// A profile variable and the surface variable used to patch it, if any.
pub type Companion = (ProfileVariable, Option<SurfaceVariable>);

/// Companions used for fixed pressure level products.
pub const FIXED_LEVEL_COMPANIONS: [Companion; 6] = [
    (ProfileVariable::Rh, Some(SurfaceVariable::Rh)),
    (ProfileVariable::Qv, Some(SurfaceVariable::Qv)),
    (ProfileVariable::Temperature, Some(SurfaceVariable::Temperature)),
    (ProfileVariable::Height, Some(SurfaceVariable::Height)),
    (ProfileVariable::Epv, None),
    (ProfileVariable::O3, None),
];

/// Companions for fixed pressure level products, with CO when present.
pub fn fixed_level_companions(with_co: bool) -> Vec<Companion> {
    let mut companions = FIXED_LEVEL_COMPANIONS.to_vec();
    if with_co {
        companions.push((ProfileVariable::Co, None));
    }
    companions
}

/// Validity mask shared by every patched variable.
fn shared_mask(profile: &SiteProfile, companions: &[Companion]) -> Result<Vec<bool>> {
    let mut present = companions
        .iter()
        .filter_map(|(var, _)| profile.variable(*var).map(|p| (*var, p)));

    let Some((reference, first)) = present.next() else {
        return Ok(vec![true; profile.n_levels()]);
    };
    for (var, p) in present {
        if !p.same_mask(first) {
            return Err(ProfileError::InconsistentMask {
                variable: var.name(),
                reference: reference.name(),
            });
        }
    }
    Ok(first.valid.clone())
}

/// Patch masked levels near the surface in place.
///
/// The dry mole fraction is recomputed from the patched specific humidity.
/// Fails if the variables do not share one validity mask, if any pressure
/// level is masked, or if no valid level lies above the surface.
pub fn extrapolate_to_surface(
    profile: &mut SiteProfile,
    surface: &SurfaceRecord,
    companions: &[Companion],
) -> Result<()> {
    let valid = shared_mask(profile, companions)?;
    if !profile.pressure.all_valid() {
        return Err(ProfileError::MaskedPressure);
    }
    if valid.iter().all(|&v| v) {
        return Ok(());
    }

    let pressure = profile.pressure.values.clone();
    let surf_p = surface.pressure;
    let first_valid = valid.iter().position(|&v| v).ok_or(ProfileError::NoValidLevel)?;

    // Index of the level the patch is anchored on; levels below it are filled
    let anchor = if surf_p > pressure[first_valid] {
        let missing: Vec<usize> = (0..valid.len()).filter(|&k| !valid[k]).collect();
        for &(var, surf_var) in companions {
            let Some(surf_var) = surf_var else { continue };
            let surf_value = surface.value(surf_var);
            if let Some(p) = profile.variable_mut(var) {
                let first_value = p.values[first_valid];
                for &k in &missing {
                    p.set(k, linear_through(surf_p, surf_value, pressure[first_valid], first_value, pressure[k]));
                }
            }
        }
        first_valid
    } else {
        let anchor = (0..valid.len())
            .find(|&k| valid[k] && pressure[k] < surf_p)
            .ok_or(ProfileError::NoLevelAboveSurface {
                surface_pressure: surf_p,
            })?;
        for &(var, surf_var) in companions {
            let Some(surf_var) = surf_var else { continue };
            let surf_value = surface.value(surf_var);
            if let Some(p) = profile.variable_mut(var) {
                let anchor_value = p.values[anchor];
                for k in 0..anchor {
                    p.set(k, linear_through(surf_p, surf_value, pressure[anchor], anchor_value, pressure[k]));
                }
            }
        }
        anchor
    };

    for &(var, surf_var) in companions {
        if surf_var.is_some() {
            continue;
        }
        if let Some(p) = profile.variable_mut(var) {
            let anchor_value = p.values[anchor];
            for k in 0..anchor {
                p.set(k, anchor_value);
            }
        }
    }

    profile.refresh_h2o_dmf();

    debug!(
        surface_pressure = surf_p,
        anchor_pressure = pressure[anchor],
        patched_levels = valid.iter().filter(|&&v| !v).count(),
        "Patched levels below the surface"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_processor::MaskedProfile;
    use test_utils::assert_approx_eq;

    const LEVELS: [f64; 5] = [1000.0, 975.0, 950.0, 925.0, 900.0];

    fn profile(valid: [bool; 5]) -> SiteProfile {
        let make = |values: [f64; 5]| MaskedProfile::new(values.to_vec(), valid.to_vec());
        let mut p = SiteProfile {
            pressure: MaskedProfile::filled(LEVELS.to_vec()),
            temperature: make([0.0, 0.0, 280.0, 278.0, 276.0]),
            height: make([0.0, 0.0, 0.5, 0.75, 1.0]),
            qv: make([0.0, 0.0, 0.008, 0.007, 0.006]),
            rh: make([0.0, 0.0, 0.6, 0.55, 0.5]),
            epv: make([0.0, 0.0, 1e-7, 2e-7, 3e-7]),
            o3: make([0.0, 0.0, 4e-8, 4e-8, 4e-8]),
            co: None,
            h2o_dmf: MaskedProfile::masked(5),
        };
        p.refresh_h2o_dmf();
        p
    }

    fn surface(pressure: f64) -> SurfaceRecord {
        SurfaceRecord {
            pressure,
            temperature: 290.0,
            qv: 0.01,
            height: 0.1,
            rh: 0.7,
            ..Default::default()
        }
    }

    #[test]
    fn test_interpolates_between_surface_and_first_level() {
        let mut p = profile([false, false, true, true, true]);
        extrapolate_to_surface(&mut p, &surface(1010.0), &FIXED_LEVEL_COMPANIONS).unwrap();

        assert!(p.temperature.all_valid());
        // 975 hPa lies between the surface (1010) and 950
        let t = p.temperature.get(1).unwrap();
        assert!(t > 280.0 && t < 290.0);
        assert_approx_eq!(t, 290.0 + (280.0 - 290.0) * (975.0 - 1010.0) / (950.0 - 1010.0), 1e-9);
        // Without a surface counterpart the first valid value is repeated
        assert_eq!(p.epv.get(0), Some(1e-7));
        assert_eq!(p.o3.get(1), Some(4e-8));
    }

    #[test]
    fn test_high_site_extrapolates_from_level_above_surface() {
        // Surface at 940 hPa: 950 hPa is valid but below ground
        let mut p = profile([false, false, true, true, true]);
        extrapolate_to_surface(&mut p, &surface(940.0), &FIXED_LEVEL_COMPANIONS).unwrap();

        let expected = |pr: f64| linear_through(940.0, 290.0, 925.0, 278.0, pr);
        for k in 0..3 {
            assert_approx_eq!(p.temperature.get(k).unwrap(), expected(LEVELS[k]), 1e-9);
        }
        assert_eq!(p.temperature.get(3), Some(278.0));
        assert_eq!(p.epv.get(0), Some(2e-7));
        assert_eq!(p.epv.get(2), Some(2e-7));
    }

    #[test]
    fn test_mismatched_masks_are_fatal() {
        let mut p = profile([false, false, true, true, true]);
        p.o3.set(1, 4e-8);
        let err = extrapolate_to_surface(&mut p, &surface(1010.0), &FIXED_LEVEL_COMPANIONS).unwrap_err();
        assert!(matches!(err, ProfileError::InconsistentMask { variable: "O3", .. }));
    }

    #[test]
    fn test_masked_pressure_is_fatal() {
        let mut p = profile([false, true, true, true, true]);
        p.pressure.mask(0);
        let err = extrapolate_to_surface(&mut p, &surface(1010.0), &FIXED_LEVEL_COMPANIONS).unwrap_err();
        assert!(matches!(err, ProfileError::MaskedPressure));
    }

    #[test]
    fn test_fully_valid_profile_is_untouched() {
        let mut p = profile([true; 5]);
        let before = p.clone();
        extrapolate_to_surface(&mut p, &surface(800.0), &FIXED_LEVEL_COMPANIONS).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_co_joins_the_patch() {
        let mut p = profile([false, false, true, true, true]);
        p.co = Some(MaskedProfile::new(vec![0.0, 0.0, 9e-8, 8e-8, 7e-8], p.temperature.valid.clone()));
        extrapolate_to_surface(&mut p, &surface(1010.0), &fixed_level_companions(true)).unwrap();
        assert_eq!(p.co.as_ref().and_then(|co| co.get(0)), Some(9e-8));
    }
}
