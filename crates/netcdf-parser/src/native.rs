//! Low-level helpers around the native netcdf library.

use std::sync::Once;

use grid_processor::GriddedField;
use ndarray::{Array4, Axis};

/// Number of levels in a GEOS native (eta) product.
pub const NATIVE_LEVEL_COUNT: usize = 72;

/// Pressure at the top edge of the model atmosphere (Pa).
const MODEL_TOP_PA: f64 = 1.0;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Call this early in `main()`, before any file is opened. Safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

pub(crate) fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Numeric variable attribute, if present.
pub(crate) fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// String variable attribute, if present.
pub(crate) fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Global attribute as a number. Some producers store resolutions as text.
pub(crate) fn get_global_f64(file: &netcdf::File, name: &str) -> Option<f64> {
    let value = file.attribute(name)?.value().ok()?;
    match value {
        netcdf::AttributeValue::Str(s) => s.trim().parse().ok(),
        other => f64::try_from(other).ok(),
    }
}

/// Whether a level count identifies a native (eta) product.
pub fn is_native_level_count(n_levels: usize) -> bool {
    n_levels == NATIVE_LEVEL_COUNT
}

/// Mid-layer pressures (hPa) of one column of layer thicknesses.
///
/// `delp` holds layer thickness in Pa, ordered space to surface as in the
/// files. Edges start at 0.01 hPa and accumulate downward; each layer's
/// pressure is the mean of its two edges. Output keeps the input order.
pub fn pressure_from_delp(delp: &[f64]) -> Vec<f64> {
    let mut top = MODEL_TOP_PA;
    delp.iter()
        .map(|&dp| {
            let bottom = top + dp;
            let mid = 0.5 * (top + bottom) / 100.0;
            top = bottom;
            mid
        })
        .collect()
}

/// Mid-layer pressure field (hPa) from a `DELP` field.
///
/// The result has the same level orientation as `delp`, so a DELP field
/// already flipped to surface-to-space must be flipped back first; use
/// [`pressure_field_from_delp_surface_first`] for that case.
pub fn pressure_field_from_delp(delp: &GriddedField) -> GriddedField {
    let physical = delp.physical_values();
    let mut pressure = Array4::<f64>::zeros(physical.raw_dim());
    for (mut out, column) in pressure
        .lanes_mut(Axis(1))
        .into_iter()
        .zip(physical.lanes(Axis(1)))
    {
        let column: Vec<f64> = column.to_vec();
        for (dst, src) in out.iter_mut().zip(pressure_from_delp(&column)) {
            *dst = src;
        }
    }
    GriddedField::new("PL", pressure).with_units("hPa")
}

/// Mid-layer pressure for a DELP field already ordered surface to space.
pub fn pressure_field_from_delp_surface_first(delp: &GriddedField) -> GriddedField {
    let mut space_first = delp.clone();
    space_first.flip_levels();
    let mut pressure = pressure_field_from_delp(&space_first);
    pressure.flip_levels();
    pressure
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_pressure_from_delp() {
        // 1 Pa top, then 99 Pa and 900 Pa layers
        let p = pressure_from_delp(&[99.0, 900.0]);
        assert_approx_eq!(p[0], 0.5, 1e-12);
        assert_approx_eq!(p[1], 5.5, 1e-12);
    }

    #[test]
    fn test_pressure_field_orientation() {
        let data = Array4::from_shape_vec((1, 3, 1, 1), vec![99.0, 900.0, 9000.0]).unwrap();
        let delp = GriddedField::new("DELP", data);
        let space_first = pressure_field_from_delp(&delp);
        assert!(space_first.column(0, 0, 0).windows(2).into_iter().all(|w| w[1] > w[0]));

        let mut flipped = delp.clone();
        flipped.flip_levels();
        let surface_first = pressure_field_from_delp_surface_first(&flipped);
        let mut expected = space_first.column(0, 0, 0).to_vec();
        expected.reverse();
        assert_eq!(surface_first.column(0, 0, 0).to_vec(), expected);
    }

    #[test]
    fn test_native_detection() {
        assert!(is_native_level_count(72));
        assert!(!is_native_level_count(42));
    }
}
