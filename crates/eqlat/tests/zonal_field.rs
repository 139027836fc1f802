//! Equivalent latitude of zonally symmetric PV fields.

use chrono::{TimeZone, Utc};
use eqlat::{EqLatError, EqLatInput, EquivalentLatitudeEngine, EquivalentLatitudeMap, LevelPressure};
use grid_processor::GridAxes;
use ndarray::Array3;
use test_utils::{assert_approx_eq, global_lat_axis, global_lon_axis};

const LEVELS: [f64; 3] = [1000.0, 500.0, 200.0];

fn axes() -> GridAxes {
    GridAxes::new(global_lat_axis(2.0), global_lon_axis(5.0)).unwrap()
}

/// PV of `amplitude * sin(lat)` PVU at every level, isothermal 300 K.
fn zonal_input(axes: &GridAxes, amplitude: f64) -> EqLatInput {
    let shape = (LEVELS.len(), axes.n_lats(), axes.n_lons());
    let epv = Array3::from_shape_fn(shape, |(_, j, _)| amplitude * 1.0e-6 * axes.lats[j].to_radians().sin());
    EqLatInput {
        epv,
        temperature: Array3::from_elem(shape, 300.0),
        pressure: LevelPressure::Fixed(LEVELS.to_vec()),
    }
}

#[test]
fn test_sine_pv_recovers_latitude() {
    let axes = axes();
    let engine = EquivalentLatitudeEngine::new(&axes, 2.0, 5.0, true);
    let interpolator = engine.compute(&zonal_input(&axes, 10.0)).unwrap();

    for lat in [-45.0_f64, -20.0, 0.0, 20.0, 45.0, 60.0] {
        let pv = 10.0 * lat.to_radians().sin();
        assert_approx_eq!(interpolator.evaluate(pv, 400.0), lat, 1.0);
    }
}

#[test]
fn test_range_and_ordering() {
    let axes = axes();
    let engine = EquivalentLatitudeEngine::new(&axes, 2.0, 5.0, true);
    let interpolator = engine.compute(&zonal_input(&axes, 10.0)).unwrap();

    let mut previous = f64::NEG_INFINITY;
    for &pv in interpolator.pv_grid() {
        let el = interpolator.evaluate(pv, 350.0);
        assert!((-90.0..=90.0).contains(&el), "EL {} for PV {}", el, pv);
        assert!(el >= previous - 1e-9);
        previous = el;
    }
    assert_approx_eq!(interpolator.evaluate(-10.0, 350.0), -90.0, 1e-9);
    assert!(interpolator.evaluate(10.0, 350.0) > 85.0);
}

#[test]
fn test_native_pressure_field_matches_fixed_levels() {
    let axes = axes();
    let engine = EquivalentLatitudeEngine::new(&axes, 2.0, 5.0, true);
    let fixed = zonal_input(&axes, 10.0);
    let pressure = Array3::from_shape_fn(fixed.temperature.dim(), |(k, _, _)| LEVELS[k]);
    let native = EqLatInput {
        pressure: LevelPressure::Field(pressure),
        ..fixed.clone()
    };

    let a = engine.compute(&fixed).unwrap();
    let b = engine.compute(&native).unwrap();
    assert_eq!(a, b);

    let field = engine.compute_field(&native).unwrap();
    assert_eq!(field.dim(), fixed.temperature.dim());
    assert_approx_eq!(field[[1, 45, 0]], 0.0, 1.0);
}

#[test]
fn test_fill_values_below_ground_are_backfilled() {
    let axes = axes();
    let engine = EquivalentLatitudeEngine::new(&axes, 2.0, 5.0, true);
    let clean = zonal_input(&axes, 10.0);
    let mut filled = clean.clone();
    // Bottom level at every point holds a fill value
    filled.epv.index_axis_mut(ndarray::Axis(0), 0).fill(1.0e15);
    filled.temperature.index_axis_mut(ndarray::Axis(0), 0).fill(1.0e15);

    let interpolator = engine.compute(&filled).unwrap();
    assert_approx_eq!(interpolator.evaluate(10.0 * 20.0_f64.to_radians().sin(), 400.0), 20.0, 1.0);
}

#[test]
fn test_map_built_in_parallel() {
    let axes = axes();
    let engine = EquivalentLatitudeEngine::new(&axes, 2.0, 5.0, true);
    let sources: Vec<_> = (0..3)
        .map(|h| (Utc.with_ymd_and_hms(2018, 1, 1, 3 * h, 0, 0).unwrap(), 10.0 + h as f64))
        .collect();

    let map = EquivalentLatitudeMap::build(&engine, &sources, Some(2), |&amplitude| {
        Ok::<_, EqLatError>(zonal_input(&axes, amplitude))
    })
    .unwrap();

    assert_eq!(map.len(), 3);
    let t = Utc.with_ymd_and_hms(2018, 1, 1, 6, 0, 0).unwrap();
    let el = map.get(&t).unwrap().evaluate(12.0 * 30.0_f64.to_radians().sin(), 400.0);
    assert_approx_eq!(el, 30.0, 1.0);
}
