//! Reading synthetic GEOS-layout files written with the netcdf library.

use chrono::{TimeZone, Utc};
use netcdf_parser::{DatasetReader, NetCdfError};
use test_utils::{assert_approx_eq, temp_test_dir, NcFixture, VarShape, GEOS_FILL_VALUE};

fn small_fixture() -> NcFixture {
    NcFixture::new(vec![-10.0, 0.0, 10.0], vec![-20.0, 0.0, 20.0, 40.0])
        .with_levels(vec![1000.0, 850.0])
        .with_times("minutes since 2018-01-01 00:00:00", vec![0.0, 180.0])
}

#[test]
fn test_profile_and_surface_fields() {
    let dir = temp_test_dir();
    let path = dir.path().join("GEOS.fpit.asm.inst3_3d_asm_Np.GEOS5124.20180101_0000.V01.nc4");

    let fixture = small_fixture();
    let n_profile = fixture.len_of(VarShape::Profile);
    let n_surface = fixture.len_of(VarShape::Surface);
    let temperature: Vec<f32> = (0..n_profile).map(|i| 200.0 + i as f32).collect();
    let mut surface_pressure = vec![101_325.0_f32; n_surface];
    surface_pressure[5] = GEOS_FILL_VALUE;

    fixture
        .with_variable("T", VarShape::Profile, temperature)
        .with_variable("PS", VarShape::Surface, surface_pressure)
        .with_attribute("PS", "_FillValue", GEOS_FILL_VALUE)
        .with_attribute("PS", "scale_factor", 0.01)
        .write(&path)
        .unwrap();

    let reader = DatasetReader::open(&path).unwrap();
    let axes = reader.axes().unwrap();
    assert_eq!(axes.n_lats(), 3);
    assert_eq!(axes.n_lons(), 4);
    assert_eq!(reader.n_levels(), 2);
    assert!(!reader.is_native());
    assert!(reader.ensure_level_type(false).is_ok());
    assert!(matches!(
        reader.ensure_level_type(true),
        Err(NetCdfError::LevelTypeMismatch { .. })
    ));
    assert_eq!(reader.levels().unwrap(), Some(vec![1000.0, 850.0]));

    let t = reader.read_profile_field("T").unwrap();
    assert_eq!(t.data.dim(), (2, 2, 3, 4));
    assert_eq!(t.data[[0, 1, 0, 0]], 212.0);
    assert_eq!(t.scale_factor, 1.0);
    assert_eq!(t.add_offset, 0.0);

    let ps = reader.read_field("PS").unwrap();
    assert_eq!(ps.data.dim(), (2, 1, 3, 4));
    assert_approx_eq!(ps.scale_factor, 0.01, 1e-7);
    assert!(!ps.is_valid_raw(ps.data[[0, 0, 1, 1]]));
    assert!(ps.is_valid_raw(ps.data[[0, 0, 0, 0]]));
}

#[test]
fn test_time_axis_and_resolution() {
    let dir = temp_test_dir();
    let path = dir.path().join("times.nc4");
    let fixture = small_fixture().with_resolution(0.5, 0.625);
    let n = fixture.len_of(VarShape::Surface);
    fixture
        .with_variable("PS", VarShape::Surface, vec![1.0; n])
        .write(&path)
        .unwrap();

    let reader = DatasetReader::open(&path).unwrap();
    let times = reader.times().unwrap();
    assert_eq!(
        times,
        vec![
            Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 1, 1, 3, 0, 0).unwrap(),
        ]
    );
    let (hours, _) = reader.time_hours().unwrap();
    assert_eq!(hours, vec![0.0, 3.0]);
    assert_eq!(reader.resolution().unwrap(), (0.5, 0.625));
}

#[test]
fn test_missing_variable() {
    let dir = temp_test_dir();
    let path = dir.path().join("empty.nc4");
    small_fixture().write(&path).unwrap();

    let reader = DatasetReader::open(&path).unwrap();
    assert!(matches!(
        reader.read_field("EPV"),
        Err(NetCdfError::MissingData { .. })
    ));
    assert!(matches!(
        reader.read_field("lat"),
        Err(NetCdfError::UnexpectedDimensions { .. })
    ));
}

#[test]
fn test_native_file_is_flipped_and_pressure_derived() {
    let dir = temp_test_dir();
    let path = dir.path().join("native.nc4");
    let levels: Vec<f64> = (1..=72).map(f64::from).collect();
    let fixture = NcFixture::new(vec![-10.0, 10.0], vec![0.0, 20.0]).with_levels(levels);
    let n = fixture.len_of(VarShape::Profile);
    // Layer index stored space to surface; each column holds 0..72
    let level_index: Vec<f32> = (0..n).map(|i| (i / 4) as f32).collect();
    fixture
        .with_variable("T", VarShape::Profile, level_index)
        .with_variable("DELP", VarShape::Profile, vec![1000.0; n])
        .write(&path)
        .unwrap();

    let reader = DatasetReader::open(&path).unwrap();
    assert!(reader.is_native());

    let t = reader.read_profile_field("T").unwrap();
    assert_eq!(t.column(0, 0, 0)[0], 71.0);
    assert_eq!(t.column(0, 0, 0)[71], 0.0);

    let p = reader.read_native_pressure().unwrap();
    let column = p.column(0, 1, 1);
    // Surface-most layer: edges 1 + 71 * 1000 and 1 + 72 * 1000 Pa
    assert_approx_eq!(column[0], (1.0 + 71_500.0) / 100.0, 1e-9);
    assert_approx_eq!(column[71], (1.0 + 500.0) / 100.0, 1e-9);
}
