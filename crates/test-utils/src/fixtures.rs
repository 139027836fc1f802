//! Common test fixtures for GEOS-style inputs.
//!
//! [`NcFixture`] writes small self-describing files with the layout of the
//! GEOS FP-IT products: `time`, `lev`, `lat`, `lon` coordinates, `f32` data
//! variables and the `LatitudeResolution`/`LongitudeResolution` globals.

use std::path::Path;

/// The 42 fixed pressure levels (hPa) of the GEOS FP-IT `Np` products,
/// ordered surface to space.
pub const GEOS_PRESSURE_LEVELS: [f64; 42] = [
    1000.0, 975.0, 950.0, 925.0, 900.0, 875.0, 850.0, 825.0, 800.0, 775.0, 750.0, 725.0, 700.0,
    650.0, 600.0, 550.0, 500.0, 450.0, 400.0, 350.0, 300.0, 250.0, 200.0, 150.0, 100.0, 70.0,
    50.0, 40.0, 30.0, 20.0, 10.0, 7.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.7, 0.5, 0.4, 0.3, 0.1,
];

/// Fill value used by GEOS files for missing data.
pub const GEOS_FILL_VALUE: f32 = 1.0e15;

/// Common grid specifications for testing.
pub mod grid {
    /// A regular lat/lon grid.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridSpec {
        pub lat_start: f64,
        pub lat_step: f64,
        pub nlat: usize,
        pub lon_start: f64,
        pub lon_step: f64,
        pub nlon: usize,
    }

    impl GridSpec {
        pub fn lats(&self) -> Vec<f64> {
            crate::regular_axis(self.lat_start, self.lat_step, self.nlat)
        }

        pub fn lons(&self) -> Vec<f64> {
            crate::regular_axis(self.lon_start, self.lon_step, self.nlon)
        }
    }

    /// GEOS FP-IT global grid (0.5 x 0.625 degrees)
    pub const GEOS_FPIT: GridSpec = GridSpec {
        lat_start: -90.0,
        lat_step: 0.5,
        nlat: 361,
        lon_start: -180.0,
        lon_step: 0.625,
        nlon: 576,
    };

    /// A coarse global grid (30 x 60 degrees) that is cheap to run through
    /// the equivalent latitude engine.
    pub const COARSE_GLOBAL: GridSpec = GridSpec {
        lat_start: -90.0,
        lat_step: 30.0,
        nlat: 7,
        lon_start: -180.0,
        lon_step: 60.0,
        nlon: 6,
    };
}

/// Whether a variable has a vertical dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarShape {
    /// `(time, lat, lon)`
    Surface,
    /// `(time, lev, lat, lon)`
    Profile,
}

#[derive(Debug, Clone)]
struct NcVariable {
    name: String,
    shape: VarShape,
    data: Vec<f32>,
    attributes: Vec<(String, f32)>,
}

/// Builder for a small GEOS-like NetCDF file.
///
/// ```ignore
/// use test_utils::{NcFixture, VarShape};
///
/// NcFixture::new(vec![-10.0, 10.0], vec![0.0, 20.0])
///     .with_levels(vec![1000.0, 900.0])
///     .with_variable("T", VarShape::Profile, vec![280.0; 8])
///     .write(&path)
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct NcFixture {
    lats: Vec<f64>,
    lons: Vec<f64>,
    levels: Option<Vec<f64>>,
    times: Vec<f64>,
    time_units: String,
    lat_resolution: f64,
    lon_resolution: f64,
    variables: Vec<NcVariable>,
}

impl NcFixture {
    /// One time step at minute 0 of 2018-01-01; resolutions taken from the axis spacing.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        let spacing = |axis: &[f64]| if axis.len() > 1 { axis[1] - axis[0] } else { 1.0 };
        Self {
            lat_resolution: spacing(&lats),
            lon_resolution: spacing(&lons),
            lats,
            lons,
            levels: None,
            times: vec![0.0],
            time_units: "minutes since 2018-01-01 00:00:00".to_string(),
            variables: Vec::new(),
        }
    }

    pub fn with_levels(mut self, levels: Vec<f64>) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn with_times(mut self, units: &str, times: Vec<f64>) -> Self {
        self.time_units = units.to_string();
        self.times = times;
        self
    }

    pub fn with_resolution(mut self, lat: f64, lon: f64) -> Self {
        self.lat_resolution = lat;
        self.lon_resolution = lon;
        self
    }

    /// Add a variable; `data` is in `(time, [lev,] lat, lon)` row-major order.
    pub fn with_variable(mut self, name: &str, shape: VarShape, data: Vec<f32>) -> Self {
        self.variables.push(NcVariable {
            name: name.to_string(),
            shape,
            data,
            attributes: Vec::new(),
        });
        self
    }

    /// Attach a numeric attribute (e.g. `scale_factor`, `_FillValue`) to a
    /// previously added variable.
    pub fn with_attribute(mut self, variable: &str, name: &str, value: f32) -> Self {
        if let Some(var) = self.variables.iter_mut().find(|v| v.name == variable) {
            var.attributes.push((name.to_string(), value));
        }
        self
    }

    /// Number of values a variable of `shape` must hold.
    pub fn len_of(&self, shape: VarShape) -> usize {
        let nlev = match shape {
            VarShape::Surface => 1,
            VarShape::Profile => self.levels.as_ref().map(|l| l.len()).unwrap_or(1),
        };
        self.times.len() * nlev * self.lats.len() * self.lons.len()
    }

    pub fn write(&self, path: &Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;

        file.add_dimension("time", self.times.len())?;
        if let Some(levels) = &self.levels {
            file.add_dimension("lev", levels.len())?;
        }
        file.add_dimension("lat", self.lats.len())?;
        file.add_dimension("lon", self.lons.len())?;

        file.add_attribute("LatitudeResolution", self.lat_resolution)?;
        file.add_attribute("LongitudeResolution", self.lon_resolution)?;

        {
            let mut var = file.add_variable::<f64>("time", &["time"])?;
            var.put_attribute("units", self.time_units.as_str())?;
            var.put_values(&self.times, ..)?;
        }
        if let Some(levels) = &self.levels {
            let mut var = file.add_variable::<f64>("lev", &["lev"])?;
            var.put_attribute("units", "hPa")?;
            var.put_values(levels, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>("lat", &["lat"])?;
            var.put_attribute("units", "degrees_north")?;
            var.put_values(&self.lats, ..)?;
        }
        {
            let mut var = file.add_variable::<f64>("lon", &["lon"])?;
            var.put_attribute("units", "degrees_east")?;
            var.put_values(&self.lons, ..)?;
        }

        for variable in &self.variables {
            let dims: &[&str] = match variable.shape {
                VarShape::Surface => &["time", "lat", "lon"],
                VarShape::Profile => &["time", "lev", "lat", "lon"],
            };
            let mut var = file.add_variable::<f32>(&variable.name, dims)?;
            for (name, value) in &variable.attributes {
                var.put_attribute(name, *value)?;
            }
            var.put_values(&variable.data, ..)?;
        }

        Ok(())
    }
}
