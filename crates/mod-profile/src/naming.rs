//! Output file names and directories.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

/// Name of a `.mod` file for a site and time.
///
/// `<PRODUCT>_<YYYYMMDDHH>Z_<lat><N|S>_<lon><E|W>.mod`. Coordinates are
/// rounded to whole degrees unless `keep_latlon_prec` is set. When the file
/// is not named in UTC the time is the site's local solar time and the `Z`
/// is dropped.
pub fn mod_file_name(
    product: &str,
    utc_time: DateTime<Utc>,
    lat: f64,
    lon_180: f64,
    keep_latlon_prec: bool,
    in_utc: bool,
) -> String {
    let time = if in_utc { utc_time } else { local_solar_time(utc_time, lon_180) };
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon_180 >= 0.0 { 'E' } else { 'W' };
    let zone = if in_utc { "Z" } else { "" };

    let (lat_str, lon_str) = if keep_latlon_prec {
        (format!("{:05.2}", lat.abs()), format!("{:06.2}", lon_180.abs()))
    } else {
        (
            format!("{:02}", lat.abs().round_ties_even() as i64),
            format!("{:03}", lon_180.abs().round_ties_even() as i64),
        )
    };

    format!(
        "{}_{}{}_{}{}_{}{}.mod",
        product.to_uppercase(),
        time.format("%Y%m%d%H"),
        zone,
        lat_str,
        ns,
        lon_str,
        ew
    )
}

/// Local solar time at a longitude, one hour per 15 degrees.
pub fn local_solar_time(utc_time: DateTime<Utc>, lon_180: f64) -> DateTime<Utc> {
    let offset_ms = (lon_180 / 15.0 * 3_600_000.0).round() as i64;
    utc_time + Duration::milliseconds(offset_ms)
}

/// Where vertical and slant files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    flat: bool,
}

impl OutputLayout {
    /// Files go under `save_path/<product>/<site>/{vertical,slant}`, or
    /// straight into `save_path` when flat.
    pub fn new(save_path: &Path, product: &str, flat: bool) -> Self {
        let root = if flat { save_path.to_path_buf() } else { save_path.join(product) };
        Self { root, flat }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_flat(&self) -> bool {
        self.flat
    }

    pub fn vertical_dir(&self, site: &str) -> PathBuf {
        if self.flat {
            self.root.clone()
        } else {
            self.root.join(site).join("vertical")
        }
    }

    /// Slant directory; flat layouts have none.
    pub fn slant_dir(&self, site: &str) -> Option<PathBuf> {
        (!self.flat).then(|| self.root.join(site).join("slant"))
    }
}
