//! Writing profile records as GGG `.mod` text files.
//!
//! Layout:
//!
//! ```text
//! 7  <n columns>
//! <constants>
//! <surface labels>
//! <surface values>
//! <version>
//! <column units>
//! <column names>
//! <one line per level>
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ProfileError, Result};
use crate::format::{centered, NumberFormat};
use crate::record::ProfileRecord;

/// Provenance line written below the surface block.
pub const VERSION: &str = concat!("mod-maker   ", env!("CARGO_PKG_VERSION"));

/// Number of header lines, declared on the first line.
pub const HEADER_LINES: usize = 7;

const COLUMN_SPACING: &str = "    ";

const SURFACE_LABELS: &str = "Pressure  Temperature     Height     MMW        H2O      RH         SLP        TROPPB        TROPPV      TROPPT       TROPT       SZA";

/// A profile column of the `.mod` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModColumn {
    Pressure,
    Temperature,
    Height,
    Mmw,
    H2o,
    Rh,
    Epv,
    PotentialTemperature,
    EqLat,
    O3,
    Co,
}

/// How a column is printed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnFormat {
    pub format: NumberFormat,
    /// Nominal column width; the format never exceeds it.
    pub total_width: usize,
    pub name: &'static str,
    pub units: &'static str,
    /// Factor applied before printing and in the summary.
    pub scale: f64,
}

impl ModColumn {
    pub const ALL: [ModColumn; 11] = [
        Self::Pressure,
        Self::Temperature,
        Self::Height,
        Self::Mmw,
        Self::H2o,
        Self::Rh,
        Self::Epv,
        Self::PotentialTemperature,
        Self::EqLat,
        Self::O3,
        Self::Co,
    ];

    pub fn format(&self) -> ColumnFormat {
        let (format, total_width, name, units, scale) = match self {
            Self::Pressure => (NumberFormat::exp(9, 3), 13, "Pressure", "mbar", 1.0),
            Self::Temperature => (NumberFormat::fixed(11, 3), 13, "Temperature", "Kelvin", 1.0),
            Self::Height => (NumberFormat::fixed(7, 3), 9, "Height", "km", 1.0),
            Self::Mmw => (NumberFormat::fixed(7, 4), 12, "MMW", "g/mole", 1.0),
            Self::H2o => (NumberFormat::exp(10, 3), 12, "H2O", "DMF", 1.0),
            Self::Rh => (NumberFormat::fixed(6, 1), 8, "RH", "%", 100.0),
            Self::Epv => (NumberFormat::exp(10, 3), 15, "EPV", "K.m+2/kg/s", 1.0),
            Self::PotentialTemperature => (NumberFormat::fixed(8, 3), 11, "PT", "Kelvin", 1.0),
            Self::EqLat => (NumberFormat::fixed(7, 3), 11, "EqL", "degrees", 1.0),
            Self::O3 => (NumberFormat::exp(9, 3), 11, "O3", "kg/kg", 1.0),
            Self::Co => (NumberFormat::exp(9, 3), 11, "CO", "mol/mol", 1.0),
        };
        ColumnFormat {
            format,
            total_width,
            name,
            units,
            scale,
        }
    }

    /// Unscaled values of this column, if the record carries it.
    pub fn values<'a>(&self, record: &'a ProfileRecord) -> Option<&'a [f64]> {
        match self {
            Self::Pressure => Some(&record.pressure),
            Self::Temperature => Some(&record.temperature),
            Self::Height => Some(&record.height),
            Self::Mmw => Some(&record.mmw),
            Self::H2o => Some(&record.h2o_dmf),
            Self::Rh => Some(&record.rh),
            Self::Epv => Some(&record.epv),
            Self::PotentialTemperature => Some(&record.pt),
            Self::EqLat => record.eq_lat.as_deref(),
            Self::O3 => Some(&record.o3),
            Self::Co => record.co.as_deref(),
        }
    }
}

/// Columns written for a record, in file order.
///
/// Equivalent latitude sits before ozone and CO comes last, each only when
/// present.
pub fn column_order(record: &ProfileRecord) -> Vec<ModColumn> {
    ModColumn::ALL
        .into_iter()
        .filter(|col| col.values(record).is_some())
        .collect()
}

/// Constants written on the second line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModConstants {
    pub earth_radius: f64,
    pub ecc2: f64,
    pub obs_lat: f64,
    pub surface_gravity: f64,
    pub profile_base_geometric_alt: f64,
    pub base_pressure: f64,
    pub tropopause_pressure: f64,
}

impl ModConstants {
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            earth_radius: 6378.137,
            ecc2: 6.0e-5,
            obs_lat: record.site_lat,
            surface_gravity: 9.81,
            profile_base_geometric_alt: record.height.first().copied().unwrap_or(f64::NAN),
            base_pressure: 1013.25,
            tropopause_pressure: record.surface.tropp_blended,
        }
    }

    fn render(&self) -> String {
        let fields = [
            (NumberFormat::fixed(8, 3), self.earth_radius),
            (NumberFormat::exp(11, 4), self.ecc2),
            (NumberFormat::fixed(7, 3), self.obs_lat),
            (NumberFormat::fixed(5, 3), self.surface_gravity),
            (NumberFormat::fixed(8, 3), self.profile_base_geometric_alt),
            (NumberFormat::fixed(8, 3), self.base_pressure),
            (NumberFormat::fixed(8, 3), self.tropopause_pressure),
        ];
        let cells: Vec<String> = fields.iter().map(|(f, v)| f.format(*v)).collect();
        cells.join(" ")
    }
}

/// Numeric content of a written file, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Scaled column values as printed; missing levels are NaN.
    pub columns: BTreeMap<String, Vec<f64>>,
    pub constants: ModConstants,
}

impl ProfileSummary {
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

fn surface_line(record: &ProfileRecord) -> String {
    let s = &record.surface;
    let exp = NumberFormat::exp(9, 3);
    let fields = [
        (exp, s.pressure, COLUMN_SPACING),
        (NumberFormat::fixed(7, 3), s.temperature, COLUMN_SPACING),
        (NumberFormat::fixed(7, 3), s.height, COLUMN_SPACING),
        (NumberFormat::fixed(7, 4), s.mmw, COLUMN_SPACING),
        (exp, s.h2o_dmf, ""),
        (NumberFormat::fixed(6, 1), s.rh_percent(), COLUMN_SPACING),
        (exp, s.slp, COLUMN_SPACING),
        (exp, s.tropp_blended, COLUMN_SPACING),
        (exp, s.tropp_pv, COLUMN_SPACING),
        (exp, s.tropp_thermal, COLUMN_SPACING),
        (NumberFormat::fixed(7, 3), s.tropt, COLUMN_SPACING),
        (NumberFormat::fixed(7, 3), s.sza, ""),
    ];
    fields
        .iter()
        .map(|(f, v, sep)| format!("{}{}", f.format(*v), sep))
        .collect()
}

fn header_line(columns: &[ModColumn], text: impl Fn(&ColumnFormat) -> &'static str) -> String {
    columns
        .iter()
        .map(|col| {
            let fmt = col.format();
            format!("{}{}", centered(text(&fmt), fmt.format.width()), COLUMN_SPACING)
        })
        .collect()
}

/// Render a record to the `.mod` text and its numeric summary.
pub fn render(record: &ProfileRecord, version: &str) -> (String, ProfileSummary) {
    let columns = column_order(record);
    let constants = ModConstants::from_record(record);

    let mut out = String::new();
    out.push_str(&format!("{}  {}\n", HEADER_LINES, columns.len()));
    out.push_str(&constants.render());
    out.push('\n');
    out.push_str(SURFACE_LABELS);
    out.push('\n');
    out.push_str(&surface_line(record));
    out.push('\n');
    out.push_str(version);
    out.push('\n');
    out.push_str(&header_line(&columns, |f| f.units));
    out.push('\n');
    out.push_str(&header_line(&columns, |f| f.name));
    out.push('\n');

    let scaled: Vec<(ColumnFormat, Vec<f64>)> = columns
        .iter()
        .map(|col| {
            let fmt = col.format();
            let values = col
                .values(record)
                .unwrap_or_default()
                .iter()
                .map(|v| v * fmt.scale)
                .collect();
            (fmt, values)
        })
        .collect();

    for level in 0..record.n_levels() {
        for (fmt, values) in &scaled {
            let value = values.get(level).copied().unwrap_or(f64::NAN);
            out.push_str(&fmt.format.format(value));
            out.push_str(COLUMN_SPACING);
        }
        out.push('\n');
    }

    let summary = ProfileSummary {
        columns: scaled
            .into_iter()
            .map(|(fmt, values)| (fmt.name.to_string(), values))
            .collect(),
        constants,
    };
    (out, summary)
}

/// Writes `.mod` files atomically.
#[derive(Debug, Clone)]
pub struct ProfileSerializer {
    version: String,
}

impl Default for ProfileSerializer {
    fn default() -> Self {
        Self::new(VERSION)
    }
}

impl ProfileSerializer {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Write a record to `path` and return its summary.
    ///
    /// The text goes to a temporary file in the same directory that is
    /// renamed into place, so a failed write never leaves a partial file
    /// at `path`. The parent directory must exist.
    pub fn write(&self, path: &Path, record: &ProfileRecord) -> Result<ProfileSummary> {
        let (text, summary) = render(record, &self.version);
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ProfileError::io(dir, e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| ProfileError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| ProfileError::io(path, e.error))?;

        debug!(path = %path.display(), levels = record.n_levels(), "Wrote mod file");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SurfaceRecord;
    use test_utils::assert_slice_approx_eq;

    fn record() -> ProfileRecord {
        ProfileRecord {
            site_lat: 36.604,
            pressure: vec![1000.0, 975.0, 950.0],
            temperature: vec![290.1, 288.4, 286.9],
            height: vec![0.312, 0.534, 0.758],
            mmw: vec![28.8, 28.81, 28.82],
            h2o_dmf: vec![1.2e-2, 1.1e-2, f64::NAN],
            rh: vec![0.55, 0.6, 0.654],
            epv: vec![1.0e-7, -2.0e-7, 3.0e-7],
            pt: vec![290.1, 290.5, 291.2],
            eq_lat: None,
            o3: vec![4.0e-8, 4.1e-8, 4.2e-8],
            co: None,
            surface: SurfaceRecord {
                pressure: 978.2,
                temperature: 291.0,
                height: 0.3,
                mmw: 28.79,
                h2o_dmf: 1.3e-2,
                rh: 0.5,
                slp: 1015.0,
                tropp_blended: 201.5,
                tropp_pv: 210.0,
                tropp_thermal: 195.0,
                tropt: 215.3,
                sza: 45.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_column_widths_fit() {
        for col in ModColumn::ALL {
            let fmt = col.format();
            assert!(fmt.format.width() <= fmt.total_width, "{:?}", col);
        }
    }

    #[test]
    fn test_column_order() {
        let mut r = record();
        assert_eq!(column_order(&r).len(), 9);
        r.eq_lat = Some(vec![40.0; 3]);
        r.co = Some(vec![1e-7; 3]);
        let order = column_order(&r);
        assert_eq!(order.len(), 11);
        assert_eq!(order[8], ModColumn::EqLat);
        assert_eq!(order[9], ModColumn::O3);
        assert_eq!(order[10], ModColumn::Co);
    }

    #[test]
    fn test_header_block() {
        let (text, _) = render(&record(), "test version");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "7  9");
        assert_eq!(lines[1], "6378.137  6.0000e-05  36.604 9.810    0.312 1013.250  201.500");
        assert_eq!(lines[2], SURFACE_LABELS);
        assert_eq!(
            lines[3],
            "9.782e+02    291.000      0.300    28.7900    1.300e-02  50.0    1.015e+03    2.015e+02    2.100e+02    1.950e+02    215.300     45.000"
        );
        assert_eq!(lines[4], "test version");
        assert!(lines[5].starts_with("  mbar         Kelvin   "));
        assert!(lines[6].starts_with("Pressure     Temperature    Height       MMW  "));
    }

    #[test]
    fn test_level_lines() {
        let (text, summary) = render(&record(), VERSION);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), HEADER_LINES + 3);

        let expected_width: usize = column_order(&record())
            .iter()
            .map(|c| c.format().format.width() + COLUMN_SPACING.len())
            .sum();
        for line in &lines[5..] {
            assert_eq!(line.len(), expected_width, "{:?}", line);
        }

        assert_eq!(
            lines[7],
            "1.000e+03        290.100      0.312    28.8000     1.200e-02      55.0     1.000e-07     290.100    4.000e-08    "
        );
        assert!(lines[9].contains("       nan    "));
        assert!(lines[8].contains(" -2.000e-07"));

        assert_slice_approx_eq!(summary.column("RH").unwrap(), &[55.0, 60.0, 65.4], 1e-9);
        assert_eq!(summary.constants.tropopause_pressure, 201.5);
        assert!(summary.column("EqL").is_none());
    }

    #[test]
    fn test_write_creates_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FPIT_2018010100Z_37N_097W.mod");
        let summary = ProfileSerializer::default().write(&path, &record()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), HEADER_LINES + 3);
        assert_eq!(text.lines().nth(4), Some(VERSION));
        assert_eq!(summary.column("Pressure").map(|p| p.len()), Some(3));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let missing = dir.path().join("no/such/dir/file.mod");
        assert!(matches!(
            ProfileSerializer::default().write(&missing, &record()),
            Err(ProfileError::Io { .. })
        ));
    }

    #[test]
    fn test_summary_serializes_nan_as_null() {
        let (_, summary) = render(&record(), VERSION);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["columns"]["H2O"][2].is_null());
        assert_eq!(json["constants"]["obs_lat"], 36.604);
    }
}
