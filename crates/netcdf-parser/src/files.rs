//! Discovery of GEOS input files by the timestamp in their names.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use met_common::TimeRange;
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};

/// One input file and the time it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeosFile {
    pub path: PathBuf,
    pub time: DateTime<Utc>,
}

/// Input files of one kind (profile, surface or chemistry), in time order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeosFileList {
    kind: String,
    files: Vec<GeosFile>,
}

impl GeosFileList {
    /// List `GEOS*.nc4` files in `dir` whose timestamp lies in `range`.
    ///
    /// Chemistry files are recognised by `chm` in their name and are kept
    /// only when `chemistry` is set; otherwise they are skipped.
    pub fn discover(dir: &Path, range: &TimeRange, chemistry: bool) -> NetCdfResult<Self> {
        let kind = if chemistry {
            "chemistry".to_string()
        } else {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string())
        };

        let unavailable = || NetCdfError::InputUnavailable {
            kind: kind.clone(),
            dir: dir.to_path_buf(),
            start: range.start.to_rfc3339(),
            end: range.end.to_rfc3339(),
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(unavailable()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("GEOS") && name.ends_with(".nc4") && name.contains("chm") == chemistry {
                names.push(name);
            }
        }
        names.sort();

        let mut files = Vec::new();
        for name in names {
            let Some(time) = datetime_from_geos_filename(&name) else {
                warn!(file = %name, "Skipping file without a YYYYMMDD_HHMM timestamp");
                continue;
            };
            if range.contains(&time) {
                files.push(GeosFile {
                    path: dir.join(&name),
                    time,
                });
            }
        }

        if files.is_empty() {
            return Err(unavailable());
        }

        debug!(kind = %kind, count = files.len(), dir = %dir.display(), "Found input files");
        Ok(Self { kind, files })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn files(&self) -> &[GeosFile] {
        &self.files
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.files.iter().map(|f| f.time).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeosFile> {
        self.files.iter()
    }
}

/// Parse the `YYYYMMDD_HHMM` token of a GEOS file name.
pub fn datetime_from_geos_filename(name: &str) -> Option<DateTime<Utc>> {
    let bytes = name.as_bytes();
    let is_digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);

    (0..bytes.len().saturating_sub(12))
        .find(|&i| is_digits(i..i + 8) && bytes[i + 8] == b'_' && is_digits(i + 9..i + 13))
        .and_then(|i| NaiveDateTime::parse_from_str(&name[i..i + 13], "%Y%m%d_%H%M").ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Check that two file lists cover exactly the same times.
pub fn ensure_matching_dates(left: &GeosFileList, right: &GeosFileList) -> NetCdfResult<()> {
    if left.times() != right.times() {
        return Err(NetCdfError::DateMismatch {
            left: left.kind.clone(),
            right: right.kind.clone(),
        });
    }
    Ok(())
}
