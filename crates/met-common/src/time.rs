//! Time handling utilities for gridded meteorological data.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetError, MetResult};

/// Unit of a CF-style time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(Self::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(Self::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(Self::Hours),
            "d" | "day" | "days" => Some(Self::Days),
            _ => None,
        }
    }

    /// Number of seconds in one unit.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }
}

/// Parsed `"<unit> since <epoch>"` time units attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse a units string such as `"minutes since 2018-01-01 00:00:00"`.
    ///
    /// The epoch is read as up to six integer fields (year, month, day, hour,
    /// minute, second) separated by any non-digit characters, so
    /// `"hours since 1800-1-1 00:00:0.0"` and `"days since 2000-01-01"` both parse.
    pub fn parse(units: &str) -> MetResult<Self> {
        let invalid = || MetError::InvalidTimeUnits(units.to_string());

        let (unit, epoch) = units.split_once(" since ").ok_or_else(invalid)?;
        let unit = TimeUnit::from_str(unit).ok_or_else(invalid)?;

        let fields: Vec<u32> = epoch
            .split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .take(6)
            .map(|s| s.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        if fields.len() < 3 {
            return Err(invalid());
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or(0);

        let date = NaiveDate::from_ymd_opt(field(0) as i32, field(1), field(2)).ok_or_else(invalid)?;
        let naive = date.and_hms_opt(field(3), field(4), field(5)).ok_or_else(invalid)?;

        Ok(Self {
            unit,
            epoch: Utc.from_utc_datetime(&naive),
        })
    }

    /// Convert a raw coordinate value to a timestamp, rounded to the nearest second.
    pub fn decode(&self, value: f64) -> DateTime<Utc> {
        let seconds = (value * self.unit.seconds()).round() as i64;
        self.epoch + Duration::seconds(seconds)
    }

    /// Hours elapsed between the epoch and `time`.
    pub fn hours_since_epoch(&self, time: DateTime<Utc>) -> f64 {
        (time - self.epoch).num_seconds() as f64 / 3600.0
    }

    /// Convert a raw coordinate value to hours since the epoch.
    pub fn to_hours(&self, value: f64) -> f64 {
        value * self.unit.seconds() / 3600.0
    }
}

/// A half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt < &self.end
    }

    /// Timestamps from `start` advancing by `step` while strictly before `end`.
    pub fn steps(&self, step: Duration) -> Vec<DateTime<Utc>> {
        let mut times = Vec::new();
        if step <= Duration::zero() {
            return times;
        }
        let mut t = self.start;
        while t < self.end {
            times.push(t);
            t += step;
        }
        times
    }
}

/// Parse a date argument.
///
/// Accepts `YYYYMMDD`, `YYYYMMDD_HH`, `YYYYMMDD_HHMM` and RFC 3339 timestamps.
pub fn parse_date_arg(s: &str) -> MetResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let (date, time) = match s.split_once('_') {
        Some((d, t)) => (d, t),
        None => (s, ""),
    };

    let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| MetError::InvalidTime(s.to_string()))?;

    let naive = match time.len() {
        0 => date.and_hms_opt(0, 0, 0),
        2 => time.parse::<u32>().ok().and_then(|h| date.and_hms_opt(h, 0, 0)),
        4 => NaiveDateTime::parse_from_str(&format!("{}{}", date.format("%Y%m%d"), time), "%Y%m%d%H%M").ok(),
        _ => None,
    }
    .ok_or_else(|| MetError::InvalidTime(s.to_string()))?;

    Ok(Utc.from_utc_datetime(&naive))
}
