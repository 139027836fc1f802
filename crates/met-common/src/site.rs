//! Site locations and the site registry interface.
//!
//! Sites are stored with their 180°-centered longitude; the 360°-centered
//! form needed by the interpolators is derived on resolution. Sites that
//! moved during their operational history carry a list of [`TimeSpan`]s,
//! each with its own coordinates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MetError, MetResult};

/// Convert a longitude in [-180, 180) to [0, 360).
pub fn lon_180_to_360(lon: f64) -> f64 {
    let lon = lon.rem_euclid(360.0);
    if lon >= 360.0 {
        0.0
    } else {
        lon
    }
}

/// Convert a longitude in [0, 360) to [-180, 180).
pub fn lon_360_to_180(lon: f64) -> f64 {
    let lon = lon_180_to_360(lon);
    if lon >= 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// A period during which a relocating site sat at one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// First valid time (inclusive)
    pub start: DateTime<Utc>,
    /// End of validity (exclusive)
    pub end: DateTime<Utc>,
    pub lat: f64,
    /// Longitude in [-180, 180)
    pub lon: f64,
    /// Altitude above sea level (meters)
    pub alt: f64,
}

/// A measurement site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteLocation {
    /// Short identifier, used in output paths
    pub id: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    /// Longitude in [-180, 180)
    pub lon: f64,
    /// Altitude above sea level (meters)
    pub alt: f64,
    /// Ordered relocation history; when non-empty it overrides `lat`/`lon`/`alt`
    #[serde(default)]
    pub time_spans: Vec<TimeSpan>,
}

/// A site position resolved for one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSite {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon_180: f64,
    pub lon_360: f64,
    /// Altitude above sea level (meters)
    pub alt: f64,
}

impl SiteLocation {
    /// Create a fixed site.
    pub fn new(id: impl Into<String>, lat: f64, lon: f64, alt: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            lat,
            lon: lon_360_to_180(lon),
            alt,
            time_spans: Vec::new(),
        }
    }

    /// Check coordinate ranges and that relocation spans are ordered and non-overlapping.
    pub fn validate(&self) -> MetResult<()> {
        let invalid = |message: String| MetError::InvalidSite {
            site: self.id.clone(),
            message,
        };

        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(invalid(format!("latitude {} outside [-90, 90]", self.lat)));
        }

        for (i, span) in self.time_spans.iter().enumerate() {
            if span.start >= span.end {
                return Err(invalid(format!("time span {} ends before it starts", i)));
            }
            if !(-90.0..=90.0).contains(&span.lat) {
                return Err(invalid(format!("time span {} latitude {} outside [-90, 90]", i, span.lat)));
            }
            if let Some(next) = self.time_spans.get(i + 1) {
                if next.start < span.end {
                    return Err(invalid(format!("time spans {} and {} overlap", i, i + 1)));
                }
            }
        }

        Ok(())
    }

    /// Resolve the site position valid at `time`.
    pub fn resolve(&self, time: DateTime<Utc>) -> MetResult<ResolvedSite> {
        let (lat, lon, alt) = if self.time_spans.is_empty() {
            (self.lat, self.lon, self.alt)
        } else {
            let span = self
                .time_spans
                .iter()
                .find(|span| span.start <= time && time < span.end)
                .ok_or_else(|| MetError::NoLocationForTime {
                    site: self.id.clone(),
                    time: time.to_rfc3339(),
                })?;
            (span.lat, span.lon, span.alt)
        };

        Ok(ResolvedSite {
            id: self.id.clone(),
            name: self.name.clone(),
            lat,
            lon_180: lon_360_to_180(lon),
            lon_360: lon_180_to_360(lon),
            alt,
        })
    }
}

/// Source of site positions.
pub trait SiteRegistry {
    /// Resolve one site at `time`.
    fn site_at(&self, id: &str, time: DateTime<Utc>) -> MetResult<ResolvedSite>;

    /// Resolve every site that has a valid position at `time`.
    fn sites_at(&self, time: DateTime<Utc>) -> Vec<ResolvedSite>;
}

/// A registry backed by an in-memory list of sites, ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteRegistry {
    sites: BTreeMap<String, SiteLocation>,
}

impl StaticSiteRegistry {
    pub fn new(sites: impl IntoIterator<Item = SiteLocation>) -> MetResult<Self> {
        let mut map = BTreeMap::new();
        for site in sites {
            site.validate()?;
            map.insert(site.id.clone(), site);
        }
        Ok(Self { sites: map })
    }

    /// Keep only the named site.
    pub fn restrict_to(&self, id: &str) -> MetResult<Self> {
        let site = self
            .sites
            .get(id)
            .ok_or_else(|| MetError::UnknownSite(id.to_string()))?;
        Ok(Self {
            sites: BTreeMap::from([(id.to_string(), site.clone())]),
        })
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl SiteRegistry for StaticSiteRegistry {
    fn site_at(&self, id: &str, time: DateTime<Utc>) -> MetResult<ResolvedSite> {
        self.sites
            .get(id)
            .ok_or_else(|| MetError::UnknownSite(id.to_string()))?
            .resolve(time)
    }

    fn sites_at(&self, time: DateTime<Utc>) -> Vec<ResolvedSite> {
        self.sites
            .values()
            .filter_map(|site| match site.resolve(time) {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    tracing::debug!(site = %site.id, error = %e, "Skipping site");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_longitude_conversions() {
        assert_eq!(lon_180_to_360(-97.486), 360.0 - 97.486);
        assert_eq!(lon_180_to_360(0.0), 0.0);
        assert_eq!(lon_180_to_360(-180.0), 180.0);
        assert_eq!(lon_360_to_180(262.514), 262.514 - 360.0);
        assert_eq!(lon_360_to_180(180.0), -180.0);
        assert_eq!(lon_360_to_180(10.0), 10.0);
    }

    #[test]
    fn test_resolve_fixed_site() {
        let site = SiteLocation::new("oc", 36.604, -97.486, 320.0);
        let resolved = site.resolve(t(2018, 1, 1)).unwrap();
        assert_eq!(resolved.lat, 36.604);
        assert_eq!(resolved.lon_180, -97.486);
        assert!((resolved.lon_360 - 262.514).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_relocating_site() {
        let mut site = SiteLocation::new("xx", 0.0, 0.0, 0.0);
        site.time_spans = vec![
            TimeSpan { start: t(2010, 1, 1), end: t(2015, 1, 1), lat: 10.0, lon: 20.0, alt: 5.0 },
            TimeSpan { start: t(2015, 1, 1), end: t(2020, 1, 1), lat: 11.0, lon: -20.0, alt: 6.0 },
        ];
        site.validate().unwrap();

        assert_eq!(site.resolve(t(2012, 6, 1)).unwrap().lat, 10.0);
        let later = site.resolve(t(2015, 1, 1)).unwrap();
        assert_eq!(later.lat, 11.0);
        assert_eq!(later.lon_360, 340.0);
        assert!(site.resolve(t(2021, 1, 1)).is_err());
    }

    #[test]
    fn test_overlapping_spans_rejected() {
        let mut site = SiteLocation::new("xx", 0.0, 0.0, 0.0);
        site.time_spans = vec![
            TimeSpan { start: t(2010, 1, 1), end: t(2016, 1, 1), lat: 10.0, lon: 20.0, alt: 5.0 },
            TimeSpan { start: t(2015, 1, 1), end: t(2020, 1, 1), lat: 11.0, lon: 20.0, alt: 6.0 },
        ];
        assert!(site.validate().is_err());
    }

    #[test]
    fn test_registry_restrict_and_lookup() {
        let registry = StaticSiteRegistry::new(vec![
            SiteLocation::new("oc", 36.604, -97.486, 320.0),
            SiteLocation::new("pa", 45.945, -90.273, 442.0),
        ])
        .unwrap();
        assert_eq!(registry.sites_at(t(2018, 1, 1)).len(), 2);

        let only = registry.restrict_to("pa").unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only.site_at("pa", t(2018, 1, 1)).unwrap().alt, 442.0);
        assert!(registry.restrict_to("zz").is_err());
    }
}
