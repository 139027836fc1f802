//! Run configuration for mod-maker.
//!
//! Loaded from a YAML file with environment variable substitution using
//! `${VAR}` and `${VAR:-default}` syntax.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use grid_processor::GridConfig;
use met_common::SiteLocation;
use serde::{Deserialize, Serialize};

/// How the met files are organized on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayout {
    /// One file per 3-hourly time step under `Np`/`Nv` and `Nx`.
    #[default]
    PerTimestep,
    /// One profile file and one surface file holding many time steps.
    Concatenated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModMakerConfig {
    /// Directory holding the `Np` (or `Nv`) and `Nx` subdirectories
    pub met_path: PathBuf,
    /// Directory holding the chemistry `Nv` subdirectory; defaults to `met_path`
    #[serde(default)]
    pub chem_path: Option<PathBuf>,
    /// Root of the output tree
    pub save_path: PathBuf,
    /// Product label, used in directory and file names
    #[serde(default = "default_product")]
    pub product: String,
    /// Profile files are on the 72 native model levels
    #[serde(default)]
    pub native_levels: bool,
    #[serde(default)]
    pub layout: SourceLayout,
    /// Spacing of output times for the concatenated layout (hours)
    #[serde(default = "default_time_step_hours")]
    pub time_step_hours: f64,
    /// Also write profiles along the solar ray
    #[serde(default)]
    pub slant: bool,
    /// Add the CO column from chemistry files
    #[serde(default)]
    pub chemistry: bool,
    /// Write every file straight into `save_path`
    #[serde(default)]
    pub flat_outdir: bool,
    #[serde(default = "default_true")]
    pub save_in_utc: bool,
    #[serde(default)]
    pub keep_latlon_prec: bool,
    /// Add the equivalent latitude column
    #[serde(default = "default_true")]
    pub equivalent_latitude: bool,
    /// Worker threads for the equivalent latitude functions; rayon's default when unset
    #[serde(default)]
    pub eqlat_threads: Option<usize>,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default = "GridConfig::from_env")]
    pub grid: GridConfig,
    pub sites: Vec<SiteLocation>,
}

fn default_product() -> String {
    "fpit".to_string()
}

fn default_time_step_hours() -> f64 {
    3.0
}

fn default_true() -> bool {
    true
}

impl ModMakerConfig {
    /// Subdirectory holding the profile files.
    pub fn profile_dir(&self) -> PathBuf {
        self.met_path.join(if self.native_levels { "Nv" } else { "Np" })
    }

    pub fn surface_dir(&self) -> PathBuf {
        self.met_path.join("Nx")
    }

    pub fn chem_dir(&self) -> PathBuf {
        self.chem_path.as_deref().unwrap_or(&self.met_path).join("Nv")
    }

    pub fn time_step(&self) -> Duration {
        Duration::seconds((self.time_step_hours * 3600.0).round() as i64)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.product.trim().is_empty(), "Product label cannot be empty");
        anyhow::ensure!(!self.sites.is_empty(), "At least one site must be configured");
        anyhow::ensure!(
            self.time_step_hours.is_finite() && self.time_step_hours > 0.0,
            "time_step_hours must be positive, got {}",
            self.time_step_hours
        );
        anyhow::ensure!(
            !(self.slant && self.flat_outdir),
            "Slant files cannot be written with flat_outdir; vertical and slant files share names"
        );
        anyhow::ensure!(
            !(self.slant && self.chemistry),
            "Slant profiles do not support chemistry variables"
        );
        anyhow::ensure!(
            self.layout == SourceLayout::PerTimestep || !(self.slant || self.chemistry),
            "Slant and chemistry output need the per_timestep layout"
        );
        if let Some(threads) = self.eqlat_threads {
            anyhow::ensure!(threads > 0, "eqlat_threads must be at least 1");
        }
        self.grid.validate()?;
        for site in &self.sites {
            site.validate()?;
        }
        Ok(())
    }
}

/// Load and validate a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ModMakerConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
    parse_config(&content).with_context(|| format!("Invalid config {:?}", path.as_ref()))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ModMakerConfig> {
    let expanded = expand_env_vars(content)?;
    let config: ModMakerConfig = serde_yaml::from_str(&expanded).context("Failed to parse config YAML")?;
    config.validate()?;
    Ok(config)
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }
            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
met_path: /data/geos
save_path: /data/mod
sites:
  - id: oc
    name: Lamont
    lat: 36.604
    lon: -97.486
    alt: 320.0
"#;

    #[test]
    fn test_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.product, "fpit");
        assert_eq!(config.layout, SourceLayout::PerTimestep);
        assert!(config.save_in_utc);
        assert!(config.equivalent_latitude);
        assert!(!config.native_levels);
        assert_eq!(config.profile_dir(), PathBuf::from("/data/geos/Np"));
        assert_eq!(config.surface_dir(), PathBuf::from("/data/geos/Nx"));
        assert_eq!(config.chem_dir(), PathBuf::from("/data/geos/Nv"));
        assert_eq!(config.time_step(), Duration::hours(3));
        assert_eq!(config.sites[0].name, "Lamont");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("MOD_MAKER_TEST_MET", "/scratch/geos");
        std::env::remove_var("MOD_MAKER_TEST_UNSET");
        let text = MINIMAL
            .replace("/data/geos", "${MOD_MAKER_TEST_MET}")
            .replace("/data/mod", "${MOD_MAKER_TEST_UNSET:-/tmp/mod}");
        let config = parse_config(&text).unwrap();
        assert_eq!(config.met_path, PathBuf::from("/scratch/geos"));
        assert_eq!(config.save_path, PathBuf::from("/tmp/mod"));

        std::env::remove_var("MOD_MAKER_TEST_REQUIRED");
        assert!(expand_env_vars("${MOD_MAKER_TEST_REQUIRED}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_rejects_slant_with_flat_outdir() {
        let text = format!("{}slant: true\nflat_outdir: true\n", MINIMAL);
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse_config(&format!("{}time_step_hours: 0\n", MINIMAL)).is_err());
        assert!(parse_config(&format!("{}layout: concatenated\nchemistry: true\n", MINIMAL)).is_err());
        assert!(parse_config(&format!("{}grid:\n  max_extrapolation_steps: -1\n", MINIMAL)).is_err());
        assert!(parse_config("met_path: /a\nsave_path: /b\nsites: []\n").is_err());

        let bad_site = MINIMAL.replace("lat: 36.604", "lat: 136.0");
        assert!(parse_config(&bad_site).is_err());
    }

    #[test]
    fn test_site_with_relocations() {
        let text = r#"
met_path: /data/geos
save_path: /data/mod
layout: concatenated
time_step_hours: 1.5
sites:
  - id: ra
    lat: -20.9
    lon: 55.5
    alt: 87.0
    time_spans:
      - { start: "2011-01-01T00:00:00Z", end: "2015-01-01T00:00:00Z", lat: -20.901, lon: 55.485, alt: 87.0 }
      - { start: "2015-01-01T00:00:00Z", end: "2030-01-01T00:00:00Z", lat: -20.901, lon: 55.485, alt: 90.0 }
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.layout, SourceLayout::Concatenated);
        assert_eq!(config.time_step(), Duration::minutes(90));
        assert_eq!(config.sites[0].time_spans.len(), 2);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = parse_config(include_str!("../../../config/mod-maker.yaml")).unwrap();
        assert_eq!(config.product, "fpit");
        assert_eq!(config.layout, SourceLayout::PerTimestep);
        assert!(config.equivalent_latitude);
        assert_eq!(config.sites.len(), 4);
    }
}
