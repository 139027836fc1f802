//! Run orchestration: find inputs, build equivalent latitude functions and
//! write one `.mod` file per site and time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use eqlat::{EqLatInput, EqLatInterpolator, EquivalentLatitudeEngine, EquivalentLatitudeMap, LevelPressure};
use grid_processor::TrilinearInterpolator;
use met_common::{ResolvedSite, SiteRegistry, TimeRange};
use mod_profile::{
    extrapolate_to_surface, fixed_level_companions, mod_file_name, OutputLayout, ProfileAssembler, ProfileFields,
    ProfileRecord, ProfileSerializer, ProfileSummary, SurfaceFields, SurfaceRecord,
};
use netcdf_parser::{ensure_matching_dates, DatasetReader, GeosFile, GeosFileList};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ModMakerConfig, SourceLayout};
use crate::fields::{surface_value, ChemistrySnapshot, LevelPressureSource, ProfileSnapshot, SurfaceSnapshot};
use crate::slant::SlantPathSolver;

/// Summaries of the files written for one site and time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSummary {
    pub vertical: ProfileSummary,
    pub slant: Option<ProfileSummary>,
}

/// Summaries of a run, by time then site.
pub type RunSummary = BTreeMap<DateTime<Utc>, BTreeMap<String, SiteSummary>>;

/// What the slant pass needs from the vertical one.
struct VerticalOutput {
    summary: ProfileSummary,
    /// Patched heights (km), the altitude grid of the solar ray
    heights: Vec<f64>,
    surface: SurfaceRecord,
}

/// Generates `.mod` files for every configured site.
pub struct ModMaker<R, S> {
    config: ModMakerConfig,
    registry: R,
    solver: S,
    assembler: ProfileAssembler,
    serializer: ProfileSerializer,
    layout: OutputLayout,
}

impl<R: SiteRegistry, S: SlantPathSolver> ModMaker<R, S> {
    pub fn new(config: ModMakerConfig, registry: R, solver: S) -> Self {
        let assembler = ProfileAssembler {
            quiet: config.quiet,
            ..Default::default()
        };
        let layout = OutputLayout::new(&config.save_path, &config.product, config.flat_outdir);
        Self {
            config,
            registry,
            solver,
            assembler,
            serializer: ProfileSerializer::default(),
            layout,
        }
    }

    pub fn config(&self) -> &ModMakerConfig {
        &self.config
    }

    /// Write every `.mod` file for the time range, oldest first.
    pub fn run(&self, range: &TimeRange) -> Result<RunSummary> {
        info!(
            start = %range.start,
            end = %range.end,
            layout = ?self.config.layout,
            native = self.config.native_levels,
            "Starting mod file generation"
        );
        match self.config.layout {
            SourceLayout::PerTimestep => self.run_per_timestep(range),
            SourceLayout::Concatenated => self.run_concatenated(range),
        }
    }

    fn run_per_timestep(&self, range: &TimeRange) -> Result<RunSummary> {
        let profile_files = GeosFileList::discover(&self.config.profile_dir(), range, false)?;
        let surface_files = GeosFileList::discover(&self.config.surface_dir(), range, false)?;
        ensure_matching_dates(&profile_files, &surface_files)?;

        let chem_files = if self.config.chemistry {
            let files = GeosFileList::discover(&self.config.chem_dir(), range, true)?;
            ensure_matching_dates(&profile_files, &files)?;
            Some(files)
        } else {
            None
        };

        let eq_lat = if self.config.equivalent_latitude {
            let native = self.config.native_levels;
            let sources: Vec<(DateTime<Utc>, PathBuf)> =
                profile_files.iter().map(|f| (f.time, f.path.clone())).collect();
            let engine = self.eqlat_engine(&profile_files.files()[0].path)?;
            EquivalentLatitudeMap::build(&engine, &sources, self.config.eqlat_threads, |path| {
                load_eqlat_input(path, native)
            })?
        } else {
            EquivalentLatitudeMap::new()
        };

        let mut summary = RunSummary::new();
        for (i, (profile, surface)) in profile_files.iter().zip(surface_files.iter()).enumerate() {
            let chem = chem_files.as_ref().map(|files| &files.files()[i]);
            let sites = self.process_timestep(profile, surface, chem, eq_lat.get(&profile.time))?;
            summary.insert(profile.time, sites);
        }

        info!(timesteps = summary.len(), "Finished mod file generation");
        Ok(summary)
    }

    fn process_timestep(
        &self,
        profile_file: &GeosFile,
        surface_file: &GeosFile,
        chem_file: Option<&GeosFile>,
        eq_lat: Option<&EqLatInterpolator>,
    ) -> Result<BTreeMap<String, SiteSummary>> {
        let time = profile_file.time;
        let sites = self.registry.sites_at(time);
        if sites.is_empty() {
            warn!(%time, "No site has a location at this time; skipping");
            return Ok(BTreeMap::new());
        }
        info!(%time, sites = sites.len(), "Processing timestep");

        let targets: Vec<(f64, f64)> = sites.iter().map(|s| (s.lat, s.lon_180)).collect();

        let met = ProfileSnapshot::load(&profile_file.path, self.config.native_levels)
            .with_context(|| format!("Failed to load profile file {}", profile_file.path.display()))?;
        let surface = SurfaceSnapshot::load(&surface_file.path)
            .with_context(|| format!("Failed to load surface file {}", surface_file.path.display()))?;

        let mut profiles = met.sample(&targets, 0)?;
        let phis = met.sample_phis(&targets, 0)?;
        let surfaces = surface.sample(&targets, &phis, 0)?;

        if let Some(chem_file) = chem_file {
            let chem = ChemistrySnapshot::load(&chem_file.path)
                .with_context(|| format!("Failed to load chemistry file {}", chem_file.path.display()))?;
            let levels = match &met.pressure {
                LevelPressureSource::Levels(levels) => Some(levels.as_slice()),
                LevelPressureSource::Field(_) => None,
            };
            for (fields, co) in profiles.iter_mut().zip(chem.sample(&targets, levels, 0)?) {
                fields.co = Some(co);
            }
        }

        let mut written = BTreeMap::new();
        for ((site, fields), surface_fields) in sites.iter().zip(profiles).zip(surfaces) {
            let sza = self.solver.solar_zenith_angle(time, site);
            let vertical_fields = fields.clone();
            let vertical = self.write_vertical(time, site, fields, &surface_fields, sza, eq_lat)?;
            let surface = vertical.surface;

            let slant = if self.config.slant && sza < 90.0 {
                let dir = self
                    .layout
                    .slant_dir(&site.id)
                    .context("Slant output needs a per-site output directory")?;
                let ray = self
                    .solver
                    .solve(time, site, &vertical.heights, surface.pressure, surface.temperature);
                let slant_fields = met.sample_slant(&vertical_fields, &ray, 0)?;
                Some(self.write_profile(&dir, time, site, slant_fields, &surface, eq_lat)?)
            } else {
                None
            };

            written.insert(
                site.id.clone(),
                SiteSummary {
                    vertical: vertical.summary,
                    slant,
                },
            );
        }
        Ok(written)
    }

    fn write_vertical(
        &self,
        time: DateTime<Utc>,
        site: &ResolvedSite,
        fields: ProfileFields,
        surface_fields: &SurfaceFields,
        sza: f64,
        eq_lat: Option<&EqLatInterpolator>,
    ) -> Result<VerticalOutput> {
        let surface = self.assembler.surface(surface_fields, site.lat, site.alt, sza);
        let dir = self.layout.vertical_dir(&site.id);
        let record = self.build_record(fields, &surface, site, eq_lat)?;
        let summary = self.write_record(&dir, time, site, &record)?;
        Ok(VerticalOutput {
            summary,
            heights: record.height,
            surface,
        })
    }

    fn write_profile(
        &self,
        dir: &Path,
        time: DateTime<Utc>,
        site: &ResolvedSite,
        fields: ProfileFields,
        surface: &SurfaceRecord,
        eq_lat: Option<&EqLatInterpolator>,
    ) -> Result<ProfileSummary> {
        let record = self.build_record(fields, surface, site, eq_lat)?;
        self.write_record(dir, time, site, &record)
    }

    fn build_record(
        &self,
        fields: ProfileFields,
        surface: &SurfaceRecord,
        site: &ResolvedSite,
        eq_lat: Option<&EqLatInterpolator>,
    ) -> Result<ProfileRecord> {
        let with_co = fields.co.is_some();
        let mut profile = self.assembler.profile(fields)?;
        if !self.config.native_levels {
            extrapolate_to_surface(&mut profile, surface, &fixed_level_companions(with_co))
                .with_context(|| format!("Surface extrapolation failed for site {}", site.id))?;
        }
        Ok(self.assembler.finalize(profile, surface, site.lat, eq_lat))
    }

    fn write_record(
        &self,
        dir: &Path,
        time: DateTime<Utc>,
        site: &ResolvedSite,
        record: &ProfileRecord,
    ) -> Result<ProfileSummary> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let name = mod_file_name(
            &self.config.product,
            time,
            site.lat,
            site.lon_180,
            self.config.keep_latlon_prec,
            self.config.save_in_utc,
        );
        let path = dir.join(name);
        let summary = self.serializer.write(&path, record)?;
        debug!(site = %site.id, path = %path.display(), "Wrote mod file");
        Ok(summary)
    }

    fn eqlat_engine(&self, path: &Path) -> Result<EquivalentLatitudeEngine> {
        let reader = DatasetReader::open(path)?;
        let axes = reader.axes()?;
        let (lat_res, lon_res) = reader.resolution()?;
        Ok(EquivalentLatitudeEngine::new(&axes, lat_res, lon_res, self.config.quiet))
    }

    fn run_concatenated(&self, range: &TimeRange) -> Result<RunSummary> {
        let profile_path = single_input_file(&self.config.profile_dir())?;
        let surface_path = single_input_file(&self.config.surface_dir())?;

        let met = ProfileSnapshot::load(&profile_path, self.config.native_levels)
            .with_context(|| format!("Failed to load profile file {}", profile_path.display()))?;
        let surface = SurfaceSnapshot::load(&surface_path)
            .with_context(|| format!("Failed to load surface file {}", surface_path.display()))?;

        let (met_hours, met_units, met_times) = file_times(&profile_path)?;
        let (surf_hours, surf_units, _) = file_times(&surface_path)?;
        let met_interp = TrilinearInterpolator::new(met.axes.clone(), met_hours, &self.config.grid)?;
        let surf_interp = TrilinearInterpolator::new(surface.axes.clone(), surf_hours, &self.config.grid)?;

        let times = range.steps(self.config.time_step());
        anyhow::ensure!(!times.is_empty(), "No output times between {} and {}", range.start, range.end);

        let eq_lat = if self.config.equivalent_latitude {
            let engine = self.eqlat_engine(&profile_path)?;
            let mut indices: Vec<usize> = times.iter().map(|t| nearest_time_index(&met_times, t)).collect();
            indices.sort_unstable();
            indices.dedup();
            let sources: Vec<(DateTime<Utc>, usize)> = indices.into_iter().map(|i| (met_times[i], i)).collect();
            EquivalentLatitudeMap::build(&engine, &sources, self.config.eqlat_threads, |&i| {
                snapshot_eqlat_input(&met, i)
            })?
        } else {
            EquivalentLatitudeMap::new()
        };

        let mut summary = RunSummary::new();
        for time in times {
            let sites = self.registry.sites_at(time);
            if sites.is_empty() {
                warn!(%time, "No site has a location at this time; skipping");
                continue;
            }
            info!(%time, sites = sites.len(), "Processing timestep");
            let el = eq_lat.nearest(&time).map(|(_, interp)| interp);

            let mut written = BTreeMap::new();
            for site in &sites {
                let w = met_interp.weights(site.lat, site.lon_180, met_units.hours_since_epoch(time))?;
                let fields = met.sample_trilinear(&met_interp, &w)?;
                let phis = surface_value(&met_interp.interpolate(&met.phis, &w)?);

                let sw = surf_interp.weights(site.lat, site.lon_180, surf_units.hours_since_epoch(time))?;
                let surface_fields = surface.sample_trilinear(&surf_interp, &sw, phis)?;

                let sza = self.solver.solar_zenith_angle(time, site);
                let vertical = self.write_vertical(time, site, fields, &surface_fields, sza, el)?;
                written.insert(
                    site.id.clone(),
                    SiteSummary {
                        vertical: vertical.summary,
                        slant: None,
                    },
                );
            }
            summary.insert(time, written);
        }

        info!(timesteps = summary.len(), "Finished mod file generation");
        Ok(summary)
    }
}

/// Engine input for one per-timestep profile file.
fn load_eqlat_input(path: &Path, native: bool) -> Result<EqLatInput> {
    let snapshot = ProfileSnapshot::load(path, native)
        .with_context(|| format!("Failed to load {} for equivalent latitude", path.display()))?;
    snapshot_eqlat_input(&snapshot, 0)
}

fn snapshot_eqlat_input(snapshot: &ProfileSnapshot, time_index: usize) -> Result<EqLatInput> {
    let pressure = match &snapshot.pressure {
        LevelPressureSource::Levels(levels) => LevelPressure::Fixed(levels.clone()),
        LevelPressureSource::Field(field) => LevelPressure::from_field(field, time_index)?,
    };
    Ok(EqLatInput::from_fields(&snapshot.epv, &snapshot.temperature, pressure, time_index)?)
}

/// File time axis in hours since its epoch, the units, and the decoded times.
fn file_times(path: &Path) -> Result<(Vec<f64>, met_common::TimeUnits, Vec<DateTime<Utc>>)> {
    let reader = DatasetReader::open(path)?;
    let (hours, units) = reader.time_hours()?;
    let times = reader.times()?;
    Ok((hours, units, times))
}

fn nearest_time_index(times: &[DateTime<Utc>], time: &DateTime<Utc>) -> usize {
    let mut best = 0;
    let mut best_dist = i64::MAX;
    for (i, t) in times.iter().enumerate() {
        let dist = (*t - *time).num_seconds().abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// The one `.nc4` file of a concatenated collection directory.
fn single_input_file(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "nc4") {
            files.push(path);
        }
    }
    files.sort();
    match files.len() {
        1 => Ok(files.remove(0)),
        0 => anyhow::bail!("No .nc4 file in {}", dir.display()),
        n => anyhow::bail!(
            "Expected one concatenated .nc4 file in {}, found {}",
            dir.display(),
            n
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_nearest_time_index() {
        let t = |h| Utc.with_ymd_and_hms(2018, 1, 1, h, 0, 0).unwrap();
        let times = [t(0), t(3), t(6)];
        assert_eq!(nearest_time_index(&times, &t(1)), 0);
        assert_eq!(nearest_time_index(&times, &t(2)), 1);
        assert_eq!(nearest_time_index(&times, &t(23)), 2);
    }

    #[test]
    fn test_single_input_file() {
        let dir = test_utils::temp_test_dir();
        assert!(single_input_file(dir.path()).is_err());
        fs::write(dir.path().join("MERRA2_400.inst3_3d_asm_Np.2018.nc4"), b"").unwrap();
        fs::write(dir.path().join("README"), b"").unwrap();
        assert!(single_input_file(dir.path()).unwrap().ends_with("MERRA2_400.inst3_3d_asm_Np.2018.nc4"));
        fs::write(dir.path().join("other.nc4"), b"").unwrap();
        assert!(single_input_file(dir.path()).is_err());
    }
}
