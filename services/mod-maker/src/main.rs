//! mod-maker
//!
//! Generates GGG `.mod` prior profile files from GEOS FP-IT (or MERRA-2)
//! meteorology for a list of sites and a date range.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use met_common::{parse_date_arg, StaticSiteRegistry, TimeRange};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mod_maker::{load_config, ModMaker, VerticalPath};

#[derive(Parser, Debug)]
#[command(name = "mod-maker")]
#[command(about = "Generate GGG .mod profile files from GEOS meteorology")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "MOD_MAKER_CONFIG", default_value = "config/mod-maker.yaml")]
    config: PathBuf,

    /// First date to process (YYYYMMDD, YYYYMMDD_HH or RFC 3339)
    #[arg(long)]
    start: String,

    /// End of the range, exclusive (default: one day after start)
    #[arg(long)]
    end: Option<String>,

    /// Only process this site
    #[arg(long)]
    site: Option<String>,

    /// Also write slant profiles
    #[arg(long)]
    slant: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Write the numeric profile summaries to this JSON file
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = init_tracing(&args) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }
    netcdf_parser::silence_hdf5_errors();

    if let Err(e) = run(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter = if args.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level.to_lowercase()))
    };
    let builder = FmtSubscriber::builder().with_env_filter(filter).with_target(true);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if args.slant {
        config.slant = true;
    }
    if args.quiet {
        config.quiet = true;
    }
    config.validate()?;

    let start = parse_date_arg(&args.start)?;
    let end = match &args.end {
        Some(end) => parse_date_arg(end)?,
        None => start + Duration::days(1),
    };
    anyhow::ensure!(end > start, "End date {} must be after start date {}", end, start);
    let range = TimeRange::new(start, end);

    let mut registry = StaticSiteRegistry::new(config.sites.clone())?;
    if let Some(site) = &args.site {
        registry = registry.restrict_to(site)?;
    }
    info!(sites = registry.len(), config = %args.config.display(), "Loaded configuration");

    let maker = ModMaker::new(config, registry, VerticalPath);
    let summary = maker.run(&range)?;

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summaries")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote profile summaries");
    }
    Ok(())
}
