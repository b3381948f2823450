//! Stockview Inspect - classify a saved layout without a browser
//!
//! Reads a layout response and an optional occupancy snapshot, runs them
//! through the same controller the viewer uses and prints the resulting tiers
//! and camera framing.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use stockview_core::config::load_config;
use stockview_core::{decode_layout, LocationId, OccupancyTier};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::report::{decode_occupancy_snapshot, run_pipeline, OccupancySnapshot};

#[derive(Parser, Debug)]
#[command(name = "stockview-inspect")]
#[command(about = "Classify warehouse bins from saved ERP responses")]
#[command(version)]
struct Args {
    /// Layout response (`{code: [x, y, z, dx, dz, dy, owner]}`)
    layout: PathBuf,

    /// Occupancy snapshot (`{code: [has_quantity, fill_percent]}`)
    #[arg(short, long)]
    occupancy: Option<PathBuf>,

    /// Active stock location id
    #[arg(short = 'L', long)]
    location: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "stockview.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args.config)?;
    let layout = decode_layout(&read_json(&args.layout)?)?;
    let occupancy = match &args.occupancy {
        Some(path) => decode_occupancy_snapshot(&read_json(path)?)?,
        None => OccupancySnapshot::new(),
    };
    let location = args.location.as_deref().and_then(LocationId::parse);
    info!(records = layout.records.len(), location = ?location, "Inputs loaded");

    let report = run_pipeline(config, location, layout, &occupancy);

    println!("{} bins:", report.bins.len());
    for bin in &report.bins {
        let owner = bin.owner.as_ref().map(|o| o.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<16} owner {:<6} {:<22} opacity {:.2}",
            bin.code,
            owner,
            bin.tier.label(),
            bin.opacity
        );
    }

    println!("Tiers:");
    for tier in OccupancyTier::ALL {
        let count = report.count(tier);
        if count > 0 {
            println!("  {:<22} {}", tier.label(), count);
        }
    }

    if !report.rejected.is_empty() {
        println!("Rejected {} rows:", report.rejected.len());
        for (code, reason) in &report.rejected {
            println!("  {:<16} {}", code, reason);
        }
    }

    match report.pose {
        Some(pose) => println!(
            "Camera: position {:.2} target {:.2} near {:.3} far {:.1}",
            pose.position, pose.target, pose.near, pose.far
        ),
        None => println!("Camera: nothing to frame"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("bogus"), Level::INFO);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["stockview-inspect", "layout.json", "-o", "occ.json", "-L", "8"]);
        assert_eq!(args.layout, PathBuf::from("layout.json"));
        assert_eq!(args.occupancy, Some(PathBuf::from("occ.json")));
        assert_eq!(args.location.as_deref(), Some("8"));
        assert_eq!(args.config, PathBuf::from("stockview.toml"));
    }
}
