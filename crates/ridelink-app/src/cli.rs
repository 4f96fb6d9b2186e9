use std::path::PathBuf;

use clap::Parser;

/// RideLink: driver presence and live location on a headless map.
#[derive(Parser, Debug)]
#[command(name = "ridelink", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter directive override (e.g. `debug`, `ridelink_presence=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Replay a recorded track (JSON list of {latitude, longitude}).
    #[arg(long)]
    pub track: Option<PathBuf>,

    /// Milliseconds between replayed points; defaults to the config value.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Keep presence in memory instead of connecting to the backend.
    #[arg(long)]
    pub offline: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
