//! ridelink: drives a headless driver session from the terminal.
//!
//! Presence goes to the configured realtime backend (or stays in memory
//! with `--offline`), positions come from a replayed track and the map is
//! a surface that logs what it would draw.

mod cli;
mod console;
mod demo;

use std::sync::Arc;
use std::time::Duration;

use ridelink_common::DriverEvent;
use ridelink_config::RideLinkConfig;
use ridelink_driver::{spawn_session, SessionSettings};
use ridelink_location::{LocationProvider, ReplayProvider};
use ridelink_map::TracingSurface;
use ridelink_presence::{
    MemoryPresenceStore, PresenceStore, RealtimeConfig, RealtimePresenceStore,
};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

fn init_logging(directive: &str) {
    let parsed = directive
        .parse::<Directive>()
        .or_else(|_| "ridelink=info".parse::<Directive>());
    let filter = match parsed {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_store(config: &RideLinkConfig, offline: bool) -> Arc<dyn PresenceStore> {
    let presence = &config.presence;
    if offline || !presence.enabled || presence.server_url.is_empty() {
        tracing::info!("presence kept in memory");
        return Arc::new(MemoryPresenceStore::new());
    }

    let rt_config = RealtimeConfig {
        url: presence.server_url.clone(),
        heartbeat_interval_secs: u64::from(presence.heartbeat_interval),
        reconnect_delay_secs: u64::from(presence.reconnect_delay),
        max_reconnect_delay_secs: u64::from(presence.max_reconnect_delay),
        ..RealtimeConfig::default()
    };
    Arc::new(RealtimePresenceStore::connect(
        rt_config,
        &presence.path,
        Duration::from_secs(u64::from(presence.write_timeout)),
    ))
}

fn build_provider(
    args: &cli::Args,
    config: &RideLinkConfig,
) -> Result<Arc<dyn LocationProvider>, ridelink_common::RideLinkError> {
    let interval = Duration::from_millis(
        args.interval_ms
            .unwrap_or(u64::from(config.location.replay_interval_ms)),
    );
    let provider = match &args.track {
        Some(path) => ReplayProvider::from_file(path, interval)?,
        None => ReplayProvider::new(demo::demo_track(36), interval),
    };
    Ok(Arc::new(provider))
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let loaded = ridelink_config::load_config(args.config.as_deref());
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level)
        .unwrap_or_default();
    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("ridelink={}", level.as_directive()));
    init_logging(&directive);

    tracing::info!("RideLink v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        RideLinkConfig::default()
    });

    let provider = match build_provider(&args, &config) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Cannot load track: {e}");
            std::process::exit(1);
        }
    };
    let store = build_store(&config, args.offline);
    let surface = TracingSurface::new();

    let (handle, task) = spawn_session(
        store,
        provider,
        surface,
        SessionSettings::from_config(&config),
    );

    let mut events = handle.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                DriverEvent::Warning(message) => tracing::warn!("{message}"),
                DriverEvent::Shutdown => break,
                other => tracing::info!(event = ?other, "session event"),
            }
        }
    });

    // The screen becomes visible and its style finishes loading.
    if handle.start().await.is_ok() {
        let _ = handle.style_loaded().await;
    }

    tokio::select! {
        _ = console::run(&handle) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    let _ = handle.shutdown().await;
    if let Err(e) = task.await {
        tracing::error!("Session task failed: {e}");
    }
    tracing::info!("Shutdown complete");
}
