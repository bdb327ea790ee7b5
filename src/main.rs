//! Orb Bridge - Serial to UDP telemetry bridge for a spherical robot
//!
//! Usage:
//!   orb-bridge                          Run with ./config.toml (or defaults)
//!   orb-bridge --port /dev/rfcomm0      Pin the serial port
//!   orb-bridge --udp-port 9100 -v       Override telemetry port, debug logs

use clap::Parser;
use orb_bridge::cli::Cli;
use orb_bridge::error::{BridgeError, Result};
use orb_bridge::{bridge, config};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = config::load(cli.config.as_deref())?;
    if !cli.port.is_empty() {
        config.device.ports = cli.port;
    }
    if let Some(udp_port) = cli.udp_port {
        config.telemetry.port = udp_port;
    }

    let rt = tokio::runtime::Runtime::new().map_err(|e| BridgeError::Runtime { source: e })?;
    rt.block_on(run(config))
}

async fn run(config: config::Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_shutdown_handler(shutdown.clone());
    bridge::run(&config, shutdown).await
}

/// Flip the shutdown flag on ctrl-c or SIGTERM
fn spawn_shutdown_handler(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        tracing::info!("Shutting down...");
        shutdown.store(true, Ordering::SeqCst);
    });

    #[cfg(not(unix))]
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down...");
        shutdown.store(true, Ordering::SeqCst);
    });
}
