//! # beacon
//!
//! Beacon relay binary: resolves settings, starts the HTTP/WebSocket
//! server, and runs until Ctrl-C or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use beacon_server::{BeaconServer, ServerConfig};
use beacon_settings::BeaconSettings;
use clap::Parser;

/// Real-time location sharing relay.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about = "Real-time location sharing relay")]
struct Cli {
    /// Host to bind (overrides settings and `BEACON_HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file. Defaults to `~/.beacon/settings.json`, which may be absent.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter such as `debug` or `beacon_server=trace`. `RUST_LOG` still wins.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

impl Cli {
    /// Apply flags on top of file and environment settings.
    fn apply(&self, settings: &mut BeaconSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Defaults, then the settings file, then environment, then flags.
fn resolve_settings(cli: &Cli) -> Result<BeaconSettings> {
    let mut settings = match &cli.config {
        Some(path) => beacon_settings::load_settings_from_explicit_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => beacon_settings::load_settings().with_context(|| {
            format!(
                "Failed to load settings from {}",
                beacon_settings::settings_path().display()
            )
        })?,
    };
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    beacon_core::logging::init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics = beacon_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings.server);
    let max_connections = config.max_connections;
    let server = BeaconServer::new(config, metrics);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(max_connections, "Beacon listening on http://{addr}");

    beacon_server::shutdown::wait_for_signal().await;

    tracing::info!("Shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
