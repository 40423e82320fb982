//! # geodns-router
//!
//! Geo-DNS router binary: loads settings, installs logging and metrics,
//! and serves the HTTP/WebSocket API until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use geodns_logging::{LogFormat, LogLevel};
use geodns_server::{GeoServer, ServerConfig};
use geodns_settings::GeoDnsSettings;

/// Geo-DNS router server.
#[derive(Parser, Debug)]
#[command(name = "geodns-router", about = "Geo-DNS router server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (defaults to `~/.geodns/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Maximum concurrent WebSocket connections (overrides settings).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Default log level: trace, debug, info, warn or error.
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("unknown log format '{s}' (expected pretty or json)"))
}

impl Cli {
    /// Overlay explicit flags on loaded settings.
    fn apply(&self, settings: &mut GeoDnsSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(max) = self.max_connections {
            settings.server.max_connections = max;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level = LogLevel::from_str_lossy(level);
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
    }
}

fn load(cli: &Cli) -> Result<GeoDnsSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(geodns_settings::settings_path);
    let mut settings = geodns_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load(&cli)?;

    geodns_logging::init_subscriber(
        &settings.logging.filter_directive(),
        settings.logging.format,
    )
    .context("Failed to install tracing subscriber")?;

    let metrics_handle = geodns_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings.server);
    tracing::debug!(?config, "server configuration");
    let server = GeoServer::new(config, metrics_handle);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Geo-DNS router listening on http://{addr} (ws://{addr}/ws)");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown().graceful_shutdown(vec![handle], None).await {
        tracing::warn!("server task did not stop in time");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
