//! syslogd - RFC 5424 syslog receiver
//!
//! # Usage
//!
//! ```bash
//! # Print everything received on udp/514 to stdout
//! syslogd
//!
//! # Listeners and destinations from a file
//! syslogd --config configs/syslogd.toml --log-level debug
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use syslog_ingest::config::{Config, DestinationConfig, ListenerConfig, LogFormat};
use syslog_ingest::server::{UdpServer, DEFAULT_PORT};
use syslog_ingest::writer::build_writer;

/// syslogd - RFC 5424 syslog receiver
#[derive(Parser, Debug)]
#[command(name = "syslogd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// UDP port to listen on when no configuration file is given [default: 514]
    #[arg(short, long, conflicts_with = "config")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => stdout_config(cli.port.unwrap_or(DEFAULT_PORT)),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| config.log.level.as_str());
    init_logging(level, config.log.format)?;

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    let mut writers = HashMap::with_capacity(config.destinations.len());
    for (name, destination) in &config.destinations {
        let writer = build_writer(destination)
            .with_context(|| format!("failed to create destination '{name}'"))?;
        writers.insert(name.as_str(), writer);
    }

    // bind everything before starting anything, a taken port aborts startup
    let mut servers = Vec::with_capacity(config.listeners.len());
    for listener in &config.listeners {
        let writer = writers
            .get(listener.destination.as_str())
            .cloned()
            .with_context(|| format!("unknown destination '{}'", listener.destination))?;

        let server = UdpServer::bind(&listener.server_config(), writer).await?;
        servers.push(server);
    }

    let handles: Vec<_> = servers.into_iter().map(UdpServer::start).collect();
    tracing::info!(listeners = handles.len(), "syslogd running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");

    for handle in handles {
        handle.stop().await;
    }

    Ok(())
}

/// One listener on `port`, printing to stdout
fn stdout_config(port: u16) -> Config {
    let mut config = Config::default();
    config
        .destinations
        .insert("stdout".into(), DestinationConfig::Stdout);
    config.listeners.push(ListenerConfig {
        port,
        destination: "stdout".into(),
        ..Default::default()
    });
    config
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}
