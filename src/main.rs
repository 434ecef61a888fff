// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quicksession::{global, Server, Settings};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_PORT: u16 = 8080;

/// quicksession - demo server for in-process cookie sessions.
#[derive(Parser)]
#[command(name = "quicksession")]
#[command(version = VERSION)]
#[command(about = "Demo server for in-process, cookie-bound sessions.")]
#[command(long_about = "quicksession - in-process, cookie-bound sessions\n\n\
    Start the demo:      quicksession\n\
    Other port:          quicksession --port 9000\n\
    Short sessions:      quicksession --expiration 60 --sweep-interval 30\n\n\
    Open http://127.0.0.1:8080/ and sign in with any name and password.\n\
    Set RUST_LOG=quicksession=debug to watch sessions start and rotate.")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind to (use 0.0.0.0 to expose on the network)
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Settings file (default: ~/.quicksession/config.json)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Name of the session cookie
    #[arg(long, value_name = "NAME")]
    cookie_name: Option<String>,

    /// Session lifetime in seconds, refreshed on every request
    #[arg(long, value_name = "SECS")]
    expiration: Option<i64>,

    /// Seconds between expired-session sweeps
    #[arg(long, value_name = "SECS")]
    sweep_interval: Option<u64>,
}

fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".quicksession").join("config.json"))
}

/// Load settings from file, then apply command-line overrides.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut settings = Settings::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;

    if let Some(name) = &cli.cookie_name {
        settings.cookie_name = name.clone();
    }
    if let Some(secs) = cli.expiration {
        settings.expiration_secs = secs;
    }
    if let Some(secs) = cli.sweep_interval {
        settings.sweep_interval = Duration::from_secs(secs);
    }

    settings.validate().context("Invalid command-line settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quicksession=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    tracing::info!(
        cookie = %settings.cookie_name,
        expiration_secs = settings.expiration_secs,
        sweep_interval_secs = settings.sweep_interval.as_secs(),
        "quicksession v{} starting",
        VERSION
    );

    let registry = Arc::clone(global());
    registry.set_settings(settings)?;

    Server::new(cli.port)
        .with_bind_address(cli.bind)
        .with_registry(registry)
        .start()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_file_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cookie_name": "FromFile", "expiration_secs": 100}"#).unwrap();

        let cli = Cli::parse_from([
            "quicksession",
            "--config",
            path.to_str().unwrap(),
            "--expiration",
            "60",
        ]);
        let settings = resolve_settings(&cli).unwrap();
        assert_eq!(settings.cookie_name, "FromFile");
        assert_eq!(settings.expiration_secs, 60);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from([
            "quicksession",
            "--config",
            dir.path().join("missing.json").to_str().unwrap(),
            "--sweep-interval",
            "0",
        ]);
        assert!(resolve_settings(&cli).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["quicksession"]);
        assert_eq!(cli.port, DEFAULT_PORT);
        assert_eq!(cli.bind, "127.0.0.1");
        assert!(cli.config.is_none());
    }
}
