//! KeyReg gateway binary.
//!
//! Loads `keyreg.toml` (or `--config`), connects to the PublicKeyRegistry
//! contract and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use keyreg_api::config::{Config, LoggingConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "keyreg-api")]
#[command(version, about = "HTTP gateway for the on-chain RSA public key registry", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "keyreg.toml", env = "KEYREG_CONFIG")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config).context("Failed to load configuration")?;

    init_logging(&config.logging, cli.debug);

    info!("KeyReg gateway starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("  Chain ID: {}", config.network.chain_id);
    info!("  RPC URL: {}", config.network.rpc_url);
    info!("  Registry: {}", config.contracts.key_registry);

    keyreg_api::run_with_config(config).await
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig, debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("keyreg_api=debug,keyreg_registry=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "keyreg_api={level},keyreg_registry={level},tower_http={level}",
                level = logging.level
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}
