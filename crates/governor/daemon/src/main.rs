//! Safety governor daemon
//!
//! Puts rate limits, resource quotas, anomaly detection, multi-factor
//! approval, automatic rollback and an emergency stop between autonomous
//! control loops and the infrastructure they drive.

use clap::Parser;
use governor_daemon::{DaemonConfig, DaemonError, DaemonResult, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Safety governor daemon CLI
#[derive(Parser)]
#[command(name = "governord")]
#[command(about = "Safety governor daemon for autonomous control operations", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GOVERNOR_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "GOVERNOR_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level, overrides the configuration file
    #[arg(long, env = "GOVERNOR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "GOVERNOR_LOG_JSON")]
    json: bool,

    /// Bearer token for the admin API
    #[arg(long, env = "GOVERNOR_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if cli.admin_token.is_some() {
        config.admin.token = cli.admin_token;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        rate_limit = config.governor.rate_limit.max_per_window,
        approval_factors = config.governor.approval.required_factors,
        "Starting safety governor"
    );

    // Create and run server
    let server = Server::new(config)?;
    server.run().await
}
