//! Concerto Gateway - Git smart HTTP front door.

use anyhow::Context;
use clap::Parser;
use concerto_gateway::{
    observability::{init_logging, LogFormat},
    server, AppState, GatewayConfig,
};
use std::path::PathBuf;

/// Concerto Gateway - serve Git repositories over smart HTTP
#[derive(Parser, Debug)]
#[command(name = "concerto-gateway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "CONCERTO_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        GatewayConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(level) = args.log_level {
        config.log.level = level;
    }
    if let Some(format) = args.log_format {
        config.log.format = format;
    }

    init_logging(&config.log.level, LogFormat::parse(&config.log.format));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Concerto gateway");
    tracing::info!(
        domain = %config.domain,
        realm = %config.realm,
        main_path = %config.main_path.display(),
        layout = ?config.repository.layout,
        git_program = config.git.program.as_deref().unwrap_or("git-<service>"),
        "Gateway configuration"
    );

    let state = AppState::from_config(config).context("invalid configuration")?;
    server::run(state).await.context("server error")?;

    Ok(())
}
