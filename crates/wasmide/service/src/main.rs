//! wasmided - web IDE backend
//!
//! Serves project CRUD, compilation to WebAssembly and share links over HTTP.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wasmide_service::{Server, ServiceConfig};

/// wasmided CLI
#[derive(Parser)]
#[command(name = "wasmided")]
#[command(about = "Web IDE backend compiling Go and AssemblyScript to WebAssembly", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WASMIDE_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides the configuration file
    #[arg(short, long, env = "WASMIDE_LISTEN_ADDR")]
    listen: Option<SocketAddr>,

    /// Log level, overrides the configuration file
    #[arg(long, env = "WASMIDE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "WASMIDE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

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
        "starting wasmided"
    );

    let server = Server::new(config).await.context("starting server")?;
    server.run().await?;
    Ok(())
}
