//! Crowdwatch Backend Server
//!
//! Run with: cargo run --bin crowdwatch-server
//!
//! # Configuration
//!
//! Reads the same config file as `crowdwatch` (`[server]` and `[logging]`).
//!
//! Environment variables:
//! - `CROWDWATCH_SERVER_HOST`: Host to bind to (default: 0.0.0.0)
//! - `CROWDWATCH_SERVER_PORT`: Port to listen on (default: 8000)
//! - `RUST_LOG`: Log filter (default: crowdwatch=info)

use clap::Parser;
use crowdwatch::config::{Config, LoadedConfig};
use crowdwatch::server::{serve, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crowdwatch-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregation backend for crowdwatch cameras")]
struct Args {
    /// Config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => LoadedConfig::from_file(path)?,
        None => Config::load_default(),
    };

    crowdwatch::logging::init(&loaded.config.logging)?;
    loaded.log();

    let mut config = loaded.config;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting Crowdwatch backend v{}", env!("CARGO_PKG_VERSION"));

    serve(AppState::new(), &config.server).await?;

    tracing::info!("Crowdwatch backend stopped");
    Ok(())
}
