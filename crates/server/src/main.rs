use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use slab_protocol::PacketRegistry;
use slab_server::context::DEFAULT_REGISTRY;
use slab_server::{ServerConfig, ServerContext, heartbeat, net};

#[derive(Parser, Debug)]
#[command(name = "slab-server")]
#[command(about = "Flat-world Minecraft 1.12.2 server", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 25565)]
    port: u16,

    /// Players allowed in Play at once
    #[arg(long, default_value_t = 20)]
    max_players: usize,

    /// Server list description
    #[arg(long, default_value = "A slab server")]
    motd: String,

    /// Packet table to use instead of the built-in protocol 340 table
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Seconds between keep-alives
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_secs: u64,
}

fn load_registry(path: Option<&PathBuf>) -> Result<PacketRegistry> {
    let json = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading packet table {}", path.display()))?,
        None => DEFAULT_REGISTRY.to_owned(),
    };
    PacketRegistry::from_json(&json).context("loading packet table")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        max_players: args.max_players,
        motd: args.motd,
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        ..ServerConfig::default()
    };
    let registry = load_registry(args.registry.as_ref())?;
    tracing::info!("Packet table loaded: {} packets", registry.len());

    let bind_addr = config.bind_addr();
    let ctx = Arc::new(ServerContext::new(config, registry)?);

    heartbeat::start(Arc::clone(&ctx));

    tracing::info!(
        "Starting Minecraft {} server on {}",
        ctx.config.version_name,
        bind_addr
    );

    tokio::select! {
        result = net::listener::run(Arc::clone(&ctx), &bind_addr) => {
            if let Err(e) = result {
                tracing::error!("Server error: {:#}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
    }

    Ok(())
}
