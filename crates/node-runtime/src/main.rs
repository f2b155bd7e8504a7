//! # Quantum-Chain Ordering Node
//!
//! ## Startup Sequence
//!
//! 1. Parse command-line flags
//! 2. Load configuration (TOML file, then `QC_*` environment, then flags)
//! 3. Initialize logging (`RUST_LOG` wins over the configured level)
//! 4. Start the ordering node and serve until Ctrl+C
//! 5. Graceful shutdown: flush the queue, then stop the server

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use node_runtime::container::config::split_peer_list;
use node_runtime::{NodeConfig, OrderingNode};

#[derive(Parser, Debug)]
#[command(name = "node-runtime", about = "Quantum-Chain ordering node")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "QC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to serve the HTTP API on
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,

    /// Comma-separated peer addresses (host:port)
    #[arg(long)]
    peers: Option<String>,

    /// Proposal size cap
    #[arg(long)]
    max_batch_size: Option<usize>,

    /// Batch timeout in milliseconds
    #[arg(long)]
    batch_timeout_ms: Option<u64>,

    /// Log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    config.apply_env()?;

    if let Some(listen) = args.listen {
        config.listen_address = listen;
    }
    if let Some(peers) = &args.peers {
        config.initial_peers = split_peer_list(peers);
    }
    if let Some(max) = args.max_batch_size {
        config.ordering.max_batch_size = max;
    }
    if let Some(timeout) = args.batch_timeout_ms {
        config.ordering.batch_timeout_ms = timeout;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("Invalid configuration")?;
    init_tracing(&config.log_level);

    info!("===========================================");
    info!("  Quantum-Chain Ordering Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        max_batch_size = config.ordering.max_batch_size,
        batch_timeout_ms = config.ordering.batch_timeout_ms,
        peers = ?config.initial_peers,
        "Configuration loaded"
    );

    let node = OrderingNode::start(config).await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await
}
