//! mlbridge host - serves the reference runtime to bridge clients.
//!
//! Exposes one `LocalRuntime` hosting every stage class on two surfaces: the
//! framed TCP bridge protocol used by `TcpBridge`, and an HTTP JSON-RPC
//! endpoint with the same methods.

mod handler;
mod server;

use anyhow::Result;
use clap::Parser;
use mlbridge::{BridgeServer, LocalRuntime};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "mlbridge-host")]
#[command(about = "Bridge host for remote ML stage objects")]
struct Args {
    /// TCP bridge port (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// HTTP JSON-RPC port (0 = auto-assign)
    #[arg(long, default_value = "0")]
    http_port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Root directory for relative save/load paths
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting mlbridge host");

    let mut runtime = LocalRuntime::new(mlbridge_stages::catalog());
    if let Some(dir) = &args.base_dir {
        info!("Base directory: {}", dir.display());
        runtime = runtime.with_base_dir(dir);
    }
    let runtime = Arc::new(runtime);

    let bridge_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let bridge = BridgeServer::start(runtime.clone(), bridge_addr).await?;

    // Ports are read from stdout by the launching process
    println!("BRIDGE_PORT={}", bridge.addr().port());

    let http_addr = server::start_server(runtime, &args.host, args.http_port).await?;
    println!("HTTP_PORT={}", http_addr.port());

    info!(
        "Host running: bridge on {}, JSON-RPC on {}",
        bridge.addr(),
        http_addr
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    drop(bridge);
    Ok(())
}
