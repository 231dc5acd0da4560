use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

use live_proxy::config::Config;
use live_proxy::http::{create_router, AppState};
use live_proxy::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "live-proxy")]
#[command(about = "Caching, batching proxy that reports which channels are live")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./live-proxy.yaml or $XDG_CONFIG_HOME/live-proxy/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Address to bind
  #[arg(long)]
  host: Option<String>,

  /// Port to listen on
  #[arg(short, long)]
  port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override listen address if specified on command line
  if let Some(host) = args.host {
    config.server.host = host;
  }
  if let Some(port) = args.port {
    config.server.port = port;
  }

  let _log_guard = init_logging(&config.logging)?;

  let state = AppState::from_config(&config)?;
  let router = create_router(state);

  let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
    .parse()
    .map_err(|e| eyre!("Invalid listen address: {}", e))?;
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;

  info!(
    %addr,
    version = env!("CARGO_PKG_VERSION"),
    ttl_secs = config.cache.ttl_secs,
    batch_limit = config.upstream.batch_limit,
    "live-proxy listening"
  );

  axum::serve(listener, router)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("shutdown complete");
  Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
  let ctrl_c = async {
    let _ = signal::ctrl_c().await;
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut stream) => {
        stream.recv().await;
      }
      Err(_) => std::future::pending::<()>().await,
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("shutdown signal received");
}
