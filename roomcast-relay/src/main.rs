use anyhow::Context;
use clap::Parser;
use roomcast_relay::RelayConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Broadcast relay for roomcast clients.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to listen on. Overrides ROOMCAST_BIND.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Milliseconds between membership snapshots. Overrides
    /// ROOMCAST_SYNC_INTERVAL_MS.
    #[arg(long)]
    sync_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = RelayConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(ms) = args.sync_interval_ms {
        config.sync_interval = Duration::from_millis(ms.max(1));
    }

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    roomcast_relay::serve(listener, config).await?;
    Ok(())
}
