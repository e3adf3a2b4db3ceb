pub mod config;
pub mod topic;
pub mod transport;

pub use config::RelayConfig;
pub use topic::{TopicCommand, TopicManager, TopicRoom};
pub use transport::{RelayService, ws_handler};

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

/// `/topic/{name}` WebSocket endpoints plus `/health`.
pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/topic/{name}", get(ws_handler))
        .route("/health", get(health))
        .with_state(service)
}

async fn health() -> &'static str {
    "ok"
}

/// Serves the relay on `listener` until the process ends.
pub async fn serve(listener: TcpListener, config: RelayConfig) -> std::io::Result<()> {
    let service = RelayService::new(config);
    info!("Relay listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service)).await
}
