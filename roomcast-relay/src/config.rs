use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:9000";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// How often each topic sends its full membership to every member.
    pub sync_interval: Duration,
    /// Messages queued per socket before the relay gives up on a slow
    /// client.
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9000)),
            sync_interval: Duration::from_secs(5),
            outbound_buffer: 512,
        }
    }
}

impl RelayConfig {
    /// Reads `ROOMCAST_BIND` and `ROOMCAST_SYNC_INTERVAL_MS`. Values that do
    /// not parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("ROOMCAST_BIND").and_then(|v| v.parse().ok()) {
            config.bind = bind;
        }
        if let Some(ms) = lookup("ROOMCAST_SYNC_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.sync_interval = Duration::from_millis(ms.max(1));
        }

        config
    }
}
