use roomcast_core::IceServerConfig;
use roomcast_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};
use std::time::Duration;

/// Settings shared by every room a client joins.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Upper bound on how long leaving waits for each peer connection to
    /// close before moving on.
    pub close_timeout: Duration,
    /// Buffer of the presence and mesh event broadcasts.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                IceServerConfig::stun(DEFAULT_STUN_ADDR),
                IceServerConfig::stun(DEFAULT_STUN_ADDR_2),
            ],
            close_timeout: Duration::from_secs(2),
            event_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// Reads `ROOMCAST_ICE_URLS` (comma separated STUN urls) and
    /// `TURN_URL` / `TURN_USERNAME` / `TURN_CREDENTIAL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(urls) = lookup("ROOMCAST_ICE_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_owned)
                .collect();
            if !urls.is_empty() {
                config.ice_servers = vec![IceServerConfig {
                    urls,
                    username: None,
                    credential: None,
                }];
            }
        }

        if let Some(turn_url) = lookup("TURN_URL") {
            config.ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: lookup("TURN_USERNAME"),
                credential: lookup("TURN_CREDENTIAL"),
            });
        }

        config
    }
}
