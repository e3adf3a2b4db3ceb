use crate::channel::BroadcastTransport;
use crate::config::SessionConfig;
use crate::media::{MediaDevices, SampleDevices};
use crate::mesh::{PeerTransportFactory, RtcPeerFactory};
use crate::store::RoomStore;
use std::sync::Arc;

struct ContextInner {
    transport: Arc<dyn BroadcastTransport>,
    store: Arc<dyn RoomStore>,
    peers: Arc<dyn PeerTransportFactory>,
    devices: Arc<dyn MediaDevices>,
    config: SessionConfig,
}

/// The collaborators every room session of one client shares.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

impl SessionContext {
    /// Uses `webrtc` peer connections and sample media devices unless told
    /// otherwise.
    pub fn new(
        transport: Arc<dyn BroadcastTransport>,
        store: Arc<dyn RoomStore>,
        config: SessionConfig,
    ) -> Self {
        let peers = Arc::new(RtcPeerFactory::new(config.ice_servers.clone()));
        Self {
            inner: Arc::new(ContextInner {
                transport,
                store,
                peers,
                devices: Arc::new(SampleDevices::new()),
                config,
            }),
        }
    }

    pub fn with_peer_factory(self, peers: Arc<dyn PeerTransportFactory>) -> Self {
        self.rebuild(|inner| inner.peers = peers)
    }

    pub fn with_devices(self, devices: Arc<dyn MediaDevices>) -> Self {
        self.rebuild(|inner| inner.devices = devices)
    }

    fn rebuild<F: FnOnce(&mut ContextInner)>(self, change: F) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => ContextInner {
                transport: shared.transport.clone(),
                store: shared.store.clone(),
                peers: shared.peers.clone(),
                devices: shared.devices.clone(),
                config: shared.config.clone(),
            },
        };
        change(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn transport(&self) -> &Arc<dyn BroadcastTransport> {
        &self.inner.transport
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.inner.store
    }

    pub fn peers(&self) -> &Arc<dyn PeerTransportFactory> {
        &self.inner.peers
    }

    pub fn devices(&self) -> &Arc<dyn MediaDevices> {
        &self.inner.devices
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}
