mod broadcast_channel;
mod local_hub;
mod transport;
mod ws_transport;

pub use broadcast_channel::{BroadcastChannel, ChannelState};
pub use local_hub::{LocalHub, LocalHubConfig};
pub use transport::{BroadcastTransport, ChannelEvent, ChannelLink, Outbound};
pub use ws_transport::WsTransport;
