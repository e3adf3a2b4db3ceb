pub use roomcast_core::{Identity, PeerId, Room, RoomId, RoomKind};

pub mod model {
    pub use roomcast_core::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use roomcast_client::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use roomcast_relay::*;
}
