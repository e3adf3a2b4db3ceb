mod ice_queue;
mod inbox;
mod signaling_output;

pub use ice_queue::IceQueue;
pub use inbox::{accept, decode};
pub use signaling_output::{ChannelSignaling, SignalingOutput};
