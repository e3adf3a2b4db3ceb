pub mod ws_client;

pub use test_relay::*;
pub use ws_client::*;
