use crate::model::peer::PeerId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One event as delivered to subscribers of a topic.
///
/// `sender` is stamped by the transport from the publishing member, so it
/// is the value consumers compare against their own id to drop local echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    pub sender: PeerId,
    pub payload: serde_json::Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, sender: PeerId, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            sender,
            payload,
        }
    }

    pub fn is_echo_of(&self, local: &PeerId) -> bool {
        self.sender == *local
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
