use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// Longest display name accepted; longer input is cut.
pub const MAX_DISPLAY_NAME_CHARS: usize = 20;

/// Who a client is for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: PeerId,
    pub display_name: String,
}

impl Identity {
    pub fn generate(display_name: &str) -> Self {
        Self {
            id: PeerId::new(),
            display_name: normalize_display_name(display_name),
        }
    }

    /// Same id, new name.
    pub fn renamed(&self, display_name: &str) -> Self {
        Self {
            id: self.id.clone(),
            display_name: normalize_display_name(display_name),
        }
    }
}

pub fn normalize_display_name(raw: &str) -> String {
    raw.trim().chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}
