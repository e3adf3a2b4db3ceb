mod presence_set;
mod presence_tracker;

pub use presence_set::{PresenceChange, PresenceSet};
pub use presence_tracker::PresenceTracker;
