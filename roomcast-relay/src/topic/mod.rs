mod topic_command;
mod topic_manager;
mod topic_room;

pub use topic_command::*;
pub use topic_manager::*;
pub use topic_room::*;
