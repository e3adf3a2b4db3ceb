mod board;
mod occupancy;
mod surface_sync;
mod workspace;

pub use board::Board;
pub use occupancy::OccupancyMirror;
pub use surface_sync::{CodeSync, Remote, SurfaceEvent, SurfaceSync, WhiteboardSync};
pub use workspace::{
    CodeFile, DEFAULT_CONTENT, DEFAULT_FILE, DEFAULT_LANGUAGE, Workspace, language_for,
};
