mod room_session;
mod session_context;

pub use room_session::{JoinOutcome, LeaveReport, RoomSession, RoomSurface};
pub use session_context::SessionContext;
