use crate::error::MediaError;
use crate::mesh::mesh_event::{MeshSnapshot, ShutdownReport};
use tokio::sync::oneshot;

/// Requests from the session to its mesh.
#[derive(Debug)]
pub(crate) enum MeshCommand {
    StartScreenShare {
        reply: oneshot::Sender<Result<(), MediaError>>,
    },

    /// Replies whether a share was running.
    StopScreenShare { reply: oneshot::Sender<bool> },

    SetAudioEnabled(bool),

    SetVideoEnabled(bool),

    Snapshot { reply: oneshot::Sender<MeshSnapshot> },

    /// Closes every connection and releases local media.
    Shutdown { reply: oneshot::Sender<ShutdownReport> },
}
