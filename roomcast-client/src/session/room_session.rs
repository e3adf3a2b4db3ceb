use crate::error::{MediaError, SessionError};
use crate::mesh::{MeshEvent, MeshManager, MeshParams, MeshSnapshot, ShutdownReport};
use crate::presence::{PresenceChange, PresenceSet, PresenceTracker};
use crate::session::session_context::SessionContext;
use crate::store::AccessDenied;
use crate::surface::{CodeSync, OccupancyMirror, WhiteboardSync};
use roomcast_core::utils::now_millis;
use roomcast_core::{Identity, PresenceEntry, Room, RoomId, RoomKind};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// What a room offers once joined.
pub enum RoomSurface {
    Whiteboard(WhiteboardSync),
    Code(CodeSync),
    /// Voice and video rooms.
    Call(MeshManager),
}

pub enum JoinOutcome {
    Joined(RoomSession),
    /// `room` is set when the room exists but refused the caller.
    Denied {
        reason: AccessDenied,
        room: Option<Room>,
    },
}

impl JoinOutcome {
    pub fn joined(self) -> Option<RoomSession> {
        match self {
            JoinOutcome::Joined(session) => Some(session),
            JoinOutcome::Denied { .. } => None,
        }
    }
}

/// What leaving tore down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaveReport {
    pub mesh: ShutdownReport,
}

/// One client's presence in one room, plus the room's surface.
pub struct RoomSession {
    context: SessionContext,
    room: Room,
    presence: PresenceTracker,
    surface: RoomSurface,
    mirror: OccupancyMirror,
}

impl RoomSession {
    /// Checks access, counts the caller in and joins the room.
    ///
    /// A denied device does not fail the join: a call room then reports the
    /// problem through [`RoomSession::media_error`].
    pub async fn open(
        context: &SessionContext,
        room_id: &RoomId,
        identity: Identity,
        secret: Option<&str>,
    ) -> Result<JoinOutcome, SessionError> {
        let store = context.store();
        let decision = store.admit(room_id, secret).await?;
        let room = match (decision.denied, decision.room) {
            (None, Some(room)) => room,
            (reason, room) => {
                let reason = reason.unwrap_or(AccessDenied::NotFound);
                info!("{} may not join {}: {}", identity.id, room_id, reason);
                return Ok(JoinOutcome::Denied { reason, room });
            }
        };

        match Self::join(context, room, identity).await {
            Ok(session) => Ok(JoinOutcome::Joined(session)),
            Err(e) => {
                if let Err(release) = store.release(room_id).await {
                    warn!("Could not release {} after a failed join: {}", room_id, release);
                }
                Err(e)
            }
        }
    }

    async fn join(
        context: &SessionContext,
        room: Room,
        identity: Identity,
    ) -> Result<Self, SessionError> {
        let config = context.config();
        let transport = context.transport().as_ref();
        let local = PresenceEntry::new(identity, now_millis());

        let presence = PresenceTracker::join(
            transport,
            room.presence_topic(),
            local.clone(),
            config.event_capacity,
        )
        .await?;

        let surface = match (room.kind, room.kind.media_profile()) {
            (_, Some(profile)) => {
                let mesh = MeshManager::start(MeshParams {
                    local: local.clone(),
                    profile,
                    channel: presence.channel().clone(),
                    presence: presence.watch(),
                    factory: context.peers().clone(),
                    devices: context.devices().clone(),
                    close_timeout: config.close_timeout,
                    event_capacity: config.event_capacity,
                })
                .await;
                Ok(RoomSurface::Call(mesh))
            }
            (RoomKind::Code, None) => CodeSync::open(transport, &room.id, local.clone())
                .await
                .map(RoomSurface::Code),
            (_, None) => WhiteboardSync::open(transport, &room.id, local.clone())
                .await
                .map(RoomSurface::Whiteboard),
        };

        let surface = match surface {
            Ok(surface) => surface,
            Err(e) => {
                presence.leave().await;
                return Err(e.into());
            }
        };

        let mirror = OccupancyMirror::spawn(context.store().clone(), room.id.clone(), presence.watch());

        info!("{} entered {} room '{}'", local.id(), room.kind.label(), room.name);
        Ok(Self {
            context: context.clone(),
            room,
            presence,
            surface,
            mirror,
        })
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn local(&self) -> &PresenceEntry {
        self.presence.local()
    }

    pub fn active_set(&self) -> PresenceSet {
        self.presence.active_set()
    }

    pub fn watch_presence(&self) -> watch::Receiver<PresenceSet> {
        self.presence.watch()
    }

    pub fn presence_changes(&self) -> broadcast::Receiver<PresenceChange> {
        self.presence.changes()
    }

    pub fn surface(&self) -> &RoomSurface {
        &self.surface
    }

    pub fn whiteboard(&self) -> Option<&WhiteboardSync> {
        match &self.surface {
            RoomSurface::Whiteboard(sync) => Some(sync),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&CodeSync> {
        match &self.surface {
            RoomSurface::Code(sync) => Some(sync),
            _ => None,
        }
    }

    pub fn mesh(&self) -> Option<&MeshManager> {
        match &self.surface {
            RoomSurface::Call(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn media_error(&self) -> Option<&MediaError> {
        self.mesh().and_then(MeshManager::media_error)
    }

    pub fn mesh_events(&self) -> Option<broadcast::Receiver<MeshEvent>> {
        self.mesh().map(MeshManager::subscribe)
    }

    pub async fn mesh_snapshot(&self) -> Result<Option<MeshSnapshot>, SessionError> {
        match self.mesh() {
            Some(mesh) => mesh.snapshot().await.map(Some),
            None => Ok(None),
        }
    }

    pub fn set_audio_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.call()?.set_audio_enabled(enabled)
    }

    pub fn set_video_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.call()?.set_video_enabled(enabled)
    }

    pub async fn start_screen_share(&self) -> Result<(), SessionError> {
        self.call()?.start_screen_share().await
    }

    pub async fn stop_screen_share(&self) -> Result<bool, SessionError> {
        self.call()?.stop_screen_share().await
    }

    fn call(&self) -> Result<&MeshManager, SessionError> {
        self.mesh().ok_or(SessionError::NotACallRoom(self.room.kind))
    }

    /// Leaves the room. Every peer connection is closed before the goodbye
    /// goes out; the store is told last.
    pub async fn close(self) -> LeaveReport {
        let RoomSession {
            context,
            room,
            presence,
            surface,
            mirror,
        } = self;

        mirror.stop();

        let mut report = LeaveReport::default();
        match surface {
            RoomSurface::Call(mesh) => report.mesh = mesh.shutdown().await,
            RoomSurface::Whiteboard(sync) => sync.close(),
            RoomSurface::Code(sync) => sync.close(),
        }

        let local = presence.local().id().clone();
        presence.leave().await;

        if let Err(e) = context.store().release(&room.id).await {
            warn!("Could not release {}: {}", room.id, e);
        }

        info!(
            "{} left '{}' ({} connections closed)",
            local, room.name, report.mesh.closed_connections
        );
        report
    }
}
