use crate::channel::BroadcastChannel;
use crate::error::{MediaError, SessionError};
use crate::media::{LocalMedia, LocalTrack, MediaDevices};
use crate::mesh::mesh_command::MeshCommand;
use crate::mesh::mesh_event::{MeshEvent, MeshSnapshot, PeerSnapshot, ShutdownReport};
use crate::mesh::peer_link::{LinkCommand, LinkReport, LinkRole, LinkUpdate, PeerLink};
use crate::mesh::peer_transport::PeerTransportFactory;
use crate::presence::PresenceSet;
use crate::signaling::{self, ChannelSignaling, SignalingOutput};
use futures::future::join_all;
use roomcast_core::{
    ConnectionId, Frame, MediaProfile, PeerId, PresenceEntry, ShareStatus, SignalBody,
    SignalMessage,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Everything a mesh needs from its room session.
pub struct MeshParams {
    pub local: PresenceEntry,
    pub profile: MediaProfile,
    /// The room's presence channel; signaling rides on it.
    pub channel: BroadcastChannel,
    pub presence: watch::Receiver<PresenceSet>,
    pub factory: Arc<dyn PeerTransportFactory>,
    pub devices: Arc<dyn MediaDevices>,
    pub close_timeout: Duration,
    pub event_capacity: usize,
}

/// Handle to the full mesh of one audio/video room.
///
/// One connection per remote peer in the active set. The peer that was
/// present first offers; the other waits.
pub struct MeshManager {
    commands: mpsc::UnboundedSender<MeshCommand>,
    events: broadcast::Sender<MeshEvent>,
    media_error: Option<MediaError>,
}

impl MeshManager {
    /// Acquires local media and starts the mesh. Denied devices do not fail
    /// the call: the mesh then stays out of the room and reports why through
    /// [`MeshManager::media_error`].
    pub async fn start(params: MeshParams) -> Self {
        let (media, media_error) = match LocalMedia::acquire(params.devices, params.profile).await {
            Ok(media) => (Some(media), None),
            Err(e) => {
                warn!("Local media unavailable, not joining the mesh: {}", e);
                (None, Some(e))
            }
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(params.event_capacity.max(1));
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();

        let mut subscribed = SignalMessage::NEGOTIATION_EVENTS.to_vec();
        subscribed.push(ShareStatus::EVENT);
        let frames = params.channel.subscribe(&subscribed);

        let mesh = Mesh {
            local: params.local,
            media,
            links: HashMap::new(),
            known: BTreeMap::new(),
            sharing: BTreeSet::new(),
            factory: params.factory,
            signaling: Arc::new(ChannelSignaling::new(params.channel.clone())),
            channel: params.channel,
            events: events.clone(),
            commands: commands_rx,
            updates_tx,
            updates: updates_rx,
            ended_tx,
            ended: ended_rx,
            close_timeout: params.close_timeout,
        };
        tokio::spawn(mesh.run(params.presence, frames));

        Self {
            commands: commands_tx,
            events,
            media_error,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeshEvent> {
        self.events.subscribe()
    }

    /// Why this client has no outgoing media, if it has none.
    pub fn media_error(&self) -> Option<&MediaError> {
        self.media_error.as_ref()
    }

    pub async fn start_screen_share(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(MeshCommand::StartScreenShare { reply })?;
        rx.await.map_err(|_| SessionError::Stopped)??;
        Ok(())
    }

    /// Returns false when no share was running.
    pub async fn stop_screen_share(&self) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(MeshCommand::StopScreenShare { reply })?;
        rx.await.map_err(|_| SessionError::Stopped)
    }

    pub fn set_audio_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.send(MeshCommand::SetAudioEnabled(enabled))
    }

    pub fn set_video_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.send(MeshCommand::SetVideoEnabled(enabled))
    }

    pub async fn snapshot(&self) -> Result<MeshSnapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(MeshCommand::Snapshot { reply })?;
        rx.await.map_err(|_| SessionError::Stopped)
    }

    /// Closes every connection, waits for each close and releases local
    /// media.
    pub async fn shutdown(self) -> ShutdownReport {
        let (reply, rx) = oneshot::channel();
        if self.send(MeshCommand::Shutdown { reply }).is_err() {
            return ShutdownReport::default();
        }
        rx.await.unwrap_or_default()
    }

    fn send(&self, command: MeshCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Stopped)
    }
}

struct Mesh {
    local: PresenceEntry,
    /// `None` when devices were denied: the client stays present but out of
    /// the mesh.
    media: Option<LocalMedia>,
    links: HashMap<PeerId, PeerLink>,
    /// Remote entries of the last active set seen.
    known: BTreeMap<PeerId, PresenceEntry>,
    sharing: BTreeSet<PeerId>,
    factory: Arc<dyn PeerTransportFactory>,
    signaling: Arc<dyn SignalingOutput>,
    channel: BroadcastChannel,
    events: broadcast::Sender<MeshEvent>,
    commands: mpsc::UnboundedReceiver<MeshCommand>,
    updates_tx: mpsc::UnboundedSender<LinkUpdate>,
    updates: mpsc::UnboundedReceiver<LinkUpdate>,
    ended_tx: mpsc::UnboundedSender<String>,
    ended: mpsc::UnboundedReceiver<String>,
    close_timeout: Duration,
}

impl Mesh {
    async fn run(
        mut self,
        mut presence: watch::Receiver<PresenceSet>,
        mut frames: mpsc::UnboundedReceiver<Frame>,
    ) {
        info!("Mesh for {} started", self.local.id());

        let initial = presence.borrow_and_update().clone();
        self.on_presence(&initial);

        let mut presence_open = true;
        let mut frames_open = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(MeshCommand::Shutdown { reply }) => {
                        let report = self.shutdown().await;
                        let _ = reply.send(report);
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },

                changed = presence.changed(), if presence_open => match changed {
                    Ok(()) => {
                        let set = presence.borrow_and_update().clone();
                        self.on_presence(&set);
                    }
                    Err(_) => {
                        presence_open = false;
                        self.close_all("presence ended");
                    }
                },

                frame = frames.recv(), if frames_open => match frame {
                    Some(frame) => self.on_frame(frame),
                    None => frames_open = false,
                },

                Some(update) = self.updates.recv() => self.on_link_update(update),

                Some(track_id) = self.ended.recv() => self.on_screen_ended(track_id),
            }
        }

        info!("Mesh for {} finished", self.local.id());
    }

    async fn handle_command(&mut self, command: MeshCommand) {
        match command {
            MeshCommand::StartScreenShare { reply } => {
                let _ = reply.send(self.start_screen_share().await);
            }
            MeshCommand::StopScreenShare { reply } => {
                let _ = reply.send(self.stop_screen_share());
            }
            MeshCommand::SetAudioEnabled(enabled) => {
                if let Some(media) = &self.media {
                    media.set_audio_enabled(enabled);
                }
            }
            MeshCommand::SetVideoEnabled(enabled) => {
                if let Some(media) = &self.media {
                    media.set_video_enabled(enabled);
                }
            }
            MeshCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            MeshCommand::Shutdown { .. } => {}
        }
    }

    fn on_presence(&mut self, set: &PresenceSet) {
        if !set.is_connected() {
            self.close_all("presence channel lost");
            self.known.clear();
            return;
        }

        let current: BTreeMap<PeerId, PresenceEntry> = set
            .remote()
            .map(|entry| (entry.id().clone(), entry.clone()))
            .collect();

        for (id, entry) in &self.known {
            if current.get(id) != Some(entry) {
                self.sharing.remove(id);
            }
        }

        // A link belongs to one presence entry. It goes when that entry
        // does, including when the same identity comes back as a new entry.
        let stale: Vec<PeerId> = self
            .links
            .iter()
            .filter(|(id, link)| match (&link.entry, current.get(*id)) {
                (Some(linked), now) => now != Some(linked),
                (None, _) => false,
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            self.close_link(&id, "left the room");
        }

        // Links answered before their peer showed up adopt its entry now.
        for (id, link) in self.links.iter_mut() {
            if link.entry.is_none() {
                link.entry = current.get(id).cloned();
            }
        }

        let joined: Vec<PresenceEntry> = current
            .values()
            .filter(|entry| self.known.get(entry.id()) != Some(*entry))
            .cloned()
            .collect();
        self.known = current;

        for entry in joined {
            if self.local.initiates_toward(&entry) && !self.links.contains_key(entry.id()) {
                let remote = entry.id().clone();
                self.open_link(remote, Some(entry), ConnectionId::new(), LinkRole::Initiator);
            }
        }
    }

    fn on_frame(&mut self, frame: Frame) {
        if frame.event == ShareStatus::EVENT {
            self.on_share_status(frame);
            return;
        }

        let Some(message) = signaling::accept(&frame, self.local.id()) else {
            return;
        };
        let sender = message.sender;

        match message.body {
            SignalBody::Offer { connection, sdp } => {
                if self.media.is_none() {
                    debug!("Ignoring offer from {} without local media", sender);
                    return;
                }
                if let Some(link) = self.current_link(&sender, connection) {
                    link.send(LinkCommand::Offer { sdp });
                    return;
                }
                if self.links.contains_key(&sender) {
                    info!("New offer from {} replaces the existing connection", sender);
                    self.close_link(&sender, "replaced by a new offer");
                }
                let entry = self.known.get(&sender).cloned();
                self.open_link(sender, entry, connection, LinkRole::Answerer { offer: sdp });
            }

            SignalBody::Answer { connection, sdp } => match self.current_link(&sender, connection) {
                Some(link) => link.send(LinkCommand::Answer { sdp }),
                None => debug!("Stale answer from {} for {}", sender, connection),
            },

            SignalBody::IceCandidate {
                connection,
                candidate,
            } => match self.current_link(&sender, connection) {
                Some(link) => link.send(LinkCommand::Candidate(candidate)),
                None => debug!("Stale candidate from {} for {}", sender, connection),
            },

            SignalBody::Join { .. } | SignalBody::Leave => {}
        }
    }

    fn on_share_status(&mut self, frame: Frame) {
        if frame.is_echo_of(self.local.id()) {
            return;
        }
        let status: ShareStatus = match frame.decode() {
            Ok(status) => status,
            Err(e) => {
                warn!("Malformed share status from {}: {}", frame.sender, e);
                return;
            }
        };
        if status.sender != frame.sender {
            return;
        }

        let changed = if status.sharing {
            self.sharing.insert(status.sender.clone())
        } else {
            self.sharing.remove(&status.sender)
        };
        if changed {
            let _ = self.events.send(MeshEvent::ShareStatus {
                peer_id: status.sender,
                sharing: status.sharing,
            });
        }
    }

    fn on_link_update(&mut self, update: LinkUpdate) {
        let Some(link) = self.links.get_mut(&update.remote) else {
            return;
        };
        if link.connection != update.connection {
            debug!("Dropping report of replaced link {}", update.connection);
            return;
        }

        match update.report {
            LinkReport::State(state) => {
                link.state = state;
                let _ = self.events.send(MeshEvent::PeerState {
                    peer_id: update.remote,
                    connection: update.connection,
                    state,
                });
            }
            LinkReport::RemoteTrack(track) => {
                let _ = self.events.send(MeshEvent::RemoteTrack {
                    peer_id: update.remote,
                    track,
                });
            }
            LinkReport::Failed(reason) => {
                error!("Link toward {} failed: {}", update.remote, reason);
                self.close_link(&update.remote, "failed");
            }
        }
    }

    fn current_link(&self, remote: &PeerId, connection: ConnectionId) -> Option<&PeerLink> {
        self.links
            .get(remote)
            .filter(|link| link.connection == connection)
    }

    fn open_link(
        &mut self,
        remote: PeerId,
        entry: Option<PresenceEntry>,
        connection: ConnectionId,
        role: LinkRole,
    ) {
        let Some(media) = &self.media else {
            return;
        };

        let side = match role {
            LinkRole::Initiator => "offering",
            LinkRole::Answerer { .. } => "answering",
        };
        info!("Opening link {} toward {} ({})", connection, remote, side);
        let mut link = PeerLink::spawn(
            remote.clone(),
            connection,
            role,
            media.tracks(),
            self.factory.clone(),
            self.signaling.clone(),
            self.updates_tx.clone(),
        );
        link.entry = entry;
        self.links.insert(remote, link);
    }

    /// Removes the link right away. Its transport closes in the background.
    fn close_link(&mut self, remote: &PeerId, reason: &str) {
        let Some(link) = self.links.remove(remote) else {
            return;
        };
        info!("Closing link toward {}: {}", remote, reason);

        let connection = link.connection;
        let closed = link.close();
        let timeout = self.close_timeout;
        let peer = remote.clone();
        tokio::spawn(async move {
            if tokio::time::timeout(timeout, closed).await.is_err() {
                warn!("Link toward {} did not close within {:?}", peer, timeout);
            }
        });

        let _ = self.events.send(MeshEvent::PeerClosed {
            peer_id: remote.clone(),
            connection,
        });
    }

    fn close_all(&mut self, reason: &str) {
        let remotes: Vec<PeerId> = self.links.keys().cloned().collect();
        for remote in remotes {
            self.close_link(&remote, reason);
        }
        self.sharing.clear();
    }

    async fn start_screen_share(&mut self) -> Result<(), MediaError> {
        let Some(media) = self.media.as_mut() else {
            return Err(MediaError::Unavailable("camera"));
        };
        let screen = media.start_screen_share().await?;

        self.replace_video(&screen);
        self.watch_capture(&screen);
        self.publish_share_status(true);
        info!("Screen share started with track {}", screen.id());
        Ok(())
    }

    fn stop_screen_share(&mut self) -> bool {
        let Some(camera) = self.media.as_mut().and_then(LocalMedia::stop_screen_share) else {
            return false;
        };

        self.replace_video(&camera);
        self.publish_share_status(false);
        info!("Screen share stopped, back to camera {}", camera.id());
        true
    }

    fn on_screen_ended(&mut self, track_id: String) {
        let current = self
            .media
            .as_ref()
            .and_then(LocalMedia::screen)
            .is_some_and(|screen| screen.id() == track_id);
        if current && self.stop_screen_share() {
            let _ = self.events.send(MeshEvent::ScreenShareEnded);
        }
    }

    fn replace_video(&self, track: &Arc<LocalTrack>) {
        for link in self.links.values() {
            link.send(LinkCommand::ReplaceVideo(track.clone()));
        }
    }

    fn watch_capture(&self, track: &Arc<LocalTrack>) {
        let mut ended = track.ended();
        let track_id = track.id().to_owned();
        let notify = self.ended_tx.clone();
        tokio::spawn(async move {
            while ended.changed().await.is_ok() {
                if *ended.borrow() {
                    let _ = notify.send(track_id);
                    return;
                }
            }
        });
    }

    fn publish_share_status(&self, sharing: bool) {
        let status = ShareStatus {
            sender: self.local.id().clone(),
            sharing,
        };
        if let Err(e) = self.channel.publish(ShareStatus::EVENT, &status) {
            warn!("Could not publish share status: {}", e);
        }
    }

    fn snapshot(&self) -> MeshSnapshot {
        let mut peers: Vec<PeerSnapshot> = self
            .links
            .values()
            .map(|link| PeerSnapshot {
                peer_id: link.remote.clone(),
                connection: link.connection,
                state: link.state,
                initiator: link.initiator,
            })
            .collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));

        MeshSnapshot {
            peers,
            sharing: self.sharing.clone(),
            local_sharing: self.media.as_ref().is_some_and(LocalMedia::is_sharing),
            outgoing_video: self
                .media
                .as_ref()
                .and_then(LocalMedia::outgoing_video)
                .map(|track| track.id().to_owned()),
            media_available: self.media.is_some(),
        }
    }

    async fn shutdown(&mut self) -> ShutdownReport {
        let links: Vec<PeerLink> = self.links.drain().map(|(_, link)| link).collect();
        let closed_connections = links.len();
        let timeout = self.close_timeout;

        let mut pending = Vec::with_capacity(links.len());
        for link in links {
            let _ = self.events.send(MeshEvent::PeerClosed {
                peer_id: link.remote.clone(),
                connection: link.connection,
            });
            pending.push(tokio::time::timeout(timeout, link.close()));
        }

        let discarded_candidates = join_all(pending)
            .await
            .into_iter()
            .map(|closed| match closed {
                Ok(Ok(discarded)) => discarded,
                _ => 0,
            })
            .sum();

        self.sharing.clear();
        if let Some(mut media) = self.media.take() {
            media.release();
        }

        info!(
            "Mesh for {} shut down: {} connections closed",
            self.local.id(),
            closed_connections
        );
        ShutdownReport {
            closed_connections,
            discarded_candidates,
        }
    }
}
