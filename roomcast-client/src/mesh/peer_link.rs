use crate::error::NegotiationError;
use crate::media::LocalTrack;
use crate::mesh::peer_transport::{
    PeerEventSink, PeerSignal, PeerTransport, PeerTransportFactory, RemoteTrack, TransportState,
};
use crate::signaling::{IceQueue, SignalingOutput};
use roomcast_core::{ConnectionId, IceCandidate, PeerId, PresenceEntry};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Renegotiating,
    Closed,
}

impl PeerState {
    fn can_become(self, next: PeerState) -> bool {
        use PeerState::*;
        matches!(
            (self, next),
            (New, Connecting)
                | (Connecting, Connected)
                | (Connecting, Renegotiating)
                | (Connected, Renegotiating)
                | (Renegotiating, Connected)
                | (_, Closed)
        ) && self != Closed
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerState::New => "NEW",
            PeerState::Connecting => "CONNECTING",
            PeerState::Connected => "CONNECTED",
            PeerState::Renegotiating => "RENEGOTIATING",
            PeerState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// How a link came to be.
pub(crate) enum LinkRole {
    /// We were present first and open with an offer.
    Initiator,
    /// The remote side offered.
    Answerer { offer: String },
}

pub(crate) enum LinkCommand {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate(IceCandidate),
    ReplaceVideo(Arc<LocalTrack>),
    Close { reply: oneshot::Sender<usize> },
}

/// What a link reports back to the mesh.
#[derive(Debug)]
pub(crate) enum LinkReport {
    State(PeerState),
    RemoteTrack(RemoteTrack),
    /// The link gave up; the mesh drops it.
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct LinkUpdate {
    pub remote: PeerId,
    pub connection: ConnectionId,
    pub report: LinkReport,
}

/// The mesh's handle to one running link.
pub(crate) struct PeerLink {
    pub remote: PeerId,
    /// The presence entry this link was opened for. Unset only for an offer
    /// that arrived before its sender's presence did.
    pub entry: Option<PresenceEntry>,
    pub connection: ConnectionId,
    pub initiator: bool,
    pub state: PeerState,
    commands: mpsc::UnboundedSender<LinkCommand>,
    closing: Arc<AtomicBool>,
}

impl PeerLink {
    pub fn spawn(
        remote: PeerId,
        connection: ConnectionId,
        role: LinkRole,
        tracks: Vec<Arc<LocalTrack>>,
        factory: Arc<dyn PeerTransportFactory>,
        signaling: Arc<dyn SignalingOutput>,
        updates: mpsc::UnboundedSender<LinkUpdate>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let closing = Arc::new(AtomicBool::new(false));
        let initiator = matches!(role, LinkRole::Initiator);

        let task = LinkTask {
            remote: remote.clone(),
            connection,
            initiator,
            state: PeerState::New,
            transport: None,
            ice: IceQueue::new(),
            awaiting_answer: false,
            established: false,
            renegotiate_pending: false,
            signaling,
            updates,
            closing: closing.clone(),
        };
        tokio::spawn(task.run(role, tracks, factory, commands_rx));

        Self {
            remote,
            entry: None,
            connection,
            initiator,
            state: PeerState::New,
            commands: commands_tx,
            closing,
        }
    }

    pub fn send(&self, command: LinkCommand) {
        if self.commands.send(command).is_err() {
            debug!("Link {} toward {} already finished", self.connection, self.remote);
        }
    }

    /// Stops the link. Work still in flight completes, but nothing it
    /// produces is sent anymore. The receiver yields the number of queued
    /// candidates that were thrown away.
    pub fn close(self) -> oneshot::Receiver<usize> {
        self.closing.store(true, Ordering::SeqCst);
        let (reply, rx) = oneshot::channel();
        self.send(LinkCommand::Close { reply });
        rx
    }
}

struct LinkTask {
    remote: PeerId,
    connection: ConnectionId,
    initiator: bool,
    state: PeerState,
    transport: Option<Arc<dyn PeerTransport>>,
    ice: IceQueue,
    /// Our offer is out and its answer has not been applied yet.
    awaiting_answer: bool,
    /// The first offer/answer round completed. Negotiation requests before
    /// that are covered by the first offer itself.
    established: bool,
    /// A renegotiation was requested while another round was in flight.
    renegotiate_pending: bool,
    signaling: Arc<dyn SignalingOutput>,
    updates: mpsc::UnboundedSender<LinkUpdate>,
    closing: Arc<AtomicBool>,
}

impl LinkTask {
    async fn run(
        mut self,
        role: LinkRole,
        tracks: Vec<Arc<LocalTrack>>,
        factory: Arc<dyn PeerTransportFactory>,
        mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    ) {
        let (signals_tx, mut signals) = mpsc::unbounded_channel();
        let sink = PeerEventSink::new(self.remote.clone(), self.connection, signals_tx);

        if let Err(e) = self.open(role, tracks, factory, sink).await {
            error!("Could not open link toward {}: {}", self.remote, e);
            self.report(LinkReport::Failed(e.to_string()));
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(LinkCommand::Close { reply }) => {
                        let discarded = self.shutdown().await;
                        let _ = reply.send(discarded);
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(signal) = signals.recv() => self.handle_signal(signal).await,
            }
        }

        debug!("Link {} toward {} finished", self.connection, self.remote);
    }

    async fn open(
        &mut self,
        role: LinkRole,
        tracks: Vec<Arc<LocalTrack>>,
        factory: Arc<dyn PeerTransportFactory>,
        sink: PeerEventSink,
    ) -> Result<(), NegotiationError> {
        let transport = factory.create(sink).await?;
        self.transport = Some(transport.clone());

        // Tracks go in before the first description so it already carries them.
        for track in tracks {
            transport.add_track(track).await?;
        }
        self.transition(PeerState::Connecting);

        match role {
            LinkRole::Initiator => self.send_offer().await,
            LinkRole::Answerer { offer } => self.answer(offer).await,
        }
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    fn transport(&self) -> Result<Arc<dyn PeerTransport>, NegotiationError> {
        self.transport.clone().ok_or(NegotiationError::Closed)
    }

    async fn send_offer(&mut self) -> Result<(), NegotiationError> {
        let sdp = self.transport()?.create_offer().await?;
        if self.is_closing() {
            return Ok(());
        }
        self.awaiting_answer = true;
        self.signaling
            .send_offer(self.remote.clone(), self.connection, sdp);
        Ok(())
    }

    async fn answer(&mut self, offer: String) -> Result<(), NegotiationError> {
        let sdp = self.transport()?.accept_offer(offer).await?;
        self.remote_description_applied().await;
        if self.is_closing() {
            return Ok(());
        }
        self.signaling
            .send_answer(self.remote.clone(), self.connection, sdp);
        Ok(())
    }

    async fn handle_command(&mut self, command: LinkCommand) {
        match command {
            LinkCommand::Offer { sdp } => {
                // A fresh description for the same connection.
                if self.state == PeerState::Connected {
                    self.transition(PeerState::Renegotiating);
                }
                if let Err(e) = self.answer(sdp).await {
                    warn!("Dropping offer from {}: {}", self.remote, e);
                }
                if self.state == PeerState::Renegotiating {
                    self.transition(PeerState::Connected);
                }
            }

            LinkCommand::Answer { sdp } => {
                if !self.initiator || !self.awaiting_answer {
                    debug!("Ignoring unexpected answer from {}", self.remote);
                    return;
                }
                let applied = match self.transport() {
                    Ok(transport) => transport.accept_answer(sdp).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = applied {
                    warn!("Dropping answer from {}: {}", self.remote, e);
                    return;
                }
                self.awaiting_answer = false;
                self.established = true;
                self.remote_description_applied().await;

                if self.state == PeerState::Renegotiating {
                    self.transition(PeerState::Connected);
                }
                if self.renegotiate_pending {
                    self.renegotiate_pending = false;
                    self.renegotiate().await;
                }
            }

            LinkCommand::Candidate(candidate) => {
                let Some(candidate) = self.ice.push(candidate) else {
                    debug!("Queued early candidate from {}", self.remote);
                    return;
                };
                self.apply_candidate(candidate).await;
            }

            LinkCommand::ReplaceVideo(track) => self.replace_video(track).await,

            LinkCommand::Close { .. } => {}
        }
    }

    async fn handle_signal(&mut self, signal: PeerSignal) {
        match signal {
            PeerSignal::IceCandidate(candidate) => {
                if !self.is_closing() {
                    self.signaling
                        .send_ice(self.remote.clone(), self.connection, candidate);
                }
            }
            PeerSignal::RemoteTrack(track) => {
                info!("Remote {:?} track {} from {}", track.kind, track.id, self.remote);
                if self.state == PeerState::Connecting {
                    self.transition(PeerState::Connected);
                }
                self.report(LinkReport::RemoteTrack(track));
            }
            PeerSignal::StateChanged(TransportState::Connected) => {
                if self.state == PeerState::Connecting {
                    self.transition(PeerState::Connected);
                }
            }
            PeerSignal::StateChanged(TransportState::Failed) => {
                self.report(LinkReport::Failed("transport failed".to_owned()));
            }
            PeerSignal::StateChanged(state) => {
                debug!("Transport toward {} is {:?}", self.remote, state);
            }
            PeerSignal::NegotiationNeeded => self.renegotiate().await,
        }
    }

    async fn replace_video(&mut self, track: Arc<LocalTrack>) {
        let Ok(transport) = self.transport() else {
            return;
        };

        if self.state == PeerState::Connected {
            self.transition(PeerState::Renegotiating);
        }

        match transport.replace_video_track(track.clone()).await {
            Ok(true) if self.established || !self.initiator => self.renegotiate().await,
            Ok(true) => self.renegotiate_pending = true,
            Ok(false) => debug!("Replaced video toward {} with {}", self.remote, track.id()),
            Err(e) => warn!("Could not replace video toward {}: {}", self.remote, e),
        }

        if self.state == PeerState::Renegotiating && !self.awaiting_answer {
            self.transition(PeerState::Connected);
        }
    }

    /// Only the initiator of a link ever offers on it, so both sides can
    /// never renegotiate at once.
    async fn renegotiate(&mut self) {
        if self.is_closing() {
            return;
        }
        if !self.initiator {
            debug!(
                "Negotiation needed toward {}, left to the initiator",
                self.remote
            );
            return;
        }
        if !self.established {
            debug!("Negotiation toward {} not established yet", self.remote);
            return;
        }
        if self.awaiting_answer {
            self.renegotiate_pending = true;
            return;
        }

        if self.state == PeerState::Connected {
            self.transition(PeerState::Renegotiating);
        }
        if let Err(e) = self.send_offer().await {
            warn!("Renegotiation toward {} failed: {}", self.remote, e);
            if self.state == PeerState::Renegotiating {
                self.transition(PeerState::Connected);
            }
        }
    }

    async fn remote_description_applied(&mut self) {
        if self.ice.is_ready() {
            return;
        }
        for candidate in self.ice.mark_ready() {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        let Ok(transport) = self.transport() else {
            return;
        };
        let Err(e) = transport.add_ice_candidate(candidate).await else {
            return;
        };
        warn!("Failed to add ICE candidate from {}: {}", self.remote, e);
    }

    async fn shutdown(&mut self) -> usize {
        let discarded = self.ice.discard();
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("Closing link toward {} failed: {}", self.remote, e);
            }
        }
        self.transition(PeerState::Closed);
        info!(
            "Closed link {} toward {} ({} queued candidates dropped)",
            self.connection, self.remote, discarded
        );
        discarded
    }

    fn transition(&mut self, next: PeerState) {
        if self.state == next {
            return;
        }
        if !self.state.can_become(next) {
            warn!(
                "Ignoring transition {} -> {} toward {}",
                self.state, next, self.remote
            );
            return;
        }
        debug!("{}: {} -> {}", self.remote, self.state, next);
        self.state = next;
        self.report(LinkReport::State(next));
    }

    fn report(&self, report: LinkReport) {
        let _ = self.updates.send(LinkUpdate {
            remote: self.remote.clone(),
            connection: self.connection,
            report,
        });
    }
}
