use crate::channel::{BroadcastChannel, BroadcastTransport, ChannelState};
use crate::error::ChannelError;
use crate::presence::presence_set::{PresenceChange, PresenceSet};
use crate::signaling;
use roomcast_core::{Frame, PeerId, PresenceEntry, PresenceEvent, SignalBody, SignalMessage, Topic};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Live membership of one room for one client.
///
/// Owns the room's presence channel. The same channel carries signaling, so
/// the mesh borrows it through [`PresenceTracker::channel`].
pub struct PresenceTracker {
    channel: BroadcastChannel,
    local: PresenceEntry,
    active: watch::Receiver<PresenceSet>,
    changes: broadcast::Sender<PresenceChange>,
    task: JoinHandle<()>,
}

impl PresenceTracker {
    /// Opens `topic`, announces `local` and starts tracking the room.
    pub async fn join(
        transport: &dyn BroadcastTransport,
        topic: Topic,
        local: PresenceEntry,
        event_capacity: usize,
    ) -> Result<Self, ChannelError> {
        let channel = BroadcastChannel::open(transport, topic, local.clone()).await?;

        // Listen before announcing so no answer to the announcement is missed.
        let frames = channel.subscribe(&[SignalMessage::JOIN, SignalMessage::LEAVE]);
        let membership = channel.presence();

        if let Err(e) = channel.publish(SignalMessage::JOIN, &SignalMessage::join(local.clone())) {
            channel.close();
            return Err(e);
        }
        info!("{} joined {}", local.id(), channel.topic());

        let (active_tx, active) = watch::channel(PresenceSet::new(local.clone()));
        let (changes, _) = broadcast::channel(event_capacity.max(1));

        let task = tokio::spawn(run(
            channel.clone(),
            active_tx,
            changes.clone(),
            frames,
            membership,
        ));

        Ok(Self {
            channel,
            local,
            active,
            changes,
            task,
        })
    }

    pub fn local(&self) -> &PresenceEntry {
        &self.local
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    /// Current active set, local entry included.
    pub fn active_set(&self) -> PresenceSet {
        self.active.borrow().clone()
    }

    /// Notified on every change of the active set.
    pub fn watch(&self) -> watch::Receiver<PresenceSet> {
        self.active.clone()
    }

    /// Individual joins and leaves, from now on.
    pub fn changes(&self) -> broadcast::Receiver<PresenceChange> {
        self.changes.subscribe()
    }

    /// Says goodbye and closes the channel. Peers that miss the goodbye still
    /// see the channel membership drop.
    pub async fn leave(self) {
        if self.channel.is_open() {
            let goodbye = SignalMessage::leave(self.local.id().clone());
            if let Err(e) = self.channel.publish(SignalMessage::LEAVE, &goodbye) {
                debug!("Could not announce leave: {}", e);
            }
        }
        self.channel.close();

        if let Err(e) = self.task.await {
            warn!("Presence task ended abnormally: {}", e);
        }
        info!("{} left {}", self.local.id(), self.channel.topic());
    }
}

async fn run(
    channel: BroadcastChannel,
    active: watch::Sender<PresenceSet>,
    changes: broadcast::Sender<PresenceChange>,
    mut frames: mpsc::UnboundedReceiver<Frame>,
    mut membership: mpsc::UnboundedReceiver<PresenceEvent>,
) {
    let local = channel.local_id().clone();

    loop {
        let applied = tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => apply_frame(&active, &local, frame),
                None => break,
            },
            event = membership.recv() => match event {
                Some(event) => apply_membership(&active, event),
                None => break,
            },
        };

        for change in applied {
            debug!("Presence change on {}: {:?}", channel.topic(), change);
            let _ = changes.send(change);
        }
    }

    let state = *channel.state().borrow();
    if state == ChannelState::Disconnected {
        warn!("Presence channel {} disconnected, dropping all peers", channel.topic());
    }

    let mut dropped = Vec::new();
    active.send_modify(|set| dropped = set.disconnect());
    for change in dropped {
        let _ = changes.send(change);
    }
}

fn apply_frame(
    active: &watch::Sender<PresenceSet>,
    local: &PeerId,
    frame: Frame,
) -> Vec<PresenceChange> {
    let Some(message) = signaling::decode(&frame, local) else {
        return Vec::new();
    };

    match message.body {
        SignalBody::Join { entry } if *entry.id() == message.sender => {
            modify(active, |set| set.insert(entry))
        }
        SignalBody::Leave => modify(active, |set| set.depart(&message.sender).into_iter().collect()),
        other => {
            debug!("Ignoring '{}' on the presence path", other.kind());
            Vec::new()
        }
    }
}

fn apply_membership(active: &watch::Sender<PresenceSet>, event: PresenceEvent) -> Vec<PresenceChange> {
    match event {
        PresenceEvent::Sync { entries } => modify(active, |set| set.reconcile(&entries)),
        PresenceEvent::Join { entry } => modify(active, |set| set.insert(entry)),
        PresenceEvent::Leave { peer_id } => {
            modify(active, |set| set.remove(&peer_id).into_iter().collect())
        }
    }
}

fn modify<F>(active: &watch::Sender<PresenceSet>, apply: F) -> Vec<PresenceChange>
where
    F: FnOnce(&mut PresenceSet) -> Vec<PresenceChange>,
{
    let mut changes = Vec::new();
    active.send_if_modified(|set| {
        changes = apply(set);
        !changes.is_empty()
    });
    changes
}
