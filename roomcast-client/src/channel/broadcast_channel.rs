use crate::channel::transport::{BroadcastTransport, ChannelEvent, Outbound};
use crate::error::ChannelError;
use dashmap::DashMap;
use roomcast_core::{Frame, PeerId, PresenceEntry, PresenceEvent, Topic};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    /// Closed locally through [`BroadcastChannel::close`].
    Closed,
    /// The transport went away. Every subscription is void; rejoining means
    /// opening a fresh channel.
    Disconnected,
}

struct Membership {
    members: BTreeMap<PeerId, PresenceEntry>,
    subscribers: Vec<mpsc::UnboundedSender<PresenceEvent>>,
}

struct ChannelInner {
    topic: Topic,
    local: PeerId,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    subscribers: DashMap<String, Vec<mpsc::UnboundedSender<Frame>>>,
    membership: Mutex<Membership>,
    state: watch::Sender<ChannelState>,
}

/// Handle to one open topic. Cheap to clone; all clones share the same
/// subscriptions and membership view.
#[derive(Clone)]
pub struct BroadcastChannel {
    inner: Arc<ChannelInner>,
}

impl BroadcastChannel {
    pub async fn open(
        transport: &dyn BroadcastTransport,
        topic: Topic,
        member: PresenceEntry,
    ) -> Result<Self, ChannelError> {
        let local = member.id().clone();
        let link = transport.open(&topic, member).await?;
        let (state, _) = watch::channel(ChannelState::Open);

        let inner = Arc::new(ChannelInner {
            topic,
            local,
            outbound: Mutex::new(Some(link.outbound)),
            subscribers: DashMap::new(),
            membership: Mutex::new(Membership {
                members: BTreeMap::new(),
                subscribers: Vec::new(),
            }),
            state,
        });

        info!("Channel {} opened", inner.topic);
        tokio::spawn(dispatch(inner.clone(), link.inbound));

        Ok(Self { inner })
    }

    pub fn topic(&self) -> &Topic {
        &self.inner.topic
    }

    pub fn local_id(&self) -> &PeerId {
        &self.inner.local
    }

    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    pub fn is_open(&self) -> bool {
        *self.inner.state.borrow() == ChannelState::Open
    }

    /// Publishes `payload` under `event`. The local handle receives it too.
    pub fn publish<P: Serialize>(&self, event: &str, payload: &P) -> Result<(), ChannelError> {
        let payload = serde_json::to_value(payload)?;
        let guard = self.inner.outbound.lock().unwrap_or_else(|e| e.into_inner());
        let Some(outbound) = guard.as_ref() else {
            return Err(ChannelError::Closed(self.inner.topic.clone()));
        };

        outbound
            .send(Outbound::Publish {
                event: event.to_owned(),
                payload,
            })
            .map_err(|_| ChannelError::Closed(self.inner.topic.clone()))
    }

    /// Receives every frame published under any of `events` from now on,
    /// local echo included. The stream ends when the channel closes or
    /// disconnects.
    pub fn subscribe(&self, events: &[&str]) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_open() {
            return rx;
        }

        for event in events {
            self.inner
                .subscribers
                .entry((*event).to_owned())
                .or_default()
                .push(tx.clone());
        }
        rx
    }

    /// Membership notifications. The first item is always a `Sync` with the
    /// membership known so far, so late subscribers miss nothing.
    pub fn presence(&self) -> mpsc::UnboundedReceiver<PresenceEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_open() {
            return rx;
        }

        let mut membership = self.inner.membership.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = membership.members.values().cloned().collect();
        if tx.send(PresenceEvent::Sync { entries: snapshot }).is_ok() {
            membership.subscribers.push(tx);
        }
        rx
    }

    /// Leaves the topic. Subscriptions end once the transport confirms.
    pub fn close(&self) {
        let previous = self
            .inner
            .outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if previous.is_some() {
            self.inner.state.send_if_modified(|state| {
                if *state == ChannelState::Open {
                    *state = ChannelState::Closed;
                    true
                } else {
                    false
                }
            });
            info!("Channel {} closed", self.inner.topic);
        }
    }
}

async fn dispatch(inner: Arc<ChannelInner>, mut inbound: mpsc::UnboundedReceiver<ChannelEvent>) {
    while let Some(event) = inbound.recv().await {
        match event {
            ChannelEvent::Frame(frame) => route_frame(&inner, frame),
            ChannelEvent::Presence(event) => route_presence(&inner, event),
            ChannelEvent::Disconnected => break,
        }
    }

    let disconnected = inner.state.send_if_modified(|state| {
        if *state == ChannelState::Open {
            *state = ChannelState::Disconnected;
            true
        } else {
            false
        }
    });
    if disconnected {
        warn!("Channel {} lost its transport", inner.topic);
    }

    inner.outbound.lock().unwrap_or_else(|e| e.into_inner()).take();
    inner.subscribers.clear();
    let mut membership = inner.membership.lock().unwrap_or_else(|e| e.into_inner());
    membership.subscribers.clear();
    membership.members.clear();
}

fn route_frame(inner: &ChannelInner, frame: Frame) {
    let Some(mut subscribers) = inner.subscribers.get_mut(&frame.event) else {
        debug!("No subscriber for '{}' on {}", frame.event, inner.topic);
        return;
    };
    subscribers.retain(|tx| tx.send(frame.clone()).is_ok());
}

fn route_presence(inner: &ChannelInner, event: PresenceEvent) {
    let mut membership = inner.membership.lock().unwrap_or_else(|e| e.into_inner());

    match &event {
        PresenceEvent::Sync { entries } => {
            membership.members = entries
                .iter()
                .map(|entry| (entry.id().clone(), entry.clone()))
                .collect();
        }
        PresenceEvent::Join { entry } => {
            membership.members.insert(entry.id().clone(), entry.clone());
        }
        PresenceEvent::Leave { peer_id } => {
            membership.members.remove(peer_id);
        }
    }

    membership
        .subscribers
        .retain(|tx| tx.send(event.clone()).is_ok());
}
