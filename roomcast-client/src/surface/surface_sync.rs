use crate::channel::{BroadcastChannel, BroadcastTransport};
use crate::error::ChannelError;
use roomcast_core::{BoardEvent, CodeEvent, PeerId, PresenceEntry, RoomId, Topic};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A family of domain events sharing one room-scoped topic.
pub trait SurfaceEvent: Serialize + DeserializeOwned + Send + 'static {
    /// Every event name of the family.
    const EVENTS: &'static [&'static str];

    fn topic(room: &RoomId) -> Topic;

    fn name(&self) -> &'static str;
}

impl SurfaceEvent for BoardEvent {
    const EVENTS: &'static [&'static str] = &BoardEvent::EVENTS;

    fn topic(room: &RoomId) -> Topic {
        Topic::whiteboard(room)
    }

    fn name(&self) -> &'static str {
        BoardEvent::name(self)
    }
}

impl SurfaceEvent for CodeEvent {
    const EVENTS: &'static [&'static str] = &CodeEvent::EVENTS;

    fn topic(room: &RoomId) -> Topic {
        Topic::code(room)
    }

    fn name(&self) -> &'static str {
        CodeEvent::name(self)
    }
}

/// An event that arrived from another client.
#[derive(Debug, Clone, PartialEq)]
pub struct Remote<E> {
    pub sender: PeerId,
    pub event: E,
}

/// Translates between domain events and a broadcast channel.
///
/// Callers apply an event to their own state first and then publish it.
/// What comes back from [`SurfaceSync::subscribe`] is only what other
/// clients published; the local echo never reaches it.
pub struct SurfaceSync<E> {
    channel: BroadcastChannel,
    _events: PhantomData<fn() -> E>,
}

pub type WhiteboardSync = SurfaceSync<BoardEvent>;
pub type CodeSync = SurfaceSync<CodeEvent>;

impl<E: SurfaceEvent> SurfaceSync<E> {
    pub async fn open(
        transport: &dyn BroadcastTransport,
        room: &RoomId,
        local: PresenceEntry,
    ) -> Result<Self, ChannelError> {
        let channel = BroadcastChannel::open(transport, E::topic(room), local).await?;
        Ok(Self {
            channel,
            _events: PhantomData,
        })
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    pub fn publish(&self, event: &E) -> Result<(), ChannelError> {
        self.channel.publish(event.name(), event)
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Remote<E>> {
        let mut frames = self.channel.subscribe(E::EVENTS);
        let local = self.channel.local_id().clone();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if frame.is_echo_of(&local) {
                    continue;
                }
                let event: E = match frame.decode() {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Malformed '{}' from {}: {}", frame.event, frame.sender, e);
                        continue;
                    }
                };
                if event.name() != frame.event {
                    debug!("'{}' frame carries a '{}' event", frame.event, event.name());
                    continue;
                }
                let remote = Remote {
                    sender: frame.sender,
                    event,
                };
                if tx.send(remote).is_err() {
                    break;
                }
            }
        });

        rx
    }

    pub fn close(&self) {
        self.channel.close();
    }
}
