use crate::channel::transport::{BroadcastTransport, ChannelEvent, ChannelLink, Outbound};
use crate::error::ChannelError;
use async_trait::async_trait;
use dashmap::DashMap;
use roomcast_core::{Frame, PeerId, PresenceEntry, PresenceEvent, Topic};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LocalHubConfig {
    /// How often every member receives a full membership snapshot.
    pub sync_interval: Duration,
}

impl Default for LocalHubConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(5),
        }
    }
}

type LossRule = Box<dyn Fn(&Frame, &PeerId) -> bool + Send + Sync>;

struct HubMember {
    conn: u64,
    entry: PresenceEntry,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

struct HubInner {
    topics: DashMap<Topic, Vec<HubMember>>,
    next_conn: AtomicU64,
    loss: Mutex<Option<LossRule>>,
}

/// In-process broadcast transport. Every client of the same hub shares its
/// topics, which makes it the transport of choice for tests and for rooms
/// whose members live in one process.
#[derive(Clone)]
pub struct LocalHub {
    inner: Arc<HubInner>,
}

impl LocalHub {
    /// Must be called inside a tokio runtime: the periodic sync runs as a
    /// task that stops once the last hub handle is dropped.
    pub fn new(config: LocalHubConfig) -> Self {
        let inner = Arc::new(HubInner {
            topics: DashMap::new(),
            next_conn: AtomicU64::new(1),
            loss: Mutex::new(None),
        });

        tokio::spawn(sync_loop(Arc::downgrade(&inner), config.sync_interval));

        Self { inner }
    }

    /// Drops every frame for which `rule(frame, receiver)` returns true.
    /// Membership notices are not affected.
    pub fn set_loss<F>(&self, rule: F)
    where
        F: Fn(&Frame, &PeerId) -> bool + Send + Sync + 'static,
    {
        *self.inner.loss.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(rule));
    }

    pub fn clear_loss(&self) {
        *self.inner.loss.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Cuts every connection of `peer_id`, as if its network went away.
    /// With `announce` false the other members are not told; only the next
    /// sync snapshot reveals the departure.
    pub fn disconnect(&self, peer_id: &PeerId, announce: bool) {
        for mut topic in self.inner.topics.iter_mut() {
            let (gone, kept): (Vec<_>, Vec<_>) = topic
                .value_mut()
                .drain(..)
                .partition(|member| member.entry.id() == peer_id);
            *topic.value_mut() = kept;

            for member in gone {
                let _ = member.events.send(ChannelEvent::Disconnected);
                if announce {
                    notify(
                        topic.value(),
                        PresenceEvent::Leave {
                            peer_id: peer_id.clone(),
                        },
                    );
                }
            }
        }
        info!("Hub disconnected {}", peer_id);
    }

    pub fn members(&self, topic: &Topic) -> Vec<PresenceEntry> {
        self.inner
            .topics
            .get(topic)
            .map(|members| members.iter().map(|m| m.entry.clone()).collect())
            .unwrap_or_default()
    }

    /// Sends a membership snapshot to every member of every topic now.
    pub fn sync_now(&self) {
        self.inner.sync_all();
    }
}

impl HubInner {
    fn join(&self, topic: &Topic, member: HubMember) {
        let mut members = self.topics.entry(topic.clone()).or_default();

        notify(
            &members,
            PresenceEvent::Join {
                entry: member.entry.clone(),
            },
        );

        let mut entries: Vec<PresenceEntry> = members.iter().map(|m| m.entry.clone()).collect();
        entries.push(member.entry.clone());
        let _ = member
            .events
            .send(ChannelEvent::Presence(PresenceEvent::Sync { entries }));

        members.push(member);
    }

    fn leave(&self, topic: &Topic, conn: u64) {
        let Some(mut members) = self.topics.get_mut(topic) else {
            return;
        };
        let Some(pos) = members.iter().position(|m| m.conn == conn) else {
            return;
        };

        let gone = members.remove(pos);
        notify(
            &members,
            PresenceEvent::Leave {
                peer_id: gone.entry.id().clone(),
            },
        );
        debug!("{} left {}", gone.entry.id(), topic);
    }

    fn fan_out(&self, topic: &Topic, conn: u64, event: String, payload: serde_json::Value) {
        let Some(members) = self.topics.get(topic) else {
            return;
        };
        let Some(sender) = members.iter().find(|m| m.conn == conn) else {
            return;
        };

        let frame = Frame::new(event, sender.entry.id().clone(), payload);
        let loss = self.loss.lock().unwrap_or_else(|e| e.into_inner());

        for member in members.iter() {
            if loss.as_ref().is_some_and(|rule| rule(&frame, member.entry.id())) {
                debug!("Dropping '{}' for {}", frame.event, member.entry.id());
                continue;
            }
            let _ = member.events.send(ChannelEvent::Frame(frame.clone()));
        }
    }

    fn sync_all(&self) {
        for members in self.topics.iter() {
            let entries: Vec<PresenceEntry> = members.iter().map(|m| m.entry.clone()).collect();
            notify(&members, PresenceEvent::Sync { entries });
        }
    }
}

fn notify(members: &[HubMember], event: PresenceEvent) {
    for member in members {
        let _ = member.events.send(ChannelEvent::Presence(event.clone()));
    }
}

async fn sync_loop(hub: Weak<HubInner>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(strong) = hub.upgrade() else {
            break;
        };
        strong.sync_all();
    }
}

#[async_trait]
impl BroadcastTransport for LocalHub {
    async fn open(&self, topic: &Topic, member: PresenceEntry) -> Result<ChannelLink, ChannelError> {
        let conn = self.inner.next_conn.fetch_add(1, Ordering::Relaxed);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        self.inner.join(
            topic,
            HubMember {
                conn,
                entry: member,
                events: events_tx,
            },
        );

        let hub = self.inner.clone();
        let topic = topic.clone();
        tokio::spawn(async move {
            while let Some(Outbound::Publish { event, payload }) = outbound_rx.recv().await {
                hub.fan_out(&topic, conn, event, payload);
            }
            hub.leave(&topic, conn);
        });

        Ok(ChannelLink {
            outbound: outbound_tx,
            inbound: events_rx,
        })
    }
}
