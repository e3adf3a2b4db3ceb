use crate::topic::topic_command::TopicCommand;
use crate::topic::topic_manager::TopicRegistry;
use roomcast_core::{Frame, PresenceEntry, PresenceEvent, RelayMessage, Topic};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

struct Member {
    entry: PresenceEntry,
    outbound: mpsc::Sender<RelayMessage>,
}

/// Owns the members of one topic and fans every publication out to all of
/// them, the publisher included.
pub struct TopicRoom {
    topic: Topic,
    members: HashMap<u64, Member>,
    command_rx: mpsc::Receiver<TopicCommand>,
    registry: TopicRegistry,
    sync_interval: Duration,
}

impl TopicRoom {
    pub(crate) fn new(
        topic: Topic,
        command_rx: mpsc::Receiver<TopicCommand>,
        registry: TopicRegistry,
        sync_interval: Duration,
    ) -> Self {
        Self {
            topic,
            members: HashMap::new(),
            command_rx,
            registry,
            sync_interval,
        }
    }

    /// Runs until the last member leaves.
    pub async fn run(mut self) {
        info!("Topic {} opened", self.topic);

        let mut ticker = tokio::time::interval(self.sync_interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(c) => self.handle_command(c),
                    None => break,
                },
                _ = ticker.tick() => self.sync(),
            }

            if self.members.is_empty() && self.retire() {
                break;
            }
        }

        info!("Topic {} closed", self.topic);
    }

    /// Unregisters the topic unless a command slipped in meanwhile. Holding
    /// the registry entry keeps new members from queueing during the check.
    fn retire(&self) -> bool {
        self.registry
            .remove_if(&self.topic, |_, _| self.command_rx.is_empty())
            .is_some()
    }

    fn handle_command(&mut self, cmd: TopicCommand) {
        match cmd {
            TopicCommand::Track {
                conn,
                entry,
                outbound,
            } => {
                info!("{} tracked on {}", entry.id(), self.topic);
                self.broadcast(RelayMessage::Presence(PresenceEvent::Join {
                    entry: entry.clone(),
                }));

                let member = Member { entry, outbound };
                self.members.insert(conn, member);

                let sync = RelayMessage::Presence(PresenceEvent::Sync {
                    entries: self.snapshot(),
                });
                self.send_to(conn, sync);
            }

            TopicCommand::Publish {
                conn,
                event,
                payload,
            } => {
                let Some(sender) = self.members.get(&conn) else {
                    debug!("Publish from untracked connection {} on {}", conn, self.topic);
                    return;
                };
                let frame = Frame::new(event, sender.entry.id().clone(), payload);
                self.broadcast(RelayMessage::Frame(frame));
            }

            TopicCommand::Untrack { conn } => self.remove(conn),
        }
    }

    /// One entry per peer, the most recent join winning.
    fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut latest: BTreeMap<_, &PresenceEntry> = BTreeMap::new();
        for member in self.members.values() {
            let id = member.entry.id();
            if latest.get(id).is_none_or(|seen| seen.joined_at < member.entry.joined_at) {
                latest.insert(id.clone(), &member.entry);
            }
        }
        latest.into_values().cloned().collect()
    }

    fn sync(&mut self) {
        let entries = self.snapshot();
        self.broadcast(RelayMessage::Presence(PresenceEvent::Sync { entries }));
    }

    fn remove(&mut self, conn: u64) {
        let Some(gone) = self.members.remove(&conn) else {
            return;
        };
        let peer_id = gone.entry.id().clone();
        info!("{} untracked from {}", peer_id, self.topic);

        let still_here = self.members.values().any(|m| *m.entry.id() == peer_id);
        if !still_here {
            self.broadcast(RelayMessage::Presence(PresenceEvent::Leave { peer_id }));
        }
    }

    fn broadcast(&mut self, msg: RelayMessage) {
        let conns: Vec<u64> = self.members.keys().copied().collect();
        for conn in conns {
            self.send_to(conn, msg.clone());
        }
    }

    /// A member whose queue is full or gone is dropped from the topic.
    fn send_to(&mut self, conn: u64, msg: RelayMessage) {
        let Some(member) = self.members.get(&conn) else {
            return;
        };
        match member.outbound.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("{} is too slow on {}, dropping it", member.entry.id(), self.topic);
                self.remove(conn);
            }
            Err(TrySendError::Closed(_)) => self.remove(conn),
        }
    }
}
