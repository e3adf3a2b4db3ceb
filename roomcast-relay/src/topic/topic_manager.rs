use crate::topic::{TopicCommand, TopicRoom};
use dashmap::DashMap;
use roomcast_core::{PresenceEntry, RelayMessage, Topic};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

pub(crate) type TopicRegistry = Arc<DashMap<Topic, mpsc::Sender<TopicCommand>>>;

const TOPIC_QUEUE: usize = 256;

/// Spawns one [`TopicRoom`] per topic on first use. A topic's actor goes
/// away with its last member.
#[derive(Clone)]
pub struct TopicManager {
    topics: TopicRegistry,
    sync_interval: Duration,
}

impl TopicManager {
    pub fn new(sync_interval: Duration) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            sync_interval,
        }
    }

    /// Adds a member to `topic` and returns the sender of the actor that now
    /// owns it.
    pub async fn track(
        &self,
        topic: &Topic,
        conn: u64,
        entry: PresenceEntry,
        outbound: mpsc::Sender<RelayMessage>,
    ) -> mpsc::Sender<TopicCommand> {
        loop {
            {
                let mut sender = self
                    .topics
                    .entry(topic.clone())
                    .or_insert_with(|| self.spawn(topic));

                let closed = match sender.try_reserve() {
                    Ok(permit) => {
                        permit.send(TopicCommand::Track {
                            conn,
                            entry: entry.clone(),
                            outbound: outbound.clone(),
                        });
                        return sender.clone();
                    }
                    Err(TrySendError::Full(())) => false,
                    Err(TrySendError::Closed(())) => true,
                };
                if closed {
                    warn!("Topic {} stopped unexpectedly, restarting it", topic);
                    *sender = self.spawn(topic);
                }
            }
            tokio::task::yield_now().await;
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    fn spawn(&self, topic: &Topic) -> mpsc::Sender<TopicCommand> {
        info!("Creating topic {}", topic);
        let (tx, rx) = mpsc::channel(TOPIC_QUEUE);
        let room = TopicRoom::new(topic.clone(), rx, self.topics.clone(), self.sync_interval);
        tokio::spawn(room.run());
        tx
    }
}
