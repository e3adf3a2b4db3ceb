use crate::config::RelayConfig;
use crate::topic::TopicManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct RelayInner {
    config: RelayConfig,
    next_conn: AtomicU64,
}

/// Shared state of the relay's HTTP handlers.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
    pub(crate) topics: TopicManager,
}

impl RelayService {
    pub fn new(config: RelayConfig) -> Self {
        let topics = TopicManager::new(config.sync_interval);
        Self {
            inner: Arc::new(RelayInner {
                config,
                next_conn: AtomicU64::new(1),
            }),
            topics,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn topic_count(&self) -> usize {
        self.topics.topic_count()
    }

    pub(crate) fn next_conn(&self) -> u64 {
        self.inner.next_conn.fetch_add(1, Ordering::Relaxed)
    }
}
