use roomcast_core::IceCandidate;
use std::collections::VecDeque;

/// Apply-on-ready buffer for remote candidates.
///
/// Candidates may overtake the description they belong to. Until a remote
/// description is applied they wait here, in arrival order.
#[derive(Debug, Default)]
pub struct IceQueue {
    ready: bool,
    pending: VecDeque<IceCandidate>,
}

impl IceQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hands the candidate back when it can be applied right away.
    pub fn push(&mut self, candidate: IceCandidate) -> Option<IceCandidate> {
        if self.ready {
            return Some(candidate);
        }
        self.pending.push_back(candidate);
        None
    }

    /// Marks the remote description as applied and drains the backlog.
    pub fn mark_ready(&mut self) -> Vec<IceCandidate> {
        self.ready = true;
        self.pending.drain(..).collect()
    }

    /// Drops everything still queued, returning how many were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.ready = false;
        dropped
    }
}
