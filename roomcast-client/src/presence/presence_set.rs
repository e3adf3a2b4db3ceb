use roomcast_core::{PeerId, PresenceEntry};
use std::collections::{BTreeMap, BTreeSet};

/// A single difference between two successive active sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Joined(PresenceEntry),
    Left(PeerId),
}

/// The active set of one room as seen by one client.
///
/// The local entry is always a member. Everything else follows discrete
/// join/leave notices, repaired wholesale by every membership snapshot.
#[derive(Debug, Clone)]
pub struct PresenceSet {
    local: PresenceEntry,
    entries: BTreeMap<PeerId, PresenceEntry>,
    /// Peers that announced `leave` but whose transport membership has not
    /// dropped yet. Snapshots taken in that window must not bring them back.
    departed: BTreeSet<PeerId>,
    connected: bool,
}

impl PresenceSet {
    pub fn new(local: PresenceEntry) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(local.id().clone(), local.clone());

        Self {
            local,
            entries,
            departed: BTreeSet::new(),
            connected: true,
        }
    }

    pub fn local(&self) -> &PresenceEntry {
        &self.local
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &PeerId) -> Option<&PresenceEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PeerId> {
        self.entries.keys()
    }

    /// Every entry except the local one: the peers a mesh must reach.
    pub fn remote(&self) -> impl Iterator<Item = &PresenceEntry> {
        let local = self.local.id();
        self.entries.values().filter(move |entry| entry.id() != local)
    }

    /// False once the local client left or lost its channel. The set then
    /// only holds the local entry.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn insert(&mut self, entry: PresenceEntry) -> Vec<PresenceChange> {
        if entry.id() == self.local.id() || !self.connected {
            return Vec::new();
        }

        let id = entry.id().clone();
        let mut changes = Vec::new();

        match self.entries.get(&id) {
            Some(current) if *current == entry => return changes,
            Some(current) if current.joined_at > entry.joined_at => return changes,
            Some(_) => changes.push(PresenceChange::Left(id.clone())),
            None => {}
        }

        self.departed.remove(&id);
        self.entries.insert(id, entry.clone());
        changes.push(PresenceChange::Joined(entry));
        changes
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<PresenceChange> {
        if id == self.local.id() {
            return None;
        }
        self.entries
            .remove(id)
            .map(|_| PresenceChange::Left(id.clone()))
    }

    /// Removes a peer that said goodbye over the channel, ahead of the
    /// transport noticing.
    pub fn depart(&mut self, id: &PeerId) -> Option<PresenceChange> {
        if id == self.local.id() {
            return None;
        }
        self.departed.insert(id.clone());
        self.remove(id)
    }

    /// Replaces the remote membership with an authoritative snapshot.
    pub fn reconcile(&mut self, snapshot: &[PresenceEntry]) -> Vec<PresenceChange> {
        if !self.connected {
            return Vec::new();
        }

        let local = self.local.id().clone();
        let listed: BTreeSet<&PeerId> = snapshot.iter().map(PresenceEntry::id).collect();
        self.departed.retain(|id| listed.contains(id));

        let stale: Vec<PeerId> = self
            .entries
            .keys()
            .filter(|id| **id != local && !listed.contains(id))
            .cloned()
            .collect();

        let mut changes: Vec<PresenceChange> =
            stale.iter().filter_map(|id| self.remove(id)).collect();

        for entry in snapshot {
            if self.departed.contains(entry.id()) {
                continue;
            }
            changes.extend(self.insert(entry.clone()));
        }

        changes
    }

    /// Drops every remote entry and stops accepting new ones.
    pub fn disconnect(&mut self) -> Vec<PresenceChange> {
        let remote: Vec<PeerId> = self.remote().map(|entry| entry.id().clone()).collect();
        let changes = remote.iter().filter_map(|id| self.remove(id)).collect();
        self.departed.clear();
        self.connected = false;
        changes
    }
}
