//! # Peer Registry
//!
//! Copy-on-write list of peers that receive every proposal. Readers take an
//! `Arc` snapshot and keep using it while updates install a fresh list, so a
//! broadcast never observes a half-applied membership change.

use parking_lot::RwLock;
use serde::Serialize;
use shared_types::Peer;
use std::collections::HashSet;
use std::sync::Arc;

/// Difference between two registry contents.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryUpdate {
    pub added: Vec<Peer>,
    pub removed: Vec<Peer>,
}

#[derive(Debug)]
pub struct PeerRegistry {
    peers: RwLock<Arc<[Peer]>>,
}

impl PeerRegistry {
    pub fn new(initial: Vec<Peer>) -> Self {
        Self {
            peers: RwLock::new(dedup(initial).into()),
        }
    }

    /// Current membership. Later updates do not affect the returned list.
    pub fn snapshot(&self) -> Arc<[Peer]> {
        Arc::clone(&self.peers.read())
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Atomically replace the whole list.
    ///
    /// Duplicate addresses collapse to their first occurrence.
    pub fn replace(&self, new_peers: Vec<Peer>) -> RegistryUpdate {
        let next: Arc<[Peer]> = dedup(new_peers).into();
        let previous = std::mem::replace(&mut *self.peers.write(), Arc::clone(&next));
        diff(&previous, &next)
    }

    /// Append a peer unless its address is already registered.
    pub fn add(&self, peer: Peer) -> bool {
        let mut guard = self.peers.write();
        if guard.iter().any(|p| p.address == peer.address) {
            return false;
        }
        let mut next = guard.to_vec();
        next.push(peer);
        *guard = next.into();
        true
    }

    /// Remove the peer with `address`, if present.
    pub fn remove(&self, address: &str) -> bool {
        let mut guard = self.peers.write();
        if !guard.iter().any(|p| p.address == address) {
            return false;
        }
        let next: Vec<Peer> = guard
            .iter()
            .filter(|p| p.address != address)
            .cloned()
            .collect();
        *guard = next.into();
        true
    }
}

fn dedup(peers: Vec<Peer>) -> Vec<Peer> {
    let mut seen = HashSet::new();
    peers
        .into_iter()
        .filter(|p| seen.insert(p.address.clone()))
        .collect()
}

fn diff(previous: &[Peer], next: &[Peer]) -> RegistryUpdate {
    RegistryUpdate {
        added: next
            .iter()
            .filter(|p| !previous.contains(p))
            .cloned()
            .collect(),
        removed: previous
            .iter()
            .filter(|p| !next.contains(p))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(addrs: &[&str]) -> Vec<Peer> {
        addrs.iter().map(|a| Peer::new(*a)).collect()
    }

    #[test]
    fn test_initial_list_deduplicated_in_order() {
        let registry = PeerRegistry::new(peers(&["a:1", "b:1", "a:1", "c:1"]));
        assert_eq!(&*registry.snapshot(), peers(&["a:1", "b:1", "c:1"]).as_slice());
    }

    #[test]
    fn test_snapshot_unaffected_by_replace() {
        let registry = PeerRegistry::new(peers(&["a:1", "b:1"]));
        let before = registry.snapshot();

        registry.replace(peers(&["c:1"]));

        assert_eq!(before.len(), 2);
        assert_eq!(&*registry.snapshot(), peers(&["c:1"]).as_slice());
    }

    #[test]
    fn test_replace_reports_diff() {
        let registry = PeerRegistry::new(peers(&["a:1", "b:1"]));

        let update = registry.replace(peers(&["b:1", "c:1"]));

        assert_eq!(update.added, peers(&["c:1"]));
        assert_eq!(update.removed, peers(&["a:1"]));
    }

    #[test]
    fn test_add_and_remove() {
        let registry = PeerRegistry::new(Vec::new());
        assert!(registry.is_empty());

        assert!(registry.add(Peer::new("a:1")));
        assert!(!registry.add(Peer::new("a:1")));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("a:1"));
        assert!(!registry.remove("a:1"));
        assert!(registry.is_empty());
    }
}
