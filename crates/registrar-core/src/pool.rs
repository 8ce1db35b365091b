use std::collections::btree_map::Entry;

use tokio::sync::RwLock;

use crate::types::{Peer, PeerSet};

// ==============================================================================
// Peer Pool
// ==============================================================================

/// Reachable peers collected by concurrent crawl tasks.
///
/// Producers only ever call [`PeerPool::insert`]; the contents are read
/// once, after every producer has been joined.
#[derive(Default)]
pub struct PeerPool {
    nodes: RwLock<PeerSet>,
}

impl PeerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `peer`, merging with any record already held for its ID.
    ///
    /// The surviving record is the one that [`Peer::supersedes`] the other,
    /// and it is a seed if either record was.
    pub async fn insert(&self, peer: Peer) {
        let mut nodes = self.nodes.write().await;
        match nodes.entry(peer.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(peer);
            }
            Entry::Occupied(mut slot) => {
                let is_seed = peer.is_seed || slot.get().is_seed;
                if peer.supersedes(slot.get()) {
                    slot.insert(peer);
                }
                slot.get_mut().is_seed = is_seed;
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub fn into_peers(self) -> PeerSet {
        self.nodes.into_inner()
    }

    pub async fn snapshot(&self) -> PeerSet {
        self.nodes.read().await.clone()
    }
}
