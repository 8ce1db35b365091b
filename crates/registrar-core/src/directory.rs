//! The persisted `peers.json` of each chain.

use tracing::debug;

use crate::error::CoreError;
use crate::registry::{read_json, write_json, RegistryLayout};
use crate::types::{Peer, PeerSet};

pub struct PeerDirectory {
    layout: RegistryLayout,
}

impl PeerDirectory {
    pub fn new(layout: RegistryLayout) -> Self {
        Self { layout }
    }

    /// Load the known peers of `chain_id`.
    ///
    /// A chain without a peer file yet (first run) yields an empty set.
    /// Entries with duplicate IDs are merged the same way the crawler merges
    /// them, so a hand-edited file cannot make the result order-dependent.
    pub fn load(&self, chain_id: &str) -> Result<PeerSet, CoreError> {
        let path = self.layout.chain(chain_id)?.peers;
        let Some(list) = read_json::<Vec<Peer>>(&path)? else {
            debug!(chain_id, path = %path.display(), "no peer file yet");
            return Ok(PeerSet::new());
        };

        let mut peers = PeerSet::new();
        for peer in list {
            match peers.get(&peer.id) {
                Some(existing) if !peer.supersedes(existing) => {}
                _ => {
                    peers.insert(peer.id.clone(), peer);
                }
            }
        }
        debug!(chain_id, count = peers.len(), "loaded peers");
        Ok(peers)
    }

    /// Persist `peers` as a JSON array sorted by peer ID.
    ///
    /// Saving the same logical set twice produces byte-identical files.
    pub fn save(&self, chain_id: &str, peers: &PeerSet) -> Result<(), CoreError> {
        let path = self.layout.chain(chain_id)?.peers;
        // BTreeMap iteration is already ID-ordered.
        let list: Vec<&Peer> = peers.values().collect();
        write_json(&path, &list)?;
        debug!(chain_id, count = list.len(), "saved peers");
        Ok(())
    }
}
