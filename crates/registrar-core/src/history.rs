//! The append-only series of trusted light roots per chain,
//! stored as one JSON array in `light-roots/heights.json`.
//!
//! The last element is the "latest" root that state-sync consumers
//! bootstrap from; there is no separate latest file.

use tracing::{debug, info};

use crate::error::CoreError;
use crate::registry::{read_json, write_json, RegistryLayout};
use crate::types::LightRoot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightRootHistory {
    roots: Vec<LightRoot>,
}

impl LightRootHistory {
    pub fn roots(&self) -> &[LightRoot] {
        &self.roots
    }

    pub fn latest(&self) -> Option<&LightRoot> {
        self.roots.last()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Append a validated root. Heights must strictly increase; a second
    /// append within the same cycle (same height) is refused rather than
    /// recorded twice.
    pub fn push(&mut self, root: LightRoot) -> Result<(), CoreError> {
        if let Some(latest) = self.latest() {
            if root.trust_height <= latest.trust_height {
                return Err(CoreError::NonIncreasingHeight {
                    height: root.trust_height,
                    latest: latest.trust_height,
                });
            }
        }
        self.roots.push(root);
        Ok(())
    }
}

pub struct HistoryStore {
    layout: RegistryLayout,
}

impl HistoryStore {
    pub fn new(layout: RegistryLayout) -> Self {
        Self { layout }
    }

    /// Load the history of `chain_id`; a chain without one yet is empty.
    pub fn load(&self, chain_id: &str) -> Result<LightRootHistory, CoreError> {
        let path = self.layout.chain(chain_id)?.heights;
        let roots = read_json::<Vec<LightRoot>>(&path)?.unwrap_or_default();
        debug!(chain_id, count = roots.len(), "loaded light root history");
        Ok(LightRootHistory { roots })
    }

    /// Overwrite the history of `chain_id`.
    pub fn save(&self, chain_id: &str, history: &LightRootHistory) -> Result<(), CoreError> {
        let path = self.layout.chain(chain_id)?.heights;
        write_json(&path, &history.roots)
    }

    /// Record one validated root at the end of the chain's history.
    pub fn append(&self, chain_id: &str, root: LightRoot) -> Result<LightRootHistory, CoreError> {
        let mut history = self.load(chain_id)?;
        history.push(root)?;
        self.save(chain_id, &history)?;
        if let Some(latest) = history.latest() {
            info!(
                chain_id,
                height = latest.trust_height,
                hash = %latest.trust_hash,
                entries = history.len(),
                "recorded light root"
            );
        }
        Ok(history)
    }
}
