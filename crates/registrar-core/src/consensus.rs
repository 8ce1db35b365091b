use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::error::{CoreError, RootGroup};
use crate::rpc::NodeRpc;
use crate::types::{LightRoot, Peer, PeerSet};

// ==============================================================================
// Consensus Result Set
// ==============================================================================

/// Light roots reported by individual peers during one consensus round.
///
/// Written concurrently through [`ConsensusResultSet::record`], then
/// consumed once by [`ConsensusResultSet::evaluate`].
#[derive(Default)]
pub struct ConsensusResultSet {
    results: RwLock<HashMap<String, LightRoot>>,
}

impl ConsensusResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, peer_id: String, root: LightRoot) {
        self.results.write().await.insert(peer_id, root);
    }

    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    /// Accept the round only if at least one peer answered and every
    /// answer is identical.
    pub fn evaluate(self, height: u64) -> Result<LightRoot, CoreError> {
        evaluate_round(self.results.into_inner(), height)
    }
}

/// Unanimity check over the answers of one round.
///
/// Any split is fatal: the error lists every distinct root together with
/// the peers that reported it, so operators can see who diverged.
pub fn evaluate_round(
    results: HashMap<String, LightRoot>,
    height: u64,
) -> Result<LightRoot, CoreError> {
    let mut groups: BTreeMap<LightRoot, Vec<String>> = BTreeMap::new();
    for (peer_id, root) in results {
        groups.entry(root).or_default().push(peer_id);
    }

    if groups.len() > 1 {
        let groups = groups
            .into_iter()
            .map(|(root, mut peers)| {
                peers.sort();
                RootGroup { root, peers }
            })
            .collect();
        return Err(CoreError::Divergence { height, groups });
    }

    groups
        .into_keys()
        .next()
        .ok_or(CoreError::NoLightRoot { height })
}

// ==============================================================================
// Root Consensus Engine
// ==============================================================================

/// Ask every reachable peer for the commit at `height` and return the light
/// root they unanimously agree on.
///
/// Each peer gets its own `commit_timeout`; peers that fail or time out are
/// left out of the round rather than failing it. The round is evaluated only
/// after every task has been joined.
pub async fn collect_light_root(
    rpc: Arc<dyn NodeRpc>,
    peers: &PeerSet,
    height: u64,
    config: &RefreshConfig,
) -> Result<LightRoot, CoreError> {
    let results = Arc::new(ConsensusResultSet::new());
    let limiter = Arc::new(Semaphore::new(config.max_in_flight));

    let mut tasks = JoinSet::new();
    for peer in peers.values() {
        tasks.spawn(ask_peer(
            rpc.clone(),
            peer.clone(),
            height,
            results.clone(),
            limiter.clone(),
            config.commit_timeout,
        ));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "commit task aborted");
        }
    }

    let results = match Arc::try_unwrap(results) {
        Ok(results) => results,
        Err(shared) => {
            let snapshot = shared.results.read().await.clone();
            ConsensusResultSet {
                results: RwLock::new(snapshot),
            }
        }
    };
    let respondents = results.len().await;
    let root = results.evaluate(height)?;
    info!(
        height,
        hash = %root.trust_hash,
        respondents,
        asked = peers.len(),
        "peers agree on light root"
    );
    Ok(root)
}

async fn ask_peer(
    rpc: Arc<dyn NodeRpc>,
    peer: Peer,
    height: u64,
    results: Arc<ConsensusResultSet>,
    limiter: Arc<Semaphore>,
    commit_timeout: Duration,
) {
    let Ok(_permit) = limiter.acquire().await else {
        return;
    };
    debug!(peer = %peer.address, height, "asking peer for commit");
    match timeout(commit_timeout, rpc.commit(&peer.address, height)).await {
        Ok(Ok(commit)) => {
            let root = LightRoot::from(commit);
            debug!(peer = %peer.address, peer_id = %peer.id, root = %root, "received light root");
            results.record(peer.id, root).await;
        }
        Ok(Err(e)) => warn!(peer = %peer.address, error = %e, "commit query failed"),
        Err(_) => warn!(peer = %peer.address, timeout = ?commit_timeout, "commit query timed out"),
    }
}
