//! Bootstrap of a new chain directory from a single trusted node.
//!
//! Seeding writes everything a later refresh needs: the genesis document
//! with its checksum, a history holding the node's current light root, and
//! a peer file containing the node itself as the only seed.

use std::io::{ErrorKind, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::directory::PeerDirectory;
use crate::error::CoreError;
use crate::history::{HistoryStore, LightRootHistory};
use crate::registry::{write_atomic, RegistryLayout};
use crate::rpc::NodeRpc;
use crate::types::{LightRoot, NodeStatus, Peer, PeerSet};

/// What [`seed_chain`] recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub chain_id: String,
    pub seed: Peer,
    pub root: LightRoot,
    /// Hex SHA-256 of the sorted genesis document.
    pub genesis_sum: String,
    /// `false` when a genesis was already present and left untouched.
    pub genesis_written: bool,
}

/// Initialise the registry directory of the chain served at `rpc_address`.
///
/// The node must be in sync, on `expected_chain_id` when one is given, and
/// run Tendermint 0.34 or newer. An existing genesis is never replaced;
/// the light-root history and peer file are reset to this node's view.
pub async fn seed_chain(
    rpc: &dyn NodeRpc,
    layout: &RegistryLayout,
    rpc_address: &str,
    expected_chain_id: Option<&str>,
) -> Result<SeedReport, CoreError> {
    let status = rpc.status(rpc_address).await?;
    check_status(rpc_address, &status, expected_chain_id)?;
    debug!(rpc_address, chain_id = %status.network, "GET /status");

    let chain_id = status.network.clone();
    let paths = layout.chain(&chain_id)?;
    let height = status.latest_block_height;

    let (genesis, commit) = futures::try_join!(
        rpc.genesis(rpc_address),
        rpc.commit(rpc_address, height)
    )?;
    debug!(rpc_address, height, "fetched genesis and commit");

    let (genesis_sum, genesis_written) = if paths.genesis.exists() {
        info!(chain_id, path = %paths.genesis.display(), "genesis already present; keeping it");
        let sum = load_genesis_sum(layout, &chain_id)?.unwrap_or_default();
        (sum, false)
    } else {
        let (sum, sorted) = sorted_genesis(&genesis)?;
        write_atomic(&paths.genesis_sum, sum.as_bytes())?;
        write_atomic(&paths.genesis, &gzip(&sorted)?)?;
        (sum, true)
    };

    let root = LightRoot::from(commit);
    let mut history = LightRootHistory::default();
    history.push(root.clone())?;
    HistoryStore::new(layout.clone()).save(&chain_id, &history)?;

    let mut seed = Peer::discovered(status.node_id, rpc_address);
    seed.is_seed = true;
    seed.mark_reachable(height, OffsetDateTime::now_utc());
    let peers = PeerSet::from([(seed.id.clone(), seed.clone())]);
    PeerDirectory::new(layout.clone()).save(&chain_id, &peers)?;

    info!(chain_id, root = %root, genesis_written, "seeded chain");
    Ok(SeedReport {
        chain_id,
        seed,
        root,
        genesis_sum,
        genesis_written,
    })
}

/// Read the recorded genesis checksum of `chain_id`, if the chain has one.
pub fn load_genesis_sum(
    layout: &RegistryLayout,
    chain_id: &str,
) -> Result<Option<String>, CoreError> {
    let path = layout.chain(chain_id)?.genesis_sum;
    match std::fs::read_to_string(&path) {
        Ok(sum) => Ok(Some(sum.trim().to_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::persist("read", path)(e)),
    }
}

fn check_status(
    rpc_address: &str,
    status: &NodeStatus,
    expected_chain_id: Option<&str>,
) -> Result<(), CoreError> {
    if let Some(expected) = expected_chain_id {
        if status.network != expected {
            return Err(CoreError::ChainMismatch {
                address: rpc_address.to_owned(),
                expected: expected.to_owned(),
                actual: status.network.clone(),
            });
        }
    }
    if status.catching_up {
        return Err(CoreError::CatchingUp {
            address: rpc_address.to_owned(),
        });
    }
    if status.version.is_empty() {
        warn!(
            rpc_address,
            "node did not report its Tendermint version; there may be compatibility problems"
        );
    } else if is_legacy_version(&status.version) {
        return Err(CoreError::UnsupportedVersion {
            address: rpc_address.to_owned(),
            version: status.version.clone(),
        });
    }
    Ok(())
}

/// Tendermint 0.30 through 0.33 serve an incompatible commit layout.
fn is_legacy_version(version: &str) -> bool {
    let mut parts = version.trim_start_matches('v').split('.');
    let major = parts.next().and_then(|p| p.parse::<u64>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u64>().ok());
    matches!((major, minor), (Some(0), Some(30..=33)))
}

/// Re-serialise `genesis` with sorted keys and two-space indent, and hash
/// the result. Returns `(hex sum, bytes)`.
pub fn sorted_genesis(genesis: &Value) -> Result<(String, Vec<u8>), CoreError> {
    let sorted = sort_keys(genesis.clone());
    let bytes = serde_json::to_vec_pretty(&sorted)
        .map_err(|e| CoreError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;
    let sum = hex::encode(Sha256::digest(&bytes));
    Ok((sum, bytes))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn gzip(content: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    Ok(encoder.finish()?)
}
