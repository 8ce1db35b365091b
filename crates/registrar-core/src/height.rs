use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::config::RefreshConfig;
use crate::error::CoreError;
use crate::rpc::NodeRpc;
use crate::types::{Peer, PeerSet};

// ==============================================================================
// Height Resolver
// ==============================================================================

/// Pick the settled block height at which light roots are collected.
///
/// Candidates are asked one at a time, in peer-ID order, since a single
/// usable answer is enough. A candidate on the wrong network or failing to
/// answer is skipped at once; a candidate still catching up is polled again
/// every `catch_up_backoff` until its `height_timeout` budget runs out.
/// The first in-sync answer wins.
pub async fn resolve_height(
    rpc: &dyn NodeRpc,
    peers: &PeerSet,
    chain_id: &str,
    config: &RefreshConfig,
) -> Result<u64, CoreError> {
    for peer in peers.values() {
        match timeout(
            config.height_timeout,
            settled_height(rpc, peer, chain_id, config),
        )
        .await
        {
            Ok(Ok(height)) => {
                info!(chain_id, peer = %peer.address, height, "resolved settled height");
                return Ok(height);
            }
            Ok(Err(e)) => {
                debug!(peer = %peer.address, error = %e, "peer could not report a usable height");
            }
            Err(_) => {
                debug!(
                    peer = %peer.address,
                    budget = ?config.height_timeout,
                    "peer did not settle within its budget"
                );
            }
        }
    }

    Err(CoreError::NoUsableHeight {
        chain_id: chain_id.to_owned(),
        tried: peers.len(),
    })
}

/// Poll one peer until it reports an in-sync height on `chain_id`. The
/// caller bounds the total time spent here.
async fn settled_height(
    rpc: &dyn NodeRpc,
    peer: &Peer,
    chain_id: &str,
    config: &RefreshConfig,
) -> Result<u64, CoreError> {
    loop {
        debug!(peer = %peer.address, "GET /status for latest block height");
        let status = rpc.status(&peer.address).await?;
        if status.network != chain_id {
            return Err(CoreError::ChainMismatch {
                address: peer.address.clone(),
                expected: chain_id.to_owned(),
                actual: status.network,
            });
        }
        if !status.catching_up {
            return Ok(status.latest_block_height);
        }
        debug!(peer = %peer.address, "peer is catching up; retrying");
        sleep(config.catch_up_backoff).await;
    }
}
