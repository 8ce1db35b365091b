use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::pool::PeerPool;
use crate::rpc::NodeRpc;
use crate::types::{Peer, PeerSet};

// ==============================================================================
// Peer Crawler
// ==============================================================================

/// Refresh the reachable peer set of a chain, one hop out from `known`.
///
/// Every known peer is asked for its `/net_info` peer table; the peer itself
/// and every peer it reports are then liveness-probed with `/status`. Only
/// peers that answer within `probe_timeout` end up in the result, each with
/// `reachable = true` and fresh contact timestamps. Peers discovered this
/// way are not asked for their own tables.
///
/// Failures are absorbed per task: an unreachable or slow peer contributes
/// nothing and never aborts its siblings, so this function cannot fail.
/// Concurrent network calls are capped at `max_in_flight`.
pub async fn refresh_peers(
    rpc: Arc<dyn NodeRpc>,
    known: &PeerSet,
    config: &RefreshConfig,
) -> PeerSet {
    if known.is_empty() {
        return PeerSet::new();
    }

    let ctx = CrawlContext {
        rpc,
        pool: Arc::new(PeerPool::new()),
        limiter: Arc::new(Semaphore::new(config.max_in_flight)),
        crawl_timeout: config.crawl_timeout,
        probe_timeout: config.probe_timeout,
    };

    let mut tasks = JoinSet::new();
    for peer in known.values() {
        tasks.spawn(contact_peer(ctx.clone(), peer.clone()));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "crawl task aborted");
        }
    }

    // Every producer has been joined, so the pool is no longer shared.
    let CrawlContext { pool, .. } = ctx;
    let reachable = match Arc::try_unwrap(pool) {
        Ok(pool) => pool.into_peers(),
        Err(shared) => shared.snapshot().await,
    };
    info!(
        known = known.len(),
        reachable = reachable.len(),
        "peer crawl finished"
    );
    reachable
}

#[derive(Clone)]
struct CrawlContext {
    rpc: Arc<dyn NodeRpc>,
    pool: Arc<PeerPool>,
    limiter: Arc<Semaphore>,
    crawl_timeout: Duration,
    probe_timeout: Duration,
}

/// Probe a known peer and every peer in its table. Returns once all of its
/// probes have finished, so joining this task joins the whole subtree.
async fn contact_peer(ctx: CrawlContext, peer: Peer) {
    let mut probes = JoinSet::new();
    probes.spawn(probe(ctx.clone(), peer.clone()));

    let table = {
        let Ok(_permit) = ctx.limiter.acquire().await else {
            return;
        };
        debug!(peer = %peer.address, "GET /net_info");
        timeout(ctx.crawl_timeout, ctx.rpc.net_info(&peer.address)).await
    };

    match table {
        Ok(Ok(neighbours)) => {
            debug!(peer = %peer.address, count = neighbours.len(), "received peer table");
            for neighbour in neighbours {
                if neighbour.node_id.is_empty() {
                    continue;
                }
                let address = neighbour.rpc_address();
                probes.spawn(probe(
                    ctx.clone(),
                    Peer::discovered(neighbour.node_id, address),
                ));
            }
        }
        Ok(Err(e)) => warn!(peer = %peer.address, error = %e, "net_info failed"),
        Err(_) => warn!(
            peer = %peer.address,
            timeout = ?ctx.crawl_timeout,
            "net_info timed out"
        ),
    }

    while probes.join_next().await.is_some() {}
}

/// Admit `peer` to the pool if it answers `/status` in time as the node it
/// claims to be.
async fn probe(ctx: CrawlContext, mut peer: Peer) {
    let answer = {
        let Ok(_permit) = ctx.limiter.acquire().await else {
            return;
        };
        timeout(ctx.probe_timeout, ctx.rpc.status(&peer.address)).await
    };

    match answer {
        Ok(Ok(status)) if status.node_id == peer.id => {
            debug!(peer = %peer.address, height = status.latest_block_height, "confirmed reachable");
            peer.mark_reachable(status.latest_block_height, OffsetDateTime::now_utc());
            ctx.pool.insert(peer).await;
        }
        Ok(Ok(status)) => debug!(
            peer = %peer.address,
            expected = %peer.id,
            actual = %status.node_id,
            "address answered with a different node id"
        ),
        Ok(Err(e)) => debug!(peer = %peer.address, error = %e, "liveness probe failed"),
        Err(_) => debug!(peer = %peer.address, "liveness probe timed out"),
    }
}
