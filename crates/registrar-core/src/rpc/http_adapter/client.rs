use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header;
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};
use crate::types::{CommitInfo, NetPeer, NodeStatus};

use super::super::NodeRpc;
use super::connection::parse_address;
use super::parsing::{parse_commit, parse_genesis, parse_net_info, parse_status};
use super::protocol::{parse_jsonrpc_error, JsonRpcRequest, JsonRpcResponse};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Tendermint JSON-RPC client over HTTP(S), shared across every node the
/// registrar talks to.
///
/// The underlying `reqwest::Client` keeps a connection pool per host, so
/// repeated probes of the same peer within one refresh reuse connections.
pub struct HttpRpcClient {
    client: reqwest::Client,
    limiter: Option<DirectRateLimiter>,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a new client.
    ///
    /// If `requests_per_second` is set, outbound requests are rate-limited
    /// across all nodes combined. Per-call deadlines are the caller's job;
    /// the client-level timeouts here only stop a hung socket from leaking
    /// forever.
    pub fn new(requests_per_second: Option<u32>) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(RpcError::Transport)?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::InvalidConfig("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            limiter,
            next_id: AtomicU64::new(initial_request_id()),
        })
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn rpc_call(
        &self,
        address: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, CoreError> {
        let url = parse_address(address)?;
        self.wait_for_rate_limit().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(rpc.id = id, rpc.method = method, peer = address, "rpc call");
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(RpcError::Transport)?;
        let status = response.status();

        let body = response.text().await.map_err(RpcError::Transport)?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.id = id, rpc.method = method, body = %body, "rpc response body");

        let decoded: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            RpcError::InvalidResponse(format!("decode JSON-RPC response ({status}): {e}"))
        })?;

        if let Some(err) = decoded.error {
            return Err(parse_jsonrpc_error(err));
        }

        decoded.result.ok_or_else(|| {
            RpcError::InvalidResponse(format!("{method} response has no result")).into()
        })
    }
}

#[async_trait]
impl NodeRpc for HttpRpcClient {
    async fn status(&self, address: &str) -> Result<NodeStatus, CoreError> {
        let raw = self
            .rpc_call(address, "status", serde_json::json!({}))
            .await?;
        parse_status(&raw)
    }

    async fn net_info(&self, address: &str) -> Result<Vec<NetPeer>, CoreError> {
        let raw = self
            .rpc_call(address, "net_info", serde_json::json!({}))
            .await?;
        parse_net_info(&raw)
    }

    async fn commit(&self, address: &str, height: u64) -> Result<CommitInfo, CoreError> {
        let raw = self
            .rpc_call(
                address,
                "commit",
                serde_json::json!({ "height": height.to_string() }),
            )
            .await?;
        parse_commit(&raw)
    }

    async fn genesis(&self, address: &str) -> Result<serde_json::Value, CoreError> {
        let raw = self
            .rpc_call(address, "genesis", serde_json::json!({}))
            .await?;
        parse_genesis(raw)
    }
}

fn initial_request_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}
