use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoreError, RpcError};
use crate::types::{CommitInfo, NetPeer, NodeStatus, DEFAULT_RPC_PORT};

use super::NodeRpc;

/// A mock Tendermint network for testing. Each RPC address maps to a
/// canned node populated via the builder pattern; unknown addresses behave
/// like unreachable hosts.
pub struct MockRpc {
    nodes: HashMap<String, MockNode>,
}

impl MockRpc {
    pub fn builder() -> MockRpcBuilder {
        MockRpcBuilder {
            nodes: HashMap::new(),
        }
    }

    /// Number of `/status` calls the node at `address` has served.
    pub fn status_calls(&self, address: &str) -> usize {
        self.nodes
            .get(address)
            .map(|node| node.status_calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    async fn node(&self, address: &str) -> Result<&MockNode, CoreError> {
        let node = self.nodes.get(address).ok_or_else(|| {
            CoreError::Rpc(RpcError::InvalidResponse(format!(
                "connection refused: {address}"
            )))
        })?;
        if !node.delay.is_zero() {
            tokio::time::sleep(node.delay).await;
        }
        if node.failing {
            return Err(CoreError::Rpc(RpcError::ServerError {
                code: -32603,
                message: "Internal error".to_owned(),
            }));
        }
        Ok(node)
    }
}

pub struct MockRpcBuilder {
    nodes: HashMap<String, MockNode>,
}

impl MockRpcBuilder {
    pub fn with_node(mut self, address: impl Into<String>, node: MockNode) -> Self {
        self.nodes.insert(address.into(), node);
        self
    }

    pub fn build(self) -> MockRpc {
        MockRpc { nodes: self.nodes }
    }
}

/// Canned behaviour of one node.
pub struct MockNode {
    status: NodeStatus,
    peers: Vec<NetPeer>,
    block_hash: String,
    genesis: serde_json::Value,
    delay: Duration,
    failing: bool,
    status_calls: AtomicUsize,
}

impl MockNode {
    pub fn new(node_id: &str, network: &str, height: u64) -> Self {
        Self {
            status: NodeStatus {
                node_id: node_id.to_owned(),
                network: network.to_owned(),
                version: "0.34.9".to_owned(),
                latest_block_height: height,
                catching_up: false,
            },
            peers: Vec::new(),
            block_hash: "E37F5936731F7F0FF35497255C666B91E719896A2E1E2F55A778A970AF92157E"
                .to_owned(),
            genesis: serde_json::json!({ "chain_id": network, "initial_height": "1" }),
            delay: Duration::ZERO,
            failing: false,
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Advertise a peer reachable at `http://<remote_ip>:26657`.
    pub fn with_peer(mut self, node_id: &str, remote_ip: &str) -> Self {
        self.peers.push(NetPeer {
            node_id: node_id.to_owned(),
            remote_ip: remote_ip.to_owned(),
            rpc_port: DEFAULT_RPC_PORT,
        });
        self
    }

    pub fn with_block_hash(mut self, hash: &str) -> Self {
        self.block_hash = hash.to_owned();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.status.version = version.to_owned();
        self
    }

    pub fn with_genesis(mut self, genesis: serde_json::Value) -> Self {
        self.genesis = genesis;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn catching_up(mut self) -> Self {
        self.status.catching_up = true;
        self
    }

    /// Every call answers with a JSON-RPC internal error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl NodeRpc for MockRpc {
    async fn status(&self, address: &str) -> Result<NodeStatus, CoreError> {
        if let Some(node) = self.nodes.get(address) {
            node.status_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(self.node(address).await?.status.clone())
    }

    async fn net_info(&self, address: &str) -> Result<Vec<NetPeer>, CoreError> {
        Ok(self.node(address).await?.peers.clone())
    }

    async fn commit(&self, address: &str, height: u64) -> Result<CommitInfo, CoreError> {
        let node = self.node(address).await?;
        if height > node.status.latest_block_height {
            return Err(CoreError::Rpc(RpcError::ServerError {
                code: -32603,
                message: format!(
                    "Internal error: height {height} must be less than or equal to the current \
                     blockchain height {}",
                    node.status.latest_block_height
                ),
            }));
        }
        Ok(CommitInfo {
            height,
            block_hash: node.block_hash.clone(),
        })
    }

    async fn genesis(&self, address: &str) -> Result<serde_json::Value, CoreError> {
        Ok(self.node(address).await?.genesis.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_address_is_unreachable() {
        let rpc = MockRpc::builder().build();
        assert!(rpc.status("http://10.0.0.9:26657").await.is_err());
    }

    #[tokio::test]
    async fn commit_above_tip_is_rejected() {
        let rpc = MockRpc::builder()
            .with_node("http://a", MockNode::new("a", "test-1", 100))
            .build();
        assert_eq!(
            rpc.commit("http://a", 100).await.expect("tip commit").height,
            100
        );
        assert!(rpc.commit("http://a", 101).await.is_err());
    }

    #[tokio::test]
    async fn status_calls_are_counted() {
        let rpc = MockRpc::builder()
            .with_node("http://a", MockNode::new("a", "test-1", 100).failing())
            .build();
        assert!(rpc.status("http://a").await.is_err());
        assert!(rpc.status("http://a").await.is_err());
        assert_eq!(rpc.status_calls("http://a"), 2);
    }
}
