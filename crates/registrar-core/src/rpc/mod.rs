//! Tendermint RPC abstraction layer.
//!
//! Defines the [`NodeRpc`] trait and provides an HTTP JSON-RPC
//! implementation ([`HttpRpcClient`]) plus a test mock (`mock::MockRpc`).
//!
//! Unlike a per-node client, one `NodeRpc` value talks to any number of
//! nodes: every call names the node's RPC address. This lets the crawler
//! and the consensus engine share a single connection pool across all the
//! peers they fan out to.

mod http_adapter;
#[cfg(test)]
pub mod mock;

pub use http_adapter::HttpRpcClient;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{CommitInfo, NetPeer, NodeStatus};

/// The Tendermint RPC methods the registrar consumes.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// `/status`: identity, network and sync state of the node.
    async fn status(&self, address: &str) -> Result<NodeStatus, CoreError>;

    /// `/net_info`: the node's own table of connected peers.
    async fn net_info(&self, address: &str) -> Result<Vec<NetPeer>, CoreError>;

    /// `/commit`: the signed header at `height`.
    async fn commit(&self, address: &str, height: u64) -> Result<CommitInfo, CoreError>;

    /// `/genesis`: the raw genesis document.
    async fn genesis(&self, address: &str) -> Result<serde_json::Value, CoreError>;
}
