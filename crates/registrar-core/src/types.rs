use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Default Tendermint RPC port, used when a peer does not advertise one.
pub const DEFAULT_RPC_PORT: u16 = 26657;

// ==============================================================================
// Peer
// ==============================================================================

/// A chain node known to the registry, keyed by its node ID.
///
/// The serialized shape matches the registry's `peers.json`: false, zero and
/// missing fields are omitted, timestamps are RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_seed: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_contact_height: u64,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_contact_date: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reachable: bool,
}

impl Peer {
    /// A peer seen in some node's peer table but not contacted yet.
    pub fn discovered(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            is_seed: false,
            last_contact_height: 0,
            last_contact_date: None,
            updated_at: None,
            reachable: false,
        }
    }

    /// Record a successful liveness probe.
    pub fn mark_reachable(&mut self, height: u64, at: OffsetDateTime) {
        self.last_contact_height = height;
        self.last_contact_date = Some(at);
        self.updated_at = Some(at);
        self.reachable = true;
    }

    /// Decide which of two records for the same peer ID survives a merge.
    ///
    /// Later contact wins, then the higher contact height, then the smaller
    /// address so that the result never depends on arrival order.
    pub(crate) fn supersedes(&self, other: &Peer) -> bool {
        let by_date = self.last_contact_date.cmp(&other.last_contact_date);
        let by_height = self.last_contact_height.cmp(&other.last_contact_height);
        let by_address = other.address.cmp(&self.address);
        by_date.then(by_height).then(by_address) == Ordering::Greater
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Peers of one chain keyed by node ID. Ordered, so iteration and
/// serialization are deterministic.
pub type PeerSet = BTreeMap<String, Peer>;

// ==============================================================================
// Light Root
// ==============================================================================

/// A (height, block hash) checkpoint from which a light client can
/// bootstrap state sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LightRoot {
    #[serde(rename = "trust-height")]
    pub trust_height: u64,
    #[serde(rename = "trust-hash")]
    pub trust_hash: String,
}

impl LightRoot {
    pub fn new(trust_height: u64, trust_hash: impl Into<String>) -> Self {
        Self {
            trust_height,
            trust_hash: trust_hash.into(),
        }
    }
}

impl fmt::Display for LightRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.trust_hash, self.trust_height)
    }
}

// ==============================================================================
// RPC Results
// ==============================================================================

/// The subset of `/status` the registrar relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub node_id: String,
    pub network: String,
    pub version: String,
    pub latest_block_height: u64,
    pub catching_up: bool,
}

/// One entry of a node's `/net_info` peer table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetPeer {
    pub node_id: String,
    pub remote_ip: String,
    pub rpc_port: u16,
}

impl NetPeer {
    /// The RPC endpoint this peer is expected to serve.
    pub fn rpc_address(&self) -> String {
        if self.remote_ip.contains(':') {
            format!("http://[{}]:{}", self.remote_ip, self.rpc_port)
        } else {
            format!("http://{}:{}", self.remote_ip, self.rpc_port)
        }
    }
}

/// Height and block hash taken from a signed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub height: u64,
    pub block_hash: String,
}

impl From<CommitInfo> for LightRoot {
    fn from(commit: CommitInfo) -> Self {
        LightRoot::new(commit.height, commit.block_hash)
    }
}
