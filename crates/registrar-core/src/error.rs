use std::fmt;
use std::path::PathBuf;

use crate::types::LightRoot;

/// Transport and protocol failures talking to a single node.
///
/// These are absorbed per task by the crawler and the consensus engine;
/// they only surface to callers through `seed_chain` and the live tests.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON-RPC server error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid JSON-RPC response: {0}")]
    InvalidResponse(String),
}

/// One group of peers that reported the same light root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootGroup {
    pub root: LightRoot,
    pub peers: Vec<String>,
}

impl fmt::Display for RootGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from [{}]", self.root, self.peers.join(", "))
    }
}

fn render_groups(groups: &[RootGroup]) -> String {
    groups
        .iter()
        .map(RootGroup::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("RPC communication failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("node {address} is on chain `{actual}`, expected `{expected}`")]
    ChainMismatch {
        address: String,
        expected: String,
        actual: String,
    },

    #[error("node {address} is still catching up")]
    CatchingUp { address: String },

    #[error("node {address} runs tendermint {version}; 0.34 or newer is required")]
    UnsupportedVersion { address: String, version: String },

    #[error("no peer could report a usable height for chain `{chain_id}` ({tried} tried)")]
    NoUsableHeight { chain_id: String, tried: usize },

    #[error("no peer answered with a light root at height {height}")]
    NoLightRoot { height: u64 },

    #[error(
        "peers reported {} different light roots at height {height}: {}",
        .groups.len(),
        render_groups(.groups)
    )]
    Divergence { height: u64, groups: Vec<RootGroup> },

    #[error("light root at height {height} does not extend history ending at {latest}")]
    NonIncreasingHeight { height: u64, latest: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op} {}: {source}", .path.display())]
    Persist {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Adapter for `map_err` that attaches the operation and path to an I/O error.
    pub(crate) fn persist(
        op: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| CoreError::Persist { op, path, source }
    }
}
