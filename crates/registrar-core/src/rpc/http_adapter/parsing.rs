use serde_json::Value;

use crate::error::{CoreError, RpcError};
use crate::types::{CommitInfo, NetPeer, NodeStatus, DEFAULT_RPC_PORT};

fn invalid(message: String) -> CoreError {
    CoreError::Rpc(RpcError::InvalidResponse(message))
}

fn pointer<'a>(raw: &'a Value, path: &str) -> Result<&'a Value, CoreError> {
    raw.pointer(path)
        .filter(|v| !v.is_null())
        .ok_or_else(|| invalid(format!("missing {path}")))
}

fn parse_str(raw: &Value, path: &str) -> Result<String, CoreError> {
    pointer(raw, path)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| invalid(format!("{path} is not a string")))
}

/// Tendermint encodes 64-bit integers as JSON strings; accept both forms.
pub(super) fn parse_u64(raw: &Value, path: &str) -> Result<u64, CoreError> {
    match pointer(raw, path)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("{path} out of range: {n}"))),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| invalid(format!("invalid {path} `{s}`: {e}"))),
        other => Err(invalid(format!("{path} is not an integer: {other}"))),
    }
}

fn parse_bool(raw: &Value, path: &str) -> Result<bool, CoreError> {
    pointer(raw, path)?
        .as_bool()
        .ok_or_else(|| invalid(format!("{path} is not a boolean")))
}

pub(super) fn parse_status(raw: &Value) -> Result<NodeStatus, CoreError> {
    Ok(NodeStatus {
        node_id: parse_str(raw, "/node_info/id")?,
        network: parse_str(raw, "/node_info/network")?,
        version: raw
            .pointer("/node_info/version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        latest_block_height: parse_u64(raw, "/sync_info/latest_block_height")?,
        catching_up: parse_bool(raw, "/sync_info/catching_up")?,
    })
}

pub(super) fn parse_net_info(raw: &Value) -> Result<Vec<NetPeer>, CoreError> {
    let peers = pointer(raw, "/peers")?
        .as_array()
        .ok_or_else(|| invalid("/peers is not an array".to_owned()))?;

    peers
        .iter()
        .map(|peer| {
            let rpc_port = peer
                .pointer("/node_info/other/rpc_address")
                .and_then(Value::as_str)
                .and_then(port_of)
                .unwrap_or(DEFAULT_RPC_PORT);
            Ok(NetPeer {
                node_id: parse_str(peer, "/node_info/id")?,
                remote_ip: parse_str(peer, "/remote_ip")?,
                rpc_port,
            })
        })
        .collect()
}

pub(super) fn parse_commit(raw: &Value) -> Result<CommitInfo, CoreError> {
    Ok(CommitInfo {
        height: parse_u64(raw, "/signed_header/header/height")?,
        block_hash: parse_str(raw, "/signed_header/commit/block_id/hash")?,
    })
}

pub(super) fn parse_genesis(raw: Value) -> Result<Value, CoreError> {
    match raw {
        Value::Object(mut map) => map
            .remove("genesis")
            .filter(Value::is_object)
            .ok_or_else(|| invalid("missing /genesis".to_owned())),
        other => Err(invalid(format!("genesis result is not an object: {other}"))),
    }
}

/// Extract the port from a listen address such as `tcp://0.0.0.0:26657`.
fn port_of(listen_address: &str) -> Option<u16> {
    let (_, port) = listen_address.rsplit_once(':')?;
    port.trim_end_matches('/').parse().ok().filter(|p| *p != 0)
}
