use crate::error::{CoreError, RpcError};

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) id: u64,
    pub(super) method: &'a str,
    pub(super) params: serde_json::Value,
}

#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    pub(super) result: Option<serde_json::Value>,
    pub(super) error: Option<serde_json::Value>,
}

/// Parse a JSON-RPC error value into a structured `CoreError`.
///
/// Tendermint puts the useful detail in the optional `data` member
/// (`"height 12 must be less than or equal to the current blockchain
/// height 10"`), so it is folded into the message when present.
pub(super) fn parse_jsonrpc_error(err: serde_json::Value) -> CoreError {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
        #[serde(default)]
        data: Option<serde_json::Value>,
    }

    match serde_json::from_value::<JsonRpcError>(err.clone()) {
        Ok(parsed) => {
            let message = match parsed.data {
                Some(serde_json::Value::String(data)) if !data.is_empty() => {
                    format!("{}: {data}", parsed.message)
                }
                _ => parsed.message,
            };
            CoreError::Rpc(RpcError::ServerError {
                code: parsed.code,
                message,
            })
        }
        Err(_) => CoreError::Rpc(RpcError::InvalidResponse(format!(
            "non-standard JSON-RPC error: {err}"
        ))),
    }
}
