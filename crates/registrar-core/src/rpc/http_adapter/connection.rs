use reqwest::Url;

use crate::error::CoreError;

/// Validate a node RPC address before any request is sent to it.
///
/// Addresses come from the registry file and from other nodes' peer
/// tables, so they are untrusted input; only plain HTTP(S) URLs pass.
pub(super) fn parse_address(address: &str) -> Result<Url, CoreError> {
    let parsed = Url::parse(address).map_err(|e| {
        CoreError::InvalidConfig(format!(
            "invalid node address `{address}`: expected HTTP(S) URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CoreError::InvalidConfig(format!(
            "unsupported address scheme `{other}` in `{address}`; expected http or https"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address_http_url() {
        let parsed = parse_address("http://127.0.0.1:26657").expect("should parse");
        assert_eq!(parsed.as_str(), "http://127.0.0.1:26657/");
    }

    #[test]
    fn parse_address_https_with_path() {
        let parsed = parse_address("https://rpc.example.org:443/cosmos").expect("should parse");
        assert_eq!(parsed.path(), "/cosmos");
    }

    #[test]
    fn parse_address_rejects_tcp_scheme() {
        let err = parse_address("tcp://0.0.0.0:26657").expect_err("must reject tcp");
        assert!(err.to_string().contains("unsupported address scheme"));
    }

    #[test]
    fn parse_address_rejects_garbage() {
        let err = parse_address("not a url").expect_err("must reject");
        assert!(err.to_string().contains("invalid node address"));
    }
}
