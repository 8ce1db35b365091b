//! Native JSON-RPC client for Tendermint RPC endpoints.
//!
//! Implements [`NodeRpc`](super::NodeRpc) over JSON-RPC using `reqwest`,
//! with a shared connection pool, optional request rate limiting and
//! tolerant decoding of Tendermint's string-encoded integers.

mod client;
mod connection;
mod parsing;
mod protocol;

pub use client::HttpRpcClient;
