//! Remote-code fetcher: pulls deployed bytecode over JSON-RPC.
//!
//! The core accepts a hex string regardless of origin; this module is the
//! only network-touching collaborator in the workspace.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while resolving or fetching remote bytecode.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No RPC endpoint could be resolved for the requested network.
    #[error("no RPC URL configured for network '{network}': set RPC_URL_{env_suffix} or RPC_URL_DEFAULT")]
    MissingRpcUrl { network: String, env_suffix: String },

    /// Transport-level failure talking to the endpoint.
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with an error payload or a non-success status.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The address holds no code.
    #[error("no code at address {0}")]
    EmptyCode(String),
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    message: String,
}

/// Resolves the RPC endpoint for a network.
///
/// Order: explicit URL, then `RPC_URL_<NETWORK_UPPER_SNAKE>`, then
/// `RPC_URL_DEFAULT`.
pub fn resolve_rpc_url(network: &str, rpc_url: Option<&str>) -> Result<String, FetchError> {
    if let Some(url) = rpc_url {
        return Ok(url.to_string());
    }
    let env_suffix = network.to_ascii_uppercase().replace('-', "_");
    if let Ok(url) = std::env::var(format!("RPC_URL_{env_suffix}")) {
        return Ok(url);
    }
    if let Ok(url) = std::env::var("RPC_URL_DEFAULT") {
        return Ok(url);
    }
    Err(FetchError::MissingRpcUrl {
        network: network.to_string(),
        env_suffix,
    })
}

/// Fetches the deployed bytecode at `address` via `eth_getCode`.
pub async fn fetch_code(
    address: &str,
    network: &str,
    rpc_url: Option<&str>,
) -> Result<String, FetchError> {
    let url = resolve_rpc_url(network, rpc_url)?;
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_getCode",
        "params": [address, "latest"],
    });

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(&body)
        .timeout(Duration::from_secs(30))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Rpc(format!("HTTP {status}")));
    }

    let parsed: RpcResponse = response.json().await?;
    if let Some(error) = parsed.error {
        return Err(FetchError::Rpc(error.message));
    }
    let code = parsed
        .result
        .ok_or_else(|| FetchError::Rpc("response missing result".to_string()))?;

    if code.is_empty() || code == "0x" {
        return Err(FetchError::EmptyCode(address.to_string()));
    }
    Ok(code)
}
