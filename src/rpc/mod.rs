//! JSON-RPC client used for balance queries and HTTP-backed providers
//!
//! This module handles:
//! - Request/response serialization (JSON-RPC 2.0)
//! - Communication with per-network RPC endpoints
//! - Typed balance helpers for EVM and Solana nodes

use alloy_primitives::U256;
use async_trait::async_trait;
use log::debug;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::utils::parse_quantity;

/// RPC errors
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed with status: {0}")]
    Status(u16),

    #[error("{message} (code: {code})")]
    Remote { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// RPC request
#[derive(Serialize, Debug)]
struct RpcRequest<'a> {
    /// JSON-RPC version
    jsonrpc: &'static str,
    /// Method name
    method: &'a str,
    /// Method parameters
    params: Value,
    /// Request ID
    id: u64,
}

/// RPC response
#[derive(Deserialize, Debug)]
struct RpcResponse {
    /// Result value; `null` is a valid result (e.g. `wallet_switchEthereumChain`)
    #[serde(default)]
    result: Value,
    /// Error value
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Error object carried by a JSON-RPC response
#[derive(Deserialize, Debug)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Trait for making JSON-RPC calls
///
/// Native code uses [`RpcClient`]; tests substitute in-memory transports.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Call `method` on the endpoint at `url`
    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// reqwest-backed JSON-RPC client
pub struct RpcClient {
    /// HTTP client
    client: Client,
    /// Request ID counter
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a new RPC client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::ConnectionFailed(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Get the next request ID
    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcTransport for RpcClient {
    async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!("Calling RPC method {} on {}", method, url);

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_request_id(),
        };

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let body = response
            .json::<RpcResponse>()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;

        decode_response(body)
    }
}

fn decode_response(body: RpcResponse) -> Result<Value, RpcError> {
    if let Some(error) = body.error {
        return Err(RpcError::Remote {
            code: error.code,
            message: error.message,
        });
    }
    Ok(body.result)
}

/// Native balance of an EVM account in wei
pub async fn eth_get_balance(
    transport: &dyn RpcTransport,
    url: &str,
    address: &str,
) -> Result<U256, RpcError> {
    let result = transport
        .call(url, "eth_getBalance", json!([address, "latest"]))
        .await?;
    quantity_from_value(&result)
}

/// Balance of a Solana account in lamports
pub async fn sol_get_balance(
    transport: &dyn RpcTransport,
    url: &str,
    pubkey: &str,
) -> Result<u64, RpcError> {
    let result = transport.call(url, "getBalance", json!([pubkey])).await?;
    // Solana wraps the value in an RpcResponse context object
    let lamports = result.get("value").unwrap_or(&result);
    lamports
        .as_u64()
        .ok_or_else(|| RpcError::InvalidResponse(format!("invalid lamports value: {}", result)))
}

/// Decode a hex quantity returned by an EVM node
pub fn quantity_from_value(value: &Value) -> Result<U256, RpcError> {
    value
        .as_str()
        .and_then(parse_quantity)
        .ok_or_else(|| RpcError::InvalidResponse(format!("invalid quantity: {}", value)))
}
