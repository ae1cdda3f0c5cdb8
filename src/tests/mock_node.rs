//! Mock EVM JSON-RPC node for end-to-end testing
//!
//! Serves the handful of methods a dev node exposes to the HTTP-backed
//! provider (`eth_accounts`, `eth_chainId`, `eth_getBalance`,
//! `wallet_switchEthereumChain`) over plain HTTP on an ephemeral port.

use anyhow::{anyhow, Result};
use log::{debug, error, info};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::network::parse_chain_id;

/// Mutable node state shared with the request handlers
#[derive(Debug, Default)]
pub struct NodeState {
    pub accounts: Vec<String>,
    pub chain_id: u64,
    /// Balances in wei keyed by lowercase address
    pub balances: HashMap<String, u128>,
    /// Methods received, in order
    pub calls: Vec<String>,
}

/// Mock node listening on 127.0.0.1
pub struct MockNode {
    pub url: String,
    pub state: Arc<Mutex<NodeState>>,
    handle: JoinHandle<()>,
}

impl MockNode {
    /// Bind an ephemeral port and start serving
    pub async fn start(state: NodeState) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        info!("Mock node listening on {}", addr);

        let state = Arc::new(Mutex::new(state));
        let shared = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!("New connection from {}", peer);
                        let state = shared.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, state).await {
                                error!("Mock node connection failed: {}", e);
                            }
                        });
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            state,
            handle,
        })
    }

    pub fn set_accounts(&self, accounts: &[&str]) {
        self.lock().accounts = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NodeState> {
        self.state.lock().unwrap()
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Read one HTTP request, answer it and close
async fn serve(mut stream: TcpStream, state: Arc<Mutex<NodeState>>) -> Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let body = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(anyhow!("connection closed before a full request"));
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let body_start = header_end + 4;
            if buffer.len() >= body_start + content_length {
                break buffer[body_start..body_start + content_length].to_vec();
            }
        }
    };

    let request: Value = serde_json::from_slice(&body)?;
    let response = handle_request(&request, &state).to_string();
    let http_response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.len(),
        response
    );
    stream.write_all(http_response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn handle_request(request: &Value, state: &Mutex<NodeState>) -> Value {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();
    let params = &request["params"];
    debug!("Handling RPC method: {}", method);

    let mut state = state.lock().unwrap();
    state.calls.push(method.to_string());

    let result = match method {
        "eth_accounts" => Ok(json!(state.accounts)),
        "eth_chainId" => Ok(json!(format!("{:#x}", state.chain_id))),
        "eth_getBalance" => {
            let address = params[0].as_str().unwrap_or_default().to_lowercase();
            let wei = state.balances.get(&address).copied().unwrap_or(0);
            Ok(json!(format!("{:#x}", wei)))
        }
        "wallet_switchEthereumChain" => match params[0]["chainId"].as_str().map(parse_chain_id) {
            Some(Ok(chain_id)) => {
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            _ => Err((-32602, "invalid chainId".to_string())),
        },
        other => Err((-32601, format!("the method {} does not exist/is not available", other))),
    };

    match result {
        Ok(value) => json!({ "jsonrpc": "2.0", "id": id, "result": value }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    }
}
