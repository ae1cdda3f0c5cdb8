//! EIP-1193 provider backed by a JSON-RPC node
//!
//! Lets the controller run outside a browser against any node that exposes
//! its accounts over JSON-RPC (dev nodes such as anvil or hardhat). HTTP has
//! no push channel, so account and chain changes are detected by polling
//! `eth_accounts` and `eth_chainId`.

use async_trait::async_trait;
use log::{debug, info};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{Eip1193Provider, ProviderEvent, ProviderRpcError, EVENT_CHANNEL_CAPACITY};
use crate::network::chain_id_from_value;
use crate::rpc::{RpcError, RpcTransport};
use crate::utils::normalize_address;

/// JSON-RPC "method not found"
const METHOD_NOT_FOUND: i64 = -32601;

pub struct HttpEip1193Provider {
    url: String,
    rpc: Arc<dyn RpcTransport>,
    events: broadcast::Sender<ProviderEvent>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl HttpEip1193Provider {
    pub fn new(url: impl Into<String>, rpc: Arc<dyn RpcTransport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            url: url.into(),
            rpc,
            events,
            poller: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start emitting events for account/chain changes seen every `interval`.
    /// Calling it again while a poller runs has no effect.
    pub fn start_polling(&self, interval: Duration) {
        let mut poller = match self.poller.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if poller.as_ref().map_or(false, |handle| !handle.is_finished()) {
            return;
        }

        info!("Polling {} every {:?} for wallet events", self.url, interval);
        let url = self.url.clone();
        let rpc = Arc::clone(&self.rpc);
        let events = self.events.clone();
        *poller = Some(tokio::spawn(poll_loop(url, rpc, events, interval)));
    }

    pub fn stop_polling(&self) {
        let handle = match self.poller.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for HttpEip1193Provider {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

fn to_provider_error(error: RpcError) -> ProviderRpcError {
    match error {
        RpcError::Remote { code, message } => ProviderRpcError::new(code, message),
        other => ProviderRpcError::new(ProviderRpcError::DISCONNECTED, other.to_string()),
    }
}

fn accounts_from_value(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(normalize_address)
                .collect()
        })
        .unwrap_or_default()
}

async fn poll_loop(
    url: String,
    rpc: Arc<dyn RpcTransport>,
    events: broadcast::Sender<ProviderEvent>,
    interval: Duration,
) {
    let mut last_accounts: Option<Vec<String>> = None;
    let mut last_chain: Option<u64> = None;
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match rpc.call(&url, "eth_accounts", json!([])).await {
            Ok(value) => {
                let accounts = accounts_from_value(&value);
                if last_accounts.as_ref() != Some(&accounts) {
                    if last_accounts.is_some() {
                        debug!("accountsChanged: {:?}", accounts);
                        let _ = events.send(ProviderEvent::AccountsChanged(accounts.clone()));
                    }
                    last_accounts = Some(accounts);
                }
            }
            Err(e) => debug!("eth_accounts poll failed: {}", e),
        }

        match rpc.call(&url, "eth_chainId", json!([])).await {
            Ok(value) => match chain_id_from_value(&value) {
                Ok(chain_id) if last_chain != Some(chain_id) => {
                    if last_chain.is_some() {
                        debug!("chainChanged: {}", chain_id);
                        let _ = events.send(ProviderEvent::ChainChanged(format!("{:#x}", chain_id)));
                    }
                    last_chain = Some(chain_id);
                }
                Ok(_) => {}
                Err(e) => debug!("eth_chainId poll returned garbage: {}", e),
            },
            Err(e) => debug!("eth_chainId poll failed: {}", e),
        }
    }
}

#[async_trait]
impl Eip1193Provider for HttpEip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        match self.rpc.call(&self.url, method, params.clone()).await {
            // Nodes without a permission prompt only know eth_accounts
            Err(RpcError::Remote { code: METHOD_NOT_FOUND, .. }) if method == "eth_requestAccounts" => {
                debug!("eth_requestAccounts unsupported by {}, using eth_accounts", self.url);
                self.rpc
                    .call(&self.url, "eth_accounts", params)
                    .await
                    .map_err(to_provider_error)
            }
            other => other.map_err(to_provider_error),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
