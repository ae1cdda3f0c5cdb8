//! Test utilities and fake wallet environments
//!
//! This module provides:
//! - Fake injected providers (EIP-1193 and Phantom-style Solana)
//! - A counting in-memory RPC transport
//! - A mock JSON-RPC node for end-to-end tests over HTTP

pub mod mock_node;


use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::controller::WalletController;
use crate::network::{parse_chain_id, NetworkRegistry};
use crate::provider::{
    default_adapters, AdapterSettings, BalanceSource, Eip1193Provider, InjectedProviders,
    ProviderEvent, ProviderRpcError, SolanaProvider, EVENT_CHANNEL_CAPACITY,
};
use crate::rpc::{RpcError, RpcTransport};
use crate::session::MemorySessionStorage;

pub const ALICE: &str = "0x1234567890abcdef1234567890abcdef12345678";
pub const BOB: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
pub const SOL_PUBKEY: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
pub const SOLANA_TEST_RPC: &str = "http://solana.test";

/// 1.5 in 18-decimal units
pub const ONE_AND_A_HALF: u128 = 1_500_000_000_000_000_000;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Scriptable stand-in for `window.ethereum`
pub struct FakeEthereum {
    accounts: Mutex<Vec<String>>,
    chain_id: Mutex<u64>,
    known_chains: Mutex<BTreeSet<u64>>,
    balance: Mutex<u128>,
    requests: Mutex<Vec<String>>,
    events: broadcast::Sender<ProviderEvent>,
    pub reject_connect: AtomicBool,
    pub reject_switch: AtomicBool,
    pub reject_add: AtomicBool,
    pub hang_connect: AtomicBool,
    /// Emitted while `eth_requestAccounts` is being answered
    pub event_during_connect: Mutex<Option<ProviderEvent>>,
}

impl FakeEthereum {
    pub fn new(accounts: &[&str], chain_id: u64) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            accounts: Mutex::new(accounts.iter().map(|a| a.to_string()).collect()),
            chain_id: Mutex::new(chain_id),
            known_chains: Mutex::new([1, 137, chain_id].into_iter().collect()),
            balance: Mutex::new(ONE_AND_A_HALF),
            requests: Mutex::new(Vec::new()),
            events,
            reject_connect: AtomicBool::new(false),
            reject_switch: AtomicBool::new(false),
            reject_add: AtomicBool::new(false),
            hang_connect: AtomicBool::new(false),
            event_during_connect: Mutex::new(None),
        })
    }

    /// Methods requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub fn chain_id(&self) -> u64 {
        *lock(&self.chain_id)
    }

    pub fn forget_chain(&self, chain_id: u64) {
        lock(&self.known_chains).remove(&chain_id);
    }

    pub fn set_balance(&self, wei: u128) {
        *lock(&self.balance) = wei;
    }

    /// Fire a provider event as the wallet UI would
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl Eip1193Provider for FakeEthereum {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        lock(&self.requests).push(method.to_string());
        match method {
            "eth_requestAccounts" => {
                if self.hang_connect.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                if self.reject_connect.load(Ordering::SeqCst) {
                    return Err(ProviderRpcError::new(
                        ProviderRpcError::USER_REJECTED,
                        "User rejected the request.",
                    ));
                }
                if let Some(event) = lock(&self.event_during_connect).take() {
                    self.emit(event);
                }
                Ok(json!(*lock(&self.accounts)))
            }
            "eth_accounts" => Ok(json!(*lock(&self.accounts))),
            "eth_chainId" => Ok(json!(format!("{:#x}", self.chain_id()))),
            "eth_getBalance" => Ok(json!(format!("{:#x}", *lock(&self.balance)))),
            "wallet_switchEthereumChain" => {
                if self.reject_switch.load(Ordering::SeqCst) {
                    return Err(ProviderRpcError::new(
                        ProviderRpcError::USER_REJECTED,
                        "User rejected the request.",
                    ));
                }
                let requested = params[0]["chainId"]
                    .as_str()
                    .and_then(|hex| parse_chain_id(hex).ok())
                    .ok_or_else(|| ProviderRpcError::new(-32602, "Invalid params"))?;
                if !lock(&self.known_chains).contains(&requested) {
                    return Err(ProviderRpcError::new(
                        ProviderRpcError::UNRECOGNIZED_CHAIN,
                        "Unrecognized chain ID",
                    ));
                }
                *lock(&self.chain_id) = requested;
                self.emit(ProviderEvent::ChainChanged(format!("{:#x}", requested)));
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                if self.reject_add.load(Ordering::SeqCst) {
                    return Err(ProviderRpcError::new(
                        ProviderRpcError::USER_REJECTED,
                        "User rejected the request.",
                    ));
                }
                let added = params[0]["chainId"]
                    .as_str()
                    .and_then(|hex| parse_chain_id(hex).ok())
                    .ok_or_else(|| ProviderRpcError::new(-32602, "Invalid params"))?;
                lock(&self.known_chains).insert(added);
                Ok(Value::Null)
            }
            other => Err(ProviderRpcError::new(
                ProviderRpcError::UNSUPPORTED_METHOD,
                format!("Unsupported method: {}", other),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Stand-in for `window.phantom.solana`
pub struct FakeSolana {
    public_key: String,
    events: broadcast::Sender<ProviderEvent>,
    pub reject_connect: AtomicBool,
    pub disconnects: AtomicUsize,
}

impl FakeSolana {
    pub fn new(public_key: &str) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            public_key: public_key.to_string(),
            events,
            reject_connect: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SolanaProvider for FakeSolana {
    async fn connect(&self) -> Result<String, ProviderRpcError> {
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(ProviderRpcError::new(
                ProviderRpcError::USER_REJECTED,
                "User rejected the request.",
            ));
        }
        Ok(self.public_key.clone())
    }

    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// In-memory RPC transport recording every call
#[derive(Default)]
pub struct FakeRpc {
    calls: Mutex<Vec<(String, String)>>,
    pub wei: Mutex<U256>,
    pub lamports: Mutex<u64>,
    pub fail: AtomicBool,
}

impl FakeRpc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            wei: Mutex::new(U256::from(ONE_AND_A_HALF)),
            lamports: Mutex::new(2_500_000_000),
            ..Self::default()
        })
    }

    /// `(url, method)` pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    pub fn balance_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(_, method)| method == "eth_getBalance" || method == "getBalance")
            .count()
    }
}

#[async_trait]
impl RpcTransport for FakeRpc {
    async fn call(&self, url: &str, method: &str, _params: Value) -> Result<Value, RpcError> {
        lock(&self.calls).push((url.to_string(), method.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(RpcError::ConnectionFailed("connection refused".to_string()));
        }
        match method {
            "eth_getBalance" => Ok(json!(format!("0x{:x}", *lock(&self.wei)))),
            "getBalance" => Ok(json!({ "context": { "slot": 1 }, "value": *lock(&self.lamports) })),
            other => Err(RpcError::Remote {
                code: -32601,
                message: format!("the method {} does not exist", other),
            }),
        }
    }
}

/// A controller over the given fakes with in-memory storage
pub struct Harness {
    pub controller: WalletController,
    pub rpc: Arc<FakeRpc>,
    pub storage: MemorySessionStorage,
}

impl Harness {
    pub fn new(ethereum: Option<Arc<FakeEthereum>>, solana: Option<Arc<FakeSolana>>) -> Self {
        Self::with_storage(ethereum, solana, MemorySessionStorage::new())
    }

    pub fn with_storage(
        ethereum: Option<Arc<FakeEthereum>>,
        solana: Option<Arc<FakeSolana>>,
        storage: MemorySessionStorage,
    ) -> Self {
        let mut injected = InjectedProviders::none();
        if let Some(provider) = ethereum {
            injected = injected.with_ethereum(provider);
        }
        if let Some(provider) = solana {
            injected = injected.with_solana(provider);
        }

        let rpc = FakeRpc::new();
        let registry = Arc::new(NetworkRegistry::default());
        let settings = AdapterSettings {
            registry: registry.clone(),
            rpc: rpc.clone(),
            solana_rpc_url: SOLANA_TEST_RPC.to_string(),
            balance_source: BalanceSource::Rpc,
        };
        let controller = WalletController::new(
            registry,
            default_adapters(&injected, &settings),
            Arc::new(storage.clone()),
        );
        Self {
            controller,
            rpc,
            storage,
        }
    }
}
