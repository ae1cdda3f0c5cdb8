//! Wallet provider adapters
//!
//! Injected wallet objects (`window.ethereum`, `window.phantom.solana`) are
//! modelled as capability traits handed to the adapters at construction time
//! instead of ambient globals:
//! - [`Eip1193Provider`]: EIP-1193 `request` plus account/chain events
//! - [`SolanaProvider`]: Phantom-style `connect`/`disconnect` plus events
//!
//! Each wallet brand implements [`WalletAdapter`], the uniform
//! connect/balance/switch/disconnect contract the controller drives.

pub mod http;
pub mod metamask;
pub mod phantom;
pub mod walletconnect;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::network::NetworkRegistry;
use crate::rpc::RpcTransport;

pub use self::http::HttpEip1193Provider;
pub use self::metamask::{BalanceSource, MetaMaskAdapter};
pub use self::phantom::PhantomAdapter;
pub use self::walletconnect::WalletConnectAdapter;

/// Capacity of provider event channels
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Wallet brands the application can connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    MetaMask,
    Phantom,
    WalletConnect,
}

impl WalletKind {
    pub const ALL: [WalletKind; 3] = [WalletKind::MetaMask, WalletKind::Phantom, WalletKind::WalletConnect];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            WalletKind::MetaMask => "MetaMask",
            WalletKind::Phantom => "Phantom",
            WalletKind::WalletConnect => "WalletConnect",
        }
    }

    /// Download page opened when the wallet is not installed
    pub fn install_url(&self) -> &'static str {
        match self {
            WalletKind::MetaMask => "https://metamask.io/download/",
            WalletKind::Phantom => "https://phantom.app/download",
            WalletKind::WalletConnect => "https://walletconnect.com/",
        }
    }

    /// Whether the wallet speaks EIP-1193 and has EVM chain ids
    pub fn is_evm(&self) -> bool {
        matches!(self, WalletKind::MetaMask | WalletKind::WalletConnect)
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metamask" | "ethereum" => Ok(WalletKind::MetaMask),
            "phantom" | "solana" => Ok(WalletKind::Phantom),
            "walletconnect" | "wc" => Ok(WalletKind::WalletConnect),
            _ => Err(format!(
                "Unknown wallet: {}. Supported wallets: metamask, phantom, walletconnect",
                s
            )),
        }
    }
}

/// Event emitted by an injected provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `accountsChanged`; an empty list means the wallet revoked access
    AccountsChanged(Vec<String>),
    /// `chainChanged` with the chain id as the provider reports it (hex string)
    ChainChanged(String),
    /// The provider disconnected from the page
    Disconnect,
}

/// EIP-1193 `ProviderRpcError`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    /// Chain not added to the wallet (`wallet_switchEthereumChain`)
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Injected EIP-1193 provider (MetaMask's `window.ethereum`)
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// `provider.request({ method, params })`
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderRpcError>;

    /// Register for `accountsChanged`/`chainChanged`; dropping the receiver unregisters
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Injected Solana provider (Phantom's `window.phantom.solana`)
#[async_trait]
pub trait SolanaProvider: Send + Sync {
    /// Request access; resolves to the base58 public key
    async fn connect(&self) -> std::result::Result<String, ProviderRpcError>;

    async fn disconnect(&self) -> std::result::Result<(), ProviderRpcError>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Provider objects present in the execution environment
#[derive(Clone, Default)]
pub struct InjectedProviders {
    pub ethereum: Option<Arc<dyn Eip1193Provider>>,
    pub solana: Option<Arc<dyn SolanaProvider>>,
}

impl InjectedProviders {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_ethereum(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.ethereum = Some(provider);
        self
    }

    pub fn with_solana(mut self, provider: Arc<dyn SolanaProvider>) -> Self {
        self.solana = Some(provider);
        self
    }
}

/// Result of a successful `connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub address: String,
    /// EVM chain id; `None` for wallets without one (Solana)
    pub chain_id: Option<u64>,
}

/// Uniform contract over each wallet brand's native API
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn kind(&self) -> WalletKind;

    /// Whether the brand's injected object exists; absence is not an error
    fn is_available(&self) -> bool;

    /// Request account access
    async fn connect(&self) -> Result<Connection>;

    /// Native balance in whole-currency units as a decimal string
    async fn get_balance(&self, address: &str, chain_id: Option<u64>) -> Result<String>;

    /// Ask the wallet to change its active chain
    async fn switch_network(&self, chain_id: u64) -> Result<()>;

    /// Best-effort teardown of the wallet side of the session
    async fn disconnect(&self) -> Result<()>;

    /// Provider event stream for the lifetime of a connection
    fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>>;
}

/// Settings shared by the adapters built from an environment
#[derive(Clone)]
pub struct AdapterSettings {
    pub registry: Arc<NetworkRegistry>,
    pub rpc: Arc<dyn RpcTransport>,
    pub solana_rpc_url: String,
    pub balance_source: BalanceSource,
}

/// Build one adapter per wallet brand over the given environment
pub fn default_adapters(
    injected: &InjectedProviders,
    settings: &AdapterSettings,
) -> Vec<Arc<dyn WalletAdapter>> {
    vec![
        Arc::new(MetaMaskAdapter::new(
            injected.ethereum.clone(),
            Arc::clone(&settings.registry),
            Arc::clone(&settings.rpc),
            settings.balance_source,
        )),
        Arc::new(PhantomAdapter::new(
            injected.solana.clone(),
            Arc::clone(&settings.rpc),
            settings.solana_rpc_url.clone(),
        )),
        Arc::new(WalletConnectAdapter::new()),
    ]
}
