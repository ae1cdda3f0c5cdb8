//! Configuration file for the walletlink CLI
//!
//! A JSON file, every field optional:
//!
//! ```json
//! {
//!   "networks": [{ "chainId": 11155111, "name": "Sepolia", "rpcUrl": "...",
//!                  "currencySymbol": "ETH", "blockExplorerUrl": "https://sepolia.etherscan.io" }],
//!   "rpcOverrides": { "1": "https://eth.llamarpc.com" },
//!   "balanceSource": "rpc",
//!   "connectTimeoutSecs": 120
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::network::{NetworkDescriptor, NetworkRegistry};
use crate::provider::phantom::SOLANA_MAINNET_RPC;
use crate::provider::BalanceSource;

const APP_DIR: &str = "walletlink";
const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";

/// Smallest allowed event poll interval
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConfig {
    /// Networks added to (or replacing) the built-in ones
    pub networks: Vec<NetworkDescriptor>,
    /// RPC URL per chain id for built-in networks
    pub rpc_overrides: BTreeMap<u64, String>,
    pub solana_rpc_url: String,
    pub balance_source: BalanceSource,
    /// EVM node acting as the injected wallet
    pub provider_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub rpc_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            rpc_overrides: BTreeMap::new(),
            solana_rpc_url: SOLANA_MAINNET_RPC.to_string(),
            balance_source: BalanceSource::default(),
            provider_url: None,
            session_file: None,
            connect_timeout_secs: 120,
            rpc_timeout_secs: 30,
            poll_interval_ms: 1000,
        }
    }
}

impl WalletConfig {
    /// Read a config file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn registry(&self) -> NetworkRegistry {
        NetworkRegistry::with_overrides(self.networks.iter().cloned(), &self.rpc_overrides)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    /// Session file from the config, or the per-user default
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(default_session_path)
    }
}

/// `~/.config/walletlink/config.json` (platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Session-scoped file: the runtime dir when available, else the temp dir
pub fn default_session_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(SESSION_FILE)
}
