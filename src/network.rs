//! Network registry for supported EVM chains
//!
//! This module provides the static table of networks the application accepts
//! a wallet connection on. A chain reported by a provider that is not in the
//! registry is still a valid connection, it is just shown as unsupported until
//! the user switches.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::{Result, WalletError};

/// Display name used for chains missing from the registry
pub const UNSUPPORTED_NETWORK_NAME: &str = "Unsupported Network";

/// Decimals of the native currency on every registered EVM chain
pub const NATIVE_DECIMALS: u8 = 18;

/// Metadata for one supported network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    /// Numeric EVM chain id (1 = Ethereum mainnet)
    pub chain_id: u64,
    /// Human readable name
    pub name: String,
    /// JSON-RPC endpoint used for balance queries
    pub rpc_url: String,
    /// Native currency symbol (ETH, MATIC, ...)
    pub currency_symbol: String,
    /// Block explorer base URL without trailing slash
    pub block_explorer_url: String,
}

impl NetworkDescriptor {
    /// Ethereum mainnet
    pub fn ethereum() -> Self {
        Self {
            chain_id: 1,
            name: String::from("Ethereum Mainnet"),
            rpc_url: String::from("https://mainnet.infura.io/v3/YOUR_INFURA_PROJECT_ID"),
            currency_symbol: String::from("ETH"),
            block_explorer_url: String::from("https://etherscan.io"),
        }
    }

    /// Polygon PoS mainnet
    pub fn polygon() -> Self {
        Self {
            chain_id: 137,
            name: String::from("Polygon Mainnet"),
            rpc_url: String::from("https://polygon-rpc.com"),
            currency_symbol: String::from("MATIC"),
            block_explorer_url: String::from("https://polygonscan.com"),
        }
    }

    /// BNB smart chain mainnet
    pub fn bsc() -> Self {
        Self {
            chain_id: 56,
            name: String::from("Binance Smart Chain Mainnet"),
            rpc_url: String::from("https://bsc-dataseed.binance.org"),
            currency_symbol: String::from("BNB"),
            block_explorer_url: String::from("https://bscscan.com"),
        }
    }

    /// Explorer page for an address on this network
    pub fn explorer_address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.block_explorer_url.trim_end_matches('/'), address)
    }

    /// Parameters for an EIP-3085 `wallet_addEthereumChain` request
    pub fn add_chain_params(&self) -> Value {
        json!([{
            "chainId": chain_id_to_hex(self.chain_id),
            "chainName": self.name,
            "rpcUrls": [self.rpc_url],
            "nativeCurrency": {
                "name": self.currency_symbol,
                "symbol": self.currency_symbol,
                "decimals": NATIVE_DECIMALS,
            },
            "blockExplorerUrls": [self.block_explorer_url],
        }])
    }
}

/// Immutable chain id → network table
#[derive(Clone, Debug)]
pub struct NetworkRegistry {
    networks: BTreeMap<u64, NetworkDescriptor>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new(vec![
            NetworkDescriptor::ethereum(),
            NetworkDescriptor::polygon(),
            NetworkDescriptor::bsc(),
        ])
    }
}

impl NetworkRegistry {
    /// Build a registry; a later descriptor for the same chain id replaces an earlier one
    pub fn new(descriptors: impl IntoIterator<Item = NetworkDescriptor>) -> Self {
        let networks = descriptors
            .into_iter()
            .map(|descriptor| (descriptor.chain_id, descriptor))
            .collect();
        Self { networks }
    }

    /// Registry with the default networks plus `extra` entries and RPC URL overrides
    pub fn with_overrides(
        extra: impl IntoIterator<Item = NetworkDescriptor>,
        rpc_overrides: &BTreeMap<u64, String>,
    ) -> Self {
        let mut registry = Self::default();
        for descriptor in extra {
            registry.networks.insert(descriptor.chain_id, descriptor);
        }
        for (chain_id, url) in rpc_overrides {
            if let Some(descriptor) = registry.networks.get_mut(chain_id) {
                descriptor.rpc_url = url.clone();
            } else {
                log::warn!("Ignoring RPC override for unknown chain {}", chain_id);
            }
        }
        registry
    }

    /// Look up a network by chain id
    pub fn describe(&self, chain_id: u64) -> Option<&NetworkDescriptor> {
        self.networks.get(&chain_id)
    }

    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.networks.contains_key(&chain_id)
    }

    /// Network name, or [`UNSUPPORTED_NETWORK_NAME`]
    pub fn name_of(&self, chain_id: u64) -> String {
        self.describe(chain_id)
            .map(|network| network.name.clone())
            .unwrap_or_else(|| UNSUPPORTED_NETWORK_NAME.to_string())
    }

    /// All networks ordered by chain id
    pub fn networks(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Explorer URL for `address` on `chain_id`, if the chain is registered
    pub fn explorer_address_url(&self, chain_id: u64, address: &str) -> Option<String> {
        self.describe(chain_id)
            .map(|network| network.explorer_address_url(address))
    }
}

/// Format a chain id the way EIP-1193 providers expect (`137` → `"0x89"`)
pub fn chain_id_to_hex(chain_id: u64) -> String {
    format!("{:#x}", chain_id)
}

/// Parse a chain id given as `0x`-prefixed hex or decimal
pub fn parse_chain_id(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex_digits) => u64::from_str_radix(hex_digits, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| WalletError::InvalidChainId(value.to_string()))
}

/// Parse a chain id from a provider JSON value (hex string or number)
pub fn chain_id_from_value(value: &Value) -> Result<u64> {
    match value {
        Value::String(s) => parse_chain_id(s),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| WalletError::InvalidChainId(n.to_string())),
        other => Err(WalletError::InvalidChainId(other.to_string())),
    }
}
