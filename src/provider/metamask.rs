//! MetaMask adapter over an injected EIP-1193 provider

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{Connection, Eip1193Provider, ProviderEvent, ProviderRpcError, WalletAdapter, WalletKind};
use crate::error::{Result, WalletError};
use crate::network::{chain_id_from_value, chain_id_to_hex, NetworkRegistry};
use crate::rpc::{self, RpcTransport};
use crate::utils::{format_ether, normalize_address};

/// Where native balances are read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSource {
    /// The registry's JSON-RPC endpoint for the chain
    #[default]
    Rpc,
    /// `eth_getBalance` through the injected provider itself
    Injected,
}

/// MetaMask (or any EIP-1193 wallet) adapter
pub struct MetaMaskAdapter {
    provider: Option<Arc<dyn Eip1193Provider>>,
    registry: Arc<NetworkRegistry>,
    rpc: Arc<dyn RpcTransport>,
    balance_source: BalanceSource,
}

impl MetaMaskAdapter {
    pub fn new(
        provider: Option<Arc<dyn Eip1193Provider>>,
        registry: Arc<NetworkRegistry>,
        rpc: Arc<dyn RpcTransport>,
        balance_source: BalanceSource,
    ) -> Self {
        Self {
            provider,
            registry,
            rpc,
            balance_source,
        }
    }

    fn provider(&self) -> Result<&Arc<dyn Eip1193Provider>> {
        self.provider
            .as_ref()
            .ok_or(WalletError::ProviderUnavailable(WalletKind::MetaMask))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        debug!("MetaMask request: {}", method);
        self.provider()?
            .request(method, params)
            .await
            .map_err(WalletError::from_provider)
    }

    async fn request_switch(&self, chain_id: u64) -> std::result::Result<Value, ProviderRpcError> {
        self.provider()
            .map_err(|e| ProviderRpcError::new(ProviderRpcError::DISCONNECTED, e.to_string()))?
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": chain_id_to_hex(chain_id) }]),
            )
            .await
    }
}

#[async_trait]
impl WalletAdapter for MetaMaskAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::MetaMask
    }

    fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    async fn connect(&self) -> Result<Connection> {
        let accounts = self.request("eth_requestAccounts", json!([])).await?;
        let address = accounts
            .as_array()
            .and_then(|list| list.first())
            .and_then(Value::as_str)
            .map(normalize_address)
            .ok_or(WalletError::NoAccounts)?;

        let chain = self.request("eth_chainId", json!([])).await?;
        let chain_id = chain_id_from_value(&chain)?;

        info!("MetaMask connected {} on chain {}", address, chain_id);
        Ok(Connection {
            address,
            chain_id: Some(chain_id),
        })
    }

    async fn get_balance(&self, address: &str, chain_id: Option<u64>) -> Result<String> {
        let chain_id = chain_id.ok_or(WalletError::NotConnected)?;
        let network = self
            .registry
            .describe(chain_id)
            .ok_or(WalletError::UnsupportedNetwork(chain_id))?;

        let wei = match self.balance_source {
            BalanceSource::Rpc => {
                rpc::eth_get_balance(self.rpc.as_ref(), &network.rpc_url, address).await?
            }
            BalanceSource::Injected => {
                let result = self
                    .request("eth_getBalance", json!([address, "latest"]))
                    .await?;
                rpc::quantity_from_value(&result)?
            }
        };

        let balance = format_ether(wei);
        debug!("Balance of {} on {}: {} {}", address, network.name, balance, network.currency_symbol);
        Ok(balance)
    }

    async fn switch_network(&self, chain_id: u64) -> Result<()> {
        self.provider()?;
        let network = self
            .registry
            .describe(chain_id)
            .ok_or(WalletError::UnsupportedNetwork(chain_id))?;

        match self.request_switch(chain_id).await {
            Ok(_) => Ok(()),
            Err(e) if e.code == ProviderRpcError::UNRECOGNIZED_CHAIN => {
                info!("Chain {} unknown to wallet, requesting wallet_addEthereumChain", chain_id);
                self.provider()?
                    .request("wallet_addEthereumChain", network.add_chain_params())
                    .await
                    .map_err(|add_error| {
                        warn!("Error adding network {}: {}", chain_id, add_error);
                        if add_error.code == ProviderRpcError::USER_REJECTED {
                            WalletError::UserRejected
                        } else {
                            WalletError::UnsupportedNetwork(chain_id)
                        }
                    })?;
                self.request_switch(chain_id)
                    .await
                    .map(|_| ())
                    .map_err(WalletError::from_provider)
            }
            Err(e) => {
                warn!("Error switching network to {}: {}", chain_id, e);
                Err(WalletError::from_provider(e))
            }
        }
    }

    async fn disconnect(&self) -> Result<()> {
        // EIP-1193 has no programmatic disconnect; only local state is cleared
        debug!("MetaMask disconnect is local only");
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|provider| provider.subscribe())
    }
}
