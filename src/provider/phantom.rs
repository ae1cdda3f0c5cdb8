//! Phantom adapter over an injected Solana provider

use alloy_primitives::U256;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{Connection, ProviderEvent, SolanaProvider, WalletAdapter, WalletKind};
use crate::error::{Result, WalletError};
use crate::rpc::{self, RpcTransport};
use crate::utils::{format_units, is_solana_address, SOLANA_DECIMALS};

/// Default Solana JSON-RPC endpoint
pub const SOLANA_MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";

pub struct PhantomAdapter {
    provider: Option<Arc<dyn SolanaProvider>>,
    rpc: Arc<dyn RpcTransport>,
    rpc_url: String,
}

impl PhantomAdapter {
    pub fn new(provider: Option<Arc<dyn SolanaProvider>>, rpc: Arc<dyn RpcTransport>, rpc_url: String) -> Self {
        Self { provider, rpc, rpc_url }
    }

    fn provider(&self) -> Result<&Arc<dyn SolanaProvider>> {
        self.provider
            .as_ref()
            .ok_or(WalletError::ProviderUnavailable(WalletKind::Phantom))
    }
}

#[async_trait]
impl WalletAdapter for PhantomAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::Phantom
    }

    fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    async fn connect(&self) -> Result<Connection> {
        let public_key = self
            .provider()?
            .connect()
            .await
            .map_err(WalletError::from_provider)?;
        let public_key = public_key.trim().to_string();
        if public_key.is_empty() {
            return Err(WalletError::NoAccounts);
        }
        if !is_solana_address(&public_key) {
            warn!("Phantom returned an unexpected public key format: {}", public_key);
        }

        info!("Phantom connected {}", public_key);
        Ok(Connection {
            address: public_key,
            chain_id: None,
        })
    }

    async fn get_balance(&self, address: &str, _chain_id: Option<u64>) -> Result<String> {
        let lamports = rpc::sol_get_balance(self.rpc.as_ref(), &self.rpc_url, address).await?;
        let balance = format_units(U256::from(lamports), SOLANA_DECIMALS);
        debug!("Balance of {}: {} SOL", address, balance);
        Ok(balance)
    }

    async fn switch_network(&self, chain_id: u64) -> Result<()> {
        // Phantom's Solana provider has no EVM chains to switch between
        Err(WalletError::UnsupportedNetwork(chain_id))
    }

    async fn disconnect(&self) -> Result<()> {
        self.provider()?
            .disconnect()
            .await
            .map_err(WalletError::from_provider)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|provider| provider.subscribe())
    }
}
