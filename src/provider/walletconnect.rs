//! WalletConnect placeholder
//!
//! There is no WalletConnect relay client; the adapter reports itself as
//! unavailable and every operation fails with `NotImplemented`, which the UI
//! shows as "coming soon" instead of a selectable option.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Connection, ProviderEvent, WalletAdapter, WalletKind};
use crate::error::{Result, WalletError};

#[derive(Debug, Default)]
pub struct WalletConnectAdapter;

impl WalletConnectAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WalletAdapter for WalletConnectAdapter {
    fn kind(&self) -> WalletKind {
        WalletKind::WalletConnect
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn connect(&self) -> Result<Connection> {
        Err(WalletError::NotImplemented(WalletKind::WalletConnect))
    }

    async fn get_balance(&self, _address: &str, _chain_id: Option<u64>) -> Result<String> {
        Err(WalletError::NotImplemented(WalletKind::WalletConnect))
    }

    async fn switch_network(&self, _chain_id: u64) -> Result<()> {
        Err(WalletError::NotImplemented(WalletKind::WalletConnect))
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_walletconnect_is_coming_soon() {
        let adapter = WalletConnectAdapter::new();
        assert!(!adapter.is_available());
        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(err, WalletError::NotImplemented(WalletKind::WalletConnect)));
        assert!(adapter.disconnect().await.is_ok());
        assert!(adapter.subscribe().is_none());
    }
}
