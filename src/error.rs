//! Error types for wallet connection operations
//!
//! Every failure an adapter or the controller can produce is a [`WalletError`].
//! The controller never lets these escape to the UI as panics: it records the
//! rendered message in the session's `error` field and hands the typed error
//! back to the caller.

use std::time::Duration;

use crate::provider::{ProviderRpcError, WalletKind};
use crate::rpc::RpcError;

/// Wallet connection errors
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("{0} is not installed!")]
    ProviderUnavailable(WalletKind),

    #[error("User rejected the request")]
    UserRejected,

    #[error("No accounts found or connected.")]
    NoAccounts,

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(u64),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Provider error: {0}")]
    Provider(ProviderRpcError),

    #[error("{0} support is coming soon")]
    NotImplemented(WalletKind),

    #[error("Wallet request timed out after {0:?}")]
    Timeout(Duration),

    #[error("No wallet connected")]
    NotConnected,

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl WalletError {
    /// Map an EIP-1193 error returned by an injected provider
    pub fn from_provider(error: ProviderRpcError) -> Self {
        if error.code == ProviderRpcError::USER_REJECTED {
            WalletError::UserRejected
        } else {
            WalletError::Provider(error)
        }
    }
}

pub type Result<T, E = WalletError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_rejection_maps_to_user_rejected() {
        let err = WalletError::from_provider(ProviderRpcError::new(4001, "User denied account access"));
        assert!(matches!(err, WalletError::UserRejected));
    }

    #[test]
    fn test_other_provider_codes_are_kept() {
        let err = WalletError::from_provider(ProviderRpcError::new(-32603, "internal"));
        match err {
            WalletError::Provider(inner) => assert_eq!(inner.code, -32603),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            WalletError::ProviderUnavailable(WalletKind::MetaMask).to_string(),
            "MetaMask is not installed!"
        );
        assert_eq!(WalletError::UnsupportedNetwork(999).to_string(), "Unsupported network: 999");
        assert_eq!(
            WalletError::NotImplemented(WalletKind::WalletConnect).to_string(),
            "WalletConnect support is coming soon"
        );
    }
}
