//! Walletlink - multi-wallet connection layer
//!
//! Connects a user's browser-style wallet (MetaMask over EIP-1193, Phantom
//! over its Solana provider) to an application session:
//! - [`network`]: the registry of supported EVM networks
//! - [`provider`]: per-brand adapters over injected provider objects
//! - [`session`]: connection state and session-scoped persistence
//! - [`controller`]: the state machine driving adapters and provider events
//! - [`ui`]: the wallet button view model

pub mod config;
pub mod controller;
pub mod error;
pub mod network;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod ui;
pub mod utils;

pub use controller::{ConnectionPhase, WalletController};
pub use error::{Result, WalletError};
pub use network::{NetworkDescriptor, NetworkRegistry};
pub use provider::{WalletAdapter, WalletKind};
pub use rpc::RpcClient;
pub use session::{WalletSession, WalletSessionState};

#[cfg(test)]
pub mod tests;
