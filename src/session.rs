//! Wallet session state and session-scoped persistence
//!
//! [`WalletSessionState`] is the snapshot the UI renders from. The
//! [`WalletSession`] wrapper owns it together with the storage used to
//! remember the connected address and chain across reloads. Only the address,
//! chain id and wallet type are persisted; balances are always re-fetched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;

use crate::error::{Result, WalletError};
use crate::provider::WalletKind;

/// Storage key holding the persisted connection
pub const SESSION_KEY: &str = "connectedWallet";

/// Current wallet connection state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSessionState {
    /// Connected address (lowercase hex or base58)
    pub address: Option<String>,
    /// EVM chain id reported by the wallet
    pub chain_id: Option<u64>,
    /// Registry name of the chain, or "Unsupported Network"
    pub network_name: Option<String>,
    /// Native balance in whole-currency units
    pub balance: Option<String>,
    /// Active wallet, `None` when disconnected
    pub wallet_type: Option<WalletKind>,
    pub is_connected: bool,
    pub is_loading: bool,
    /// Last failure, advisory only
    pub error: Option<String>,
}

impl WalletSessionState {
    /// Empty state carrying only an error message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// What survives a reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub address: String,
    pub chain_id: Option<u64>,
    pub wallet_type: WalletKind,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Trait for session-scoped key/value storage (`sessionStorage`)
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Get the storage type identifier
    fn storage_type(&self) -> &'static str;
}

/// In-memory storage, lost with the process
#[derive(Clone, Default)]
pub struct MemorySessionStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all items (useful for testing)
    pub fn items(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn storage_type(&self) -> &'static str {
        "memory"
    }
}

/// JSON object file holding all items; used by the CLI between invocations
#[derive(Clone, Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                WalletError::Storage(format!("failed to parse {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(WalletError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn store(&self, items: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WalletError::Storage(format!("failed to create {}: {}", parent.display(), e)))?;
        }
        let data = serde_json::to_string_pretty(items)
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        fs::write(&self.path, data)
            .await
            .map_err(|e| WalletError::Storage(format!("failed to write {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking every write
        let mut items = self.load().await.unwrap_or_default();
        items.insert(key.to_string(), value.to_string());
        self.store(&items).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut items = self.load().await.unwrap_or_default();
        items.remove(key);
        self.store(&items).await
    }

    fn storage_type(&self) -> &'static str {
        "file"
    }
}

/// Session state plus its storage
pub struct WalletSession {
    state: WalletSessionState,
    storage: Arc<dyn SessionStorage>,
}

impl WalletSession {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: WalletSessionState::default(),
            storage,
        }
    }

    pub fn state(&self) -> &WalletSessionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut WalletSessionState {
        &mut self.state
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> WalletSessionState {
        self.state.clone()
    }

    /// Back to the empty initial state (storage untouched)
    pub(crate) fn reset(&mut self) {
        self.state = WalletSessionState::default();
    }

    /// Save `{address, chainId, walletType}`; failures are logged, never fatal
    pub async fn persist(&self) {
        let (Some(address), Some(wallet_type)) = (&self.state.address, self.state.wallet_type) else {
            return;
        };
        let record = PersistedSession {
            address: address.clone(),
            chain_id: self.state.chain_id,
            wallet_type,
            saved_at: Some(Utc::now()),
        };
        let result = match serde_json::to_string(&record) {
            Ok(json) => self.storage.set_item(SESSION_KEY, &json).await,
            Err(e) => Err(WalletError::Storage(e.to_string())),
        };
        match result {
            Ok(()) => debug!("Persisted session to {} storage", self.storage.storage_type()),
            Err(e) => warn!("Failed to persist wallet session: {}", e),
        }
    }

    /// Load the persisted connection; unparseable entries are removed
    pub async fn load_persisted(&self) -> Option<PersistedSession> {
        let raw = match self.storage.get_item(SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read saved wallet: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to parse saved wallet: {}", e);
                self.clear_persisted().await;
                None
            }
        }
    }

    pub async fn clear_persisted(&self) {
        if let Err(e) = self.storage.remove_item(SESSION_KEY).await {
            warn!("Failed to clear saved wallet: {}", e);
        }
    }
}
