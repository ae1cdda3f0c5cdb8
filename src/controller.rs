//! Wallet connection controller
//!
//! The controller is the single writer of the [`WalletSessionState`]. It
//! drives the adapters for user actions (connect, disconnect, switch network)
//! and applies provider events (account and chain changes) delivered over the
//! subscription it holds for the lifetime of a connection.
//!
//! Every failure is recorded in the session's `error` field and also returned
//! to the caller; nothing here panics or leaves the session half-updated.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::error::{Result, WalletError};
use crate::network::{parse_chain_id, NetworkRegistry};
use crate::provider::{ProviderEvent, WalletAdapter, WalletKind};
use crate::session::{SessionStorage, WalletSession, WalletSessionState};
use crate::utils::normalize_address;

/// Default bound on wallet prompts (connect, switch network)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Network name shown for wallets without EVM chain ids
pub const SOLANA_NETWORK_NAME: &str = "Solana";

/// High-level connection phase derived from the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected { supported: bool },
    Error,
}

/// The adapter and event subscription of the current connection
struct ActiveConnection {
    adapter: Arc<dyn WalletAdapter>,
    events: Option<broadcast::Receiver<ProviderEvent>>,
}

impl ActiveConnection {
    fn new(adapter: Arc<dyn WalletAdapter>) -> Self {
        Self { adapter, events: None }
    }

    /// Register provider listeners once per connection
    fn ensure_subscribed(&mut self) {
        if self.events.is_none() {
            self.events = self.adapter.subscribe();
            if self.events.is_some() {
                debug!("Subscribed to {} provider events", self.adapter.kind());
            }
        }
    }
}

pub struct WalletController {
    registry: Arc<NetworkRegistry>,
    adapters: BTreeMap<WalletKind, Arc<dyn WalletAdapter>>,
    session: WalletSession,
    active: Option<ActiveConnection>,
    request_timeout: Duration,
}

impl WalletController {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        adapters: Vec<Arc<dyn WalletAdapter>>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.kind(), adapter))
            .collect();
        Self {
            registry,
            adapters,
            session: WalletSession::new(storage),
            active: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> WalletSessionState {
        self.session.snapshot()
    }

    pub fn state(&self) -> &WalletSessionState {
        self.session.state()
    }

    /// Wallets and whether their provider is present
    pub fn availability(&self) -> Vec<(WalletKind, bool)> {
        WalletKind::ALL
            .iter()
            .map(|kind| {
                let available = self.adapters.get(kind).map_or(false, |a| a.is_available());
                (*kind, available)
            })
            .collect()
    }

    pub fn phase(&self) -> ConnectionPhase {
        let state = self.session.state();
        if state.is_loading {
            ConnectionPhase::Connecting
        } else if state.is_connected {
            ConnectionPhase::Connected {
                supported: self.chain_supported(),
            }
        } else if state.error.is_some() {
            ConnectionPhase::Error
        } else {
            ConnectionPhase::Disconnected
        }
    }

    fn chain_supported(&self) -> bool {
        let state = self.session.state();
        match (state.wallet_type, state.chain_id) {
            (Some(kind), _) if !kind.is_evm() => true,
            (_, Some(chain_id)) => self.registry.is_supported(chain_id),
            _ => false,
        }
    }

    fn adapter(&self, kind: WalletKind) -> Result<Arc<dyn WalletAdapter>> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or(WalletError::ProviderUnavailable(kind))
    }

    async fn bounded<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(WalletError::Timeout(self.request_timeout)),
        }
    }

    /// Connect `kind`. On failure the session is reset and only the error kept.
    pub async fn connect(&mut self, kind: WalletKind) -> Result<()> {
        if let Some(current) = self.session.state().wallet_type {
            if current != kind {
                info!("Switching wallet from {} to {}", current, kind);
                self.teardown().await;
                self.session.reset();
            }
        }

        {
            let state = self.session.state_mut();
            state.error = None;
            state.is_loading = true;
        }
        info!("Connecting {}", kind);

        let outcome = match self.adapter(kind) {
            Ok(adapter) => {
                let result = self.bounded(adapter.connect()).await;
                result.map(|connection| (adapter, connection))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((adapter, connection)) => {
                {
                    let state = self.session.state_mut();
                    state.address = Some(normalize_address(&connection.address));
                    state.chain_id = connection.chain_id;
                    state.wallet_type = Some(kind);
                    state.is_connected = true;
                    state.is_loading = false;
                    state.balance = None;
                }
                let mut active = ActiveConnection::new(adapter);
                active.ensure_subscribed();
                self.active = Some(active);
                self.session.persist().await;
                self.sync_chain().await;
                Ok(())
            }
            Err(e) => {
                warn!("Wallet connection error: {}", e);
                self.active = None;
                *self.session.state_mut() = WalletSessionState::failed(e.to_string());
                self.session.clear_persisted().await;
                Err(e)
            }
        }
    }

    /// Clear local state and storage; Solana wallets are also told to disconnect
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session.state_mut().error = None;
        self.teardown().await;
        self.session.reset();
        self.session.clear_persisted().await;
        info!("Wallet disconnected");
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            // Dropping the receiver unregisters the listeners
            drop(active.events);
            if let Err(e) = active.adapter.disconnect().await {
                warn!("{} disconnect failed: {}", active.adapter.kind(), e);
            }
        }
    }

    /// Ask the wallet to switch chains; the address is never touched
    pub async fn switch_network(&mut self, chain_id: u64) -> Result<()> {
        self.session.state_mut().error = None;
        let adapter = match self.active.as_ref() {
            Some(active) if self.session.state().is_connected => Arc::clone(&active.adapter),
            _ => {
                let err = WalletError::NotConnected;
                self.session.state_mut().error = Some(format!("Failed to switch network: {}", err));
                return Err(err);
            }
        };

        self.session.state_mut().is_loading = true;
        info!("Switching {} to chain {}", adapter.kind(), chain_id);
        let result = self.bounded(adapter.switch_network(chain_id)).await;
        self.session.state_mut().is_loading = false;

        match result {
            Ok(()) => {
                self.apply_chain(chain_id).await;
                Ok(())
            }
            Err(e) => {
                warn!("Error switching network: {}", e);
                self.session.state_mut().error = Some(format!("Failed to switch network: {}", e));
                Err(e)
            }
        }
    }

    /// Re-query the balance for the current address and chain
    pub async fn refresh_balance(&mut self) -> Result<()> {
        let (address, chain_id) = {
            let state = self.session.state();
            match &state.address {
                Some(address) => (address.clone(), state.chain_id),
                None => return Err(WalletError::NotConnected),
            }
        };
        let adapter = match self.active.as_ref() {
            Some(active) => Arc::clone(&active.adapter),
            None => return Err(WalletError::NotConnected),
        };

        match adapter.get_balance(&address, chain_id).await {
            Ok(balance) => {
                self.session.state_mut().balance = Some(balance);
                Ok(())
            }
            Err(e) => {
                warn!("Error fetching balance: {}", e);
                self.session.state_mut().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Set network name, warning and balance for the current chain
    async fn sync_chain(&mut self) {
        let (kind, chain_id) = {
            let state = self.session.state();
            (state.wallet_type, state.chain_id)
        };

        match (kind, chain_id) {
            (Some(kind), _) if !kind.is_evm() => {
                self.session.state_mut().network_name = Some(SOLANA_NETWORK_NAME.to_string());
                let _ = self.refresh_balance().await;
            }
            (_, Some(chain_id)) => {
                if let Some(network) = self.registry.describe(chain_id) {
                    self.session.state_mut().network_name = Some(network.name.clone());
                    let _ = self.refresh_balance().await;
                } else {
                    warn!("Connected on unsupported chain {}", chain_id);
                    let state = self.session.state_mut();
                    state.network_name = Some(self.registry.name_of(chain_id));
                    state.balance = None;
                    state.error = Some(WalletError::UnsupportedNetwork(chain_id).to_string());
                }
            }
            _ => {
                self.session.state_mut().network_name = None;
            }
        }
    }

    async fn apply_chain(&mut self, chain_id: u64) {
        {
            let state = self.session.state_mut();
            state.chain_id = Some(chain_id);
            state.balance = None;
            state.error = None;
        }
        self.session.persist().await;
        self.sync_chain().await;
    }

    /// Rehydrate from storage. Returns whether a connection was restored.
    pub async fn restore(&mut self) -> Result<bool> {
        let Some(record) = self.session.load_persisted().await else {
            return Ok(false);
        };

        let adapter = match self.adapter(record.wallet_type) {
            Ok(adapter) if adapter.is_available() => adapter,
            _ => {
                info!("Saved {} session dropped: provider not available", record.wallet_type);
                self.session.clear_persisted().await;
                return Ok(false);
            }
        };

        info!("Restoring {} session for {}", record.wallet_type, record.address);
        {
            let state = self.session.state_mut();
            state.address = Some(normalize_address(&record.address));
            state.chain_id = record.chain_id;
            state.wallet_type = Some(record.wallet_type);
            state.is_connected = true;
            state.is_loading = false;
            state.balance = None;
            state.error = None;
        }
        let mut active = ActiveConnection::new(adapter);
        active.ensure_subscribed();
        self.active = Some(active);
        self.sync_chain().await;
        Ok(true)
    }

    /// Apply one provider event
    pub async fn handle_event(&mut self, event: ProviderEvent) {
        let state = self.session.state();
        if state.is_loading {
            debug!("Ignoring {:?} while a request is in flight", event);
            return;
        }
        if !state.is_connected {
            debug!("Ignoring {:?} while disconnected", event);
            return;
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("Wallet revoked account access");
                    self.teardown_local();
                    self.session.reset();
                    self.session.clear_persisted().await;
                }
                Some(account) => {
                    let address = normalize_address(account);
                    if self.session.state().address.as_deref() == Some(address.as_str()) {
                        return;
                    }
                    info!("Account changed to {}", address);
                    let supported = self.chain_supported();
                    {
                        let state = self.session.state_mut();
                        state.address = Some(address);
                        state.balance = None;
                        // The unsupported-network warning outlives account changes
                        if supported {
                            state.error = None;
                        }
                    }
                    self.session.persist().await;
                    if supported {
                        let _ = self.refresh_balance().await;
                    }
                }
            },
            ProviderEvent::ChainChanged(raw) => match parse_chain_id(&raw) {
                Ok(chain_id) => {
                    if self.session.state().chain_id == Some(chain_id) {
                        return;
                    }
                    info!("Chain changed to {}", chain_id);
                    self.apply_chain(chain_id).await;
                }
                Err(e) => warn!("Ignoring chainChanged event: {}", e),
            },
            ProviderEvent::Disconnect => {
                info!("Provider disconnected");
                self.teardown_local();
                self.session.reset();
                self.session.clear_persisted().await;
            }
        }
    }

    /// Drop the connection without calling into the wallet
    fn teardown_local(&mut self) {
        self.active = None;
    }

    /// Apply every event already queued; returns how many were handled
    pub async fn process_pending_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.active.as_mut().and_then(|a| a.events.as_mut()) {
                Some(events) => events.try_recv(),
                None => return handled,
            };
            match next {
                Ok(event) => {
                    self.handle_event(event).await;
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Missed {} provider events", skipped);
                }
                Err(TryRecvError::Empty) => return handled,
                Err(TryRecvError::Closed) => {
                    debug!("Provider event channel closed");
                    if let Some(active) = self.active.as_mut() {
                        active.events = None;
                    }
                    return handled;
                }
            }
        }
    }

    /// Wait for the next provider event; `None` when there is no subscription
    pub async fn next_event(&mut self) -> Option<ProviderEvent> {
        loop {
            let events = self.active.as_mut()?.events.as_mut()?;
            match events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} provider events", skipped),
                Err(RecvError::Closed) => {
                    if let Some(active) = self.active.as_mut() {
                        active.events = None;
                    }
                    return None;
                }
            }
        }
    }
}
