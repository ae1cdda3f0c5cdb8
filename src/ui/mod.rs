//! Wallet button view model
//!
//! [`WalletButton`] owns only transient UI toggles (connect modal, account
//! menu, "copied" flag). Everything else is rendered from the controller's
//! session snapshot. Side effects the host must perform (clipboard writes,
//! opening tabs) are returned as [`UiEffect`] values instead of executed.

use log::debug;
use std::fmt;
use std::time::{Duration, Instant};

use crate::controller::WalletController;
use crate::error::WalletError;
use crate::provider::WalletKind;
use crate::utils::{shorten_address, to_checksum_address};

/// How long the "Copied!" feedback stays visible
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

/// Hex digits kept on each side of a shortened address
const ADDRESS_CHARS: usize = 4;

/// Fractional digits shown for balances
const BALANCE_PRECISION: usize = 4;

const UNSUPPORTED_WARNING: &str = "Unsupported network. Please switch to a supported network.";

/// User interactions with the button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    OpenConnectModal,
    CloseConnectModal,
    SelectWallet(WalletKind),
    ToggleAccountMenu,
    CopyAddress,
    ViewOnExplorer,
    SwitchNetwork(u64),
    Disconnect,
}

/// Side effect for the host environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    WriteClipboard(String),
    OpenTab(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletOption {
    pub kind: WalletKind,
    pub available: bool,
    pub coming_soon: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOption {
    pub chain_id: u64,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMenu {
    /// EIP-55 form for hex addresses
    pub address: String,
    /// Balance with its currency symbol, e.g. `1.5000 MATIC`
    pub balance: Option<String>,
    pub wallet_name: String,
    pub network_name: Option<String>,
    /// Switch targets; only offered for MetaMask
    pub networks: Vec<NetworkOption>,
    pub explorer_url: Option<String>,
    pub copied: bool,
}

/// Everything needed to draw the button in its current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub label: String,
    pub disabled: bool,
    pub connected: bool,
    /// Wallet choices when the connect modal is open
    pub wallet_options: Option<Vec<WalletOption>>,
    pub menu: Option<AccountMenu>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct WalletButton {
    modal_open: bool,
    menu_open: bool,
    copied_at: Option<Instant>,
}

impl WalletButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    /// Whether the copy feedback is still showing at `now`
    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_at
            .map_or(false, |at| now.saturating_duration_since(at) < COPY_FEEDBACK)
    }

    pub fn render(&self, controller: &WalletController, now: Instant) -> ButtonView {
        let state = controller.state();
        let registry = controller.registry();

        let label = if state.is_loading && !state.is_connected {
            "Connecting...".to_string()
        } else if let (true, Some(address)) = (state.is_connected, &state.address) {
            shorten_address(address, ADDRESS_CHARS)
        } else if state.is_connected {
            "Connected".to_string()
        } else {
            "Connect Wallet".to_string()
        };

        let wallet_options = (self.modal_open && !state.is_connected).then(|| {
            controller
                .availability()
                .into_iter()
                .map(|(kind, available)| WalletOption {
                    kind,
                    available,
                    coming_soon: kind == WalletKind::WalletConnect,
                })
                .collect()
        });

        let menu = match (&state.address, state.wallet_type) {
            (Some(address), Some(kind)) if self.menu_open && state.is_connected => {
                let symbol = match (kind.is_evm(), state.chain_id) {
                    (false, _) => Some("SOL".to_string()),
                    (true, Some(chain_id)) => registry.describe(chain_id).map(|n| n.currency_symbol.clone()),
                    (true, None) => None,
                };
                let balance = state.balance.as_deref().map(|balance| {
                    let shown = display_balance(balance);
                    match &symbol {
                        Some(symbol) => format!("{} {}", shown, symbol),
                        None => shown,
                    }
                });
                let networks = if kind == WalletKind::MetaMask {
                    registry
                        .networks()
                        .map(|network| NetworkOption {
                            chain_id: network.chain_id,
                            name: network.name.clone(),
                            active: state.chain_id == Some(network.chain_id),
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                let explorer_url = state
                    .chain_id
                    .and_then(|chain_id| registry.explorer_address_url(chain_id, address));

                Some(AccountMenu {
                    address: to_checksum_address(address).unwrap_or_else(|| address.clone()),
                    balance,
                    wallet_name: kind.name().to_string(),
                    network_name: state.network_name.clone(),
                    networks,
                    explorer_url,
                    copied: self.is_copied(now),
                })
            }
            _ => None,
        };

        let unsupported = state.is_connected
            && state.wallet_type.map_or(false, |kind| kind.is_evm())
            && state.chain_id.map_or(false, |chain_id| !registry.is_supported(chain_id));

        ButtonView {
            label,
            disabled: state.is_loading,
            connected: state.is_connected,
            wallet_options,
            menu,
            warning: unsupported.then(|| UNSUPPORTED_WARNING.to_string()),
            error: state.error.clone(),
        }
    }

    /// Apply `action`. Failures are already recorded in the session state,
    /// so only the effect for the host is returned.
    pub async fn dispatch(
        &mut self,
        action: ButtonAction,
        controller: &mut WalletController,
        now: Instant,
    ) -> Option<UiEffect> {
        debug!("Button action: {:?}", action);
        match action {
            ButtonAction::OpenConnectModal => {
                if !controller.state().is_loading {
                    self.modal_open = true;
                }
                None
            }
            ButtonAction::CloseConnectModal => {
                self.modal_open = false;
                None
            }
            ButtonAction::SelectWallet(kind) => match controller.connect(kind).await {
                Ok(()) => {
                    self.modal_open = false;
                    None
                }
                // Modal stays open so the error is visible next to the choices
                Err(WalletError::ProviderUnavailable(kind)) => {
                    Some(UiEffect::OpenTab(kind.install_url().to_string()))
                }
                Err(_) => None,
            },
            ButtonAction::ToggleAccountMenu => {
                self.menu_open = controller.state().is_connected && !self.menu_open;
                None
            }
            ButtonAction::CopyAddress => {
                let address = controller.state().address.clone()?;
                self.copied_at = Some(now);
                Some(UiEffect::WriteClipboard(address))
            }
            ButtonAction::ViewOnExplorer => {
                let state = controller.state();
                let url = controller
                    .registry()
                    .explorer_address_url(state.chain_id?, state.address.as_deref()?)?;
                Some(UiEffect::OpenTab(url))
            }
            ButtonAction::SwitchNetwork(chain_id) => {
                let _ = controller.switch_network(chain_id).await;
                None
            }
            ButtonAction::Disconnect => {
                let _ = controller.disconnect().await;
                self.menu_open = false;
                self.copied_at = None;
                None
            }
        }
    }
}

/// Round a decimal balance string for display
fn display_balance(balance: &str) -> String {
    match balance.parse::<f64>() {
        Ok(value) => format!("{:.*}", BALANCE_PRECISION, value),
        Err(_) => balance.to_string(),
    }
}

impl fmt::Display for ButtonView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label)?;
        if self.disabled {
            write!(f, " (busy)")?;
        }
        writeln!(f)?;

        if let Some(warning) = &self.warning {
            writeln!(f, "  ! {}", warning)?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "  Error: {}", error)?;
        }

        if let Some(options) = &self.wallet_options {
            writeln!(f, "  Choose your preferred wallet to connect:")?;
            for option in options {
                let note = if option.coming_soon {
                    " (coming soon)"
                } else if !option.available {
                    " (not installed)"
                } else {
                    ""
                };
                writeln!(f, "    - {}{}", option.kind, note)?;
            }
        }

        if let Some(menu) = &self.menu {
            writeln!(f, "  Address:     {}", menu.address)?;
            if let Some(balance) = &menu.balance {
                writeln!(f, "  Balance:     {}", balance)?;
            }
            writeln!(f, "  Wallet Type: {}", menu.wallet_name)?;
            if let Some(network) = &menu.network_name {
                writeln!(f, "  Network:     {}", network)?;
            }
            if let Some(url) = &menu.explorer_url {
                writeln!(f, "  Explorer:    {}", url)?;
            }
            if menu.copied {
                writeln!(f, "  Copied!")?;
            }
            if !menu.networks.is_empty() {
                writeln!(f, "  Switch network:")?;
                for network in &menu.networks {
                    let marker = if network.active { "*" } else { " " };
                    writeln!(f, "   {} {} ({})", marker, network.name, network.chain_id)?;
                }
            }
        }
        Ok(())
    }
}
