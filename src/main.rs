//! walletlink CLI
//!
//! Drives the wallet controller from the command line. An EVM node exposing
//! its accounts over JSON-RPC (anvil, hardhat, geth --dev) stands in for the
//! injected MetaMask provider; the connection is remembered in a session file
//! between invocations.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use walletlink::config::WalletConfig;
use walletlink::network::parse_chain_id;
use walletlink::provider::{
    default_adapters, AdapterSettings, HttpEip1193Provider, InjectedProviders, WalletKind,
};
use walletlink::session::FileSessionStorage;
use walletlink::ui::{ButtonAction, UiEffect, WalletButton};
use walletlink::{RpcClient, WalletController};

/// Main CLI arguments
#[derive(Parser)]
#[command(name = "walletlink")]
#[command(about = "Connect wallets, inspect balances and switch networks")]
#[command(version)]
struct Args {
    /// Configuration file (JSON)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// JSON-RPC URL of the node acting as the injected EVM wallet
    #[arg(short = 'p', long)]
    provider_url: Option<String>,

    /// Session file remembering the connected wallet
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// List supported networks
    Networks,
    /// Show metadata for a chain id (hex or decimal)
    Describe {
        chain: String,
    },
    /// Connect a wallet
    Connect {
        /// metamask, phantom or walletconnect
        #[arg(short = 'w', long, default_value = "metamask")]
        wallet: WalletKind,
    },
    /// Show the connected wallet
    Status,
    /// Re-fetch the balance of the connected wallet
    Balance,
    /// Ask the wallet to switch networks
    Switch {
        chain: String,
    },
    /// Forget the connected wallet
    Disconnect,
    /// Print the block explorer URL of the connected address
    Explorer,
    /// Follow account and chain changes until interrupted
    Watch {
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

struct App {
    controller: WalletController,
    button: WalletButton,
    evm_provider: Option<Arc<HttpEip1193Provider>>,
}

impl App {
    fn build(config: &WalletConfig) -> Result<Self> {
        let registry = Arc::new(config.registry());
        let rpc = Arc::new(RpcClient::new(config.rpc_timeout()).context("Failed to create RPC client")?);

        let evm_provider = config
            .provider_url
            .as_ref()
            .map(|url| Arc::new(HttpEip1193Provider::new(url.clone(), rpc.clone())));
        let mut injected = InjectedProviders::none();
        if let Some(provider) = &evm_provider {
            injected = injected.with_ethereum(provider.clone());
        }

        let settings = AdapterSettings {
            registry: registry.clone(),
            rpc,
            solana_rpc_url: config.solana_rpc_url.clone(),
            balance_source: config.balance_source,
        };
        let session_path = config.session_path();
        debug!("Using session file {}", session_path.display());
        let storage = Arc::new(FileSessionStorage::new(session_path));

        let controller = WalletController::new(registry, default_adapters(&injected, &settings), storage)
            .with_request_timeout(config.connect_timeout());

        Ok(Self {
            controller,
            button: WalletButton::new(),
            evm_provider,
        })
    }

    async fn restore(&mut self) -> Result<()> {
        if !self.controller.restore().await? {
            info!("No saved wallet session");
        }
        Ok(())
    }

    async fn dispatch(&mut self, action: ButtonAction) -> Option<UiEffect> {
        self.button
            .dispatch(action, &mut self.controller, Instant::now())
            .await
    }

    fn print(&self) {
        print!("{}", self.button.render(&self.controller, Instant::now()));
    }

    /// Render with the account menu open when connected
    async fn print_status(&mut self) {
        if self.controller.state().is_connected && !self.button.is_menu_open() {
            self.dispatch(ButtonAction::ToggleAccountMenu).await;
        }
        self.print();
    }

    fn failure(&self) -> Option<anyhow::Error> {
        self.controller.state().error.as_ref().map(|e| anyhow!("{}", e))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut config = WalletConfig::load_or_default(args.config.as_deref())?;
    if let Some(url) = args.provider_url {
        config.provider_url = Some(url);
    }
    if let Some(path) = args.session_file {
        config.session_file = Some(path);
    }

    let mut app = App::build(&config)?;

    match args.command {
        Commands::Networks => {
            for network in app.controller.registry().networks() {
                println!(
                    "{:>6}  {:<28} {:<6} {}",
                    network.chain_id, network.name, network.currency_symbol, network.block_explorer_url
                );
            }
        }
        Commands::Describe { chain } => {
            let chain_id = parse_chain_id(&chain)?;
            match app.controller.registry().describe(chain_id) {
                Some(network) => println!("{}", serde_json::to_string_pretty(network)?),
                None => println!("{}: {}", chain_id, app.controller.registry().name_of(chain_id)),
            }
        }
        Commands::Connect { wallet } => {
            app.restore().await?;
            app.dispatch(ButtonAction::OpenConnectModal).await;
            if let Some(UiEffect::OpenTab(url)) = app.dispatch(ButtonAction::SelectWallet(wallet)).await {
                println!("Install {} from {}", wallet, url);
            }
            if !app.controller.state().is_connected {
                app.print();
                return Err(app.failure().unwrap_or_else(|| anyhow!("Connection failed")));
            }
            app.print_status().await;
        }
        Commands::Status => {
            app.restore().await?;
            app.print_status().await;
        }
        Commands::Balance => {
            app.restore().await?;
            app.controller.refresh_balance().await?;
            app.print_status().await;
        }
        Commands::Switch { chain } => {
            let chain_id = parse_chain_id(&chain)?;
            app.restore().await?;
            let switched = app.controller.switch_network(chain_id).await;
            if switched.is_ok() {
                if let Some(e) = &app.controller.state().error {
                    warn!("Switched to chain {}, but: {}", chain_id, e);
                }
            }
            app.print_status().await;
            switched.with_context(|| format!("Failed to switch to chain {}", chain_id))?;
        }
        Commands::Disconnect => {
            app.restore().await?;
            app.dispatch(ButtonAction::Disconnect).await;
            println!("Wallet disconnected");
        }
        Commands::Explorer => {
            app.restore().await?;
            match app.dispatch(ButtonAction::ViewOnExplorer).await {
                Some(UiEffect::OpenTab(url)) => println!("{}", url),
                _ => return Err(anyhow!("No explorer available for the current wallet")),
            }
        }
        Commands::Watch { interval_ms } => {
            app.restore().await?;
            if !app.controller.state().is_connected {
                return Err(anyhow!("No wallet connected; run `walletlink connect` first"));
            }
            let interval = interval_ms
                .map(|ms| Duration::from_millis(ms.max(walletlink::config::MIN_POLL_INTERVAL_MS)))
                .unwrap_or_else(|| config.poll_interval());
            if let Some(provider) = &app.evm_provider {
                info!("Polling {} every {:?}", provider.url(), interval);
                provider.start_polling(interval);
            }
            app.print_status().await;

            loop {
                tokio::select! {
                    event = app.controller.next_event() => match event {
                        Some(event) => {
                            info!("Provider event: {:?}", event);
                            app.controller.handle_event(event).await;
                            app.print_status().await;
                            if !app.controller.state().is_connected {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
