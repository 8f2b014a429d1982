use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nameplate::core::{parse_address, short, LogNotifier};
use nameplate::domain::resolve::{NameResolver, Resolve, ResolutionOutcome};
use nameplate::infrastructure::wallet::{AlloyWallet, WalletProvider};
use nameplate::session::{ConnectionController, ConnectionState};
use nameplate::config;

#[derive(Debug, Parser)]
#[command(
    name = "nameplate",
    version,
    about = "Resolve Ethereum addresses to ENS names across redundant backends"
)]
struct Args {
    /// HTTP JSON-RPC endpoint acting as the wallet provider (e.g. http://localhost:8545)
    #[arg(long, global = true)]
    rpc: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve one address and print the outcome
    Resolve {
        /// Account address (0x-prefixed hex)
        address: String,
    },
    /// Connect through the RPC node's accounts and follow the session
    /// until it settles
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nameplate=info")),
        )
        .init();

    let args = Args::parse();
    let settings = config::load();

    let wallet: Option<Arc<dyn WalletProvider>> = match args.rpc.as_deref() {
        Some(rpc) => {
            let endpoint = normalize_http_endpoint(rpc);
            Some(Arc::new(AlloyWallet::connect(
                &endpoint,
                settings.account_poll_interval(),
            )?))
        }
        None => None,
    };

    match args.command {
        Command::Resolve { address } => {
            let address = parse_address(&address)
                .ok_or_else(|| anyhow!("invalid address: {address}"))?;
            let resolver = NameResolver::from_settings(settings, wallet);
            match resolver.resolve(address).await {
                ResolutionOutcome::Found(name) => println!("{} {}", short(address), name),
                _ => println!("{} (no name found)", short(address)),
            }
        }
        Command::Session => {
            let wallet = wallet.context("--rpc is required for session mode")?;
            let resolver = Arc::new(NameResolver::from_settings(
                settings,
                Some(Arc::clone(&wallet)),
            ));
            let handle = ConnectionController::spawn(wallet, resolver, Arc::new(LogNotifier));
            let mut states = handle.subscribe();
            handle.connect().await?;

            // First change is the move out of the initial Disconnected.
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                print_state(&state);
                if state.is_settled() {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn print_state(state: &ConnectionState) {
    match state {
        ConnectionState::Disconnected => println!("disconnected"),
        ConnectionState::Connecting => println!("connecting…"),
        ConnectionState::Connected {
            address,
            resolved_name,
            resolution_pending,
        } => match (resolved_name, resolution_pending) {
            (Some(name), _) => println!("connected: {} ({})", name, short(*address)),
            (None, true) => println!("connected: {} (resolving name…)", short(*address)),
            (None, false) => println!("connected: {} (no name found)", short(*address)),
        },
        ConnectionState::Failed { reason } => println!("failed: {reason}"),
    }
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
