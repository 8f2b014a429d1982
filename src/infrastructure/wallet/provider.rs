//! Wallet provider abstraction and the Alloy HTTP implementation
//!
//! The session layer consumes the wallet only through this trait: its
//! account list, chain id, and raw-call capability. Anything with those
//! operations (a browser wallet bridge, a local node, a test double) can
//! stand in.

use std::sync::Mutex;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Wallet-boundary failures
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet provider is available")]
    NoProvider,

    #[error("the user rejected the connection request")]
    UserRejected,

    #[error("wallet transport error: {0}")]
    Transport(String),

    #[error("wallet call failed: {0}")]
    Call(String),
}

/// Provider-originated notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// The authorized account list changed; empty means disconnected.
    AccountsChanged(Vec<Address>),
    /// The provider switched networks.
    ChainChanged(u64),
}

/// Abstract wallet provider
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync + 'static {
    /// Whether a provider is present at all; when false, nothing else is
    /// worth calling.
    fn is_available(&self) -> bool;

    /// Currently authorized accounts, without prompting (may be empty).
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Ask the user to authorize accounts (may fail with `UserRejected`).
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// The chain the provider is currently on.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Execute a read-only call through the provider.
    async fn raw_call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError>;

    /// Subscribe to account/chain changes. Only one subscription is live at
    /// a time; subscribing again tears down the previous one.
    async fn subscribe_events(&self) -> Result<mpsc::Receiver<AccountEvent>, WalletError>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

// Type alias for the filled HTTP provider
type HttpFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// `WalletProvider` over an HTTP JSON-RPC node.
///
/// A node has no prompt surface, so `request_accounts` degrades to the
/// unlocked-account list, and account/chain changes are surfaced by polling
/// and diffing.
pub struct AlloyWallet {
    provider: HttpFillProvider,
    endpoint: String,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl AlloyWallet {
    pub fn connect(url: &str, poll_interval: Duration) -> Result<Self> {
        let rpc_url = url.parse().context("Invalid HTTP URL")?;
        let provider = ProviderBuilder::new().connect_http(rpc_url);
        Ok(Self {
            provider,
            endpoint: url.to_string(),
            poll_interval,
            poller: Mutex::new(None),
        })
    }
}

impl Drop for AlloyWallet {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.poller.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

#[async_trait::async_trait]
impl WalletProvider for AlloyWallet {
    fn is_available(&self) -> bool {
        // Construction requires a configured endpoint; that is this
        // adapter's equivalent of an injected provider object existing.
        true
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.provider
            .get_accounts()
            .await
            .map_err(|err| WalletError::Transport(err.to_string()))
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.accounts().await
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|err| WalletError::Transport(err.to_string()))
    }

    async fn raw_call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError> {
        let request = TransactionRequest::default().to(to).input(data.into());
        self.provider
            .call(request)
            .await
            .map_err(|err| WalletError::Call(err.to_string()))
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<AccountEvent>, WalletError> {
        let (tx, rx) = mpsc::channel(16);
        let provider = self.provider.clone();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut last_accounts: Option<Vec<Address>> = None;
            let mut last_chain: Option<u64> = None;

            loop {
                ticker.tick().await;

                if let Ok(accounts) = provider.get_accounts().await {
                    let changed = last_accounts
                        .as_ref()
                        .is_some_and(|prev| *prev != accounts);
                    if changed && tx.send(AccountEvent::AccountsChanged(accounts.clone())).await.is_err() {
                        break;
                    }
                    last_accounts = Some(accounts);
                }

                if let Ok(chain) = provider.get_chain_id().await {
                    let changed = last_chain.is_some_and(|prev| prev != chain);
                    if changed && tx.send(AccountEvent::ChainChanged(chain)).await.is_err() {
                        break;
                    }
                    last_chain = Some(chain);
                }

                if tx.is_closed() {
                    break;
                }
            }
        });

        // One live subscription at a time
        let mut guard = self
            .poller
            .lock()
            .map_err(|_| WalletError::Transport("poller lock poisoned".to_string()))?;
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }

        Ok(rx)
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}
