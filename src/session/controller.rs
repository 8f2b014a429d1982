//! Wallet session state machine
//!
//! One task owns the state and drives everything through a select loop:
//! commands from the handle, account/chain events from the provider, and
//! completions from spawned resolution tasks. Resolution tasks are tagged
//! with the address they were started for; a completion whose tag no longer
//! matches the connected address is discarded, so a slow lookup for a
//! previous account can never clobber a newer one (fire-and-forget with
//! ignore-if-stale, no cancellation token).

use std::sync::Arc;

use alloy_primitives::Address;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::core::{short, Notifier, NotifyLevel};
use crate::domain::resolve::{Resolve, ResolutionOutcome};
use crate::infrastructure::wallet::{AccountEvent, WalletError, WalletProvider};
use crate::session::state::{ConnectFailure, ConnectionState};

/// Commands accepted by the controller loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Prompt the wallet for accounts and connect. Also the retry path out
    /// of `Failed`.
    Connect,
    /// Adopt an already-authorized account without prompting, if any.
    Resume,
    /// Re-run resolution for the connected address.
    Refresh,
    /// Drop the session back to `Disconnected`.
    Disconnect,
    /// Stop the controller loop.
    Shutdown,
}

/// The controller loop has ended and can no longer accept commands.
#[derive(Debug, thiserror::Error)]
#[error("session controller has shut down")]
pub struct SessionClosed;

/// Command/snapshot surface handed to the embedding application.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    /// Current state snapshot.
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub async fn connect(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Connect).await
    }

    pub async fn resume(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Resume).await
    }

    pub async fn refresh(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Refresh).await
    }

    pub async fn disconnect(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Disconnect).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Shutdown).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionClosed> {
        self.cmd_tx.send(cmd).await.map_err(|_| SessionClosed)
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Owns `ConnectionState` and every transition on it.
pub struct ConnectionController {
    wallet: Arc<dyn WalletProvider>,
    resolver: Arc<dyn Resolve>,
    notifier: Arc<dyn Notifier>,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    completion_tx: mpsc::Sender<(Address, ResolutionOutcome)>,
    completion_rx: mpsc::Receiver<(Address, ResolutionOutcome)>,
}

impl ConnectionController {
    /// Spawn the controller loop and return its handle. The loop ends on
    /// `Shutdown` or when every handle is dropped.
    pub fn spawn(
        wallet: Arc<dyn WalletProvider>,
        resolver: Arc<dyn Resolve>,
        notifier: Arc<dyn Notifier>,
    ) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (completion_tx, completion_rx) = mpsc::channel(16);

        let controller = Self {
            wallet,
            resolver,
            notifier,
            state_tx,
            cmd_rx,
            completion_tx,
            completion_rx,
        };
        tokio::spawn(controller.run());

        SessionHandle { cmd_tx, state_rx }
    }

    async fn run(mut self) {
        // The single live provider subscription; the receiver is dropped
        // with the loop, which tears the poller down.
        let mut events = match self.wallet.subscribe_events().await {
            Ok(rx) => Some(rx),
            Err(err) => {
                debug!("provider events unavailable: {err}");
                None
            }
        };

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if let Flow::Stop = self.handle_command(cmd).await {
                            break;
                        }
                    }
                    // Every handle dropped
                    None => break,
                },
                completed = self.completion_rx.recv() => {
                    if let Some((for_address, outcome)) = completed {
                        self.apply_completion(for_address, outcome);
                    }
                },
                event = recv_event(&mut events) => match event {
                    Some(event) => self.handle_event(event),
                    None => events = None,
                },
            }
        }
    }

    async fn handle_command(&mut self, cmd: SessionCommand) -> Flow {
        match cmd {
            SessionCommand::Connect => {
                match self.state() {
                    ConnectionState::Disconnected | ConnectionState::Failed { .. } => {
                        self.connect().await;
                    }
                    state => debug!(?state, "ignoring connect request"),
                }
                Flow::Continue
            }
            SessionCommand::Resume => {
                if self.state() == ConnectionState::Disconnected {
                    self.resume().await;
                }
                Flow::Continue
            }
            SessionCommand::Refresh => {
                if let ConnectionState::Connected {
                    address,
                    resolved_name,
                    ..
                } = self.state()
                {
                    self.set_state(ConnectionState::Connected {
                        address,
                        resolved_name,
                        resolution_pending: true,
                    });
                    self.spawn_resolution(address);
                }
                Flow::Continue
            }
            SessionCommand::Disconnect => {
                self.set_state(ConnectionState::Disconnected);
                Flow::Continue
            }
            SessionCommand::Shutdown => Flow::Stop,
        }
    }

    async fn connect(&mut self) {
        if !self.wallet.is_available() {
            self.notifier.notify(
                "A wallet provider is required to connect",
                NotifyLevel::Error,
            );
            self.fail(ConnectFailure::NoProviderInstalled);
            return;
        }

        self.set_state(ConnectionState::Connecting);

        match self.wallet.request_accounts().await {
            Ok(accounts) => match accounts.first().copied() {
                Some(address) => {
                    self.notifier
                        .notify("Wallet connected, resolving name…", NotifyLevel::Info);
                    self.adopt(address);
                }
                None => {
                    debug!("wallet granted no accounts");
                    self.set_state(ConnectionState::Disconnected);
                }
            },
            Err(WalletError::UserRejected) => {
                self.notifier
                    .notify("Connection was rejected", NotifyLevel::Warn);
                self.fail(ConnectFailure::UserRejected);
            }
            Err(WalletError::NoProvider) => {
                self.notifier.notify(
                    "A wallet provider is required to connect",
                    NotifyLevel::Error,
                );
                self.fail(ConnectFailure::NoProviderInstalled);
            }
            Err(err) => {
                self.notifier
                    .notify("Failed to connect wallet", NotifyLevel::Error);
                self.fail(ConnectFailure::Unavailable(err.to_string()));
            }
        }
    }

    /// Adopt an already-authorized account without prompting; any fault
    /// leaves the session disconnected.
    async fn resume(&mut self) {
        if !self.wallet.is_available() {
            return;
        }
        match self.wallet.accounts().await {
            Ok(accounts) => {
                if let Some(address) = accounts.first().copied() {
                    self.adopt(address);
                }
            }
            Err(err) => debug!("resume check failed: {err}"),
        }
    }

    fn handle_event(&mut self, event: AccountEvent) {
        match event {
            AccountEvent::AccountsChanged(accounts) => match accounts.first().copied() {
                Some(next) => {
                    if self.state().address() == Some(next) {
                        return;
                    }
                    self.notifier
                        .notify("Wallet account changed, resolving name…", NotifyLevel::Info);
                    self.adopt(next);
                }
                None => {
                    if self.state() != ConnectionState::Disconnected {
                        self.notifier.notify("Wallet disconnected", NotifyLevel::Warn);
                        self.set_state(ConnectionState::Disconnected);
                    }
                }
            },
            AccountEvent::ChainChanged(chain_id) => {
                // On-chain backends gained or lost availability; refresh the
                // connected account's name.
                if let Some(address) = self.state().address() {
                    debug!(chain_id, "network changed, re-resolving");
                    self.adopt(address);
                }
            }
        }
    }

    fn adopt(&mut self, address: Address) {
        self.set_state(ConnectionState::Connected {
            address,
            resolved_name: None,
            resolution_pending: true,
        });
        self.spawn_resolution(address);
    }

    fn spawn_resolution(&self, address: Address) {
        let resolver = Arc::clone(&self.resolver);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = resolver.resolve(address).await;
            let _ = completion_tx.send((address, outcome)).await;
        });
    }

    fn apply_completion(&mut self, for_address: Address, outcome: ResolutionOutcome) {
        let ConnectionState::Connected { address, .. } = self.state() else {
            debug!(
                address = %short(for_address),
                "discarding resolution for a closed session"
            );
            return;
        };
        if address != for_address {
            debug!(
                stale = %short(for_address),
                current = %short(address),
                "discarding stale resolution"
            );
            return;
        }

        let resolved_name = match outcome {
            ResolutionOutcome::Found(name) => {
                self.notifier
                    .notify(&format!("Name found: {name}"), NotifyLevel::Info);
                Some(name)
            }
            _ => {
                self.notifier
                    .notify("No name found for this address", NotifyLevel::Info);
                None
            }
        };

        self.set_state(ConnectionState::Connected {
            address,
            resolved_name,
            resolution_pending: false,
        });
    }

    fn fail(&mut self, reason: ConnectFailure) {
        self.set_state(ConnectionState::Failed { reason });
    }

    fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    fn set_state(&mut self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }
}

async fn recv_event(
    events: &mut Option<mpsc::Receiver<AccountEvent>>,
) -> Option<AccountEvent> {
    match events.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
