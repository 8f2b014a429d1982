//! End-to-end session behavior against a scripted wallet and resolver

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{sleep, timeout};

use nameplate::config::Settings;
use nameplate::core::parse_address;
use nameplate::{
    AccountEvent, ConnectFailure, ConnectionController, ConnectionState, NameResolver,
    NullNotifier, Resolve, ResolutionOutcome, ResolveContext, ResolvedName, Strategy,
    StrategyResult, WalletError, WalletProvider,
};

// --- scripted wallet -----------------------------------------------------

struct MockWallet {
    available: bool,
    reject: AtomicBool,
    accounts: Mutex<Vec<Address>>,
    request_calls: AtomicUsize,
    events: Mutex<Option<mpsc::Receiver<AccountEvent>>>,
}

impl MockWallet {
    fn new() -> Self {
        Self {
            available: true,
            reject: AtomicBool::new(false),
            accounts: Mutex::new(Vec::new()),
            request_calls: AtomicUsize::new(0),
            events: Mutex::new(None),
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    fn with_accounts(self, accounts: Vec<Address>) -> Self {
        *self.accounts.lock().unwrap() = accounts;
        self
    }

    fn rejecting(self) -> Self {
        self.reject.store(true, Ordering::SeqCst);
        self
    }

    fn with_events(self, rx: mpsc::Receiver<AccountEvent>) -> Self {
        *self.events.lock().unwrap() = Some(rx);
        self
    }
}

#[async_trait::async_trait]
impl WalletProvider for MockWallet {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(1)
    }

    async fn raw_call(&self, _to: Address, _data: Bytes) -> Result<Bytes, WalletError> {
        Err(WalletError::Call("no contracts in mock".to_string()))
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<AccountEvent>, WalletError> {
        match self.events.lock().unwrap().take() {
            Some(rx) => Ok(rx),
            None => {
                // No scripted events: hand back a channel that is already
                // closed so the controller stops polling it.
                let (tx, rx) = mpsc::channel(1);
                drop(tx);
                Ok(rx)
            }
        }
    }

    fn endpoint_name(&self) -> String {
        "mock".to_string()
    }
}

// --- scripted resolver ---------------------------------------------------

#[derive(Clone)]
struct ScriptedOutcome {
    outcome: ResolutionOutcome,
    gate: Option<Arc<Notify>>,
}

struct MockResolver {
    outcomes: Mutex<HashMap<Address, ScriptedOutcome>>,
}

impl MockResolver {
    fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    fn script(&self, address: Address, outcome: ResolutionOutcome) {
        self.outcomes.lock().unwrap().insert(
            address,
            ScriptedOutcome {
                outcome,
                gate: None,
            },
        );
    }

    /// The resolution for `address` blocks until the returned gate fires.
    fn script_gated(&self, address: Address, outcome: ResolutionOutcome) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.outcomes.lock().unwrap().insert(
            address,
            ScriptedOutcome {
                outcome,
                gate: Some(Arc::clone(&gate)),
            },
        );
        gate
    }
}

#[async_trait::async_trait]
impl Resolve for MockResolver {
    async fn resolve(&self, address: Address) -> ResolutionOutcome {
        let scripted = self.outcomes.lock().unwrap().get(&address).cloned();
        match scripted {
            Some(scripted) => {
                if let Some(gate) = scripted.gate {
                    gate.notified().await;
                }
                scripted.outcome
            }
            None => ResolutionOutcome::NotFound,
        }
    }
}

// --- helpers -------------------------------------------------------------

struct Fixed {
    result: StrategyResult,
}

#[async_trait::async_trait]
impl Strategy for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn attempt(&self, _address: Address, _cx: &ResolveContext) -> StrategyResult {
        self.result.clone()
    }
}

fn found(name: &str) -> ResolutionOutcome {
    ResolutionOutcome::Found(ResolvedName::parse(name, Address::ZERO).expect("valid test name"))
}

fn addr_a() -> Address {
    parse_address("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
}

fn addr_b() -> Address {
    parse_address("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb").unwrap()
}

fn addr_main() -> Address {
    parse_address("0x1234567890123456789012345678901234567890").unwrap()
}

async fn wait_for(
    rx: &mut watch::Receiver<ConnectionState>,
    pred: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("state change timed out")
        .expect("controller ended unexpectedly")
        .clone()
}

// --- tests ---------------------------------------------------------------

#[tokio::test]
async fn no_provider_fails_without_prompting() {
    let wallet = Arc::new(MockWallet::unavailable());
    let handle = ConnectionController::spawn(
        Arc::clone(&wallet) as Arc<dyn WalletProvider>,
        Arc::new(MockResolver::new()),
        Arc::new(NullNotifier),
    );

    let mut states = handle.subscribe();
    handle.connect().await.unwrap();

    let state = wait_for(&mut states, |s| matches!(s, ConnectionState::Failed { .. })).await;
    let ConnectionState::Failed { reason } = state else {
        unreachable!()
    };
    assert_eq!(reason, ConnectFailure::NoProviderInstalled);
    assert!(reason.is_permanent());
    assert_eq!(wallet.request_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejection_fails_and_retry_recovers() {
    let wallet = Arc::new(MockWallet::new().with_accounts(vec![addr_a()]).rejecting());
    let resolver = MockResolver::new();
    resolver.script(addr_a(), found("alice.eth"));

    let handle = ConnectionController::spawn(
        Arc::clone(&wallet) as Arc<dyn WalletProvider>,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();

    handle.connect().await.unwrap();
    let state = wait_for(&mut states, |s| matches!(s, ConnectionState::Failed { .. })).await;
    assert_eq!(
        state,
        ConnectionState::Failed {
            reason: ConnectFailure::UserRejected
        }
    );

    // User approves on the second attempt.
    wallet.reject.store(false, Ordering::SeqCst);
    handle.connect().await.unwrap();

    let state = wait_for(&mut states, |s| {
        matches!(
            s,
            ConnectionState::Connected {
                resolution_pending: false,
                ..
            }
        )
    })
    .await;
    assert_eq!(state.address(), Some(addr_a()));
}

#[tokio::test]
async fn end_to_end_primary_name_reaches_state() {
    let wallet = Arc::new(MockWallet::new().with_accounts(vec![addr_main()]));
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(Fixed {
            result: StrategyResult::Accepted(
                ResolvedName::parse("nora.eth", Address::ZERO).unwrap(),
            ),
        }),
        Box::new(Fixed {
            result: StrategyResult::Unavailable,
        }),
    ];
    let resolver = NameResolver::new(strategies, ResolveContext::new(Settings::default(), None));

    let handle = ConnectionController::spawn(
        wallet,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();
    handle.connect().await.unwrap();

    let state = wait_for(&mut states, |s| s.is_connected() && s.is_settled()).await;
    assert_eq!(
        state,
        ConnectionState::Connected {
            address: addr_main(),
            resolved_name: ResolvedName::parse("nora.eth", Address::ZERO),
            resolution_pending: false,
        }
    );
}

#[tokio::test]
async fn all_backends_unavailable_settles_with_no_name() {
    let wallet = Arc::new(MockWallet::new().with_accounts(vec![addr_main()]));
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(Fixed {
            result: StrategyResult::Unavailable,
        }),
        Box::new(Fixed {
            result: StrategyResult::Unavailable,
        }),
        Box::new(Fixed {
            result: StrategyResult::Unavailable,
        }),
    ];
    let resolver = NameResolver::new(strategies, ResolveContext::new(Settings::default(), None));

    let handle = ConnectionController::spawn(
        wallet,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();
    handle.connect().await.unwrap();

    let state = wait_for(&mut states, |s| s.is_connected() && s.is_settled()).await;
    assert_eq!(
        state,
        ConnectionState::Connected {
            address: addr_main(),
            resolved_name: None,
            resolution_pending: false,
        }
    );
}

#[tokio::test]
async fn stale_resolution_never_overwrites_newer_account() {
    let (events_tx, events_rx) = mpsc::channel(4);
    let wallet = Arc::new(
        MockWallet::new()
            .with_accounts(vec![addr_a()])
            .with_events(events_rx),
    );

    let resolver = MockResolver::new();
    let gate_a = resolver.script_gated(addr_a(), found("alice.eth"));
    resolver.script(addr_b(), found("bob.eth"));

    let handle = ConnectionController::spawn(
        wallet,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();

    handle.connect().await.unwrap();
    let state = wait_for(&mut states, |s| s.is_connected()).await;
    assert_eq!(state.address(), Some(addr_a()));

    // Account switches while the first lookup is still in flight.
    events_tx
        .send(AccountEvent::AccountsChanged(vec![addr_b()]))
        .await
        .unwrap();

    let state = wait_for(&mut states, |s| {
        matches!(
            s,
            ConnectionState::Connected {
                resolved_name: Some(_),
                resolution_pending: false,
                ..
            }
        )
    })
    .await;
    assert_eq!(state.address(), Some(addr_b()));

    // The first lookup finally completes; its result must be discarded.
    gate_a.notify_one();
    sleep(Duration::from_millis(100)).await;

    let state = handle.state();
    assert_eq!(
        state,
        ConnectionState::Connected {
            address: addr_b(),
            resolved_name: ResolvedName::parse("bob.eth", Address::ZERO),
            resolution_pending: false,
        }
    );
}

#[tokio::test]
async fn emptied_account_list_disconnects() {
    let (events_tx, events_rx) = mpsc::channel(4);
    let wallet = Arc::new(
        MockWallet::new()
            .with_accounts(vec![addr_a()])
            .with_events(events_rx),
    );
    let resolver = MockResolver::new();
    resolver.script(addr_a(), found("alice.eth"));

    let handle = ConnectionController::spawn(
        wallet,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();

    handle.connect().await.unwrap();
    wait_for(&mut states, |s| s.is_connected() && s.is_settled()).await;

    events_tx
        .send(AccountEvent::AccountsChanged(Vec::new()))
        .await
        .unwrap();
    let state = wait_for(&mut states, |s| *s == ConnectionState::Disconnected).await;
    assert_eq!(state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn explicit_disconnect_from_connected() {
    let wallet = Arc::new(MockWallet::new().with_accounts(vec![addr_a()]));
    let resolver = MockResolver::new();
    resolver.script(addr_a(), found("alice.eth"));

    let handle = ConnectionController::spawn(
        wallet,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();

    handle.connect().await.unwrap();
    wait_for(&mut states, |s| s.is_connected() && s.is_settled()).await;

    handle.disconnect().await.unwrap();
    let state = wait_for(&mut states, |s| *s == ConnectionState::Disconnected).await;
    assert_eq!(state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn resume_adopts_authorized_account_without_prompting() {
    let wallet = Arc::new(MockWallet::new().with_accounts(vec![addr_a()]));
    let resolver = MockResolver::new();
    resolver.script(addr_a(), found("alice.eth"));

    let handle = ConnectionController::spawn(
        Arc::clone(&wallet) as Arc<dyn WalletProvider>,
        Arc::new(resolver),
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();

    handle.resume().await.unwrap();
    let state = wait_for(&mut states, |s| s.is_connected() && s.is_settled()).await;
    assert_eq!(state.address(), Some(addr_a()));
    assert_eq!(wallet.request_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resume_with_no_authorized_accounts_stays_disconnected() {
    let wallet = Arc::new(MockWallet::new());
    let handle = ConnectionController::spawn(
        wallet,
        Arc::new(MockResolver::new()),
        Arc::new(NullNotifier),
    );

    handle.resume().await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn refresh_reruns_resolution_for_current_address() {
    let wallet = Arc::new(MockWallet::new().with_accounts(vec![addr_a()]));
    let resolver = Arc::new(MockResolver::new());
    resolver.script(addr_a(), found("alice.eth"));

    let handle = ConnectionController::spawn(
        wallet,
        Arc::clone(&resolver) as Arc<dyn Resolve>,
        Arc::new(NullNotifier),
    );
    let mut states = handle.subscribe();

    handle.connect().await.unwrap();
    wait_for(&mut states, |s| s.is_connected() && s.is_settled()).await;

    // The registered name changed out from under us; refresh picks it up.
    resolver.script(addr_a(), found("renamed.eth"));
    handle.refresh().await.unwrap();

    let state = wait_for(&mut states, |s| {
        matches!(
            s,
            ConnectionState::Connected {
                resolved_name: Some(name),
                resolution_pending: false,
                ..
            } if name.as_str() == "renamed.eth"
        )
    })
    .await;
    assert_eq!(state.address(), Some(addr_a()));
}
