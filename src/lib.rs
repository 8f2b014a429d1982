//! Reverse-resolve Ethereum addresses to ENS names across redundant
//! backends.
//!
//! Several independent backends can answer "what name points back at this
//! address": REST lookups with inconsistent payload shapes, raw registrar
//! calls through a connected wallet, and the ENS subgraph. This crate runs
//! them as an ordered chain of strategies that tolerates any subset of them
//! being down, and wraps the result in a wallet-session state machine that
//! keeps UI-visible state consistent across account switches while lookups
//! are still in flight.

pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod session;

pub use config::Settings;
pub use core::{LogNotifier, Notifier, NotifyLevel, NullNotifier};
pub use domain::resolve::{
    decode_name_reply, default_strategies, LookupError, NameResolver, Resolve, ResolutionOutcome,
    ResolveContext, ResolvedName, Strategy, StrategyResult,
};
pub use infrastructure::wallet::{AccountEvent, AlloyWallet, WalletError, WalletProvider};
pub use session::{
    ConnectFailure, ConnectionController, ConnectionState, SessionClosed, SessionHandle,
};
