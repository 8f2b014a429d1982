//! Strategy seam shared by every lookup backend

use std::sync::Arc;

use alloy_primitives::Address;

use crate::config::Settings;
use crate::domain::resolve::ResolvedName;
use crate::infrastructure::wallet::WalletProvider;

/// What a single backend attempt produced.
///
/// `Unavailable` is the backend failing to answer (transport fault, wrong
/// network, missing capability); `Rejected` is a well-formed answer that
/// fails the real-name checks. Both let the caller continue down the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyResult {
    Accepted(ResolvedName),
    Rejected,
    Unavailable,
}

/// Failures internal to a strategy attempt; all of them degrade to
/// `StrategyResult::Unavailable` at the attempt boundary.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unsupported network (chain id {0})")]
    WrongNetwork(u64),

    #[error("no wallet connection")]
    NoWallet,
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Malformed(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

/// Capabilities injected into every strategy attempt.
///
/// Strategies resolve only through what is carried here; nothing reaches for
/// ambient connections.
#[derive(Clone)]
pub struct ResolveContext {
    pub http: reqwest::Client,
    pub wallet: Option<Arc<dyn WalletProvider>>,
    pub settings: Settings,
}

impl ResolveContext {
    pub fn new(settings: Settings, wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout())
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            wallet,
            settings,
        }
    }
}

/// One independent, replaceable method of reverse resolution against a
/// specific backend.
#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
    /// Stable label used in logs and tests.
    fn name(&self) -> &'static str;

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult;
}

/// Run a raw candidate through the real-name checks.
pub(crate) fn classify_candidate(raw: &str, address: Address) -> StrategyResult {
    match ResolvedName::parse(raw, address) {
        Some(name) => StrategyResult::Accepted(name),
        None => StrategyResult::Rejected,
    }
}
