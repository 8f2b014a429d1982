//! Priority-ordered resolution over the strategy set

use std::sync::Arc;

use alloy_primitives::Address;
use tokio::time::timeout;
use tracing::debug;

use crate::config::Settings;
use crate::core::short;
use crate::domain::resolve::graph::GraphLookup;
use crate::domain::resolve::http::{PrimaryLookup, ReverseLookup, SecondaryLookup};
use crate::domain::resolve::name::ResolutionOutcome;
use crate::domain::resolve::onchain::{ContractNameCall, EtherscanProxyCall};
use crate::domain::resolve::strategy::{ResolveContext, Strategy, StrategyResult};
use crate::infrastructure::wallet::WalletProvider;

/// Resolution behind a seam so callers (and tests) can swap the chain out.
#[async_trait::async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, address: Address) -> ResolutionOutcome;
}

/// The fixed backend priority order. Appends the Etherscan proxy fallback
/// only when an API key is configured.
pub fn default_strategies(settings: &Settings) -> Vec<Box<dyn Strategy>> {
    let mut chain: Vec<Box<dyn Strategy>> = vec![
        Box::new(PrimaryLookup),
        Box::new(ReverseLookup),
        Box::new(ContractNameCall::reverse_registrar(settings)),
        Box::new(ContractNameCall::registry(settings)),
        Box::new(GraphLookup),
        Box::new(SecondaryLookup),
    ];
    if let Some(key) = settings.endpoints.etherscan_api_key.clone() {
        chain.push(Box::new(EtherscanProxyCall::new(settings, key)));
    }
    chain
}

/// Runs the strategy chain in priority order, short-circuiting on the first
/// accepted name.
pub struct NameResolver {
    strategies: Vec<Box<dyn Strategy>>,
    cx: ResolveContext,
}

impl NameResolver {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, cx: ResolveContext) -> Self {
        Self { strategies, cx }
    }

    /// The default chain over the given settings and optional wallet.
    pub fn from_settings(settings: Settings, wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        let strategies = default_strategies(&settings);
        let cx = ResolveContext::new(settings, wallet);
        Self { strategies, cx }
    }
}

#[async_trait::async_trait]
impl Resolve for NameResolver {
    async fn resolve(&self, address: Address) -> ResolutionOutcome {
        let attempt_bound = self.cx.settings.strategy_timeout();
        let mut outcome = ResolutionOutcome::Inconclusive;

        for strategy in &self.strategies {
            let result = match timeout(attempt_bound, strategy.attempt(address, &self.cx)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(strategy = strategy.name(), "attempt timed out");
                    StrategyResult::Unavailable
                }
            };

            match result {
                StrategyResult::Accepted(name) => {
                    debug!(strategy = strategy.name(), name = %name, "accepted");
                    outcome = ResolutionOutcome::Found(name);
                    break;
                }
                StrategyResult::Rejected => {
                    debug!(strategy = strategy.name(), "rejected");
                }
                StrategyResult::Unavailable => {
                    debug!(strategy = strategy.name(), "unavailable");
                }
            }
        }

        match outcome {
            ResolutionOutcome::Inconclusive => {
                debug!(address = %short(address), "no backend produced a name");
                ResolutionOutcome::NotFound
            }
            settled => settled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse_address;
    use crate::domain::resolve::name::ResolvedName;
    use std::time::Duration;

    struct StallingStrategy;

    #[async_trait::async_trait]
    impl Strategy for StallingStrategy {
        fn name(&self) -> &'static str {
            "stalling"
        }

        async fn attempt(&self, _address: Address, _cx: &ResolveContext) -> StrategyResult {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StrategyResult::Accepted(
                ResolvedName::parse("never.eth", Address::ZERO).expect("valid name"),
            )
        }
    }

    fn addr() -> Address {
        parse_address("0x1234567890123456789012345678901234567890").unwrap()
    }

    #[tokio::test]
    async fn empty_chain_is_not_found() {
        let resolver = NameResolver::new(
            Vec::new(),
            ResolveContext::new(Settings::default(), None),
        );
        assert_eq!(resolver.resolve(addr()).await, ResolutionOutcome::NotFound);
    }

    #[tokio::test]
    async fn stalled_attempt_is_bounded_by_timeout() {
        let mut settings = Settings::default();
        settings.timeouts.strategy_ms = 50;
        let resolver = NameResolver::new(
            vec![Box::new(StallingStrategy)],
            ResolveContext::new(settings, None),
        );
        assert_eq!(resolver.resolve(addr()).await, ResolutionOutcome::NotFound);
    }
}
