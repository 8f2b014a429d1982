//! Indexed-graph lookup strategy

use alloy_primitives::Address;
use serde::Deserialize;
use tracing::debug;

use crate::core::canonical;
use crate::domain::resolve::strategy::{
    classify_candidate, LookupError, ResolveContext, Strategy, StrategyResult,
};

/// Queries the ENS subgraph for domains owned by the address.
pub struct GraphLookup;

#[derive(Debug, Deserialize)]
struct GraphReply {
    #[serde(default)]
    data: Option<GraphData>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphData {
    #[serde(default)]
    domains: Vec<GraphDomain>,
}

#[derive(Debug, Deserialize)]
struct GraphDomain {
    #[serde(default)]
    name: Option<String>,
}

/// The subgraph indexes owners by lowercase address.
fn domains_query(address: Address) -> serde_json::Value {
    serde_json::json!({
        "query": format!(
            "query {{ domains(where: {{owner: \"{}\"}}) {{ name }} }}",
            canonical(address)
        )
    })
}

impl GraphLookup {
    async fn lookup(
        &self,
        address: Address,
        cx: &ResolveContext,
    ) -> Result<GraphReply, LookupError> {
        let response = cx
            .http
            .post(&cx.settings.endpoints.graph)
            .json(&domains_query(address))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LookupError::Transport(format!(
                "status {}",
                response.status()
            )));
        }
        response
            .json::<GraphReply>()
            .await
            .map_err(|err| LookupError::Malformed(err.to_string()))
    }
}

#[async_trait::async_trait]
impl Strategy for GraphLookup {
    fn name(&self) -> &'static str {
        "graph-query"
    }

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult {
        match self.lookup(address, cx).await {
            Ok(reply) => {
                let domains = reply.data.unwrap_or_default().domains;
                match domains.first().and_then(|d| d.name.as_deref()) {
                    Some(raw) => classify_candidate(raw, address),
                    None => StrategyResult::Rejected,
                }
            }
            Err(err) => {
                debug!(strategy = self.name(), "unavailable: {err}");
                StrategyResult::Unavailable
            }
        }
    }
}
