//! HTTP JSON lookup strategies
//!
//! The same logical backend has been observed shaping its payload
//! differently across callers, so the primary strategy probes every field
//! location a name has shown up in.

use alloy_primitives::Address;
use serde_json::Value;
use tracing::debug;

use crate::core::canonical;
use crate::domain::resolve::strategy::{
    classify_candidate, LookupError, ResolveContext, Strategy, StrategyResult,
};
use crate::domain::resolve::ResolvedName;

/// `GET {ens_api}/ens/resolve/{address}` with the full field probe.
pub struct PrimaryLookup;

/// Reverse-record variants: `/ens/reverse/{address}`, then
/// `/ens/resolve/{address}?reverse=true`.
pub struct ReverseLookup;

/// Remaining REST variants: `/ens/lookup/{address}`, then
/// `/ens/domains/{address}`.
pub struct SecondaryLookup;

async fn fetch_json(cx: &ResolveContext, url: &str) -> Result<Value, LookupError> {
    let response = cx.http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(LookupError::Transport(format!(
            "status {}",
            response.status()
        )));
    }
    let body = response
        .json::<Value>()
        .await
        .map_err(|err| LookupError::Malformed(err.to_string()))?;
    Ok(body)
}

fn api_base(cx: &ResolveContext) -> &str {
    cx.settings.endpoints.ens_api.trim_end_matches('/')
}

/// Probe the field locations a name has been observed under.
fn probe_name_fields(body: &Value) -> Option<&str> {
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        return Some(name);
    }
    if let Some(name) = body
        .get("address")
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
    {
        return Some(name);
    }
    if let Some(name) = body
        .get("result")
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
    {
        return Some(name);
    }
    if let Some(display) = body.get("displayName").and_then(Value::as_str) {
        // displayName falls back to the raw address when no name exists
        if !display.starts_with("0x") {
            return Some(display);
        }
    }
    None
}

/// Walk variant URLs, accepting the first usable top-level `name`.
async fn first_variant_name(
    cx: &ResolveContext,
    label: &'static str,
    urls: &[String],
    address: Address,
) -> StrategyResult {
    let mut saw_reply = false;
    for url in urls {
        match fetch_json(cx, url).await {
            Ok(body) => {
                saw_reply = true;
                if let Some(raw) = body.get("name").and_then(Value::as_str) {
                    if let Some(name) = ResolvedName::parse(raw, address) {
                        return StrategyResult::Accepted(name);
                    }
                }
            }
            Err(err) => debug!(strategy = label, %url, "variant failed: {err}"),
        }
    }
    if saw_reply {
        StrategyResult::Rejected
    } else {
        StrategyResult::Unavailable
    }
}

#[async_trait::async_trait]
impl Strategy for PrimaryLookup {
    fn name(&self) -> &'static str {
        "http-primary"
    }

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult {
        let url = format!("{}/ens/resolve/{}", api_base(cx), canonical(address));
        match fetch_json(cx, &url).await {
            Ok(body) => match probe_name_fields(&body) {
                Some(raw) => classify_candidate(raw, address),
                None => StrategyResult::Rejected,
            },
            Err(err) => {
                debug!(strategy = self.name(), "unavailable: {err}");
                StrategyResult::Unavailable
            }
        }
    }
}

#[async_trait::async_trait]
impl Strategy for ReverseLookup {
    fn name(&self) -> &'static str {
        "http-reverse"
    }

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult {
        let base = api_base(cx);
        let addr = canonical(address);
        let urls = [
            format!("{base}/ens/reverse/{addr}"),
            format!("{base}/ens/resolve/{addr}?reverse=true"),
        ];
        first_variant_name(cx, self.name(), &urls, address).await
    }
}

#[async_trait::async_trait]
impl Strategy for SecondaryLookup {
    fn name(&self) -> &'static str {
        "http-lookup"
    }

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult {
        let base = api_base(cx);
        let addr = canonical(address);
        let urls = [
            format!("{base}/ens/lookup/{addr}"),
            format!("{base}/ens/domains/{addr}"),
        ];
        first_variant_name(cx, self.name(), &urls, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn probes_top_level_name() {
        let body = json!({"name": "nora.eth", "address": "0x12"});
        assert_eq!(probe_name_fields(&body), Some("nora.eth"));
    }

    #[test]
    fn probes_nested_address_wrapper() {
        let body = json!({"address": {"name": "nora.eth"}});
        assert_eq!(probe_name_fields(&body), Some("nora.eth"));
    }

    #[test]
    fn probes_nested_result_wrapper() {
        let body = json!({"result": {"name": "nora.eth"}});
        assert_eq!(probe_name_fields(&body), Some("nora.eth"));
    }

    #[test]
    fn probes_display_name() {
        let body = json!({"displayName": "nora.eth"});
        assert_eq!(probe_name_fields(&body), Some("nora.eth"));
    }

    #[test]
    fn rejects_address_shaped_display_name() {
        let body = json!({"displayName": "0x1234567890123456789012345678901234567890"});
        assert_eq!(probe_name_fields(&body), None);
    }

    #[test]
    fn null_name_falls_through_to_other_fields() {
        let body = json!({"name": null, "address": {"name": "nora.eth"}});
        assert_eq!(probe_name_fields(&body), Some("nora.eth"));
    }

    #[test]
    fn empty_reply_probes_to_none() {
        assert_eq!(probe_name_fields(&json!({})), None);
        assert_eq!(probe_name_fields(&json!({"name": null})), None);
    }
}
