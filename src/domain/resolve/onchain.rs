//! Contract-call lookup strategies
//!
//! Both registrar lookups go through the connected wallet's raw-call
//! capability and only make sense against the mainnet deployments; any
//! other network reports Unavailable so the chain keeps going.

use alloy_primitives::Address;
use tracing::debug;

use crate::config::Settings;
use crate::core::canonical;
use crate::domain::resolve::decoder::decode_name_reply;
use crate::domain::resolve::strategy::{
    classify_candidate, LookupError, ResolveContext, Strategy, StrategyResult,
};

/// The only network the registrar deployments exist on.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// `name(address)` on the reverse registrar.
const REVERSE_NAME_SELECTOR: [u8; 4] = [0x0f, 0x5a, 0x54, 0x66];

/// `name(address)` on the registry.
const REGISTRY_NAME_SELECTOR: [u8; 4] = [0x69, 0x1f, 0x34, 0x31];

/// Encode a `name(address)` call: selector + address in a 32-byte slot.
pub(crate) fn encode_name_call(selector: [u8; 4], owner: Address) -> Vec<u8> {
    let mut data = selector.to_vec();
    // Pad address to 32 bytes
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(owner.as_slice());
    data
}

/// A raw `name(address)` lookup against one registrar contract.
pub struct ContractNameCall {
    label: &'static str,
    contract: Address,
    selector: [u8; 4],
}

impl ContractNameCall {
    pub fn reverse_registrar(settings: &Settings) -> Self {
        Self {
            label: "reverse-registrar",
            contract: settings.reverse_registrar_address(),
            selector: REVERSE_NAME_SELECTOR,
        }
    }

    pub fn registry(settings: &Settings) -> Self {
        Self {
            label: "registry",
            contract: settings.registry_address(),
            selector: REGISTRY_NAME_SELECTOR,
        }
    }

    async fn lookup(
        &self,
        address: Address,
        cx: &ResolveContext,
    ) -> Result<Vec<u8>, LookupError> {
        let wallet = cx.wallet.as_ref().ok_or(LookupError::NoWallet)?;

        let chain_id = wallet
            .chain_id()
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        if chain_id != MAINNET_CHAIN_ID {
            return Err(LookupError::WrongNetwork(chain_id));
        }

        let calldata = encode_name_call(self.selector, address);
        let reply = wallet
            .raw_call(self.contract, calldata.into())
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        Ok(reply.to_vec())
    }
}

#[async_trait::async_trait]
impl Strategy for ContractNameCall {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult {
        match self.lookup(address, cx).await {
            Ok(reply) => match decode_name_reply(&reply) {
                Some(raw) => classify_candidate(&raw, address),
                None => StrategyResult::Rejected,
            },
            Err(err) => {
                debug!(strategy = self.label, "unavailable: {err}");
                StrategyResult::Unavailable
            }
        }
    }
}

/// The reverse-registrar call issued through the Etherscan proxy API
/// instead of the wallet; only constructed when an API key is configured.
pub struct EtherscanProxyCall {
    base: String,
    api_key: String,
    contract: Address,
}

impl EtherscanProxyCall {
    pub fn new(settings: &Settings, api_key: String) -> Self {
        Self {
            base: settings.endpoints.etherscan.trim_end_matches('/').to_string(),
            api_key,
            contract: settings.reverse_registrar_address(),
        }
    }

    async fn lookup(
        &self,
        address: Address,
        cx: &ResolveContext,
    ) -> Result<Vec<u8>, LookupError> {
        let calldata = encode_name_call(REVERSE_NAME_SELECTOR, address);
        let url = format!(
            "{}/api?module=proxy&action=eth_call&to={}&data=0x{}&apikey={}",
            self.base,
            canonical(self.contract),
            hex::encode(&calldata),
            self.api_key,
        );

        let response = cx.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Transport(format!(
                "status {}",
                response.status()
            )));
        }
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| LookupError::Malformed(err.to_string()))?;

        let result = body
            .get("result")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| LookupError::Malformed("missing result field".to_string()))?;
        let raw = result.strip_prefix("0x").unwrap_or(result);
        hex::decode(raw).map_err(|err| LookupError::Malformed(err.to_string()))
    }
}

#[async_trait::async_trait]
impl Strategy for EtherscanProxyCall {
    fn name(&self) -> &'static str {
        "etherscan-proxy"
    }

    async fn attempt(&self, address: Address, cx: &ResolveContext) -> StrategyResult {
        match self.lookup(address, cx).await {
            Ok(reply) => match decode_name_reply(&reply) {
                Some(raw) => classify_candidate(&raw, address),
                None => StrategyResult::Rejected,
            },
            Err(err) => {
                debug!(strategy = self.name(), "unavailable: {err}");
                StrategyResult::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse_address;

    #[test]
    fn calldata_layout() {
        let owner = parse_address("0x1234567890123456789012345678901234567890").unwrap();
        let data = encode_name_call(REVERSE_NAME_SELECTOR, owner);

        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &[0x0f, 0x5a, 0x54, 0x66]);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..], owner.as_slice());
    }

    #[test]
    fn calldata_hex_matches_wire_form() {
        let owner = parse_address("0x1234567890123456789012345678901234567890").unwrap();
        let data = encode_name_call(REGISTRY_NAME_SELECTOR, owner);
        assert_eq!(
            format!("0x{}", hex::encode(data)),
            "0x691f34310000000000000000000000001234567890123456789012345678901234567890"
        );
    }
}
