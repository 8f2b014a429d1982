use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::Address;
use serde::Deserialize;

use crate::core::parse_address;

/// Name lookup backends
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// ENS Ideas-style REST API base
    #[serde(default = "default_ens_api")]
    pub ens_api: String,

    /// ENS subgraph query endpoint
    #[serde(default = "default_graph")]
    pub graph: String,

    /// Etherscan API base (proxy eth_call fallback)
    #[serde(default = "default_etherscan")]
    pub etherscan: String,

    /// Etherscan API key; the proxy fallback is skipped without one
    #[serde(default)]
    pub etherscan_api_key: Option<String>,
}

/// Name-service contract addresses on mainnet
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSettings {
    #[serde(default = "default_reverse_registrar")]
    pub reverse_registrar: String,

    #[serde(default = "default_registry")]
    pub registry: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    /// HTTP client request timeout
    #[serde(default = "default_http_ms")]
    pub http_ms: u64,

    /// Upper bound on a single strategy attempt
    #[serde(default = "default_strategy_ms")]
    pub strategy_ms: u64,

    /// Wallet adapter account/chain polling interval
    #[serde(default = "default_account_poll_ms")]
    pub account_poll_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub endpoints: EndpointSettings,

    #[serde(default)]
    pub contracts: ContractSettings,

    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

fn default_ens_api() -> String {
    "https://api.ensideas.com".to_string()
}

fn default_graph() -> String {
    "https://api.thegraph.com/subgraphs/name/ensdomains/ens".to_string()
}

fn default_etherscan() -> String {
    "https://api.etherscan.io".to_string()
}

fn default_reverse_registrar() -> String {
    "0x3671aE578E63FdF66ad4F3E12CC0c0d71Ac7510C".to_string()
}

fn default_registry() -> String {
    "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e".to_string()
}

fn default_http_ms() -> u64 {
    10_000
}

fn default_strategy_ms() -> u64 {
    12_000
}

fn default_account_poll_ms() -> u64 {
    2_000
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            ens_api: default_ens_api(),
            graph: default_graph(),
            etherscan: default_etherscan(),
            etherscan_api_key: None,
        }
    }
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            reverse_registrar: default_reverse_registrar(),
            registry: default_registry(),
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            http_ms: default_http_ms(),
            strategy_ms: default_strategy_ms(),
            account_poll_ms: default_account_poll_ms(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoints: EndpointSettings::default(),
            contracts: ContractSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl Settings {
    /// Reverse registrar address, falling back to the mainnet deployment
    /// when the configured value does not parse.
    pub fn reverse_registrar_address(&self) -> Address {
        parse_address(&self.contracts.reverse_registrar)
            .unwrap_or_else(|| parse_address(&default_reverse_registrar()).expect("builtin address"))
    }

    /// Registry address, with the same fallback.
    pub fn registry_address(&self) -> Address {
        parse_address(&self.contracts.registry)
            .unwrap_or_else(|| parse_address(&default_registry()).expect("builtin address"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.http_ms)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.strategy_ms)
    }

    pub fn account_poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.account_poll_ms)
    }
}

pub fn load() -> Settings {
    let Some(path) = config_path() else {
        return Settings::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Settings::default(),
    };
    toml::from_str::<Settings>(&content).unwrap_or_default()
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("NAMEPLATE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("nameplate").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("nameplate").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "nameplate", "nameplate")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
