//! TOML file configuration structures.
//!
//! These structs directly map to the `mortal-config.toml` file format.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Needed for wallet payments and lending only.
    #[serde(default)]
    pub wallet: Option<WalletConfig>,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub timings: TimingsConfig,
    #[serde(default)]
    pub lending: LendingConfig,
}

impl FileConfig {
    /// Defaults for everything but the agent URL.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            agent: AgentConfig { base_url },
            storage: StorageConfig::default(),
            wallet: None,
            chains: Vec::new(),
            timings: TimingsConfig::default(),
            lending: LendingConfig::default(),
        }
    }
}

/// Agent backend section.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent API, e.g. `https://agent.example.com/api/`.
    pub base_url: Url,
}

/// Where in-progress flows are saved.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./.mortal")
}

/// JSON-RPC wallet endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub rpc_url: Url,
    /// Sending account. Defaults to the first account the node reports.
    #[serde(default)]
    pub account: Option<String>,
}

/// Per-chain overrides applied on top of the agent's menu.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub id: String,
    /// ERC-20 contract of the payment token.
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// Poll intervals and timeouts, in seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimingsConfig {
    pub purchase_poll: u64,
    pub dashboard_poll: u64,
    pub receipt_poll: u64,
    pub allowance_poll: u64,
    pub stuck_timeout: u64,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            purchase_poll: 3,
            dashboard_poll: 15,
            receipt_poll: 3,
            allowance_poll: 3,
            stuck_timeout: 60,
        }
    }
}

/// Loan request limits.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    pub min_amount: Decimal,
    pub max_interest_rate_bps: u32,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            min_amount: Decimal::ONE,
            max_interest_rate_bps: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parsing() {
        let toml_str = r#"
[agent]
base_url = "https://agent.example.com/api/"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.base_url.as_str(), "https://agent.example.com/api/");
        assert_eq!(config.storage.dir, PathBuf::from("./.mortal"));
        assert!(config.wallet.is_none());
        assert!(config.chains.is_empty());
        assert_eq!(config.timings.stuck_timeout, 60);
        assert_eq!(config.lending.min_amount, Decimal::ONE);
    }

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[agent]
base_url = "http://127.0.0.1:8000/"

[storage]
dir = "/var/lib/mortal"

[wallet]
rpc_url = "http://127.0.0.1:1248"
account = "0x1111111111111111111111111111111111111111"

[[chains]]
id = "base"
token_address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
decimals = 6

[timings]
purchase_poll = 5
stuck_timeout = 120

[lending]
min_amount = "10"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let wallet = config.wallet.unwrap();
        assert_eq!(wallet.rpc_url.port(), Some(1248));
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].decimals, Some(6));
        assert_eq!(config.timings.purchase_poll, 5);
        assert_eq!(config.timings.dashboard_poll, 15);
        assert_eq!(config.timings.stuck_timeout, 120);
        assert_eq!(config.lending.min_amount, Decimal::from(10));
        assert_eq!(config.lending.max_interest_rate_bps, 10_000);
    }

    #[test]
    fn test_missing_agent_section_is_rejected() {
        assert!(toml::from_str::<FileConfig>("[storage]\ndir = \"x\"\n").is_err());
    }
}
