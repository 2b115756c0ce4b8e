//! Configuration module for the `mortal` binary.
//!
//! Reads the TOML file, applies command line overrides and validates the
//! result into [`RuntimeConfig`].

pub mod file;
pub mod runtime;

use std::path::{Path, PathBuf};
use std::time::Duration;

use mortal_core::config::{FlowTimings, LendingLimits};
use mortal_core::wallet::contracts::parse_address;
use thiserror::Error;
use url::Url;

use crate::config::file::{FileConfig, LendingConfig, TimingsConfig, WalletConfig};
pub use crate::config::runtime::{RuntimeConfig, WalletSettings};

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    base_url_override: Option<Url>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, base_url_override: Option<Url>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            base_url_override,
        }
    }

    /// Load and validate the configuration.
    ///
    /// A missing file is fine when `--base-url` is given; every other
    /// setting has a default.
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => match &self.base_url_override {
                Some(url) => {
                    tracing::debug!(path = ?self.config_path, "No config file, using defaults");
                    FileConfig::with_base_url(url.clone())
                }
                None => {
                    return Err(ConfigError::IoError {
                        path: self.config_path.clone(),
                        source: e,
                    });
                }
            },
            Err(source) => {
                return Err(ConfigError::IoError {
                    path: self.config_path.clone(),
                    source,
                });
            }
        };
        self.build(file_config)
    }

    fn build(&self, file_config: FileConfig) -> Result<RuntimeConfig, ConfigError> {
        let FileConfig {
            agent,
            storage,
            wallet,
            chains,
            timings,
            lending,
        } = file_config;

        let config = RuntimeConfig {
            agent_url: self.base_url_override.clone().unwrap_or(agent.base_url),
            storage_dir: storage.dir,
            wallet: wallet.map(convert_wallet).transpose()?,
            chains,
            timings: convert_timings(timings),
            lending: convert_lending(lending),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn convert_wallet(w: WalletConfig) -> Result<WalletSettings, ConfigError> {
    let account = w
        .account
        .as_deref()
        .map(parse_address)
        .transpose()
        .map_err(|e| ConfigError::ValidationError(format!("wallet account: {e}")))?;
    Ok(WalletSettings {
        rpc_url: w.rpc_url,
        account,
    })
}

fn convert_lending(l: LendingConfig) -> LendingLimits {
    LendingLimits {
        min_amount: l.min_amount,
        max_interest_rate_bps: l.max_interest_rate_bps,
    }
}

fn convert_timings(t: TimingsConfig) -> FlowTimings {
    FlowTimings {
        purchase_poll_interval: Duration::from_secs(t.purchase_poll),
        dashboard_poll_interval: Duration::from_secs(t.dashboard_poll),
        receipt_poll_interval: Duration::from_secs(t.receipt_poll),
        allowance_poll_interval: Duration::from_secs(t.allowance_poll),
        stuck_timeout: Duration::from_secs(t.stuck_timeout),
    }
}

fn validate(config: &RuntimeConfig) -> Result<(), ConfigError> {
    if !matches!(config.agent_url.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "agent base_url must be http(s), got {}",
            config.agent_url
        )));
    }
    let t = &config.timings;
    for (name, value) in [
        ("purchase_poll", t.purchase_poll_interval),
        ("dashboard_poll", t.dashboard_poll_interval),
        ("receipt_poll", t.receipt_poll_interval),
        ("allowance_poll", t.allowance_poll_interval),
        ("stuck_timeout", t.stuck_timeout),
    ] {
        if value.is_zero() {
            return Err(ConfigError::ValidationError(format!("timings.{name} must be positive")));
        }
    }
    if config.lending.min_amount.is_sign_negative() {
        return Err(ConfigError::ValidationError("lending.min_amount must not be negative".into()));
    }
    for chain in &config.chains {
        if let Some(token) = &chain.token_address {
            parse_address(token).map_err(|e| {
                ConfigError::ValidationError(format!("chain {} token_address: {e}", chain.id))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_applies_base_url_override() {
        let file = write_config("[agent]\nbase_url = \"https://a.example.com/\"\n");
        let override_url = Url::parse("http://localhost:9000/").unwrap();
        let config = ConfigLoader::new(file.path(), Some(override_url.clone()))
            .load()
            .unwrap();
        assert_eq!(config.agent_url, override_url);
        assert_eq!(config.timings, FlowTimings::default());
        assert_eq!(config.lending, LendingLimits::default());
    }

    #[test]
    fn test_missing_file_needs_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            ConfigLoader::new(&path, None).load(),
            Err(ConfigError::IoError { .. })
        ));
        let config = ConfigLoader::new(&path, Some(Url::parse("http://localhost/").unwrap()))
            .load()
            .unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("./.mortal"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let file = write_config(
            "[agent]\nbase_url = \"https://a.example.com/\"\n[timings]\nreceipt_poll = 0\n",
        );
        assert!(matches!(
            ConfigLoader::new(file.path(), None).load(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_bad_token_address_is_rejected() {
        let file = write_config(
            "[agent]\nbase_url = \"https://a.example.com/\"\n[[chains]]\nid = \"base\"\ntoken_address = \"0x12\"\n",
        );
        assert!(matches!(
            ConfigLoader::new(file.path(), None).load(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_wallet_account_is_parsed() {
        let file = write_config(
            "[agent]\nbase_url = \"https://a.example.com/\"\n[wallet]\nrpc_url = \"http://127.0.0.1:8545/\"\naccount = \"0x1111111111111111111111111111111111111111\"\n",
        );
        let config = ConfigLoader::new(file.path(), None).load().unwrap();
        let account = config.wallet.unwrap().account.unwrap();
        assert_eq!(account, parse_address("0x1111111111111111111111111111111111111111").unwrap());

        let file = write_config(
            "[agent]\nbase_url = \"https://a.example.com/\"\n[wallet]\nrpc_url = \"http://127.0.0.1:8545/\"\naccount = \"me\"\n",
        );
        assert!(matches!(
            ConfigLoader::new(file.path(), None).load(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
