//! Validated runtime configuration.

use std::path::PathBuf;

use alloy::primitives::Address;
use mortal_core::config::{FlowTimings, LendingLimits};
use mortal_sdk::objects::MenuResponse;
use url::Url;

use super::file::ChainConfig;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub agent_url: Url,
    pub storage_dir: PathBuf,
    pub wallet: Option<WalletSettings>,
    pub chains: Vec<ChainConfig>,
    pub timings: FlowTimings,
    pub lending: LendingLimits,
}

#[derive(Debug, Clone)]
pub struct WalletSettings {
    pub rpc_url: Url,
    pub account: Option<Address>,
}

impl RuntimeConfig {
    /// Fill in or replace chain details from the local configuration.
    pub fn apply_chain_overrides(&self, menu: &mut MenuResponse) {
        for chain in &mut menu.supported_chains {
            let Some(local) = self.chains.iter().find(|c| c.id == chain.id) else {
                continue;
            };
            if let Some(token_address) = &local.token_address {
                chain.token_address = Some(token_address.clone());
            }
            if let Some(decimals) = local.decimals {
                chain.decimals = decimals;
            }
        }
    }
}
