//! Shared handles for the subcommands.

use std::sync::Arc;

use anyhow::Context;
use mortal_core::api::AgentApi;
use mortal_core::executor::OnChainPaymentExecutor;
use mortal_core::flow::OrderFlowController;
use mortal_core::persistence::{FileStore, KeyValueStore, LoanPersistence, OrderPersistence};
use mortal_core::wallet::{JsonRpcWallet, TokenWallet};
use mortal_sdk::client::AgentClient;
use mortal_sdk::objects::MenuResponse;
use tokio::sync::watch;

use crate::config::RuntimeConfig;
use crate::shutdown::spawn_shutdown_watch;

pub struct AppState {
    pub config: RuntimeConfig,
    pub api: Arc<AgentClient>,
    pub store: Arc<dyn KeyValueStore>,
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> anyhow::Result<Self> {
        let api = Arc::new(AgentClient::new(config.agent_url.clone()));
        let store = FileStore::open(&config.storage_dir).with_context(|| {
            format!("cannot open storage directory {}", config.storage_dir.display())
        })?;
        Ok(Self {
            config,
            api,
            store: Arc::new(store),
            shutdown: spawn_shutdown_watch(),
        })
    }

    pub fn agent(&self) -> Arc<dyn AgentApi> {
        self.api.clone()
    }

    pub fn orders(&self) -> OrderPersistence {
        OrderPersistence::orders(self.store.clone())
    }

    pub fn loans(&self) -> LoanPersistence {
        LoanPersistence::loans(self.store.clone())
    }

    pub fn controller(&self) -> OrderFlowController {
        OrderFlowController::new(self.agent(), self.orders(), &self.config.timings)
    }

    /// The agent's menu with local chain overrides applied.
    pub async fn menu(&self) -> anyhow::Result<MenuResponse> {
        let mut menu = self.api.get_menu().await.context("failed to load the menu")?;
        self.config.apply_chain_overrides(&mut menu);
        Ok(menu)
    }

    pub fn wallet(&self) -> anyhow::Result<Arc<dyn TokenWallet>> {
        let settings = self
            .config
            .wallet
            .as_ref()
            .context("no [wallet] section in the configuration")?;
        Ok(Arc::new(JsonRpcWallet::new(
            settings.rpc_url.clone(),
            settings.account,
        )))
    }

    pub fn payment_executor(&self) -> anyhow::Result<OnChainPaymentExecutor> {
        Ok(OnChainPaymentExecutor::new(self.wallet()?, self.config.timings))
    }
}
