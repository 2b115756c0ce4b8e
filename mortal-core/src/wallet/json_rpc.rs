//! [`TokenWallet`] over an EIP-1193 style JSON-RPC endpoint.
//!
//! The endpoint is expected to sign and broadcast `eth_sendTransaction`
//! itself (a desktop wallet bridge or a dev node with an unlocked account),
//! the same division of labour a browser wallet extension provides.

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use super::contracts;
use super::{TokenWallet, TxReceipt, WalletError};
use crate::verify::TxHash;

impl From<TransportError> for WalletError {
    fn from(e: TransportError) -> Self {
        match e.as_error_resp() {
            Some(payload) => WalletError::from_rpc(payload.code, payload.message.to_string()),
            None => WalletError::Transport(e.to_string()),
        }
    }
}

/// JSON-RPC wallet provider.
pub struct JsonRpcWallet {
    provider: DynProvider,
    configured_account: Option<Address>,
    account: OnceCell<Address>,
}

impl JsonRpcWallet {
    /// Create a wallet talking to `endpoint`.
    ///
    /// Without a configured `account`, the first entry of `eth_accounts`
    /// is used.
    pub fn new(endpoint: Url, account: Option<Address>) -> Self {
        // No fillers: nonce, gas and signing belong to the endpoint.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(endpoint)
            .erased();
        Self {
            provider,
            configured_account: account,
            account: OnceCell::new(),
        }
    }

    async fn resolve_account(&self) -> Result<Address, WalletError> {
        if let Some(account) = self.configured_account {
            return Ok(account);
        }
        debug!("Resolving wallet account via eth_accounts");
        let accounts = self.provider.get_accounts().await?;
        accounts.first().copied().ok_or(WalletError::NoAccount)
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<TxHash, WalletError> {
        let from = self.account().await?;
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data);
        let pending = self.provider.send_transaction(request).await?;
        let hash = TxHash::from(*pending.tx_hash());
        info!(tx_hash = %hash, %to, "Transaction submitted");
        Ok(hash)
    }
}

#[async_trait]
impl TokenWallet for JsonRpcWallet {
    async fn account(&self) -> Result<Address, WalletError> {
        self.account
            .get_or_try_init(|| self.resolve_account())
            .await
            .copied()
    }

    async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        self.send_transaction(token, contracts::transfer_calldata(to, amount))
            .await
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        self.send_transaction(token, contracts::approve_calldata(spender, amount))
            .await
    }

    async fn lend(
        &self,
        vault: Address,
        amount: U256,
        interest_rate_bps: u32,
    ) -> Result<TxHash, WalletError> {
        self.send_transaction(vault, contracts::lend_calldata(amount, interest_rate_bps))
            .await
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError> {
        let request = TransactionRequest::default()
            .with_to(token)
            .with_input(contracts::allowance_calldata(owner, spender));
        let output = self.provider.call(request).await?;
        contracts::decode_allowance(&output).map_err(|e| WalletError::Malformed(e.to_string()))
    }

    async fn receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>, WalletError> {
        let hash: B256 = tx
            .as_str()
            .parse()
            .map_err(|_| WalletError::Malformed(format!("invalid tx hash {tx}")))?;
        let Some(receipt) = self.provider.get_transaction_receipt(hash).await? else {
            return Ok(None);
        };
        let Some(block_number) = receipt.block_number() else {
            return Ok(None);
        };
        Ok(Some(TxReceipt {
            success: receipt.status(),
            block_number,
        }))
    }
}
