//! Wallet provider abstraction.
//!
//! [`TokenWallet`] covers the handful of contract interactions the flows
//! need. Submission methods resolve as soon as the provider hands back a
//! transaction hash; confirmation is observed separately through
//! [`TokenWallet::receipt`].

pub mod contracts;
mod json_rpc;

pub use json_rpc::JsonRpcWallet;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::verify::TxHash;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Longest raw provider message shown to the user.
const SUMMARY_MAX_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum WalletError {
    /// The user declined the request in their wallet.
    #[error("request rejected in wallet")]
    Rejected,

    /// The provider or its RPC backend failed.
    #[error("wallet provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("wallet transport error: {0}")]
    Transport(String),

    #[error("malformed wallet response: {0}")]
    Malformed(String),

    #[error("no wallet account available")]
    NoAccount,

    #[error("transaction {0} reverted")]
    Reverted(TxHash),
}

impl WalletError {
    /// Classify a JSON-RPC error object by its code.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        if code == USER_REJECTED_CODE {
            WalletError::Rejected
        } else {
            WalletError::Provider {
                code,
                message: message.into(),
            }
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, WalletError::Rejected)
    }

    /// The raw error, cut down for display next to a retry prompt.
    pub fn summary(&self) -> String {
        let full = self.to_string();
        if full.chars().count() <= SUMMARY_MAX_CHARS {
            return full;
        }
        let cut: String = full.chars().take(SUMMARY_MAX_CHARS).collect();
        format!("{cut}…")
    }
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub success: bool,
    pub block_number: u64,
}

/// The wallet operations used by the payment and loan executors.
///
/// Amounts are token base units.
#[async_trait]
pub trait TokenWallet: Send + Sync {
    /// The connected account.
    async fn account(&self) -> Result<Address, WalletError>;

    /// ERC-20 `transfer(to, amount)` on `token`.
    async fn transfer(&self, token: Address, to: Address, amount: U256)
    -> Result<TxHash, WalletError>;

    /// ERC-20 `approve(spender, amount)` on `token`.
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError>;

    /// Vault `lend(amount, interestRateBps)`.
    async fn lend(
        &self,
        vault: Address,
        amount: U256,
        interest_rate_bps: u32,
    ) -> Result<TxHash, WalletError>;

    /// ERC-20 `allowance(owner, spender)`.
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError>;

    /// The receipt of `tx`, or `None` while it is still pending (or the
    /// RPC node has not caught up yet).
    async fn receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>, WalletError>;
}
