//! Pays an order with an ERC-20 transfer from the connected wallet.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use mortal_sdk::objects::ChainInfo;
use thiserror::Error;
use tracing::{info, warn};

use super::wait_for_receipt;
use crate::amount::{AmountError, from_base_units, to_base_units};
use crate::config::FlowTimings;
use crate::verify::{TxHash, VerifiedOrder};
use crate::wallet::contracts::{InvalidAddress, parse_address};
use crate::wallet::{TokenWallet, TxReceipt, WalletError};

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Declined in the wallet. Shown as a neutral notice.
    #[error("payment was cancelled in the wallet")]
    Rejected,

    /// Any other submission failure, with the truncated raw error.
    #[error("payment could not be submitted: {0}")]
    Submission(String),

    #[error("payment transaction {0} reverted")]
    Reverted(TxHash),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("no token contract known for chain {0}")]
    MissingTokenContract(String),

    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    #[error("order is payable on {order_chain}, not {chain}")]
    ChainMismatch { order_chain: String, chain: String },
}

impl PaymentError {
    fn from_wallet(e: WalletError) -> Self {
        match e {
            WalletError::Rejected => PaymentError::Rejected,
            WalletError::Reverted(tx) => PaymentError::Reverted(tx),
            other => PaymentError::Submission(other.summary()),
        }
    }
}

/// The exact transfer that pays an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPlan {
    pub order_id: String,
    /// ERC-20 contract.
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Verified payment address.
    pub to: Address,
    /// Base units.
    pub amount: U256,
}

impl PaymentPlan {
    pub fn display_amount(&self) -> String {
        format!("{} {}", from_base_units(self.amount, self.decimals), self.symbol)
    }
}

/// A submitted transfer, referenced by hash before it is mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    pub order_id: String,
    pub tx_hash: TxHash,
}

/// Result of waiting for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed(TxReceipt),
    /// No receipt within the stuck timeout. The user may still submit the
    /// hash for verification.
    Stuck,
}

/// Wallet-mediated token transfer for a verified order.
pub struct OnChainPaymentExecutor {
    wallet: Arc<dyn TokenWallet>,
    timings: FlowTimings,
}

impl OnChainPaymentExecutor {
    pub fn new(wallet: Arc<dyn TokenWallet>, timings: FlowTimings) -> Self {
        Self { wallet, timings }
    }

    /// Work out the transfer for `order` on `chain`.
    pub fn plan(&self, order: &VerifiedOrder, chain: &ChainInfo) -> Result<PaymentPlan, PaymentError> {
        let details = order.order();
        if details.chain != chain.id {
            return Err(PaymentError::ChainMismatch {
                order_chain: details.chain.clone(),
                chain: chain.id.clone(),
            });
        }
        let token = chain
            .token_address
            .as_deref()
            .ok_or_else(|| PaymentError::MissingTokenContract(chain.id.clone()))?;
        let token = parse_address(token)?;
        let to = parse_address(order.payment_address())?;
        let amount = to_base_units(details.price_usd, chain.decimals)?;
        Ok(PaymentPlan {
            order_id: details.order_id.clone(),
            token,
            symbol: chain.token.clone(),
            decimals: chain.decimals,
            to,
            amount,
        })
    }

    /// Ask the wallet to send the transfer. Resolves with the hash as soon
    /// as the wallet returns it.
    pub async fn submit(&self, plan: &PaymentPlan) -> Result<PendingPayment, PaymentError> {
        let tx_hash = self
            .wallet
            .transfer(plan.token, plan.to, plan.amount)
            .await
            .map_err(|e| {
                warn!(order_id = %plan.order_id, error = %e, "Transfer submission failed");
                PaymentError::from_wallet(e)
            })?;
        info!(order_id = %plan.order_id, tx_hash = %tx_hash, amount = %plan.amount, "Payment submitted");
        Ok(PendingPayment {
            order_id: plan.order_id.clone(),
            tx_hash,
        })
    }

    /// Wait for the transfer to be mined, up to the stuck timeout.
    pub async fn confirm(&self, pending: &PendingPayment) -> Result<Confirmation, PaymentError> {
        let wait = wait_for_receipt(
            self.wallet.as_ref(),
            &pending.tx_hash,
            self.timings.receipt_poll_interval,
        );
        match tokio::time::timeout(self.timings.stuck_timeout, wait).await {
            Ok(receipt) if receipt.success => {
                info!(order_id = %pending.order_id, tx_hash = %pending.tx_hash, "Payment confirmed");
                Ok(Confirmation::Confirmed(receipt))
            }
            Ok(_) => Err(PaymentError::Reverted(pending.tx_hash.clone())),
            Err(_) => {
                warn!(order_id = %pending.order_id, tx_hash = %pending.tx_hash, "Payment confirmation stuck");
                Ok(Confirmation::Stuck)
            }
        }
    }
}
