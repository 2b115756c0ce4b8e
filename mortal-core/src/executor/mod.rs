//! Fund-moving operations.
//!
//! - [`OnChainPaymentExecutor`]: pays a verified order with a token transfer.
//! - [`LendExecutor`]: drives the approve → lend sequence of a loan.
//!
//! Both only ever present a timeout as "stuck, offer the manual override";
//! the underlying transaction stays pending on chain regardless.

pub mod lend;
pub mod payment;

pub use lend::{ApprovalSource, LendError, LendExecutor, WaitOutcome};
pub use payment::{Confirmation, OnChainPaymentExecutor, PaymentError, PaymentPlan, PendingPayment};

use std::time::Duration;

use tracing::{debug, warn};

use crate::verify::TxHash;
use crate::wallet::{TokenWallet, TxReceipt};

/// Poll for the receipt of `tx` until one shows up.
///
/// Read failures are logged and retried on the next tick; public RPC nodes
/// routinely lag behind the transaction they just accepted. The caller
/// bounds the wait.
pub(crate) async fn wait_for_receipt(
    wallet: &dyn TokenWallet,
    tx: &TxHash,
    interval: Duration,
) -> TxReceipt {
    loop {
        match wallet.receipt(tx).await {
            Ok(Some(receipt)) => {
                debug!(tx_hash = %tx, block = receipt.block_number, "Receipt available");
                return receipt;
            }
            Ok(None) => debug!(tx_hash = %tx, "Receipt not available yet"),
            Err(e) => warn!(tx_hash = %tx, error = %e, "Receipt read failed, retrying"),
        }
        tokio::time::sleep(interval).await;
    }
}
