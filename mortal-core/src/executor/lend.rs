//! Two-phase approve → lend against the agent vault.
//!
//! Approval confirmation is raced between two sources: re-reading the
//! allowance (primary, because public RPC endpoints often serve receipts
//! late) and the ordinary receipt wait (secondary). Whichever observes the
//! approval first advances the flow; when both are ready on the same poll
//! the allowance wins. A wall-clock timeout marks the flow stuck, which
//! unlocks the manual override without cancelling anything on chain.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use mortal_sdk::objects::AgentStatus;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::wait_for_receipt;
use crate::config::FlowTimings;
use crate::flow::loan::{LoanFlow, LoanStep};
use crate::persistence::LoanPersistence;
use crate::verify::{SecurityError, TxHash, ValidationError};
use crate::wallet::contracts::{InvalidAddress, parse_address};
use crate::wallet::{TokenWallet, WalletError};

#[derive(Debug, Error)]
pub enum LendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    #[error("request was cancelled in the wallet")]
    Rejected,

    #[error("wallet request failed: {0}")]
    Wallet(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("cannot {action} while the loan is {step}")]
    InvalidStep { step: LoanStep, action: &'static str },
}

impl From<WalletError> for LendError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Rejected => LendError::Rejected,
            WalletError::Reverted(tx) => LendError::Reverted(tx),
            other => LendError::Wallet(other.summary()),
        }
    }
}

/// What observed an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalSource {
    /// The allowance already covered the amount before any approve.
    ExistingAllowance,
    /// An allowance re-read.
    Allowance,
    /// The approve receipt.
    Receipt,
    /// The user confirmed on a block explorer.
    Manual,
}

/// Result of a confirmation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Confirmed(ApprovalSource),
    /// Timed out; the flow is marked stuck.
    Stuck,
}

/// Drives a [`LoanFlow`] through the wallet.
pub struct LendExecutor {
    wallet: Arc<dyn TokenWallet>,
    token: Address,
    vault: Address,
    timings: FlowTimings,
    persistence: Option<LoanPersistence>,
}

impl LendExecutor {
    /// Build an executor lending `token` to the vault named by `status`.
    ///
    /// The vault is the approve spender, so an agent that does not report
    /// one is refused outright.
    pub fn for_agent(
        wallet: Arc<dyn TokenWallet>,
        token: Address,
        status: &AgentStatus,
        timings: FlowTimings,
    ) -> Result<Self, LendError> {
        let vault = status
            .vault_address
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(SecurityError::MissingAuthoritativeAddress)?;
        Ok(Self {
            wallet,
            token,
            vault: parse_address(vault)?,
            timings,
            persistence: None,
        })
    }

    /// Save the flow after every step change.
    pub fn with_persistence(mut self, persistence: LoanPersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    /// Read the current allowance and skip the approve step when it
    /// already covers the loan. Returns `true` on the shortcut.
    pub async fn check_allowance(&self, flow: &mut LoanFlow) -> Result<bool, LendError> {
        expect_step(flow, LoanStep::Idle, "check allowance")?;
        let owner = self.wallet.account().await?;
        let allowance = self.wallet.allowance(self.token, owner, self.vault).await?;
        debug!(%allowance, needed = %flow.amount_units, "Read current allowance");
        if allowance >= flow.amount_units {
            info!(vault = %self.vault, "Allowance already covers the loan, skipping approve");
            flow.already_approved = true;
            flow.advance(LoanStep::Approved);
            self.persist(flow);
            return Ok(true);
        }
        Ok(false)
    }

    /// Submit `approve(vault, amount)`.
    pub async fn approve(&self, flow: &mut LoanFlow) -> Result<TxHash, LendError> {
        expect_step(flow, LoanStep::Idle, "approve")?;
        let tx = self
            .wallet
            .approve(self.token, self.vault, flow.amount_units)
            .await?;
        info!(tx_hash = %tx, amount = %flow.amount_units, "Approve submitted");
        flow.approve_tx = Some(tx.clone());
        flow.advance(LoanStep::Approving);
        self.persist(flow);
        Ok(tx)
    }

    /// Wait for the approval, racing allowance re-reads against the
    /// receipt. May be called again after a `Stuck` outcome.
    pub async fn await_approval(&self, flow: &mut LoanFlow) -> Result<WaitOutcome, LendError> {
        expect_step(flow, LoanStep::Approving, "wait for approval")?;
        let Some(tx) = flow.approve_tx.clone() else {
            return Err(LendError::InvalidStep {
                step: flow.step,
                action: "wait for approval without an approve transaction",
            });
        };
        let owner = self.wallet.account().await?;
        let needed = flow.amount_units;

        let outcome = tokio::select! {
            biased;

            () = self.watch_allowance(owner, needed) => {
                WaitOutcome::Confirmed(ApprovalSource::Allowance)
            }

            receipt = wait_for_receipt(self.wallet.as_ref(), &tx, self.timings.receipt_poll_interval) => {
                if !receipt.success {
                    warn!(tx_hash = %tx, "Approve reverted");
                    return Err(LendError::Reverted(tx));
                }
                WaitOutcome::Confirmed(ApprovalSource::Receipt)
            }

            () = tokio::time::sleep(self.timings.stuck_timeout) => WaitOutcome::Stuck,
        };

        match outcome {
            WaitOutcome::Confirmed(source) => {
                info!(tx_hash = %tx, ?source, "Approval confirmed");
                flow.advance(LoanStep::Approved);
            }
            WaitOutcome::Stuck => {
                warn!(tx_hash = %tx, "Approval not observed before timeout");
                flow.stuck = true;
            }
        }
        self.persist(flow);
        Ok(outcome)
    }

    /// Submit `lend(amount, interestRateBps)` to the vault.
    pub async fn lend(&self, flow: &mut LoanFlow) -> Result<TxHash, LendError> {
        expect_step(flow, LoanStep::Approved, "lend")?;
        let tx = self
            .wallet
            .lend(self.vault, flow.amount_units, flow.interest_rate_bps)
            .await?;
        info!(tx_hash = %tx, amount = %flow.amount_units, bps = flow.interest_rate_bps, "Lend submitted");
        flow.lend_tx = Some(tx.clone());
        flow.advance(LoanStep::Lending);
        self.persist(flow);
        Ok(tx)
    }

    /// Wait for the lend receipt.
    pub async fn await_lend(&self, flow: &mut LoanFlow) -> Result<WaitOutcome, LendError> {
        expect_step(flow, LoanStep::Lending, "wait for lend")?;
        let Some(tx) = flow.lend_tx.clone() else {
            return Err(LendError::InvalidStep {
                step: flow.step,
                action: "wait for lend without a lend transaction",
            });
        };
        let wait = wait_for_receipt(
            self.wallet.as_ref(),
            &tx,
            self.timings.receipt_poll_interval,
        );
        let outcome = match tokio::time::timeout(self.timings.stuck_timeout, wait).await {
            Ok(receipt) if receipt.success => {
                info!(tx_hash = %tx, "Lend confirmed");
                flow.advance(LoanStep::Done);
                WaitOutcome::Confirmed(ApprovalSource::Receipt)
            }
            Ok(_) => {
                warn!(tx_hash = %tx, "Lend reverted");
                return Err(LendError::Reverted(tx));
            }
            Err(_) => {
                warn!(tx_hash = %tx, "Lend not confirmed before timeout");
                flow.stuck = true;
                WaitOutcome::Stuck
            }
        };
        self.persist(flow);
        Ok(outcome)
    }

    /// "I confirmed on the explorer, proceed." Only offered once a wait
    /// has timed out.
    pub fn override_confirmed(&self, flow: &mut LoanFlow) -> Result<WaitOutcome, LendError> {
        if !flow.can_override() {
            return Err(LendError::InvalidStep {
                step: flow.step,
                action: "override confirmation",
            });
        }
        let next = match flow.step {
            LoanStep::Approving => LoanStep::Approved,
            _ => LoanStep::Done,
        };
        info!(from = %flow.step, to = %next, "Manual confirmation override");
        flow.advance(next);
        self.persist(flow);
        Ok(WaitOutcome::Confirmed(ApprovalSource::Manual))
    }

    /// Abandon the current attempt and return to `idle`.
    pub fn start_over(&self, flow: &mut LoanFlow) {
        info!(from = %flow.step, "Loan flow restarted");
        flow.start_over();
        self.persist(flow);
    }

    async fn watch_allowance(&self, owner: Address, needed: U256) {
        while !self.allowance_covers(owner, needed).await {}
    }

    async fn allowance_covers(&self, owner: Address, needed: U256) -> bool {
        match self.wallet.allowance(self.token, owner, self.vault).await {
            Ok(allowance) if allowance >= needed => true,
            Ok(allowance) => {
                debug!(%allowance, %needed, "Allowance not updated yet");
                tokio::time::sleep(self.timings.allowance_poll_interval).await;
                false
            }
            Err(e) => {
                warn!(error = %e, "Allowance read failed, retrying");
                tokio::time::sleep(self.timings.allowance_poll_interval).await;
                false
            }
        }
    }

    fn persist(&self, flow: &LoanFlow) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        let result = match flow.step {
            LoanStep::Idle | LoanStep::Done => persistence.clear(),
            _ => persistence.save(flow),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist loan flow");
        }
    }
}

fn expect_step(flow: &LoanFlow, step: LoanStep, action: &'static str) -> Result<(), LendError> {
    if flow.step == step {
        Ok(())
    } else {
        Err(LendError::InvalidStep {
            step: flow.step,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LendingLimits;
    use crate::persistence::{KeyValueStore, MemoryStore};
    use crate::testing::{FakeWallet, TOKEN, VAULT, WalletFailure, address, units};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn status() -> AgentStatus {
        AgentStatus {
            vault_address: Some(VAULT.into()),
            ..AgentStatus::default()
        }
    }

    fn executor(wallet: Arc<FakeWallet>) -> LendExecutor {
        LendExecutor::for_agent(wallet, address(TOKEN), &status(), FlowTimings::default()).unwrap()
    }

    fn loan() -> LoanFlow {
        LoanFlow::new(Decimal::new(100, 0), 6, 750, "base", &LendingLimits::default()).unwrap()
    }

    #[test]
    fn test_missing_vault_is_refused() {
        let wallet = Arc::new(FakeWallet::new());
        let result = LendExecutor::for_agent(wallet, address(TOKEN), &AgentStatus::default(), FlowTimings::default());
        assert!(matches!(
            result,
            Err(LendError::Security(SecurityError::MissingAuthoritativeAddress))
        ));
    }

    #[test]
    fn test_malformed_vault_is_refused() {
        let wallet = Arc::new(FakeWallet::new());
        let status = AgentStatus {
            vault_address: Some("0xnot-a-vault".into()),
            ..AgentStatus::default()
        };
        let result = LendExecutor::for_agent(wallet, address(TOKEN), &status, FlowTimings::default());
        assert!(matches!(result, Err(LendError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_existing_allowance_skips_approve() {
        let wallet = Arc::new(FakeWallet::new());
        wallet.script_allowances([Some(U256::MAX)]);
        let exec = executor(wallet.clone());
        let mut flow = loan();

        assert!(exec.check_allowance(&mut flow).await.unwrap());
        assert_eq!(flow.step, LoanStep::Approved);
        assert!(flow.already_approved);
        assert!(wallet.approvals.lock().unwrap().is_empty());

        exec.lend(&mut flow).await.unwrap();
        assert_eq!(wallet.loans.lock().unwrap()[0], (address(VAULT), units(100_000_000), 750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowance_confirms_before_receipt() {
        let wallet = Arc::new(FakeWallet::new());
        wallet.script_allowances([Some(U256::ZERO), Some(U256::ZERO), Some(units(100_000_000))]);
        wallet.receipt_on(None);
        let exec = executor(wallet.clone());
        let mut flow = loan();

        assert!(!exec.check_allowance(&mut flow).await.unwrap());
        exec.approve(&mut flow).await.unwrap();
        assert_eq!(wallet.approvals.lock().unwrap()[0], (address(TOKEN), address(VAULT), units(100_000_000)));
        assert_eq!(flow.step, LoanStep::Approving);

        let outcome = exec.await_approval(&mut flow).await.unwrap();
        assert_eq!(outcome, WaitOutcome::Confirmed(ApprovalSource::Allowance));
        assert_eq!(flow.step, LoanStep::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowance_wins_when_both_ready() {
        let wallet = Arc::new(FakeWallet::new());
        wallet.script_allowances([Some(units(100_000_000))]);
        wallet.receipt_on(Some(1));
        let exec = executor(wallet.clone());
        let mut flow = loan();

        exec.approve(&mut flow).await.unwrap();
        let outcome = exec.await_approval(&mut flow).await.unwrap();
        assert_eq!(outcome, WaitOutcome::Confirmed(ApprovalSource::Allowance));
        assert_eq!(flow.step, LoanStep::Approved);
        assert_eq!(wallet.allowance_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_confirms_when_allowance_lags() {
        let wallet = Arc::new(FakeWallet::new());
        wallet.receipt_on(Some(2));
        let exec = executor(wallet.clone());
        let mut flow = loan();

        exec.approve(&mut flow).await.unwrap();
        let outcome = exec.await_approval(&mut flow).await.unwrap();
        assert_eq!(outcome, WaitOutcome::Confirmed(ApprovalSource::Receipt));
        assert_eq!(flow.step, LoanStep::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_approval_then_override_and_lend() {
        let wallet = Arc::new(FakeWallet::new());
        wallet.receipt_on(None);
        let exec = executor(wallet.clone());
        let mut flow = loan();

        assert!(exec.override_confirmed(&mut flow).is_err());
        exec.approve(&mut flow).await.unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(exec.await_approval(&mut flow).await.unwrap(), WaitOutcome::Stuck);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(flow.step, LoanStep::Approving);
        assert!(flow.can_override());

        assert_eq!(
            exec.override_confirmed(&mut flow).unwrap(),
            WaitOutcome::Confirmed(ApprovalSource::Manual)
        );
        assert_eq!(flow.step, LoanStep::Approved);
        assert!(!flow.stuck);

        wallet.receipt_on(Some(1));
        exec.lend(&mut flow).await.unwrap();
        assert_eq!(exec.await_lend(&mut flow).await.unwrap(), WaitOutcome::Confirmed(ApprovalSource::Receipt));
        assert_eq!(flow.step, LoanStep::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_approve() {
        let wallet = Arc::new(FakeWallet::new());
        *wallet.receipt_success.lock().unwrap() = false;
        let exec = executor(wallet);
        let mut flow = loan();

        exec.approve(&mut flow).await.unwrap();
        assert!(matches!(exec.await_approval(&mut flow).await, Err(LendError::Reverted(_))));
        assert_eq!(flow.step, LoanStep::Approving);
    }

    #[tokio::test]
    async fn test_rejected_approve_keeps_idle() {
        let wallet = Arc::new(FakeWallet::new());
        *wallet.fail_submissions.lock().unwrap() = Some(WalletFailure::Reject);
        let exec = executor(wallet);
        let mut flow = loan();

        assert!(matches!(exec.approve(&mut flow).await, Err(LendError::Rejected)));
        assert_eq!(flow.step, LoanStep::Idle);
    }

    #[tokio::test]
    async fn test_lend_requires_approval() {
        let exec = executor(Arc::new(FakeWallet::new()));
        let mut flow = loan();
        assert!(matches!(
            exec.lend(&mut flow).await,
            Err(LendError::InvalidStep { step: LoanStep::Idle, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_persisted_until_done() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let persistence = LoanPersistence::loans(store);
        let wallet = Arc::new(FakeWallet::new());
        let exec = executor(wallet).with_persistence(persistence.clone());
        let mut flow = loan();

        exec.approve(&mut flow).await.unwrap();
        let saved = persistence.load().unwrap().unwrap();
        assert_eq!(saved.step, LoanStep::Approving);
        assert_eq!(saved.approve_tx, flow.approve_tx);

        exec.start_over(&mut flow);
        assert_eq!(persistence.load().unwrap(), None);

        exec.approve(&mut flow).await.unwrap();
        exec.await_approval(&mut flow).await.unwrap();
        exec.lend(&mut flow).await.unwrap();
        assert_eq!(persistence.load().unwrap().unwrap().step, LoanStep::Lending);
        exec.await_lend(&mut flow).await.unwrap();
        assert_eq!(persistence.load().unwrap(), None);
    }
}
