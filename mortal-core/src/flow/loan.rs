//! Loan flow state.
//!
//! `idle → approving → approved → lending → done`, with a `stuck` flag that
//! unlocks the manual override once a confirmation wait has timed out.
//! [`LendExecutor`](crate::executor::LendExecutor) performs the network side.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::to_base_units;
use crate::config::LendingLimits;
use crate::verify::{TxHash, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStep {
    Idle,
    Approving,
    Approved,
    Lending,
    Done,
}

impl std::fmt::Display for LoanStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStep::Idle => write!(f, "idle"),
            LoanStep::Approving => write!(f, "approving"),
            LoanStep::Approved => write!(f, "approved"),
            LoanStep::Lending => write!(f, "lending"),
            LoanStep::Done => write!(f, "done"),
        }
    }
}

/// A loan request and its progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanFlow {
    pub amount: Decimal,
    /// `amount` in token base units.
    pub amount_units: U256,
    pub interest_rate_bps: u32,
    pub chain: String,
    pub step: LoanStep,
    #[serde(default)]
    pub approve_tx: Option<TxHash>,
    #[serde(default)]
    pub lend_tx: Option<TxHash>,
    /// Set when the existing allowance already covered the amount.
    #[serde(default)]
    pub already_approved: bool,
    /// A confirmation wait timed out in the current step.
    #[serde(skip)]
    pub stuck: bool,
}

impl LoanFlow {
    /// Validate a loan request. Nothing here touches the network.
    pub fn new(
        amount: Decimal,
        decimals: u8,
        interest_rate_bps: u32,
        chain: impl Into<String>,
        limits: &LendingLimits,
    ) -> Result<Self, ValidationError> {
        if amount < limits.min_amount {
            return Err(ValidationError::AmountBelowMinimum {
                amount: amount.to_string(),
                minimum: limits.min_amount.to_string(),
            });
        }
        if interest_rate_bps == 0 || interest_rate_bps > limits.max_interest_rate_bps {
            return Err(ValidationError::InterestRateOutOfRange {
                bps: interest_rate_bps,
                max: limits.max_interest_rate_bps,
            });
        }
        let amount_units = to_base_units(amount, decimals)
            .map_err(|e| ValidationError::InvalidAmount(e.to_string()))?;
        Ok(Self {
            amount,
            amount_units,
            interest_rate_bps,
            chain: chain.into(),
            step: LoanStep::Idle,
            approve_tx: None,
            lend_tx: None,
            already_approved: false,
            stuck: false,
        })
    }

    /// Waiting on chain for the approve or the lend transaction.
    pub fn is_waiting(&self) -> bool {
        matches!(self.step, LoanStep::Approving | LoanStep::Lending)
    }

    /// The manual "confirmed on the explorer" override is on offer.
    pub fn can_override(&self) -> bool {
        self.is_waiting() && self.stuck
    }

    /// Back to `idle`, keeping the request itself.
    pub fn start_over(&mut self) {
        self.step = LoanStep::Idle;
        self.approve_tx = None;
        self.lend_tx = None;
        self.already_approved = false;
        self.stuck = false;
    }

    pub(crate) fn advance(&mut self, step: LoanStep) {
        self.step = step;
        self.stuck = false;
    }
}
