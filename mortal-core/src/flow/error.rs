use mortal_sdk::client::ClientError;
use thiserror::Error;

use super::state::FlowStep;
use crate::executor::PaymentError;
use crate::persistence::PersistenceError;
use crate::verify::{SecurityError, ValidationError};

/// Errors surfaced by [`OrderFlowController`](super::OrderFlowController).
///
/// None of these leave the flow in a broken state: the controller only
/// commits a transition after every fallible step has succeeded, so on error
/// the flow is exactly where it was before the call.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Rejected locally before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Payment blocked. Never downgraded to a warning.
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("agent request failed: {0}")]
    Network(#[from] ClientError),

    #[error("local storage error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("cannot {action} in the {step} step")]
    InvalidTransition { step: FlowStep, action: &'static str },
}

/// How an error should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Security,
    /// Wallet rejection or provider failure; a retry is offered.
    Wallet,
    Network,
    /// A programming or usage error in driving the flow.
    Flow,
}

impl FlowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FlowError::Validation(_) => ErrorCategory::Validation,
            FlowError::Security(_) => ErrorCategory::Security,
            FlowError::Payment(
                PaymentError::MissingTokenContract(_)
                | PaymentError::InvalidAddress(_)
                | PaymentError::ChainMismatch { .. },
            ) => ErrorCategory::Flow,
            FlowError::Payment(_) => ErrorCategory::Wallet,
            FlowError::Network(_) => ErrorCategory::Network,
            FlowError::Persistence(_) | FlowError::InvalidTransition { .. } => ErrorCategory::Flow,
        }
    }

    /// A wallet rejection, shown as a neutral notice instead of an error.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, FlowError::Payment(PaymentError::Rejected))
    }
}
