//! The purchase and loan flows.
//!
//! [`OrderFlowController`] owns one purchase flow: it performs the network
//! calls, feeds their results through [`reduce`], and carries out the
//! resulting effects (snapshot writes, poller start and stop). The loan
//! flow is a plain value driven by [`LendExecutor`](crate::executor::LendExecutor).

pub mod controller;
pub mod error;
pub mod loan;
pub mod state;

pub use controller::{OrderFlowController, ResumeOutcome, WalletPayment};
pub use error::{ErrorCategory, FlowError};
pub use loan::{LoanFlow, LoanStep};
pub use state::{
    DeliveryContent, Effect, FlowEvent, FlowState, FlowStep, SelectedService, Transition, reduce,
};
