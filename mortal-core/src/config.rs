//! Runtime tuning for the order and loan flows.
//!
//! The defaults are product policy. A deployment may override any of them;
//! the binary reads overrides from its configuration file.

use std::time::Duration;

use rust_decimal::Decimal;

/// Intervals and timeouts used by the pollers and confirmation waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTimings {
    /// Order status poll interval while waiting for delivery.
    pub purchase_poll_interval: Duration,
    /// Agent status refresh interval for dashboard-style views.
    pub dashboard_poll_interval: Duration,
    /// Receipt poll interval while a transaction confirms.
    pub receipt_poll_interval: Duration,
    /// Allowance re-read interval while an approval confirms.
    pub allowance_poll_interval: Duration,
    /// How long a confirmation wait runs before the manual override is
    /// offered. The on-chain transaction is never cancelled.
    pub stuck_timeout: Duration,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            purchase_poll_interval: Duration::from_secs(3),
            dashboard_poll_interval: Duration::from_secs(15),
            receipt_poll_interval: Duration::from_secs(3),
            allowance_poll_interval: Duration::from_secs(3),
            stuck_timeout: Duration::from_secs(60),
        }
    }
}

/// Limits applied to loan requests before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingLimits {
    /// Smallest accepted loan, in whole tokens.
    pub min_amount: Decimal,
    /// Largest accepted interest rate in basis points.
    pub max_interest_rate_bps: u32,
}

impl Default for LendingLimits {
    fn default() -> Self {
        Self {
            min_amount: Decimal::ONE,
            max_interest_rate_bps: 10_000,
        }
    }
}
