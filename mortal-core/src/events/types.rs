use mortal_sdk::objects::{AgentStatus, OrderStatus};
use time::OffsetDateTime;

/// A status observed by the order status poller.
///
/// Only non-failed fetches produce an event; transport errors are swallowed
/// by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEvent {
    /// Flow epoch the poller was started under.
    pub epoch: u64,
    pub order_id: String,
    pub status: OrderStatus,
}

impl PollEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Latest agent status published by the vault watcher.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    /// `None` until the first successful fetch.
    pub status: Option<AgentStatus>,
    pub fetched_at: Option<OffsetDateTime>,
    /// Consecutive failed fetches since the last success.
    pub failures: u32,
}
