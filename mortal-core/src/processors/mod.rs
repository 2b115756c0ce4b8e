//! Background tasks.
//!
//! - [`OrderStatusPoller`]: polls one order until it reaches a terminal
//!   status, reporting each observed status as a [`PollEvent`](crate::events::PollEvent).
//! - [`VaultStatusWatcher`]: refreshes the agent status for dashboard views.
//! - [`TaskSlot`]: owns at most one spawned task and aborts it on
//!   replacement or drop.

pub mod status_poller;
pub mod task_slot;
pub mod vault_watcher;

pub use status_poller::OrderStatusPoller;
pub use task_slot::TaskSlot;
pub use vault_watcher::VaultStatusWatcher;
