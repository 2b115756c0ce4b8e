//! Channel factories for background task output.

use tokio::sync::{mpsc, watch};

use super::types::{PollEvent, StatusSnapshot};

/// Buffer of the poll event channel. A poller produces at most one event
/// per tick, and the controller drains them as they come.
pub const DEFAULT_CHANNEL_BUFFER: usize = 16;

/// Sender handle for poll events.
pub type PollEventSender = mpsc::Sender<PollEvent>;
/// Receiver handle for poll events.
pub type PollEventReceiver = mpsc::Receiver<PollEvent>;

/// Publishing side of the vault watcher.
pub type StatusSnapshotSender = watch::Sender<StatusSnapshot>;
/// Subscriber side of the vault watcher.
pub type StatusSnapshotReceiver = watch::Receiver<StatusSnapshot>;

/// Create a new poll event channel.
///
/// One channel per controller; every poller the controller spawns gets a
/// clone of the sender.
pub fn poll_event_channel() -> (PollEventSender, PollEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a status snapshot channel, starting empty.
pub fn status_snapshot_channel() -> (StatusSnapshotSender, StatusSnapshotReceiver) {
    watch::channel(StatusSnapshot::default())
}
