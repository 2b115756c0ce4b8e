//! Messages passed from background tasks back to the flow controller.
//!
//! Background tasks never touch flow state. They send events carrying the
//! flow epoch they were started under, and the controller applies them
//! through the reducer, which drops anything from a superseded epoch.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, PollEventReceiver, PollEventSender, StatusSnapshotReceiver,
    StatusSnapshotSender, poll_event_channel, status_snapshot_channel,
};
pub use types::{PollEvent, StatusSnapshot};
