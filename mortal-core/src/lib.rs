#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod amount;
pub mod api;
pub mod config;
pub mod events;
pub mod executor;
pub mod flow;
pub mod order;
pub mod persistence;
pub mod processors;
pub mod verify;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;
