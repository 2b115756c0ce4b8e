//! SDK for the mortal agent backend.
//!
//! [`objects`] holds the request and response shapes of the agent REST
//! surface. The typed HTTP client lives in [`client`] behind the `client`
//! cargo feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
