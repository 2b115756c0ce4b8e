//! Client-side checks that run before anything touches the network or
//! moves funds.

pub mod address;
pub mod tx_hash;

pub use address::{SecurityError, VerifiedOrder, verify_payment_address};
pub use tx_hash::{TxHash, ValidationError, is_valid_tx_hash};
