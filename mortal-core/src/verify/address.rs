//! Payment address verification.
//!
//! The order-creation response names the address to pay, but that response
//! could come from a compromised or stale path. Before any transfer the
//! address is corroborated against the vault address reported by an
//! independent `GET /status` call. The check fails closed: an unknown
//! authoritative address is treated exactly like a mismatch.

use thiserror::Error;

use crate::order::Order;

/// Payment must not proceed. Never downgraded to a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error(
        "SECURITY: the agent did not report a vault address, so the payment address \
         cannot be verified; payment is blocked"
    )]
    MissingAuthoritativeAddress,

    #[error(
        "SECURITY: payment address {received} does not match the agent vault \
         {expected}; payment is blocked"
    )]
    AddressMismatch { expected: String, received: String },
}

/// Compare the order's payment address with the authoritative one.
///
/// Comparison is ASCII case-insensitive, since EVM addresses differ only in
/// checksum casing. A missing or blank authoritative address fails.
pub fn check_payment_address(
    authoritative: Option<&str>,
    candidate: &str,
) -> Result<(), SecurityError> {
    let expected = match authoritative {
        Some(addr) if !addr.trim().is_empty() => addr,
        _ => return Err(SecurityError::MissingAuthoritativeAddress),
    };
    if candidate.is_empty() || !expected.eq_ignore_ascii_case(candidate) {
        return Err(SecurityError::AddressMismatch {
            expected: expected.to_owned(),
            received: candidate.to_owned(),
        });
    }
    Ok(())
}

/// An order whose payment address passed [`check_payment_address`].
///
/// Everything that moves funds takes a `&VerifiedOrder`, so there is no way
/// to reach a transfer with an order that skipped verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedOrder {
    order: Order,
}

impl VerifiedOrder {
    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn order_id(&self) -> &str {
        &self.order.order_id
    }

    pub fn payment_address(&self) -> &str {
        &self.order.payment_address
    }

    /// Rebuild from a local snapshot. Snapshots are only ever written for
    /// orders that already passed verification.
    pub(crate) fn restore(order: Order) -> Self {
        Self { order }
    }
}

/// Verify `order` against the authoritative vault address.
pub fn verify_payment_address(
    authoritative: Option<&str>,
    order: Order,
) -> Result<VerifiedOrder, SecurityError> {
    check_payment_address(authoritative, &order.payment_address)?;
    Ok(VerifiedOrder { order })
}
