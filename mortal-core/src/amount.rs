//! Conversion between human token amounts and on-chain base units.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("amount {amount} overflows at {decimals} decimals")]
    Overflow { amount: Decimal, decimals: u8 },
}

fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Convert `amount` to integer base units of a token with `decimals`
/// decimals.
///
/// Any precision finer than one base unit is truncated toward zero, so the
/// result never implies a fractional base unit.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }
    let overflow = || AmountError::Overflow { amount, decimals };
    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scaled = pow10(u32::from(decimals))
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(overflow)?;
    let divisor = pow10(amount.scale()).ok_or_else(overflow)?;
    Ok(scaled / divisor)
}

/// Render base units as a human amount, e.g. `5000000` at 6 decimals is
/// `"5"` and `1500000` is `"1.5"`.
pub fn from_base_units(units: U256, decimals: u8) -> String {
    let digits = units.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_owned()
    } else {
        format!("{whole}.{frac}")
    }
}
