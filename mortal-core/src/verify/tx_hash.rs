//! Transaction hash format check.
//!
//! Runs before the hash is sent anywhere, so a typo never costs a backend
//! verification attempt.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TX_HASH_HEX_LEN: usize = 64;

/// Input rejected locally, without a network round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid transaction hash: expected 0x followed by 64 hex characters")]
    MalformedTxHash,

    #[error("amount {amount} is below the minimum of {minimum}")]
    AmountBelowMinimum { amount: String, minimum: String },

    #[error("interest rate {bps} bps is outside 1..={max}")]
    InterestRateOutOfRange { bps: u32, max: u32 },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// `true` iff `value` is exactly `0x` followed by 64 hex digits.
pub fn is_valid_tx_hash(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(hex) => hex.len() == TX_HASH_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// A transaction hash that passed [`is_valid_tx_hash`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    /// Parse user input. Surrounding whitespace is trimmed first.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if is_valid_tx_hash(trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(ValidationError::MalformedTxHash)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234…cdef`, for compact display.
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TxHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TxHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<B256> for TxHash {
    fn from(value: B256) -> Self {
        Self(format!("0x{}", hex::encode(value)))
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_of(len: usize) -> String {
        "ab".repeat(len / 2) + if len % 2 == 1 { "c" } else { "" }
    }

    #[test]
    fn test_accepts_64_hex_chars() {
        assert!(is_valid_tx_hash(&format!("0x{}", hex_of(64))));
        assert!(is_valid_tx_hash(&format!("0x{}", "F".repeat(64))));
        assert!(is_valid_tx_hash(&format!("0x{}", "0123456789abcdefABCDEF".repeat(3)[..64].to_owned())));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(!is_valid_tx_hash(&format!("0x{}", hex_of(63))));
        assert!(!is_valid_tx_hash(&format!("0x{}", hex_of(65))));
        assert!(!is_valid_tx_hash("0x"));
        assert!(!is_valid_tx_hash(""));
    }

    #[test]
    fn test_rejects_bad_prefix_and_chars() {
        assert!(!is_valid_tx_hash(&hex_of(66)));
        assert!(!is_valid_tx_hash(&format!("0X{}", hex_of(64))));
        assert!(!is_valid_tx_hash(&format!("0x{}g", hex_of(63))));
        assert!(!is_valid_tx_hash(&format!(" 0x{}", hex_of(64))));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let raw = format!("0x{}", hex_of(64));
        let parsed = TxHash::parse(&format!("  {raw}\n")).unwrap();
        assert_eq!(parsed.as_str(), raw);
        assert_eq!(TxHash::parse("   "), Err(ValidationError::MalformedTxHash));
    }

    #[test]
    fn test_serde_validates() {
        let raw = format!("\"0x{}\"", hex_of(64));
        let hash: TxHash = serde_json::from_str(&raw).unwrap();
        assert_eq!(serde_json::to_string(&hash).unwrap(), raw);
        assert!(serde_json::from_str::<TxHash>("\"0x1234\"").is_err());
    }

    #[test]
    fn test_from_b256() {
        let hash = TxHash::from(B256::repeat_byte(0xab));
        assert_eq!(hash.as_str(), format!("0x{}", hex_of(64)));
        assert!(is_valid_tx_hash(hash.as_str()));
    }

    #[test]
    fn test_short_form() {
        let hash = TxHash::parse(&format!("0x{}", hex_of(64))).unwrap();
        assert_eq!(hash.short(), "0xabab…abab");
    }
}
