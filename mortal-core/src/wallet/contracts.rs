//! Contract interfaces for the calls the flows make.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use thiserror::Error;

// ERC-20 token and agent vault interfaces.
sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
    }

    interface ILendingVault {
        function lend(uint256 amount, uint256 interestRateBps) external;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0:?}")]
pub struct InvalidAddress(pub String);

/// Parse a `0x`-prefixed 20-byte address. Checksum casing is not enforced.
pub fn parse_address(address: &str) -> Result<Address, InvalidAddress> {
    let invalid = || InvalidAddress(address.to_owned());
    if !address.starts_with("0x") {
        return Err(invalid());
    }
    address.parse().map_err(|_| invalid())
}

pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

pub fn allowance_calldata(owner: Address, spender: Address) -> Bytes {
    IERC20::allowanceCall { owner, spender }.abi_encode().into()
}

pub fn lend_calldata(amount: U256, interest_rate_bps: u32) -> Bytes {
    ILendingVault::lendCall {
        amount,
        interestRateBps: U256::from(interest_rate_bps),
    }
    .abi_encode()
    .into()
}

/// Decode the return data of `allowance(owner, spender)`.
pub fn decode_allowance(data: &[u8]) -> Result<U256, alloy::sol_types::Error> {
    IERC20::allowanceCall::abi_decode_returns(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TO: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_selectors() {
        assert_eq!(IERC20::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IERC20::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
        assert_eq!(ILendingVault::lendCall::SELECTOR, [0x91, 0x10, 0xdf, 0x85]);
    }

    #[test]
    fn test_transfer_calldata() {
        let data = transfer_calldata(parse_address(TO).unwrap(), U256::from(5_000_000u64));
        assert_eq!(
            hex::encode(&data),
            "a9059cbb\
             0000000000000000000000005aaeb6053f3e94c9b9a09f33669435e7ef1beaed\
             00000000000000000000000000000000000000000000000000000000004c4b40"
        );
    }

    #[test]
    fn test_lend_calldata() {
        let data = lend_calldata(U256::from(1u8), 500);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &[0x91, 0x10, 0xdf, 0x85]);
        assert_eq!(&data[66..], &[0x01, 0xf4]);
    }

    #[test]
    fn test_bad_address_rejected() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(parse_address("0xzzAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert_eq!(
            parse_address(&TO.to_lowercase()).unwrap(),
            parse_address(TO).unwrap()
        );
    }

    #[test]
    fn test_decode_allowance_keeps_full_width() {
        let max = [0xffu8; 32];
        assert_eq!(decode_allowance(&max).unwrap(), U256::MAX);
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(decode_allowance(&word).unwrap(), U256::from(7u8));
        assert!(decode_allowance(&[]).is_err());
    }
}
