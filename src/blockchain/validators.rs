//! Input validation for addresses, private keys, and amounts.
//!
//! All functions are pure and deterministic.

use std::fmt;

use alloy::hex;
use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{TransferError, TransferResult};
use crate::blockchain::wallet::PrivateKey;

/// Decimal places of the native asset.
pub const NATIVE_DECIMALS: usize = 18;

/// A strictly positive amount of the native asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount {
    wei: U256,
}

impl Amount {
    pub fn from_wei(wei: U256) -> Option<Self> {
        (!wei.is_zero()).then_some(Self { wei })
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_ether(self.wei))
    }
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate a `0x`-prefixed, 40 hex digit address.
///
/// Mixed-case input is accepted as-is; the returned address displays in
/// checksummed form.
pub fn validate_address(raw: &str) -> TransferResult<Address> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("0x").ok_or_else(|| {
        TransferError::AddressIncorrect(format!("'{}' is missing the 0x prefix", raw))
    })?;

    if digits.len() != 40 || !is_hex(digits) {
        return Err(TransferError::AddressIncorrect(format!(
            "'{}' is not 40 hexadecimal characters",
            raw
        )));
    }

    raw.parse::<Address>()
        .map_err(|e| TransferError::AddressIncorrect(e.to_string()))
}

/// Validate a 64 hex digit private key, optionally `0x`-prefixed.
///
/// The error never echoes the input.
pub fn validate_private_key(raw: &str) -> TransferResult<PrivateKey> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("0x").unwrap_or(raw);

    if digits.len() != 64 || !is_hex(digits) {
        return Err(TransferError::KeyIncorrect(
            "expected 64 hexadecimal characters".to_string(),
        ));
    }

    let bytes = hex::decode(digits)
        .map_err(|_| TransferError::KeyIncorrect("not hexadecimal".to_string()))?;
    let signer = PrivateKeySigner::from_slice(&bytes).map_err(|_| {
        TransferError::KeyIncorrect("not a valid secp256k1 scalar".to_string())
    })?;

    Ok(PrivateKey::new(signer))
}

/// Parse a positive decimal amount of the native asset into wei.
pub fn validate_amount(raw: &str) -> TransferResult<Amount> {
    let raw = raw.trim();
    let invalid = |reason: &str| TransferError::AmountIncorrect(format!("'{}': {}", raw, reason));

    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("not a number"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a number"));
    }
    if fraction.len() > NATIVE_DECIMALS {
        return Err(invalid("too many decimal places (max 18)"));
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| invalid("too large"))?
    };
    let padded = format!("{:0<width$}", fraction, width = NATIVE_DECIMALS);
    let fraction = U256::from_str_radix(&padded, 10).map_err(|_| invalid("not a number"))?;

    let wei = whole
        .checked_mul(U256::from(10u64).pow(U256::from(NATIVE_DECIMALS as u64)))
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| invalid("too large"))?;

    Amount::from_wei(wei).ok_or_else(|| invalid("must be greater than zero"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_valid_address_is_checksummed() {
        let raw = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
        let address = validate_address(raw).unwrap();
        let checksummed = address.to_checksum(None);
        assert_eq!(checksummed, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert!(checksummed.eq_ignore_ascii_case(raw));
        assert_eq!(address.to_string(), checksummed);
    }

    #[test]
    fn test_malformed_addresses() {
        for raw in [
            "",
            "f39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb9226",
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb922666",
            "0xg39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "0x",
        ] {
            assert!(
                matches!(validate_address(raw), Err(TransferError::AddressIncorrect(_))),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn test_private_key_with_and_without_prefix() {
        let plain = validate_private_key(TEST_PRIVATE_KEY).unwrap();
        let prefixed = validate_private_key(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(plain.address(), prefixed.address());
        assert_eq!(
            plain.address(),
            validate_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap()
        );
    }

    #[test]
    fn test_invalid_private_keys() {
        let zero = "0".repeat(64);
        let above_order = "f".repeat(64);
        let too_long = format!("{}0", TEST_PRIVATE_KEY);
        let not_hex = format!("zz{}", &TEST_PRIVATE_KEY[2..]);
        for raw in [
            "invalid_key",
            &TEST_PRIVATE_KEY[..63],
            too_long.as_str(),
            not_hex.as_str(),
            zero.as_str(),
            above_order.as_str(),
        ] {
            let err = validate_private_key(raw).unwrap_err();
            assert!(matches!(err, TransferError::KeyIncorrect(_)));
            assert!(!err.to_string().contains(TEST_PRIVATE_KEY));
        }
    }

    #[test]
    fn test_amount_conversion() {
        let amount = validate_amount("0.1").unwrap();
        assert_eq!(amount.wei(), U256::from(100_000_000_000_000_000u128));
        assert_eq!(validate_amount("1").unwrap().wei(), U256::from(10u128.pow(18)));
        assert_eq!(validate_amount(".5").unwrap().wei(), U256::from(5 * 10u128.pow(17)));
        assert_eq!(validate_amount("0.000000000000000001").unwrap().wei(), U256::from(1));
        assert_eq!(amount.to_string(), format_ether(amount.wei()));
    }

    #[test]
    fn test_non_positive_or_garbage_amounts() {
        let too_precise = "0.0000000000000000001";
        for raw in ["", "0", "0.0", "-1", "+1", "abc", "1.2.3", ".", "1e5", too_precise] {
            assert!(
                matches!(validate_amount(raw), Err(TransferError::AmountIncorrect(_))),
                "{raw:?}"
            );
        }
    }
}
