//! Account address type (20-byte Ethereum-style address).

use ethers_core::types::{Address, H160};
use ethers_core::utils::to_checksum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// An account address as reported by the wallet or stored in the contract.
///
/// Equality is byte-wise, so two addresses that differ only in hex letter case
/// compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(Address);

impl AccountAddress {
    /// Number of hex digits in a textual address (without the `0x` prefix).
    pub const HEX_LEN: usize = 40;

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(H160(bytes))
    }

    /// Parse and validate a textual address.
    ///
    /// Accepts 40 hex digits with an optional `0x` prefix. All-lowercase and
    /// all-uppercase input is accepted as is; mixed-case input must match its
    /// EIP-55 checksum.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyAddress);
        }

        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != Self::HEX_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypesError::InvalidAddress(trimmed.to_string()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| TypesError::InvalidAddress(trimmed.to_string()))?;
        let address = Self::new(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(TypesError::BadChecksum(trimmed.to_string()));
        }

        Ok(address)
    }

    /// Whether `raw` is a well-formed address.
    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_fixed_bytes()
    }

    /// The underlying ABI address value.
    pub fn to_h160(&self) -> Address {
        self.0
    }

    /// EIP-55 mixed-case checksum form, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        to_checksum(&self.0, None)
    }
}

impl From<Address> for AccountAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for AccountAddress {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_checksum())
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}
