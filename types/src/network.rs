//! Chain identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// Identifies which chain the wallet is connected to.
///
/// The contract address binding is only meaningful on one chain, so a change
/// of chain id ends the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Parse the `0x`-prefixed quantity returned by `eth_chainId`.
    pub fn from_hex(raw: &str) -> Result<Self, TypesError> {
        let digits = raw
            .strip_prefix("0x")
            .ok_or_else(|| TypesError::InvalidChainId(raw.to_string()))?;
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| TypesError::InvalidChainId(raw.to_string()))
    }

    /// Human-readable name for well-known chains.
    pub fn name(&self) -> Option<&'static str> {
        match self.0 {
            1 => Some("mainnet"),
            11155111 => Some("sepolia"),
            17000 => Some("holesky"),
            31337 => Some("localhost"),
            _ => None,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantity() {
        assert_eq!(ChainId::from_hex("0x1").unwrap(), ChainId(1));
        assert_eq!(ChainId::from_hex("0x7a69").unwrap(), ChainId(31337));
        assert!(ChainId::from_hex("31337").is_err());
        assert!(ChainId::from_hex("0xzz").is_err());
    }

    #[test]
    fn display_includes_known_name() {
        assert_eq!(ChainId(31337).to_string(), "31337 (localhost)");
        assert_eq!(ChainId(424242).to_string(), "424242");
    }
}
