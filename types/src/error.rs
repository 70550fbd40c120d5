//! Parse errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("address is empty")]
    EmptyAddress,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address checksum mismatch: {0}")]
    BadChecksum(String),

    #[error("invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),
}
