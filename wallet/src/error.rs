use ballot_types::ChainId;
use thiserror::Error;

/// EIP-1193 error code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Broad classification of a failed provider request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The wallet endpoint could not be reached at all.
    Unreachable,
    /// The wallet answered with a JSON-RPC error object.
    Rpc,
    /// The wallet answered with something that is not a valid response.
    InvalidResponse,
}

/// A failed request to the wallet provider.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// JSON-RPC error code, when the wallet supplied one.
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unreachable,
            code: None,
            message: message.into(),
        }
    }

    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Rpc,
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidResponse,
            code: None,
            message: message.into(),
        }
    }

    /// The user declined the request in the wallet.
    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet available: {0}")]
    Unavailable(String),

    #[error("request rejected by user: {0}")]
    UserRejected(String),

    #[error("wallet is on chain {actual}, expected {expected}")]
    WrongNetwork { expected: ChainId, actual: ChainId },

    #[error("wallet provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl WalletError {
    /// Classify a provider failure that happened while requesting access.
    pub fn from_access_failure(err: ProviderError) -> Self {
        if err.is_user_rejection() {
            Self::UserRejected(err.message)
        } else if err.kind == ProviderErrorKind::Unreachable {
            Self::Unavailable(err.message)
        } else {
            Self::Provider(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_failures_are_classified() {
        assert!(matches!(
            WalletError::from_access_failure(ProviderError::rpc(4001, "denied")),
            WalletError::UserRejected(_)
        ));
        assert!(matches!(
            WalletError::from_access_failure(ProviderError::unreachable("refused")),
            WalletError::Unavailable(_)
        ));
        assert!(matches!(
            WalletError::from_access_failure(ProviderError::rpc(-32603, "internal")),
            WalletError::Provider(_)
        ));
    }
}
