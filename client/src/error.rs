use ballot_gateway::GatewayError;
use ballot_wallet::WalletError;
use thiserror::Error;

/// User-facing classification of every client failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    WalletUnavailable,
    UserRejected,
    /// Transient read failure; retryable.
    RemoteReadError,
    /// Write rejected before reaching the chain.
    SubmissionRejected,
    /// Write reached the chain but did not confirm.
    ConfirmationFailed,
    /// Local validation failed; nothing was sent.
    InvalidInput,
    /// An action was attempted without a bound account.
    NotConnected,
    /// The same logical action is already pending.
    AlreadyPending,
    /// Result belongs to a superseded account or network. Never shown.
    StaleContext,
}

impl ErrorKind {
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::StaleContext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WalletUnavailable => "WalletUnavailable",
            Self::UserRejected => "UserRejected",
            Self::RemoteReadError => "RemoteReadError",
            Self::SubmissionRejected => "SubmissionRejected",
            Self::ConfirmationFailed => "ConfirmationFailed",
            Self::InvalidInput => "InvalidInput",
            Self::NotConnected => "NotConnected",
            Self::AlreadyPending => "AlreadyPending",
            Self::StaleContext => "StaleContext",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not eligible to vote: {0}")]
    NotEligible(String),

    #[error("no wallet connected")]
    NotConnected,

    #[error("{0} is already pending")]
    AlreadyPending(String),

    #[error("account or network changed while the request was in flight")]
    StaleContext,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Wallet(WalletError::UserRejected(_)) => ErrorKind::UserRejected,
            Self::Wallet(_) => ErrorKind::WalletUnavailable,
            Self::Gateway(GatewayError::RemoteRead(_)) => ErrorKind::RemoteReadError,
            Self::Gateway(GatewayError::SubmissionRejected(_)) => ErrorKind::SubmissionRejected,
            Self::Gateway(GatewayError::ConfirmationFailed { .. }) => {
                ErrorKind::ConfirmationFailed
            }
            Self::InvalidInput(_) | Self::NotEligible(_) | Self::Config(_) => {
                ErrorKind::InvalidInput
            }
            Self::NotConnected => ErrorKind::NotConnected,
            Self::AlreadyPending(_) => ErrorKind::AlreadyPending,
            Self::StaleContext => ErrorKind::StaleContext,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_gateway::FailureReason;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            ClientError::from(WalletError::Unavailable("none".into())).kind(),
            ErrorKind::WalletUnavailable
        );
        assert_eq!(
            ClientError::from(WalletError::UserRejected("no".into())).kind(),
            ErrorKind::UserRejected
        );
        assert_eq!(
            ClientError::from(GatewayError::RemoteRead("x".into())).kind(),
            ErrorKind::RemoteReadError
        );
        assert_eq!(
            ClientError::from(GatewayError::confirmation(FailureReason::Dropped, "x")).kind(),
            ErrorKind::ConfirmationFailed
        );
        assert_eq!(
            ClientError::NotEligible("already voted".into()).kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn only_stale_context_is_hidden() {
        assert!(!ClientError::StaleContext.kind().is_user_facing());
        assert!(ClientError::NotConnected.kind().is_user_facing());
    }
}
