use std::fmt;

use thiserror::Error;

/// Why a submitted transaction did not confirm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Mined, but execution reverted. State is unchanged.
    Reverted,
    /// The node forgot the transaction without mining it.
    Dropped,
    /// Another transaction with the same nonce was mined instead.
    Replaced,
    /// The outcome could not be observed (transport failure while waiting).
    Unknown,
}

impl FailureReason {
    /// Whether the contract state may have changed despite the failure.
    pub fn may_have_landed(&self) -> bool {
        !matches!(self, Self::Reverted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reverted => "reverted",
            Self::Dropped => "dropped",
            Self::Replaced => "replaced",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transient read failure. Never to be read as a false or zero value.
    #[error("contract read failed: {0}")]
    RemoteRead(String),

    #[error("transaction rejected before submission: {0}")]
    SubmissionRejected(String),

    #[error("transaction {reason}: {message}")]
    ConfirmationFailed {
        reason: FailureReason,
        message: String,
    },
}

impl GatewayError {
    pub fn confirmation(reason: FailureReason, message: impl Into<String>) -> Self {
        Self::ConfirmationFailed {
            reason,
            message: message.into(),
        }
    }
}
