//! Election phase as reported by the contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The election's current stage.
///
/// The contract reports an ordinal; anything outside the known range maps to
/// [`ElectionPhase::Unknown`] rather than failing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionPhase {
    /// Voters and candidates are being registered.
    Registration,
    /// Registered voters may cast their vote.
    Voting,
    /// Voting has closed and results are final.
    Finished,
    /// The phase could not be determined.
    #[default]
    Unknown,
}

impl ElectionPhase {
    /// Map the contract's state ordinal onto a phase.
    pub fn from_ordinal(ordinal: u64) -> Self {
        match ordinal {
            0 => Self::Registration,
            1 => Self::Voting,
            2 => Self::Finished,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "Registration",
            Self::Voting => "Voting",
            Self::Finished => "Finished",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ElectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ordinals() {
        assert_eq!(ElectionPhase::from_ordinal(0), ElectionPhase::Registration);
        assert_eq!(ElectionPhase::from_ordinal(1), ElectionPhase::Voting);
        assert_eq!(ElectionPhase::from_ordinal(2), ElectionPhase::Finished);
    }

    #[test]
    fn labels() {
        assert_eq!(ElectionPhase::Voting.to_string(), "Voting");
        assert_eq!(ElectionPhase::default(), ElectionPhase::Unknown);
    }
}
