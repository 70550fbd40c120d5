//! Per-account voter record.

use serde::{Deserialize, Serialize};

/// Registration and voting status of one account, as held by the contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub is_registered: bool,
    pub has_voted: bool,
    /// Only present when `has_voted` is true.
    pub voted_candidate_id: Option<u64>,
}

impl VoterRecord {
    /// Build a record from the raw contract fields.
    ///
    /// The contract always returns a candidate id; it is dropped unless the
    /// voter has actually voted.
    pub fn from_raw(is_registered: bool, has_voted: bool, voted_candidate_id: u64) -> Self {
        Self {
            is_registered,
            has_voted,
            voted_candidate_id: has_voted.then_some(voted_candidate_id),
        }
    }

    /// A registered account that has not voted yet.
    pub fn can_vote(&self) -> bool {
        self.is_registered && !self.has_voted
    }
}
