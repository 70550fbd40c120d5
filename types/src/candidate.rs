//! Candidate record.

use serde::{Deserialize, Serialize};

/// A candidate as stored by the contract. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: u64,
    pub name: String,
    pub vote_count: u64,
}

impl Candidate {
    pub fn new(id: u64, name: impl Into<String>, vote_count: u64) -> Self {
        Self {
            id,
            name: name.into(),
            vote_count,
        }
    }
}
