//! State-changing contract calls.

use ballot_types::AccountAddress;
use ethers_core::abi::Token;
use ethers_core::types::U256;
use std::fmt;

use crate::abi::encode_call;

/// One mutating operation on the election contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContractCall {
    RegisterVoter(AccountAddress),
    AddCandidate(String),
    StartVoting,
    EndVoting,
    Vote(u64),
}

impl ContractCall {
    /// Solidity signature used to derive the selector.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::RegisterVoter(_) => "registerVoter(address)",
            Self::AddCandidate(_) => "addCandidate(string)",
            Self::StartVoting => "startVoting()",
            Self::EndVoting => "endVoting()",
            Self::Vote(_) => "vote(uint256)",
        }
    }

    /// Short operation name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterVoter(_) => "register_voter",
            Self::AddCandidate(_) => "add_candidate",
            Self::StartVoting => "start_voting",
            Self::EndVoting => "end_voting",
            Self::Vote(_) => "vote",
        }
    }

    /// Call data: selector followed by the ABI-encoded argument.
    pub fn encode(&self) -> Vec<u8> {
        let args = match self {
            Self::RegisterVoter(voter) => vec![Token::Address(voter.to_h160())],
            Self::AddCandidate(name) => vec![Token::String(name.clone())],
            Self::StartVoting | Self::EndVoting => Vec::new(),
            Self::Vote(candidate_id) => vec![Token::Uint(U256::from(*candidate_id))],
        };
        encode_call(self.signature(), &args)
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterVoter(voter) => write!(f, "register voter {voter}"),
            Self::AddCandidate(name) => write!(f, "add candidate \"{name}\""),
            Self::StartVoting => f.write_str("start voting"),
            Self::EndVoting => f.write_str("end voting"),
            Self::Vote(candidate_id) => write!(f, "vote for candidate {candidate_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argumentless_calls_are_selector_only() {
        assert_eq!(ContractCall::StartVoting.encode().len(), 4);
        assert_eq!(ContractCall::EndVoting.encode().len(), 4);
        assert_ne!(
            ContractCall::StartVoting.encode(),
            ContractCall::EndVoting.encode()
        );
    }

    #[test]
    fn vote_encodes_candidate_id_as_last_word() {
        let data = ContractCall::Vote(5).encode();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 5);
    }

    #[test]
    fn add_candidate_encodes_dynamic_string() {
        let data = ContractCall::AddCandidate("Alice".into()).encode();
        // selector + offset word + length word + one padded data word
        assert_eq!(data.len(), 4 + 32 * 3);
    }
}
