//! ABI encoding of contract reads and decoding of their return data.

use ballot_types::{AccountAddress, Candidate, ElectionPhase, VoterRecord};
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::U256;
use ethers_core::utils::id;

use crate::error::GatewayError;

pub const OWNER: &str = "owner()";
pub const GET_CURRENT_STATE: &str = "getCurrentState()";
pub const GET_VOTER: &str = "getVoter(address)";
pub const GET_CANDIDATES_COUNT: &str = "getCandidatesCount()";
pub const GET_CANDIDATE: &str = "getCandidate(uint256)";

/// Selector followed by the ABI-encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data
}

pub fn encode_owner() -> Vec<u8> {
    encode_call(OWNER, &[])
}

pub fn encode_get_current_state() -> Vec<u8> {
    encode_call(GET_CURRENT_STATE, &[])
}

pub fn encode_get_voter(account: AccountAddress) -> Vec<u8> {
    encode_call(GET_VOTER, &[Token::Address(account.to_h160())])
}

pub fn encode_get_candidates_count() -> Vec<u8> {
    encode_call(GET_CANDIDATES_COUNT, &[])
}

pub fn encode_get_candidate(index: u64) -> Vec<u8> {
    encode_call(GET_CANDIDATE, &[Token::Uint(U256::from(index))])
}

fn decode(what: &str, types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, GatewayError> {
    if data.is_empty() {
        return Err(GatewayError::RemoteRead(format!(
            "{what}: empty return data (is the contract deployed on this chain?)"
        )));
    }
    abi::decode(types, data)
        .map_err(|e| GatewayError::RemoteRead(format!("{what}: undecodable return data: {e}")))
}

fn malformed(what: &str) -> GatewayError {
    GatewayError::RemoteRead(format!("{what}: unexpected return shape"))
}

fn to_u64(what: &str, value: U256) -> Result<u64, GatewayError> {
    if value > U256::from(u64::MAX) {
        return Err(GatewayError::RemoteRead(format!(
            "{what}: value {value} does not fit in 64 bits"
        )));
    }
    Ok(value.low_u64())
}

pub fn decode_owner(data: &[u8]) -> Result<AccountAddress, GatewayError> {
    let mut tokens = decode(OWNER, &[ParamType::Address], data)?.into_iter();
    tokens
        .next()
        .and_then(Token::into_address)
        .map(AccountAddress::from)
        .ok_or_else(|| malformed(OWNER))
}

/// The state ordinal is mapped, never rejected: unknown ordinals become
/// [`ElectionPhase::Unknown`].
pub fn decode_phase(data: &[u8]) -> Result<ElectionPhase, GatewayError> {
    let mut tokens = decode(GET_CURRENT_STATE, &[ParamType::Uint(8)], data)?.into_iter();
    let ordinal = tokens
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| malformed(GET_CURRENT_STATE))?;
    if ordinal > U256::from(u64::MAX) {
        return Ok(ElectionPhase::Unknown);
    }
    Ok(ElectionPhase::from_ordinal(ordinal.low_u64()))
}

/// `(bool isRegistered, bool hasVoted, uint256 votedCandidateId)`.
pub fn decode_voter(data: &[u8]) -> Result<VoterRecord, GatewayError> {
    let tokens = decode(
        GET_VOTER,
        &[ParamType::Bool, ParamType::Bool, ParamType::Uint(256)],
        data,
    )?;
    match tokens.as_slice() {
        [Token::Bool(is_registered), Token::Bool(has_voted), Token::Uint(voted_id)] => {
            // A voted id that overflows u64 is only a problem if it is used.
            let voted_id = if *has_voted {
                to_u64(GET_VOTER, *voted_id)?
            } else {
                0
            };
            Ok(VoterRecord::from_raw(*is_registered, *has_voted, voted_id))
        }
        _ => Err(malformed(GET_VOTER)),
    }
}

pub fn decode_candidates_count(data: &[u8]) -> Result<u64, GatewayError> {
    let mut tokens = decode(GET_CANDIDATES_COUNT, &[ParamType::Uint(256)], data)?.into_iter();
    let count = tokens
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| malformed(GET_CANDIDATES_COUNT))?;
    to_u64(GET_CANDIDATES_COUNT, count)
}

/// A `Candidate` struct: `(uint256 id, string name, uint256 voteCount)`.
pub fn decode_candidate(data: &[u8]) -> Result<Candidate, GatewayError> {
    let shape = ParamType::Tuple(vec![
        ParamType::Uint(256),
        ParamType::String,
        ParamType::Uint(256),
    ]);
    let mut tokens = decode(GET_CANDIDATE, &[shape], data)?.into_iter();
    let fields = tokens
        .next()
        .and_then(Token::into_tuple)
        .ok_or_else(|| malformed(GET_CANDIDATE))?;
    match fields.as_slice() {
        [Token::Uint(id), Token::String(name), Token::Uint(votes)] => Ok(Candidate::new(
            to_u64(GET_CANDIDATE, *id)?,
            name.clone(),
            to_u64(GET_CANDIDATE, *votes)?,
        )),
        _ => Err(malformed(GET_CANDIDATE)),
    }
}
