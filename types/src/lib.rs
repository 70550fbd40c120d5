//! Fundamental types for the ballot client.
//!
//! This crate defines the data model shared across every other crate in the workspace:
//! account addresses, chain ids, transaction hashes and receipts, the election phase,
//! and the voter and candidate records mirrored from the election contract.

pub mod address;
pub mod candidate;
pub mod error;
pub mod hash;
pub mod network;
pub mod state;
pub mod voter;

pub use address::AccountAddress;
pub use candidate::Candidate;
pub use error::TypesError;
pub use hash::{Receipt, TxHash};
pub use network::ChainId;
pub use state::ElectionPhase;
pub use voter::VoterRecord;
