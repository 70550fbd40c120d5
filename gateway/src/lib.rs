//! Contract gateway for the election contract.
//!
//! [`ElectionContract`] is the typed façade the rest of the client talks to:
//! side-effect-free reads that may be retried freely, and two-phase writes
//! (submit, then await confirmation) that are never retried automatically.
//! [`RpcElectionContract`] implements it over a wallet provider using
//! `eth_call`, `eth_sendTransaction` and receipt polling.

pub mod abi;
pub mod call;
pub mod contract;
pub mod error;
pub mod rpc;

pub use call::ContractCall;
pub use contract::{ElectionContract, PendingTx};
pub use error::{FailureReason, GatewayError};
pub use rpc::RpcElectionContract;
