//! The typed contract façade.

use async_trait::async_trait;
use ballot_types::{AccountAddress, Candidate, ElectionPhase, Receipt, TxHash, VoterRecord};
use ballot_wallet::SigningContext;

use crate::call::ContractCall;
use crate::error::GatewayError;

/// Handle for a transaction the wallet accepted for broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub call: ContractCall,
}

/// Reads and two-phase writes against the election contract.
///
/// Reads are side-effect free and may be retried; a [`GatewayError::RemoteRead`]
/// means "unknown", never "false" or "zero". Writes are split into
/// [`submit`](ElectionContract::submit) and
/// [`await_confirmation`](ElectionContract::await_confirmation) and are
/// never retried by the gateway.
#[async_trait]
pub trait ElectionContract: Send + Sync {
    /// Address the gateway is bound to.
    fn address(&self) -> AccountAddress;

    async fn owner(&self) -> Result<AccountAddress, GatewayError>;

    async fn phase(&self) -> Result<ElectionPhase, GatewayError>;

    async fn voter(&self, account: AccountAddress) -> Result<VoterRecord, GatewayError>;

    async fn candidate_count(&self) -> Result<u64, GatewayError>;

    async fn candidate(&self, index: u64) -> Result<Candidate, GatewayError>;

    /// Have the signer authorize and broadcast `call`.
    async fn submit(
        &self,
        signer: &SigningContext,
        call: &ContractCall,
    ) -> Result<PendingTx, GatewayError>;

    /// Wait until `pending` is mined, or known to have failed.
    async fn await_confirmation(&self, pending: &PendingTx) -> Result<Receipt, GatewayError>;

}
