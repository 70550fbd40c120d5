//! Session and signing contexts.
//!
//! A [`SessionContext`] is the only process-wide mutable state of the client:
//! the bound account, the chain it lives on, and the signing capability for it.
//! It is never mutated in place. Account or network changes build a new context
//! with a higher epoch, and anything started against an older epoch is stale.

use std::fmt;
use std::sync::Arc;

use ballot_types::{AccountAddress, ChainId, TxHash};

use crate::error::ProviderError;
use crate::provider::{TransactionRequest, WalletProvider};

/// Capability to authorize state-changing requests, bound to one account.
#[derive(Clone)]
pub struct SigningContext {
    account: AccountAddress,
    provider: Arc<dyn WalletProvider>,
}

impl SigningContext {
    pub fn new(account: AccountAddress, provider: Arc<dyn WalletProvider>) -> Self {
        Self { account, provider }
    }

    /// The account every transaction is sent from.
    pub fn account(&self) -> AccountAddress {
        self.account
    }

    /// Ask the wallet to sign and broadcast a call to `to` with `data`.
    pub async fn send(&self, to: AccountAddress, data: &[u8]) -> Result<TxHash, ProviderError> {
        let tx = TransactionRequest::new(self.account, to, data);
        self.provider.send_transaction(&tx).await
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// One bound account on one chain.
#[derive(Clone, Debug)]
pub struct SessionContext {
    epoch: u64,
    chain_id: ChainId,
    signer: SigningContext,
}

impl SessionContext {
    pub fn new(
        epoch: u64,
        chain_id: ChainId,
        account: AccountAddress,
        provider: Arc<dyn WalletProvider>,
    ) -> Self {
        Self {
            epoch,
            chain_id,
            signer: SigningContext::new(account, provider),
        }
    }

    /// Monotonic context generation; higher epochs supersede lower ones.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn account(&self) -> AccountAddress {
        self.signer.account
    }

    pub fn signer(&self) -> &SigningContext {
        &self.signer
    }
}
