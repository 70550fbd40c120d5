//! JSON-RPC implementation of the contract gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ballot_types::{AccountAddress, Candidate, ElectionPhase, Receipt, VoterRecord};
use ballot_wallet::{ProviderError, SigningContext, WalletProvider};
use serde_json::{json, Value};

use crate::abi;
use crate::call::ContractCall;
use crate::contract::{ElectionContract, PendingTx};
use crate::error::{FailureReason, GatewayError};

/// Default interval between receipt polls.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Consecutive polls a transaction may be unknown to the node before it is
/// reported as dropped.
pub const DEFAULT_DROPPED_AFTER_POLLS: u32 = 30;

/// Gateway bound to one deployed contract, talking through a wallet provider.
pub struct RpcElectionContract {
    provider: Arc<dyn WalletProvider>,
    address: AccountAddress,
    receipt_poll_interval: Duration,
    dropped_after_polls: u32,
}

impl RpcElectionContract {
    pub fn new(provider: Arc<dyn WalletProvider>, address: AccountAddress) -> Self {
        Self {
            provider,
            address,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            dropped_after_polls: DEFAULT_DROPPED_AFTER_POLLS,
        }
    }

    pub fn with_receipt_polling(mut self, interval: Duration, dropped_after_polls: u32) -> Self {
        self.receipt_poll_interval = interval;
        self.dropped_after_polls = dropped_after_polls.max(1);
        self
    }

    /// `eth_call` against the latest block, returning raw return data.
    async fn call(&self, what: &str, data: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        let params = json!([
            { "to": self.address, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let result = self
            .provider
            .request("eth_call", params)
            .await
            .map_err(|e| GatewayError::RemoteRead(format!("{what}: {e}")))?;
        let raw = result
            .as_str()
            .ok_or_else(|| GatewayError::RemoteRead(format!("{what}: expected hex string")))?;
        decode_hex(raw).ok_or_else(|| GatewayError::RemoteRead(format!("{what}: invalid hex")))
    }

    /// Fetch the receipt, `None` while the transaction is not mined.
    async fn receipt(&self, pending: &PendingTx) -> Result<Option<Value>, ProviderError> {
        let result = self
            .provider
            .request("eth_getTransactionReceipt", json!([pending.hash]))
            .await?;
        Ok((!result.is_null()).then_some(result))
    }

    /// Fetch the transaction as known to the node, `None` if it is unknown.
    async fn transaction(&self, pending: &PendingTx) -> Result<Option<Value>, ProviderError> {
        let result = self
            .provider
            .request("eth_getTransactionByHash", json!([pending.hash]))
            .await?;
        Ok((!result.is_null()).then_some(result))
    }

    /// Whether a transaction from `from` with `nonce` has been mined, i.e.
    /// the account's mined nonce moved past it.
    async fn nonce_consumed(&self, from: &str, nonce: u64) -> Result<bool, ProviderError> {
        let result = self
            .provider
            .request("eth_getTransactionCount", json!([from, "latest"]))
            .await?;
        Ok(result
            .as_str()
            .and_then(parse_quantity)
            .is_some_and(|mined| mined > nonce))
    }

    /// One round of receipt, transaction and nonce lookups.
    async fn poll(
        &self,
        pending: &PendingTx,
        sender_nonce: &mut Option<(String, u64)>,
    ) -> Result<Poll, ProviderError> {
        if let Some(receipt) = self.receipt(pending).await? {
            return Ok(Poll::Mined(receipt));
        }

        match self.transaction(pending).await? {
            Some(tx) => {
                if sender_nonce.is_none() {
                    *sender_nonce = tx["from"]
                        .as_str()
                        .zip(tx["nonce"].as_str().and_then(parse_quantity))
                        .map(|(from, nonce)| (from.to_string(), nonce));
                }
                Ok(Poll::Known)
            }
            None => {
                if let Some((from, nonce)) = sender_nonce.as_ref() {
                    if self.nonce_consumed(from, *nonce).await? {
                        return Ok(Poll::Replaced);
                    }
                }
                Ok(Poll::Missing)
            }
        }
    }
}

#[async_trait]
impl ElectionContract for RpcElectionContract {
    fn address(&self) -> AccountAddress {
        self.address
    }

    async fn owner(&self) -> Result<AccountAddress, GatewayError> {
        let data = self.call(abi::OWNER, abi::encode_owner()).await?;
        abi::decode_owner(&data)
    }

    async fn phase(&self) -> Result<ElectionPhase, GatewayError> {
        let data = self
            .call(abi::GET_CURRENT_STATE, abi::encode_get_current_state())
            .await?;
        abi::decode_phase(&data)
    }

    async fn voter(&self, account: AccountAddress) -> Result<VoterRecord, GatewayError> {
        let data = self
            .call(abi::GET_VOTER, abi::encode_get_voter(account))
            .await?;
        abi::decode_voter(&data)
    }

    async fn candidate_count(&self) -> Result<u64, GatewayError> {
        let data = self
            .call(abi::GET_CANDIDATES_COUNT, abi::encode_get_candidates_count())
            .await?;
        abi::decode_candidates_count(&data)
    }

    async fn candidate(&self, index: u64) -> Result<Candidate, GatewayError> {
        let data = self
            .call(abi::GET_CANDIDATE, abi::encode_get_candidate(index))
            .await?;
        abi::decode_candidate(&data)
    }

    async fn submit(
        &self,
        signer: &SigningContext,
        call: &ContractCall,
    ) -> Result<PendingTx, GatewayError> {
        let hash = signer
            .send(self.address, &call.encode())
            .await
            .map_err(|e| {
                if e.is_user_rejection() {
                    GatewayError::SubmissionRejected(format!("user declined to sign: {e}"))
                } else {
                    GatewayError::SubmissionRejected(e.to_string())
                }
            })?;
        tracing::debug!(%hash, call = call.name(), "transaction submitted");
        Ok(PendingTx {
            hash,
            call: call.clone(),
        })
    }

    async fn await_confirmation(&self, pending: &PendingTx) -> Result<Receipt, GatewayError> {
        let mut missing_polls = 0u32;
        let mut failed_polls = 0u32;
        // (from, nonce) once the node has shown us the transaction.
        let mut sender_nonce: Option<(String, u64)> = None;

        loop {
            match self.poll(pending, &mut sender_nonce).await {
                Ok(Poll::Mined(receipt)) => return parse_receipt(pending, &receipt),
                Ok(Poll::Known) => {
                    missing_polls = 0;
                    failed_polls = 0;
                }
                Ok(Poll::Replaced) => {
                    return Err(GatewayError::confirmation(
                        FailureReason::Replaced,
                        format!("{} replaced by another transaction", pending.hash),
                    ));
                }
                Ok(Poll::Missing) => {
                    failed_polls = 0;
                    missing_polls += 1;
                    if missing_polls >= self.dropped_after_polls {
                        return Err(GatewayError::confirmation(
                            FailureReason::Dropped,
                            format!("{} is no longer known to the node", pending.hash),
                        ));
                    }
                }
                Err(e) => {
                    failed_polls += 1;
                    tracing::warn!(hash = %pending.hash, failed_polls, "receipt poll failed: {e}");
                    if failed_polls >= self.dropped_after_polls {
                        return Err(GatewayError::confirmation(
                            FailureReason::Unknown,
                            format!("{} could not be observed: {e}", pending.hash),
                        ));
                    }
                }
            }

            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

/// What one confirmation poll observed.
enum Poll {
    Mined(Value),
    /// Known to the node, not mined yet.
    Known,
    /// Unknown to the node.
    Missing,
    /// Unknown to the node, and its nonce was consumed by another transaction.
    Replaced,
}

fn parse_receipt(pending: &PendingTx, receipt: &Value) -> Result<Receipt, GatewayError> {
    let status = receipt["status"].as_str().and_then(parse_quantity);
    let block_number = receipt["blockNumber"]
        .as_str()
        .and_then(parse_quantity)
        .unwrap_or_default();
    match status {
        Some(1) => Ok(Receipt {
            tx_hash: pending.hash,
            block_number,
            gas_used: receipt["gasUsed"].as_str().and_then(parse_quantity),
        }),
        Some(0) => Err(GatewayError::confirmation(
            FailureReason::Reverted,
            format!("{} reverted in block {block_number}", pending.hash),
        )),
        _ => Err(GatewayError::confirmation(
            FailureReason::Unknown,
            format!("{} has a receipt without a status", pending.hash),
        )),
    }
}

/// Parse a `0x`-prefixed JSON-RPC quantity.
fn parse_quantity(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix("0x")?;
    u64::from_str_radix(digits, 16).ok()
}

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    hex::decode(raw.strip_prefix("0x")?).ok()
}
