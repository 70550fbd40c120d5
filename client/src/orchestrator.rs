//! Transaction lifecycle for user-initiated writes.
//!
//! Each action instance runs the state machine
//!
//! ```text
//! Idle ──▶ Submitting ──▶ Pending ──▶ Confirmed
//!   │           │            │
//!   └───────────┴────────────┴──▶ Failed
//!                            └──▶ Orphaned (account/network changed meanwhile)
//! ```
//!
//! and reports every transition on a broadcast channel. Writes are never
//! retried; a retry is a new action.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ballot_gateway::{ContractCall, ElectionContract, GatewayError};
use ballot_types::{AccountAddress, Receipt, TxHash};
use ballot_wallet::{ConnectionManager, SessionContext};
use tokio::sync::broadcast;

use crate::error::{ClientError, ErrorKind};

/// Capacity of the transaction event channel.
const TX_EVENT_CAPACITY: usize = 64;

/// Something that can rebuild the published snapshot.
#[async_trait]
pub trait Resync: Send + Sync {
    async fn resync(&self);
}

/// A mutating action as requested by the user, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    RegisterVoter(String),
    AddCandidate(String),
    StartVoting,
    EndVoting,
    Vote(u64),
}

impl Action {
    /// Local precondition checks. Never touches the network.
    pub fn validate(&self) -> Result<ContractCall, ClientError> {
        match self {
            Self::RegisterVoter(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(ClientError::InvalidInput("voter address is empty".into()));
                }
                AccountAddress::parse(raw)
                    .map(ContractCall::RegisterVoter)
                    .map_err(|e| ClientError::InvalidInput(e.to_string()))
            }
            Self::AddCandidate(raw) => {
                let name = raw.trim();
                if name.is_empty() {
                    return Err(ClientError::InvalidInput("candidate name is empty".into()));
                }
                Ok(ContractCall::AddCandidate(name.to_string()))
            }
            Self::StartVoting => Ok(ContractCall::StartVoting),
            Self::EndVoting => Ok(ContractCall::EndVoting),
            Self::Vote(candidate_id) => Ok(ContractCall::Vote(*candidate_id)),
        }
    }
}

/// Identity of a logical operation for duplicate-submission prevention.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ActionKey {
    RegisterVoter(AccountAddress),
    AddCandidate(String),
    StartVoting,
    EndVoting,
    /// Any vote: an account votes once, whichever candidate.
    Vote,
}

impl From<&ContractCall> for ActionKey {
    fn from(call: &ContractCall) -> Self {
        match call {
            ContractCall::RegisterVoter(voter) => Self::RegisterVoter(*voter),
            ContractCall::AddCandidate(name) => Self::AddCandidate(name.clone()),
            ContractCall::StartVoting => Self::StartVoting,
            ContractCall::EndVoting => Self::EndVoting,
            ContractCall::Vote(_) => Self::Vote,
        }
    }
}

/// Removes the key from the in-flight set when the action ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<ActionKey>>,
    key: ActionKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

/// State of one action instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Submitting,
    Pending { hash: TxHash },
    Confirmed { receipt: Receipt },
    Failed { kind: ErrorKind, message: String },
    /// The session changed while pending; the outcome is not reported.
    Orphaned { hash: TxHash },
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed { .. } | Self::Failed { .. } | Self::Orphaned { .. }
        )
    }

    fn failed(err: &ClientError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("preparing"),
            Self::Submitting => f.write_str("waiting for the wallet to sign"),
            Self::Pending { hash } => write!(f, "pending {hash}"),
            Self::Confirmed { receipt } => {
                write!(f, "confirmed in block {}", receipt.block_number)
            }
            Self::Failed { kind, message } => write!(f, "failed ({}): {message}", kind.as_str()),
            Self::Orphaned { hash } => write!(f, "{hash} outcome dropped, account or network changed"),
        }
    }
}

/// A state transition of one action instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxEvent {
    /// Distinguishes concurrent action instances.
    pub id: u64,
    pub action: Action,
    pub state: TxState,
}

/// Runs mutating actions against the contract.
pub struct Orchestrator {
    contract: Arc<dyn ElectionContract>,
    connection: Arc<ConnectionManager>,
    in_flight: Mutex<HashSet<ActionKey>>,
    next_id: AtomicU64,
    events: broadcast::Sender<TxEvent>,
}

impl Orchestrator {
    pub fn new(contract: Arc<dyn ElectionContract>, connection: Arc<ConnectionManager>) -> Self {
        let (events, _) = broadcast::channel(TX_EVENT_CAPACITY);
        Self {
            contract,
            connection,
            in_flight: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Every transition of every action, in order per action.
    pub fn subscribe(&self) -> broadcast::Receiver<TxEvent> {
        self.events.subscribe()
    }

    /// Run `action` to a terminal state.
    ///
    /// `resync` is invoked exactly once after `Confirmed`, after a failure
    /// whose effect may still have landed, and after a vote refused because
    /// the local view was stale. Never before confirmation.
    pub async fn execute(&self, action: Action, resync: &dyn Resync) -> TxState {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let emit = |state: TxState| {
            let _ = self.events.send(TxEvent {
                id,
                action: action.clone(),
                state: state.clone(),
            });
            state
        };

        emit(TxState::Idle);

        let call = match action.validate() {
            Ok(call) => call,
            Err(e) => {
                tracing::debug!(id, "rejected locally: {e}");
                return emit(TxState::failed(&e));
            }
        };

        let Some(ctx) = self.connection.current().await else {
            return emit(TxState::failed(&ClientError::NotConnected));
        };

        let key = ActionKey::from(&call);
        let _guard = match self.claim(key) {
            Some(guard) => guard,
            None => {
                return emit(TxState::failed(&ClientError::AlreadyPending(call.to_string())));
            }
        };

        if let ContractCall::Vote(_) = call {
            if let Err(e) = self.check_eligibility(&ctx).await {
                tracing::info!(id, "vote refused: {e}");
                let state = emit(TxState::failed(&e));
                if matches!(e, ClientError::NotEligible(_)) {
                    resync.resync().await;
                }
                return state;
            }
        }

        emit(TxState::Submitting);
        let pending = match self.contract.submit(ctx.signer(), &call).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(id, call = call.name(), "submission failed: {e}");
                return emit(TxState::failed(&e.into()));
            }
        };
        tracing::info!(id, call = call.name(), hash = %pending.hash, "transaction pending");
        emit(TxState::Pending { hash: pending.hash });

        let outcome = self.contract.await_confirmation(&pending).await;

        if !self.connection.is_current(&ctx).await {
            tracing::debug!(
                id,
                hash = %pending.hash,
                "session changed while pending, outcome dropped ({})",
                ErrorKind::StaleContext.as_str()
            );
            return TxState::Orphaned { hash: pending.hash };
        }

        match outcome {
            Ok(receipt) => {
                tracing::info!(id, call = call.name(), block = receipt.block_number, "transaction confirmed");
                let state = emit(TxState::Confirmed { receipt });
                resync.resync().await;
                state
            }
            Err(e) => {
                tracing::warn!(id, call = call.name(), "transaction failed: {e}");
                let may_have_landed = matches!(
                    &e,
                    GatewayError::ConfirmationFailed { reason, .. } if reason.may_have_landed()
                );
                let state = emit(TxState::failed(&e.into()));
                if may_have_landed {
                    resync.resync().await;
                }
                state
            }
        }
    }

    fn claim(&self, key: ActionKey) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(key.clone()) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            key,
        })
    }

    /// Re-read the caller's record right before voting.
    async fn check_eligibility(&self, ctx: &SessionContext) -> Result<(), ClientError> {
        let record = self.contract.voter(ctx.account()).await?;
        if !record.is_registered {
            return Err(ClientError::NotEligible("you are not registered to vote".into()));
        }
        if record.has_voted {
            return Err(ClientError::NotEligible("you have already voted".into()));
        }
        Ok(())
    }
}
