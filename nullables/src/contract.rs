//! Nullable contract: an in-memory election with scripted failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use ballot_gateway::{ContractCall, ElectionContract, FailureReason, GatewayError, PendingTx};
use ballot_types::{AccountAddress, Candidate, ElectionPhase, Receipt, TxHash, VoterRecord};
use ballot_wallet::SigningContext;

use crate::gate::{Gate, HeldCall};

#[derive(Default)]
struct Election {
    phase: ElectionPhase,
    voters: HashMap<AccountAddress, VoterRecord>,
    candidates: Vec<Candidate>,
    block_number: u64,
}

impl Election {
    /// Apply a mined call. Rules are deliberately permissive; the real
    /// contract enforces them.
    fn apply(&mut self, sender: AccountAddress, call: &ContractCall) {
        match call {
            ContractCall::RegisterVoter(voter) => {
                self.voters.entry(*voter).or_default().is_registered = true;
            }
            ContractCall::AddCandidate(name) => {
                let id = self.candidates.len() as u64 + 1;
                self.candidates.push(Candidate::new(id, name.clone(), 0));
            }
            ContractCall::StartVoting => self.phase = ElectionPhase::Voting,
            ContractCall::EndVoting => self.phase = ElectionPhase::Finished,
            ContractCall::Vote(candidate_id) => {
                let record = self.voters.entry(sender).or_default();
                record.has_voted = true;
                record.voted_candidate_id = Some(*candidate_id);
                if let Some(c) = self.candidates.iter_mut().find(|c| c.id == *candidate_id) {
                    c.vote_count += 1;
                }
            }
        }
    }
}

#[derive(Default)]
struct Faults {
    owner: bool,
    phase: bool,
    voter: bool,
    count: bool,
    candidate_indices: HashSet<u64>,
    next_submission: Option<String>,
    next_confirmation: Option<FailureReason>,
}

#[derive(Default)]
struct Gates {
    phase: VecDeque<Gate>,
    confirmation: VecDeque<Gate>,
}

/// A test election contract.
///
/// Reads answer from in-memory state; confirmed writes mutate it. Every call
/// is appended to a log (`"phase"`, `"voter"`, `"candidate_count"`,
/// `"candidate:{i}"`, `"owner"`, `"submit:{name}"`, `"confirm:{name}"`).
pub struct NullContract {
    address: AccountAddress,
    owner: AccountAddress,
    election: Mutex<Election>,
    faults: Mutex<Faults>,
    gates: Mutex<Gates>,
    pending: Mutex<HashMap<TxHash, AccountAddress>>,
    submitted: Mutex<u64>,
    calls: Mutex<Vec<String>>,
}

impl NullContract {
    pub fn new(owner: AccountAddress) -> Self {
        Self {
            address: AccountAddress::new([0xc0; 20]),
            owner,
            election: Mutex::new(Election::default()),
            faults: Mutex::new(Faults::default()),
            gates: Mutex::new(Gates::default()),
            pending: Mutex::new(HashMap::new()),
            submitted: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    // ── State setup ────────────────────────────────────────────────────

    pub fn set_phase(&self, phase: ElectionPhase) {
        self.election.lock().unwrap().phase = phase;
    }

    pub fn set_voter(&self, account: AccountAddress, record: VoterRecord) {
        self.election.lock().unwrap().voters.insert(account, record);
    }

    pub fn add_candidate(&self, candidate: Candidate) {
        self.election.lock().unwrap().candidates.push(candidate);
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.election.lock().unwrap().candidates.clone()
    }

    pub fn voter_record(&self, account: AccountAddress) -> VoterRecord {
        self.election
            .lock()
            .unwrap()
            .voters
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    // ── Fault injection ────────────────────────────────────────────────

    pub fn fail_owner(&self, fail: bool) {
        self.faults.lock().unwrap().owner = fail;
    }

    pub fn fail_phase(&self, fail: bool) {
        self.faults.lock().unwrap().phase = fail;
    }

    pub fn fail_voter(&self, fail: bool) {
        self.faults.lock().unwrap().voter = fail;
    }

    pub fn fail_count(&self, fail: bool) {
        self.faults.lock().unwrap().count = fail;
    }

    pub fn fail_candidate(&self, index: u64) {
        self.faults.lock().unwrap().candidate_indices.insert(index);
    }

    pub fn reject_next_submission(&self, message: &str) {
        self.faults.lock().unwrap().next_submission = Some(message.to_string());
    }

    pub fn fail_next_confirmation(&self, reason: FailureReason) {
        self.faults.lock().unwrap().next_confirmation = Some(reason);
    }

    // ── Interleaving control ───────────────────────────────────────────

    /// Suspend the next `phase` read until released.
    pub fn hold_next_phase_read(&self) -> HeldCall {
        let (held, gate) = HeldCall::new();
        self.gates.lock().unwrap().phase.push_back(gate);
        held
    }

    /// Suspend the next confirmation wait until released.
    pub fn hold_next_confirmation(&self) -> HeldCall {
        let (held, gate) = HeldCall::new();
        self.gates.lock().unwrap().confirmation.push_back(gate);
        held
    }

    // ── Assertions ─────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn read_error(what: &str) -> GatewayError {
        GatewayError::RemoteRead(format!("{what}: node unavailable"))
    }
}

#[async_trait]
impl ElectionContract for NullContract {
    fn address(&self) -> AccountAddress {
        self.address
    }

    async fn owner(&self) -> Result<AccountAddress, GatewayError> {
        self.record("owner");
        if self.faults.lock().unwrap().owner {
            return Err(Self::read_error("owner"));
        }
        Ok(self.owner)
    }

    async fn phase(&self) -> Result<ElectionPhase, GatewayError> {
        self.record("phase");
        let gate = self.gates.lock().unwrap().phase.pop_front();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.faults.lock().unwrap().phase {
            return Err(Self::read_error("getCurrentState"));
        }
        Ok(self.election.lock().unwrap().phase)
    }

    async fn voter(&self, account: AccountAddress) -> Result<VoterRecord, GatewayError> {
        self.record("voter");
        if self.faults.lock().unwrap().voter {
            return Err(Self::read_error("getVoter"));
        }
        Ok(self.voter_record(account))
    }

    async fn candidate_count(&self) -> Result<u64, GatewayError> {
        self.record("candidate_count");
        if self.faults.lock().unwrap().count {
            return Err(Self::read_error("getCandidatesCount"));
        }
        Ok(self.election.lock().unwrap().candidates.len() as u64)
    }

    async fn candidate(&self, index: u64) -> Result<Candidate, GatewayError> {
        self.record(format!("candidate:{index}"));
        if self.faults.lock().unwrap().candidate_indices.contains(&index) {
            return Err(Self::read_error("getCandidate"));
        }
        self.election
            .lock()
            .unwrap()
            .candidates
            .get(index as usize)
            .cloned()
            .ok_or_else(|| GatewayError::RemoteRead(format!("getCandidate: no index {index}")))
    }

    async fn submit(
        &self,
        signer: &SigningContext,
        call: &ContractCall,
    ) -> Result<PendingTx, GatewayError> {
        self.record(format!("submit:{}", call.name()));
        if let Some(message) = self.faults.lock().unwrap().next_submission.take() {
            return Err(GatewayError::SubmissionRejected(message));
        }
        let hash = {
            let mut submitted = self.submitted.lock().unwrap();
            *submitted += 1;
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&submitted.to_be_bytes());
            TxHash::new(bytes)
        };
        self.pending.lock().unwrap().insert(hash, signer.account());
        Ok(PendingTx {
            hash,
            call: call.clone(),
        })
    }

    async fn await_confirmation(&self, pending: &PendingTx) -> Result<Receipt, GatewayError> {
        self.record(format!("confirm:{}", pending.call.name()));
        let gate = self.gates.lock().unwrap().confirmation.pop_front();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let sender = self
            .pending
            .lock()
            .unwrap()
            .remove(&pending.hash)
            .ok_or_else(|| {
                GatewayError::confirmation(FailureReason::Dropped, "unknown transaction")
            })?;

        if let Some(reason) = self.faults.lock().unwrap().next_confirmation.take() {
            return Err(GatewayError::confirmation(
                reason,
                format!("{} {reason}", pending.hash),
            ));
        }

        let mut election = self.election.lock().unwrap();
        election.apply(sender, &pending.call);
        election.block_number += 1;
        Ok(Receipt {
            tx_hash: pending.hash,
            block_number: election.block_number,
            gas_used: Some(21_000),
        })
    }
}
