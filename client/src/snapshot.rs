//! Versioned snapshots of contract state and their publication.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ballot_gateway::GatewayError;
use ballot_types::{AccountAddress, Candidate, ChainId, ElectionPhase, VoterRecord};
use tokio::sync::watch;

/// A field whose read failed. Distinct from any legitimate value, so the UI
/// can show an error instead of a false negative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadFailure {
    pub message: String,
}

impl From<GatewayError> for ReadFailure {
    fn from(err: GatewayError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One position of the candidate list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateEntry {
    Loaded(Candidate),
    /// Placeholder for an index whose read failed.
    Errored { index: u64, error: ReadFailure },
}

impl CandidateEntry {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Loaded(candidate) => Some(candidate),
            Self::Errored { .. } => None,
        }
    }
}

/// One consistent read of contract state for one account context.
///
/// Every field was read under the same session epoch. Rendering decisions are
/// made from a snapshot only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Build order; newer builds carry higher versions.
    pub version: u64,
    /// Session epoch the reads were made under.
    pub epoch: u64,
    pub account: AccountAddress,
    pub chain_id: ChainId,
    pub owner: Result<AccountAddress, ReadFailure>,
    pub phase: Result<ElectionPhase, ReadFailure>,
    pub voter: Result<VoterRecord, ReadFailure>,
    /// Ordered by contract index; errored entries keep their position.
    pub candidates: Result<Vec<CandidateEntry>, ReadFailure>,
}

impl Snapshot {
    /// The phase, with a failed read treated as [`ElectionPhase::Unknown`].
    pub fn effective_phase(&self) -> ElectionPhase {
        self.phase.as_ref().copied().unwrap_or_default()
    }

    /// The voter record, with a failed read treated as unregistered.
    pub fn effective_voter(&self) -> VoterRecord {
        self.voter.as_ref().copied().unwrap_or_default()
    }

    /// Whether the bound account is the contract owner. Unknown counts as no.
    pub fn is_owner(&self) -> bool {
        self.owner.as_ref().is_ok_and(|owner| *owner == self.account)
    }

    /// Successfully read candidates, in list order.
    pub fn loaded_candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(CandidateEntry::candidate)
    }
}

/// Holds the last published snapshot and fans it out to subscribers.
///
/// Publication is last-writer-wins by version: a snapshot older than the one
/// already published, or built under a superseded epoch, is discarded.
pub struct SnapshotStore {
    tx: watch::Sender<Option<Arc<Snapshot>>>,
    epoch_floor: AtomicU64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            epoch_floor: AtomicU64::new(0),
        }
    }

    /// The current (last known) snapshot.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.tx.subscribe()
    }

    /// Publish `snapshot` unless it is stale. Returns the published snapshot.
    pub fn publish(&self, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);
        let floor = &self.epoch_floor;
        let published = self.tx.send_if_modified(|current| {
            if snapshot.epoch < floor.load(Ordering::SeqCst) {
                return false;
            }
            if current.as_ref().is_some_and(|c| c.version >= snapshot.version) {
                return false;
            }
            *current = Some(Arc::clone(&snapshot));
            true
        });
        published.then_some(snapshot)
    }

    /// Discard everything built before `epoch`, clearing the published
    /// snapshot if it is older.
    pub fn invalidate_before(&self, epoch: u64) {
        self.epoch_floor.fetch_max(epoch, Ordering::SeqCst);
        self.tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(|c| c.epoch < epoch) {
                *current = None;
                true
            } else {
                false
            }
        });
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
