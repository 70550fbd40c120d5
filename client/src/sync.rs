//! Snapshot construction.

use std::sync::Arc;

use ballot_gateway::ElectionContract;
use ballot_types::AccountAddress;
use ballot_wallet::SessionContext;
use tokio::sync::RwLock;

use crate::snapshot::{CandidateEntry, ReadFailure, Snapshot};

/// Largest candidate count a build will read index by index.
pub const DEFAULT_MAX_CANDIDATES: u64 = 1_000;

/// Builds snapshots through a fixed read sequence:
/// owner (cached per session) → phase → caller's voter record →
/// candidate count → each candidate by index.
///
/// No read failure aborts the build. Each one degrades its own field and is
/// kept in the snapshot as a [`ReadFailure`].
pub struct Synchronizer {
    contract: Arc<dyn ElectionContract>,
    /// `(epoch, owner)` of the last successful owner read.
    owner_cache: RwLock<Option<(u64, AccountAddress)>>,
    max_candidates: u64,
}

impl Synchronizer {
    pub fn new(contract: Arc<dyn ElectionContract>) -> Self {
        Self {
            contract,
            owner_cache: RwLock::new(None),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Treat a candidate count above `max` as a failed count read.
    pub fn with_max_candidates(mut self, max: u64) -> Self {
        self.max_candidates = max;
        self
    }

    pub fn contract(&self) -> &Arc<dyn ElectionContract> {
        &self.contract
    }

    /// Read the contract owner once per session epoch. Failures are not
    /// cached, so the next build retries.
    pub async fn owner(&self, ctx: &SessionContext) -> Result<AccountAddress, ReadFailure> {
        if let Some((epoch, owner)) = *self.owner_cache.read().await {
            if epoch == ctx.epoch() {
                return Ok(owner);
            }
        }
        let owner = self.contract.owner().await?;
        tracing::debug!(%owner, epoch = ctx.epoch(), "contract owner cached");
        *self.owner_cache.write().await = Some((ctx.epoch(), owner));
        Ok(owner)
    }

    /// Forget the cached owner (network change).
    pub async fn clear_owner(&self) {
        *self.owner_cache.write().await = None;
    }

    /// Build one snapshot for `ctx`, stamped with `version`.
    pub async fn build(&self, ctx: &SessionContext, version: u64) -> Snapshot {
        let owner = self.owner(ctx).await;

        let phase = self.contract.phase().await.map_err(ReadFailure::from);
        if let Err(e) = &phase {
            tracing::warn!(version, "phase read failed: {e}");
        }

        let voter = self
            .contract
            .voter(ctx.account())
            .await
            .map_err(ReadFailure::from);
        if let Err(e) = &voter {
            tracing::warn!(version, account = %ctx.account(), "voter read failed: {e}");
        }

        let candidates = self.candidates(version).await;

        tracing::debug!(version, epoch = ctx.epoch(), "snapshot built");
        Snapshot {
            version,
            epoch: ctx.epoch(),
            account: ctx.account(),
            chain_id: ctx.chain_id(),
            owner,
            phase,
            voter,
            candidates,
        }
    }

    /// Read the count, then every index in order. A failed index becomes an
    /// errored placeholder; the list length always equals the count. A count
    /// above the limit fails the whole list without reading any index.
    async fn candidates(&self, version: u64) -> Result<Vec<CandidateEntry>, ReadFailure> {
        let count = match self.contract.candidate_count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(version, "candidate count read failed: {e}");
                return Err(e.into());
            }
        };

        if count > self.max_candidates {
            tracing::warn!(version, count, limit = self.max_candidates, "candidate count over limit");
            return Err(ReadFailure {
                message: format!("candidate count {count} exceeds limit {}", self.max_candidates),
            });
        }

        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count {
            match self.contract.candidate(index).await {
                Ok(candidate) => entries.push(CandidateEntry::Loaded(candidate)),
                Err(e) => {
                    tracing::warn!(version, index, "candidate read failed: {e}");
                    entries.push(CandidateEntry::Errored {
                        index,
                        error: e.into(),
                    });
                }
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_nullables::{NullContract, NullWallet};
    use ballot_types::{Candidate, ChainId, ElectionPhase, VoterRecord};

    fn account() -> AccountAddress {
        AccountAddress::new([0xaa; 20])
    }

    fn ctx(epoch: u64) -> SessionContext {
        SessionContext::new(
            epoch,
            ChainId(31337),
            account(),
            Arc::new(NullWallet::single(account())),
        )
    }

    fn contract() -> Arc<NullContract> {
        let contract = Arc::new(NullContract::new(account()));
        contract.add_candidate(Candidate::new(1, "A", 3));
        contract.add_candidate(Candidate::new(2, "B", 5));
        contract.add_candidate(Candidate::new(3, "C", 0));
        contract
    }

    #[tokio::test]
    async fn reads_in_fixed_order() {
        let contract = contract();
        let sync = Synchronizer::new(contract.clone());
        sync.build(&ctx(1), 1).await;
        assert_eq!(
            contract.calls(),
            vec![
                "owner",
                "phase",
                "voter",
                "candidate_count",
                "candidate:0",
                "candidate:1",
                "candidate:2"
            ]
        );
    }

    #[tokio::test]
    async fn composes_snapshot() {
        let contract = contract();
        contract.set_phase(ElectionPhase::Voting);
        contract.set_voter(account(), VoterRecord::from_raw(true, false, 0));
        let sync = Synchronizer::new(contract.clone());

        let snap = sync.build(&ctx(4), 9).await;
        assert_eq!(snap.version, 9);
        assert_eq!(snap.epoch, 4);
        assert_eq!(snap.phase, Ok(ElectionPhase::Voting));
        assert!(snap.effective_voter().can_vote());
        assert!(snap.is_owner());
        assert_eq!(snap.loaded_candidates().count(), 3);
    }

    #[tokio::test]
    async fn failed_candidate_index_leaves_placeholder_in_place() {
        let contract = contract();
        contract.fail_candidate(1);
        let sync = Synchronizer::new(contract.clone());

        let snap = sync.build(&ctx(1), 1).await;
        let entries = snap.candidates.as_ref().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].candidate().unwrap().name, "A");
        assert!(matches!(entries[1], CandidateEntry::Errored { index: 1, .. }));
        assert_eq!(entries[2].candidate().unwrap().name, "C");
    }

    #[tokio::test]
    async fn read_failures_degrade_fields_independently() {
        let contract = contract();
        contract.fail_phase(true);
        contract.fail_voter(true);
        let sync = Synchronizer::new(contract.clone());

        let snap = sync.build(&ctx(1), 1).await;
        assert!(snap.phase.is_err());
        assert_eq!(snap.effective_phase(), ElectionPhase::Unknown);
        assert!(snap.voter.is_err());
        assert_eq!(snap.candidates.as_ref().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn count_failure_marks_whole_list() {
        let contract = contract();
        contract.fail_count(true);
        let sync = Synchronizer::new(contract.clone());

        let snap = sync.build(&ctx(1), 1).await;
        assert!(snap.candidates.is_err());
        assert_eq!(contract.count_calls("candidate:"), 0);
    }

    #[tokio::test]
    async fn count_over_limit_fails_list_without_index_reads() {
        let contract = contract();
        let sync = Synchronizer::new(contract.clone()).with_max_candidates(2);

        let snap = sync.build(&ctx(1), 1).await;
        let err = snap.candidates.unwrap_err();
        assert!(err.message.contains("exceeds limit 2"), "{err}");
        assert_eq!(contract.count_calls("candidate:"), 0);
        assert!(snap.phase.is_ok());
    }

    #[tokio::test]
    async fn count_at_limit_is_read_in_full() {
        let contract = contract();
        let sync = Synchronizer::new(contract.clone()).with_max_candidates(3);

        let snap = sync.build(&ctx(1), 1).await;
        assert_eq!(snap.candidates.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn owner_read_once_per_epoch() {
        let contract = contract();
        let sync = Synchronizer::new(contract.clone());

        sync.build(&ctx(1), 1).await;
        sync.build(&ctx(1), 2).await;
        assert_eq!(contract.count_calls("owner"), 1);

        sync.build(&ctx(2), 3).await;
        assert_eq!(contract.count_calls("owner"), 2);
    }

    #[tokio::test]
    async fn failed_owner_read_is_retried() {
        let contract = contract();
        contract.fail_owner(true);
        let sync = Synchronizer::new(contract.clone());

        let snap = sync.build(&ctx(1), 1).await;
        assert!(snap.owner.is_err());
        assert!(!snap.is_owner());

        contract.fail_owner(false);
        let snap = sync.build(&ctx(1), 2).await;
        assert!(snap.is_owner());
        assert_eq!(contract.count_calls("owner"), 2);
    }
}
