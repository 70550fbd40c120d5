//! Visibility policy: what the UI may offer, derived purely from a snapshot.

use ballot_types::ElectionPhase;

use crate::snapshot::Snapshot;

/// A vote button for one candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteButton {
    pub candidate_id: u64,
    pub label: String,
}

/// Which areas and controls are shown.
///
/// | phase        | voting area                    | results area | vote buttons            |
/// |--------------|--------------------------------|--------------|-------------------------|
/// | Registration | hidden                         | hidden       | none                    |
/// | Voting       | shown iff registered & not voted | hidden     | one per loaded candidate iff registered & not voted |
/// | Finished     | hidden                         | shown        | none                    |
/// | Unknown      | hidden                         | hidden       | none                    |
///
/// A failed phase read counts as Unknown; a failed voter read counts as
/// unregistered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Visibility {
    pub voting_area: bool,
    pub results_area: bool,
    pub vote_buttons: Vec<VoteButton>,
    /// Owner-only controls (register voter, add candidate, start/end voting).
    pub owner_controls: bool,
}

impl Visibility {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let phase = snapshot.effective_phase();
        let can_vote = phase == ElectionPhase::Voting && snapshot.effective_voter().can_vote();

        let vote_buttons = if can_vote {
            snapshot
                .loaded_candidates()
                .map(|c| VoteButton {
                    candidate_id: c.id,
                    label: format!("Vote for {}", c.name),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            voting_area: can_vote,
            results_area: phase == ElectionPhase::Finished,
            vote_buttons,
            owner_controls: snapshot.is_owner(),
        }
    }

    /// Whether `candidate_id` may be voted for right now.
    pub fn offers_vote_for(&self, candidate_id: u64) -> bool {
        self.vote_buttons.iter().any(|b| b.candidate_id == candidate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CandidateEntry, ReadFailure};
    use ballot_types::{AccountAddress, Candidate, ChainId, VoterRecord};
    use proptest::prelude::*;

    fn snapshot(phase: ElectionPhase, voter: VoterRecord) -> Snapshot {
        Snapshot {
            version: 1,
            epoch: 1,
            account: AccountAddress::new([1; 20]),
            chain_id: ChainId(31337),
            owner: Ok(AccountAddress::new([2; 20])),
            phase: Ok(phase),
            voter: Ok(voter),
            candidates: Ok(vec![
                CandidateEntry::Loaded(Candidate::new(1, "A", 3)),
                CandidateEntry::Loaded(Candidate::new(2, "B", 5)),
            ]),
        }
    }

    const UNREGISTERED: VoterRecord = VoterRecord {
        is_registered: false,
        has_voted: false,
        voted_candidate_id: None,
    };
    const ELIGIBLE: VoterRecord = VoterRecord {
        is_registered: true,
        has_voted: false,
        voted_candidate_id: None,
    };
    const VOTED: VoterRecord = VoterRecord {
        is_registered: true,
        has_voted: true,
        voted_candidate_id: Some(1),
    };

    #[test]
    fn registration_hides_everything() {
        let v = Visibility::from_snapshot(&snapshot(ElectionPhase::Registration, ELIGIBLE));
        assert!(!v.voting_area && !v.results_area && v.vote_buttons.is_empty());
    }

    #[test]
    fn voting_and_eligible_shows_buttons() {
        let v = Visibility::from_snapshot(&snapshot(ElectionPhase::Voting, ELIGIBLE));
        assert!(v.voting_area);
        assert!(!v.results_area);
        let labels: Vec<_> = v.vote_buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Vote for A", "Vote for B"]);
        assert!(v.offers_vote_for(2));
    }

    #[test]
    fn voting_but_unregistered_hides_voting_area() {
        let v = Visibility::from_snapshot(&snapshot(ElectionPhase::Voting, UNREGISTERED));
        assert!(!v.voting_area && !v.results_area && v.vote_buttons.is_empty());
    }

    #[test]
    fn voting_but_already_voted_hides_voting_area() {
        let v = Visibility::from_snapshot(&snapshot(ElectionPhase::Voting, VOTED));
        assert!(!v.voting_area && !v.results_area && v.vote_buttons.is_empty());
    }

    #[test]
    fn finished_shows_results_only() {
        let v = Visibility::from_snapshot(&snapshot(ElectionPhase::Finished, ELIGIBLE));
        assert!(!v.voting_area && v.results_area && v.vote_buttons.is_empty());
    }

    #[test]
    fn unknown_hides_everything() {
        let v = Visibility::from_snapshot(&snapshot(ElectionPhase::Unknown, ELIGIBLE));
        assert!(!v.voting_area && !v.results_area && v.vote_buttons.is_empty());
    }

    #[test]
    fn failed_voter_read_hides_voting_area() {
        let mut snap = snapshot(ElectionPhase::Voting, ELIGIBLE);
        snap.voter = Err(ReadFailure { message: "down".into() });
        let v = Visibility::from_snapshot(&snap);
        assert!(!v.voting_area && v.vote_buttons.is_empty());
    }

    #[test]
    fn errored_candidates_get_no_button() {
        let mut snap = snapshot(ElectionPhase::Voting, ELIGIBLE);
        snap.candidates = Ok(vec![
            CandidateEntry::Errored {
                index: 0,
                error: ReadFailure { message: "down".into() },
            },
            CandidateEntry::Loaded(Candidate::new(2, "B", 5)),
        ]);
        let v = Visibility::from_snapshot(&snap);
        assert_eq!(v.vote_buttons.len(), 1);
        assert_eq!(v.vote_buttons[0].candidate_id, 2);
    }

    #[test]
    fn owner_controls_follow_owner_match() {
        let mut snap = snapshot(ElectionPhase::Registration, ELIGIBLE);
        assert!(!Visibility::from_snapshot(&snap).owner_controls);
        snap.owner = Ok(snap.account);
        assert!(Visibility::from_snapshot(&snap).owner_controls);
    }

    fn phase_strategy() -> impl Strategy<Value = ElectionPhase> {
        prop_oneof![
            Just(ElectionPhase::Registration),
            Just(ElectionPhase::Voting),
            Just(ElectionPhase::Finished),
            Just(ElectionPhase::Unknown),
        ]
    }

    proptest! {
        /// Buttons and the voting area appear together, only in Voting for an
        /// eligible voter, and never alongside results.
        #[test]
        fn policy_invariants(phase in phase_strategy(), registered: bool, voted: bool) {
            let voter = VoterRecord::from_raw(registered, voted, 1);
            let snap = snapshot(phase, voter);
            let v = Visibility::from_snapshot(&snap);
            let eligible = phase == ElectionPhase::Voting && registered && !voted;
            prop_assert_eq!(v.voting_area, eligible);
            prop_assert_eq!(!v.vote_buttons.is_empty(), eligible);
            prop_assert_eq!(v.results_area, phase == ElectionPhase::Finished);
            prop_assert!(!(v.voting_area && v.results_area));
            prop_assert_eq!(Visibility::from_snapshot(&snap), v);
        }
    }
}
