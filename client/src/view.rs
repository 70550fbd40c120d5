//! Presentation-facing view model.

use crate::snapshot::{CandidateEntry, Snapshot};
use crate::visibility::Visibility;

pub const NO_CANDIDATES: &str = "No candidates added yet.";
pub const NO_RESULTS: &str = "No candidates or results yet.";
pub const CANDIDATES_ERROR: &str = "Error loading candidates.";
pub const RESULTS_ERROR: &str = "Error loading results.";
pub const PHASE_ERROR: &str = "Error loading state.";

/// Everything a presentation layer needs to draw one snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub account: String,
    pub is_registered: String,
    pub has_voted: String,
    pub voted_candidate_id: String,
    pub phase: String,
    pub candidate_lines: Vec<String>,
    pub result_lines: Vec<String>,
    pub visibility: Visibility,
}

impl View {
    pub fn render(snapshot: &Snapshot) -> Self {
        let (is_registered, has_voted, voted_candidate_id) = match &snapshot.voter {
            Ok(voter) => (
                yes_no(voter.is_registered),
                yes_no(voter.has_voted),
                voter
                    .voted_candidate_id
                    .map_or_else(|| "N/A".to_string(), |id| id.to_string()),
            ),
            Err(_) => ("Error".into(), "Error".into(), "Error".into()),
        };

        let phase = match &snapshot.phase {
            Ok(phase) => phase.to_string(),
            Err(_) => PHASE_ERROR.to_string(),
        };

        let (candidate_lines, result_lines) = match &snapshot.candidates {
            Err(_) => (
                vec![CANDIDATES_ERROR.to_string()],
                vec![RESULTS_ERROR.to_string()],
            ),
            Ok(entries) if entries.is_empty() => {
                (vec![NO_CANDIDATES.to_string()], vec![NO_RESULTS.to_string()])
            }
            Ok(entries) => entries
                .iter()
                .map(|entry| match entry {
                    CandidateEntry::Loaded(c) => (
                        format!("ID: {}, Name: {}", c.id, c.name),
                        format!("{}: {} votes", c.name, c.vote_count),
                    ),
                    CandidateEntry::Errored { index, .. } => {
                        let line = format!("Error loading candidate at index {index}.");
                        (line.clone(), line)
                    }
                })
                .unzip(),
        };

        Self {
            account: snapshot.account.to_string(),
            is_registered,
            has_voted,
            voted_candidate_id,
            phase,
            candidate_lines,
            result_lines,
            visibility: Visibility::from_snapshot(snapshot),
        }
    }

    /// Plain-text rendering, one line per row.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Account: {}", self.account),
            format!("Registered: {}", self.is_registered),
            format!("Voted: {}", self.has_voted),
            format!("Voted candidate: {}", self.voted_candidate_id),
            format!("Election state: {}", self.phase),
        ];
        if self.visibility.owner_controls {
            lines.push("[owner controls available]".into());
        }

        lines.push("Candidates:".into());
        lines.extend(self.candidate_lines.iter().map(|l| format!("  {l}")));

        if self.visibility.voting_area {
            lines.push("Cast your vote:".into());
            lines.extend(
                self.visibility
                    .vote_buttons
                    .iter()
                    .map(|b| format!("  [{}] {}", b.candidate_id, b.label)),
            );
        }

        if self.visibility.results_area {
            lines.push("Results:".into());
            lines.extend(self.result_lines.iter().map(|l| format!("  {l}")));
        }
        lines
    }
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}
