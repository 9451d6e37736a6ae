//! Next-concept selection policy.
//!
//! Greedy, stateless-per-call heuristic over a consistent snapshot of all
//! concepts: never-graded concepts come first (cold-start coverage), then the
//! concept most likely to be forgotten right now, i.e. the one with minimum
//! retrievability. Ties always break toward the lowest concept id so batches
//! added together are reviewed in a reproducible order. Nothing is persisted;
//! every call recomputes from scratch.

use chrono::{DateTime, Utc};

use crate::fsrs;

/// Memory state carried by a candidate, when one exists.
#[derive(Debug, Clone, Copy)]
pub struct CandidateState {
    pub difficulty: f64,
    pub stability: f64,
}

/// One concept as seen by the selection policy.
#[derive(Debug, Clone)]
pub struct ReviewCandidate {
    pub concept_id: i64,
    pub topic_id: i64,
    /// `None` means new, never graded.
    pub state: Option<CandidateState>,
    /// Timestamp of the most recent recall session, if any.
    pub last_reviewed: Option<DateTime<Utc>>,
}

/// Current retrievability of a candidate, or `None` for a concept with no
/// memory state. A stated concept with no session on record should not occur;
/// it is treated as reviewed just now rather than failing.
pub fn current_retrievability(candidate: &ReviewCandidate, now: DateTime<Utc>) -> Option<f64> {
    let state = candidate.state.as_ref()?;

    let elapsed_days = match candidate.last_reviewed {
        Some(last) => (now - last).num_days().max(0) as f64,
        None => {
            log::warn!(
                "concept {} has a learning state but no recall session; assuming zero elapsed days",
                candidate.concept_id
            );
            0.0
        }
    };

    Some(fsrs::retrievability(elapsed_days, state.stability))
}

/// Picks the next concept to review.
///
/// Priority order: lowest-id concept without state, else minimum
/// retrievability with lowest-id tie-break, else `None` when there is nothing
/// to review.
pub fn select_next(candidates: &[ReviewCandidate], now: DateTime<Utc>) -> Option<i64> {
    if let Some(new) = candidates
        .iter()
        .filter(|c| c.state.is_none())
        .map(|c| c.concept_id)
        .min()
    {
        return Some(new);
    }

    candidates
        .iter()
        .filter_map(|c| current_retrievability(c, now).map(|r| (c.concept_id, r)))
        .min_by(|(id_a, r_a), (id_b, r_b)| {
            r_a.partial_cmp(r_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(id_a.cmp(id_b))
        })
        .map(|(id, _)| id)
}
