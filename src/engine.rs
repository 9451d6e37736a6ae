//! The scheduling engine: selection, technique allocation and the update
//! protocol for graded recall attempts.
//!
//! One `record_recall_and_update` call is one logical unit: append the
//! session, compute elapsed time and retrievability, derive the new
//! difficulty/stability, persist, bump technique progress. All four writes
//! run inside a single storage transaction and commit or roll back together.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fsrs::{self, FsrsParams, Grade};
use crate::scheduler::{self, CandidateState, ReviewCandidate};
use crate::storage::models::{parse_datetime, LearningState, RecallSession, TechniqueProgress};
use crate::storage::{concept, learning_state, recall_session, Concept, Storage, StorageError,
    StorageResult, Topic};
use crate::technique::{self, Technique};

/// Engine error type.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown concept: {0}")]
    UnknownConcept(i64),

    #[error("invalid grade: {0} (expected 1..=4)")]
    InvalidGrade(i64),

    #[error(transparent)]
    Store(#[from] StorageError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Result of one graded recall attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub concept_id: i64,
    pub difficulty: f64,
    pub stability: f64,
    /// Retrievability used for this transition; 1.0 for a first grading.
    pub retrievability: f64,
    pub technique: Technique,
}

/// Mean current retrievability across a topic's concepts. Concepts never
/// graded contribute 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMastery {
    pub topic: Topic,
    pub mastery: f64,
}

/// The spaced-repetition scheduling engine.
///
/// Holds an explicitly passed storage handle; there is no ambient global
/// connection. All methods are synchronous and run to completion.
pub struct Engine {
    storage: Storage,
    params: FsrsParams,
}

impl Engine {
    /// Creates an engine over a store using the reference FSRS-4.5 weights.
    pub fn new(storage: Storage) -> Self {
        Self::with_params(storage, FsrsParams::default())
    }

    pub fn with_params(storage: Storage, params: FsrsParams) -> Self {
        Self { storage, params }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn params(&self) -> &FsrsParams {
        &self.params
    }

    /// Next concept to review, or `None` when nothing exists to review.
    ///
    /// Read-only and idempotent: calling it twice without an intervening
    /// update returns the same concept.
    pub fn select_next_concept(&self) -> EngineResult<Option<Concept>> {
        let now = Utc::now();

        let selected = self.storage.snapshot(|conn| {
            let candidates = load_candidates(conn)?;
            match scheduler::select_next(&candidates, now) {
                Some(concept_id) => concept::get_concept(conn, concept_id),
                None => Ok(None),
            }
        })?;

        if let Some(concept) = &selected {
            log::debug!("selected concept {} for review", concept.id);
        }

        Ok(selected)
    }

    /// Review technique for a concept, classified from its full grade
    /// history.
    pub fn allocate_technique(&self, concept_id: i64) -> EngineResult<Technique> {
        let grades = self.storage.snapshot(|conn| {
            match concept::get_concept(conn, concept_id)? {
                Some(_) => Ok(Some(recall_session::grades(conn, concept_id)?)),
                None => Ok(None),
            }
        })?;

        let grades = grades.ok_or(EngineError::UnknownConcept(concept_id))?;
        Ok(technique::allocate(&grades))
    }

    /// Records one graded recall attempt and updates the concept's memory
    /// state.
    ///
    /// The session row is always appended first so the raw response and
    /// grade survive in the audit trail; a failure anywhere rolls the whole
    /// attempt back.
    pub fn record_recall_and_update(
        &self,
        concept_id: i64,
        response_text: &str,
        grade: i64,
        technique: Technique,
    ) -> EngineResult<ReviewOutcome> {
        self.record_recall_and_update_at(concept_id, response_text, grade, technique, Utc::now())
    }

    /// Same as [`Self::record_recall_and_update`] with an explicit attempt
    /// timestamp, for callers that batch or replay recorded attempts.
    pub fn record_recall_and_update_at(
        &self,
        concept_id: i64,
        response_text: &str,
        grade: i64,
        technique: Technique,
        now: DateTime<Utc>,
    ) -> EngineResult<ReviewOutcome> {
        let grade = Grade::from_value(grade).ok_or(EngineError::InvalidGrade(grade))?;
        let params = &self.params;

        let outcome = self.storage.transaction(|conn| {
            if concept::get_concept(conn, concept_id)?.is_none() {
                return Ok(None);
            }

            let session_id =
                RecallSession::append(conn, concept_id, now, Some(response_text), grade.value())?;

            let (difficulty, stability, retrievability) =
                match learning_state::get_state(conn, concept_id)? {
                    None => {
                        // First grading: no prior decay to account for.
                        (
                            params.initial_difficulty(grade),
                            params.initial_stability(grade),
                            1.0,
                        )
                    }
                    Some(state) => {
                        let elapsed_days =
                            elapsed_since_prior_session(conn, concept_id, session_id, now)?;
                        let r = fsrs::retrievability(elapsed_days, state.stability);
                        let difficulty = params.next_difficulty(state.difficulty, grade);
                        let stability =
                            params.next_stability(difficulty, state.stability, r, grade);
                        (difficulty, stability, r)
                    }
                };

            LearningState::upsert(conn, concept_id, difficulty, stability)?;
            TechniqueProgress::touch(conn, concept_id, technique.as_str(), now)?;

            Ok(Some(ReviewOutcome {
                concept_id,
                difficulty,
                stability,
                retrievability,
                technique,
            }))
        })?;

        outcome.ok_or(EngineError::UnknownConcept(concept_id))
    }

    /// Per-topic mastery overview for reporting dashboards.
    pub fn topic_mastery(&self) -> EngineResult<Vec<TopicMastery>> {
        let now = Utc::now();

        let overview = self.storage.snapshot(|conn| {
            let candidates = load_candidates(conn)?;

            let mut stmt = conn.prepare("SELECT * FROM topics ORDER BY id")?;
            let topics: Vec<Topic> = stmt
                .query_map([], |row| Topic::from_row(row))?
                .filter_map(|r| r.ok())
                .collect();

            let overview = topics
                .into_iter()
                .map(|topic| {
                    let scores: Vec<f64> = candidates
                        .iter()
                        .filter(|c| c.topic_id == topic.id)
                        .map(|c| scheduler::current_retrievability(c, now).unwrap_or(0.0))
                        .collect();

                    let mastery = if scores.is_empty() {
                        0.0
                    } else {
                        scores.iter().sum::<f64>() / scores.len() as f64
                    };

                    TopicMastery { topic, mastery }
                })
                .collect();

            Ok(overview)
        })?;

        Ok(overview)
    }
}

/// Whole days since the session strictly before the one just appended.
///
/// A concept holding a learning state is expected to have at least one prior
/// session; if the lookup comes back empty the inconsistency is logged and
/// treated as zero elapsed days rather than failing the update.
fn elapsed_since_prior_session(
    conn: &Connection,
    concept_id: i64,
    session_id: i64,
    now: DateTime<Utc>,
) -> StorageResult<f64> {
    match recall_session::latest_before(conn, concept_id, session_id, now)? {
        Some(prior) => Ok((now - prior.timestamp).num_days().max(0) as f64),
        None => {
            log::warn!(
                "concept {} has a learning state but no prior recall session; using 0 elapsed days",
                concept_id
            );
            Ok(0.0)
        }
    }
}

/// Loads the selection snapshot: every concept joined with its optional
/// memory state and the timestamp of its most recent session.
fn load_candidates(conn: &Connection) -> StorageResult<Vec<ReviewCandidate>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            c.id AS concept_id,
            c.topic_id AS topic_id,
            ls.difficulty AS difficulty,
            ls.stability AS stability,
            (
                SELECT rs.timestamp FROM recall_sessions rs
                WHERE rs.concept_id = c.id
                ORDER BY rs.timestamp DESC, rs.id DESC
                LIMIT 1
            ) AS last_reviewed
        FROM concepts c
        LEFT JOIN learning_states ls ON ls.concept_id = c.id
        ORDER BY c.id
        "#,
    )?;

    let candidates = stmt
        .query_map([], |row| {
            let difficulty: Option<f64> = row.get("difficulty")?;
            let stability: Option<f64> = row.get("stability")?;
            let state = match (difficulty, stability) {
                (Some(difficulty), Some(stability)) => Some(CandidateState {
                    difficulty,
                    stability,
                }),
                _ => None,
            };

            Ok(ReviewCandidate {
                concept_id: row.get("concept_id")?,
                topic_id: row.get("topic_id")?,
                state,
                last_reviewed: row
                    .get::<_, Option<String>>("last_reviewed")?
                    .map(parse_datetime),
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(candidates)
}
