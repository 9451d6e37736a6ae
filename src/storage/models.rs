//! Data models for the learning record store.
//!
//! Row structs with `from_row` parsing and insert helpers that take a plain
//! `&Connection`, so the update protocol can compose them inside a single
//! transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

use crate::storage::StorageResult;

// ============================================================
// Topic
// ============================================================

/// A named area of knowledge owning a set of concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub name: String,
}

impl Topic {
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    /// Inserts a new topic, returning its assigned id.
    pub fn create(conn: &Connection, name: &str) -> StorageResult<i64> {
        conn.execute("INSERT INTO topics (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }
}

// ============================================================
// Concept
// ============================================================

/// An atomic fact under a topic. Content is never mutated once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: i64,
    pub topic_id: i64,
    pub content: String,
}

impl Concept {
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            topic_id: row.get("topic_id")?,
            content: row.get("content")?,
        })
    }

    /// Inserts a new concept, returning its assigned id.
    pub fn create(conn: &Connection, topic_id: i64, content: &str) -> StorageResult<i64> {
        conn.execute(
            "INSERT INTO concepts (topic_id, content) VALUES (?1, ?2)",
            params![topic_id, content],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

// ============================================================
// LearningState
// ============================================================

/// Per-concept memory state, created lazily on the first graded recall.
/// Absence means "new, never graded".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningState {
    pub id: i64,
    pub concept_id: i64,
    pub difficulty: f64,
    pub stability: f64,
}

impl LearningState {
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            concept_id: row.get("concept_id")?,
            difficulty: row.get("difficulty")?,
            stability: row.get("stability")?,
        })
    }

    /// Inserts or overwrites the single state row for a concept.
    pub fn upsert(
        conn: &Connection,
        concept_id: i64,
        difficulty: f64,
        stability: f64,
    ) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO learning_states (concept_id, difficulty, stability)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (concept_id) DO UPDATE SET
                difficulty = excluded.difficulty,
                stability = excluded.stability
            "#,
            params![concept_id, difficulty, stability],
        )?;
        Ok(())
    }
}

// ============================================================
// RecallSession
// ============================================================

/// One recall attempt: immutable, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallSession {
    pub id: i64,
    pub concept_id: i64,
    pub timestamp: DateTime<Utc>,
    pub user_response: Option<String>,
    pub grade: i64,
}

impl RecallSession {
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            concept_id: row.get("concept_id")?,
            timestamp: parse_datetime(row.get::<_, String>("timestamp")?),
            user_response: row.get("user_response")?,
            grade: row.get("grade")?,
        })
    }

    /// Appends one session row, returning its assigned id.
    pub fn append(
        conn: &Connection,
        concept_id: i64,
        timestamp: DateTime<Utc>,
        user_response: Option<&str>,
        grade: i64,
    ) -> StorageResult<i64> {
        conn.execute(
            r#"
            INSERT INTO recall_sessions (concept_id, timestamp, user_response, grade)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![concept_id, format_datetime(timestamp), user_response, grade],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

// ============================================================
// TechniqueProgress
// ============================================================

/// Running counter for one (concept, technique) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueProgress {
    pub id: i64,
    pub concept_id: i64,
    pub technique: String,
    pub applications_count: i64,
    pub last_applied_timestamp: Option<DateTime<Utc>>,
}

impl TechniqueProgress {
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            concept_id: row.get("concept_id")?,
            technique: row.get("technique")?,
            applications_count: row.get("applications_count")?,
            last_applied_timestamp: row
                .get::<_, Option<String>>("last_applied_timestamp")?
                .map(parse_datetime),
        })
    }

    /// Increments the application count for a pair, creating the row on
    /// first application.
    pub fn touch(
        conn: &Connection,
        concept_id: i64,
        technique: &str,
        applied_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO technique_progress
                (concept_id, technique, applications_count, last_applied_timestamp)
            VALUES (?1, ?2, 1, ?3)
            ON CONFLICT (concept_id, technique) DO UPDATE SET
                applications_count = applications_count + 1,
                last_applied_timestamp = excluded.last_applied_timestamp
            "#,
            params![concept_id, technique, format_datetime(applied_at)],
        )?;
        Ok(())
    }
}

// ============================================================
// Timestamp helpers
// ============================================================

/// Parses stored timestamps, tolerating both RFC3339 and the plain
/// `%Y-%m-%d %H:%M:%S` form.
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S") {
        return DateTime::from_naive_utc_and_offset(dt, Utc);
    }

    Utc::now()
}

/// Formats timestamps in the sortable text form used throughout the store.
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}
