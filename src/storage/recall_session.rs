//! Recall session log operations.
//!
//! The log is append-only: sessions are recorded once per recall attempt and
//! never mutated or deleted, preserving the audit trail even when a later
//! state computation fails.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::{format_datetime, RecallSession};
use crate::storage::{StorageError, StorageResult};

/// Most recent session for a concept, if any. Ties on the second-resolution
/// timestamp fall back to insertion order.
pub(crate) fn latest(conn: &Connection, concept_id: i64) -> StorageResult<Option<RecallSession>> {
    let session = conn
        .query_row(
            r#"
            SELECT * FROM recall_sessions
            WHERE concept_id = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
            params![concept_id],
            |row| RecallSession::from_row(row),
        )
        .optional()?;

    Ok(session)
}

/// Most recent session strictly before the given one. With the current
/// attempt already appended, this is the second-most-recent overall.
pub(crate) fn latest_before(
    conn: &Connection,
    concept_id: i64,
    session_id: i64,
    session_timestamp: DateTime<Utc>,
) -> StorageResult<Option<RecallSession>> {
    let ts = format_datetime(session_timestamp);
    let session = conn
        .query_row(
            r#"
            SELECT * FROM recall_sessions
            WHERE concept_id = ?1
              AND (timestamp < ?2 OR (timestamp = ?2 AND id < ?3))
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
            params![concept_id, ts, session_id],
            |row| RecallSession::from_row(row),
        )
        .optional()?;

    Ok(session)
}

/// Every recorded grade for a concept, most-recent-first.
pub(crate) fn grades(conn: &Connection, concept_id: i64) -> StorageResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT grade FROM recall_sessions
        WHERE concept_id = ?1
        ORDER BY timestamp DESC, id DESC
        "#,
    )?;

    let grades = stmt
        .query_map(params![concept_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(grades)
}

/// Recall session repository.
pub struct RecallSessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RecallSessionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_connection(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// Appends one session, returning its assigned id.
    pub fn append(
        &self,
        concept_id: i64,
        timestamp: DateTime<Utc>,
        user_response: Option<&str>,
        grade: i64,
    ) -> StorageResult<i64> {
        let conn = self.get_connection()?;
        RecallSession::append(&conn, concept_id, timestamp, user_response, grade)
    }

    /// Most recent session for a concept.
    pub fn latest(&self, concept_id: i64) -> StorageResult<Option<RecallSession>> {
        let conn = self.get_connection()?;
        latest(&conn, concept_id)
    }

    /// Every recorded grade for a concept, most-recent-first.
    pub fn grades(&self, concept_id: i64) -> StorageResult<Vec<i64>> {
        let conn = self.get_connection()?;
        grades(&conn, concept_id)
    }

    /// Full session history for a concept, oldest first.
    pub fn history(&self, concept_id: i64) -> StorageResult<Vec<RecallSession>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM recall_sessions
            WHERE concept_id = ?1
            ORDER BY timestamp, id
            "#,
        )?;

        let sessions = stmt
            .query_map(params![concept_id], |row| RecallSession::from_row(row))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use chrono::{Duration, Utc};

    fn seeded_concept(storage: &Storage) -> i64 {
        let topic_id = storage.topics().add("Geography").unwrap();
        storage
            .concepts()
            .add(topic_id, "The Nile flows north")
            .unwrap()
    }

    #[test]
    fn append_and_read_back() {
        let storage = Storage::in_memory().unwrap();
        let concept_id = seeded_concept(&storage);
        let sessions = storage.recall_sessions();

        let now = Utc::now();
        sessions
            .append(concept_id, now, Some("it flows north"), 3)
            .unwrap();

        let latest = sessions.latest(concept_id).unwrap().unwrap();
        assert_eq!(latest.concept_id, concept_id);
        assert_eq!(latest.grade, 3);
        assert_eq!(latest.user_response.as_deref(), Some("it flows north"));
    }

    #[test]
    fn grades_are_most_recent_first() {
        let storage = Storage::in_memory().unwrap();
        let concept_id = seeded_concept(&storage);
        let sessions = storage.recall_sessions();

        let base = Utc::now();
        for (offset, grade) in [(0, 1), (1, 2), (2, 4)] {
            sessions
                .append(concept_id, base + Duration::days(offset), None, grade)
                .unwrap();
        }

        assert_eq!(sessions.grades(concept_id).unwrap(), vec![4, 2, 1]);
    }

    #[test]
    fn latest_before_skips_the_current_session() {
        let storage = Storage::in_memory().unwrap();
        let concept_id = seeded_concept(&storage);
        let sessions = storage.recall_sessions();

        let first_ts = Utc::now() - Duration::days(10);
        let second_ts = Utc::now();
        let first_id = sessions.append(concept_id, first_ts, None, 1).unwrap();
        let second_id = sessions.append(concept_id, second_ts, None, 3).unwrap();

        let conn = storage.connection();
        let guard = conn.lock().unwrap();
        let prior = latest_before(&guard, concept_id, second_id, second_ts)
            .unwrap()
            .unwrap();
        assert_eq!(prior.id, first_id);

        // The very first session has nothing before it.
        let none = latest_before(&guard, concept_id, first_id, first_ts).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn same_timestamp_falls_back_to_insertion_order() {
        let storage = Storage::in_memory().unwrap();
        let concept_id = seeded_concept(&storage);
        let sessions = storage.recall_sessions();

        let ts = Utc::now();
        let first_id = sessions.append(concept_id, ts, None, 2).unwrap();
        let second_id = sessions.append(concept_id, ts, None, 3).unwrap();

        let latest = sessions.latest(concept_id).unwrap().unwrap();
        assert_eq!(latest.id, second_id);

        let conn = storage.connection();
        let guard = conn.lock().unwrap();
        let prior = latest_before(&guard, concept_id, second_id, ts)
            .unwrap()
            .unwrap();
        assert_eq!(prior.id, first_id);
    }
}
