//! Session tracking
//!
//! The active session of a committee is simply its most recently created
//! session row. It carries the pointer to the speaker list on display.

use crate::db::{timestamp, CommitteeSession, DbResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Duration of a session opened implicitly by a motion
pub const DEFAULT_DURATION_MINUTES: u32 = 120;

/// Values used when a session has to be created on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub topic: String,
    pub duration_minutes: u32,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            topic: "Default Session".to_string(),
            duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

/// Get session by ID
pub fn find(conn: &Connection, session_id: i64) -> DbResult<Option<CommitteeSession>> {
    let sql = format!(
        "SELECT {} FROM committee_sessions s WHERE s.id = ?1",
        CommitteeSession::COLUMNS
    );
    let session = conn
        .query_row(&sql, params![session_id], CommitteeSession::from_row)
        .optional()?;
    Ok(session)
}

/// Most recently created session of a committee
pub fn active(conn: &Connection, committee_id: i64) -> DbResult<Option<CommitteeSession>> {
    let sql = format!(
        "SELECT {} FROM committee_sessions s WHERE s.committee_id = ?1
         ORDER BY s.created_at DESC, s.id DESC LIMIT 1",
        CommitteeSession::COLUMNS
    );
    let session = conn
        .query_row(&sql, params![committee_id], CommitteeSession::from_row)
        .optional()?;
    Ok(session)
}

/// Active session of a committee, opening a default one if it has none.
///
/// The caller is responsible for checking the committee exists.
pub fn resolve_or_create(
    conn: &Connection,
    committee_id: i64,
    defaults: &SessionDefaults,
) -> DbResult<CommitteeSession> {
    if let Some(session) = active(conn, committee_id)? {
        return Ok(session);
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO committee_sessions (committee_id, topic, chair, start_time, duration_minutes, created_at)
         VALUES (?1, ?2, NULL, ?3, ?4, ?3)",
        params![committee_id, defaults.topic, timestamp(&now), defaults.duration_minutes],
    )?;

    let session = CommitteeSession {
        id: conn.last_insert_rowid(),
        committee_id,
        topic: defaults.topic.clone(),
        chair: None,
        start_time: Some(now),
        duration_minutes: defaults.duration_minutes,
        current_speaker_list_id: None,
        created_at: now,
    };
    tracing::info!(
        committee_id,
        session_id = session.id,
        "Opened default committee session"
    );
    Ok(session)
}

/// Repoint the session at a speaker list (or at nothing)
pub fn set_current_list(conn: &Connection, session_id: i64, list_id: Option<i64>) -> DbResult<()> {
    conn.execute(
        "UPDATE committee_sessions SET current_speaker_list_id = ?1 WHERE id = ?2",
        params![list_id, session_id],
    )?;
    Ok(())
}

/// Drop every session pointer that references a list about to disappear
pub fn clear_list_references(conn: &Connection, list_id: i64) -> DbResult<usize> {
    let cleared = conn.execute(
        "UPDATE committee_sessions SET current_speaker_list_id = NULL
         WHERE current_speaker_list_id = ?1",
        params![list_id],
    )?;
    Ok(cleared)
}
