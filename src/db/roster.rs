//! Roster lookups
//!
//! Committees, delegates and users are written by the upstream registration
//! system. The floor only reads them, records roll-call attendance, and flips
//! a committee into session.

use super::{timestamp, Attendance, Committee, CommitteeStatus, DbError, DbResult, Delegate};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Get committee by ID
pub fn find_committee(conn: &Connection, id: i64) -> DbResult<Option<Committee>> {
    let sql = format!("SELECT {} FROM committees c WHERE c.id = ?1", Committee::COLUMNS);
    let committee = conn
        .query_row(&sql, params![id], Committee::from_row)
        .optional()?;
    Ok(committee)
}

/// Get delegate by ID
pub fn find_delegate(conn: &Connection, id: i64) -> DbResult<Option<Delegate>> {
    let sql = format!("SELECT {} FROM delegates d WHERE d.id = ?1", Delegate::COLUMNS);
    let delegate = conn
        .query_row(&sql, params![id], Delegate::from_row)
        .optional()?;
    Ok(delegate)
}

/// Count `(total, present)` delegates of a committee
pub fn attendance_counts(conn: &Connection, committee_id: i64) -> DbResult<(u32, u32)> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COUNT(CASE WHEN status = 'present' THEN 1 END)
         FROM delegates WHERE committee_id = ?1",
        params![committee_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

/// Record attendance for a delegate of the given committee.
///
/// Returns `false` when the delegate does not sit on that committee.
pub fn set_attendance(
    conn: &Connection,
    committee_id: i64,
    delegate_id: i64,
    attendance: Attendance,
) -> DbResult<bool> {
    let updated = conn.execute(
        "UPDATE delegates SET status = ?1 WHERE id = ?2 AND committee_id = ?3",
        params![attendance, delegate_id, committee_id],
    )?;
    Ok(updated > 0)
}

pub fn set_committee_status(conn: &Connection, id: i64, status: CommitteeStatus) -> DbResult<()> {
    conn.execute(
        "UPDATE committees SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;
    Ok(())
}

// ==================== Fixtures ====================
//
// The registration system owns these writes in production.

/// Input for seeding a committee
#[allow(dead_code)] // Used in tests
#[derive(Debug, Clone)]
pub struct NewCommittee<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub venue: Option<&'a str>,
    pub status: CommitteeStatus,
    pub time_config: Option<&'a Value>,
}

#[allow(dead_code)] // Used in tests
pub fn insert_user(conn: &Connection, name: &str) -> DbResult<i64> {
    conn.execute("INSERT INTO users (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

#[allow(dead_code)] // Used in tests
pub fn insert_committee(conn: &Connection, new: &NewCommittee<'_>) -> DbResult<Committee> {
    let time_config = new.time_config.map(Value::to_string);
    conn.execute(
        "INSERT INTO committees (code, name, venue, status, time_config, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.code,
            new.name,
            new.venue,
            new.status,
            time_config,
            timestamp(&Utc::now())
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_committee(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

#[allow(dead_code)] // Used in tests
pub fn insert_delegate(
    conn: &Connection,
    committee_id: i64,
    user_id: Option<i64>,
    country: &str,
) -> DbResult<Delegate> {
    conn.execute(
        "INSERT INTO delegates (committee_id, user_id, country) VALUES (?1, ?2, ?3)",
        params![committee_id, user_id, country],
    )?;
    Ok(Delegate {
        id: conn.last_insert_rowid(),
        committee_id,
        user_id,
        country: country.to_string(),
        status: None,
    })
}
