//! Speaker queue
//!
//! Keeps one speaker list ordered and gap-free. Non-removed entries hold
//! positions `1..=n`; removed entries are parked behind them at `n+1..`, so
//! the store's unique `(speaker_list_id, position)` index covers every row.
//!
//! Functions here run inside the caller's transaction.

use super::error::{FloorError, Missing, StateViolation};
use crate::db::{find_delegate, timestamp, DbResult, EntryStatus, SpeakerList, SpeakerListEntry};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Queue entry as shown on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: i64,
    pub delegate_id: i64,
    pub country: String,
    pub delegate: String,
    pub status: EntryStatus,
    pub position: i64,
}

const QUEUE_SELECT: &str = "SELECT e.id, e.delegate_id, d.country, u.name, e.status, e.position
     FROM speaker_list_entries e
     LEFT JOIN delegates d ON d.id = e.delegate_id
     LEFT JOIN users u ON u.id = d.user_id";

fn queue_entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        delegate_id: row.get(1)?,
        country: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "Unknown".to_string()),
        delegate: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "Unknown".to_string()),
        status: row.get(4)?,
        position: row.get(5)?,
    })
}

/// One requested change to an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEdit {
    pub id: i64,
    /// Target position, 1-based
    pub position: Option<i64>,
    pub status: Option<EntryStatus>,
}

// ==================== Lists ====================

pub fn find_list(conn: &Connection, list_id: i64) -> DbResult<Option<SpeakerList>> {
    let sql = format!("SELECT {} FROM speaker_lists l WHERE l.id = ?1", SpeakerList::COLUMNS);
    let list = conn
        .query_row(&sql, params![list_id], SpeakerList::from_row)
        .optional()?;
    Ok(list)
}

pub fn require_list(conn: &Connection, list_id: i64) -> Result<SpeakerList, FloorError> {
    find_list(conn, list_id)?.ok_or_else(|| Missing::SpeakerList(list_id).into())
}

/// Open an empty speaker list for a committee
pub fn create_list(conn: &Connection, committee_id: i64) -> DbResult<SpeakerList> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO speaker_lists (committee_id, created_at) VALUES (?1, ?2)",
        params![committee_id, timestamp(&now)],
    )?;
    Ok(SpeakerList {
        id: conn.last_insert_rowid(),
        committee_id,
        created_at: now,
    })
}

/// Number of waiting or speaking entries
pub fn active_count(conn: &Connection, list_id: i64) -> DbResult<u32> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM speaker_list_entries
         WHERE speaker_list_id = ?1 AND status != 'removed'",
        params![list_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ==================== Entries ====================

/// Every entry of a list, parked ones included, by position
pub fn entries(conn: &Connection, list_id: i64) -> DbResult<Vec<SpeakerListEntry>> {
    let sql = format!(
        "SELECT {} FROM speaker_list_entries e WHERE e.speaker_list_id = ?1 ORDER BY e.position",
        SpeakerListEntry::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![list_id], SpeakerListEntry::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// The visible queue: waiting and speaking entries by position
pub fn query(conn: &Connection, list_id: i64) -> DbResult<Vec<QueueEntry>> {
    let sql = format!(
        "{QUEUE_SELECT} WHERE e.speaker_list_id = ?1 AND e.status IN ('waiting', 'speaking')
         ORDER BY e.position"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![list_id], queue_entry_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn queue_entry(conn: &Connection, entry_id: i64) -> DbResult<QueueEntry> {
    let sql = format!("{QUEUE_SELECT} WHERE e.id = ?1");
    Ok(conn.query_row(&sql, params![entry_id], queue_entry_from_row)?)
}

fn entry_with_status(
    conn: &Connection,
    list_id: i64,
    status: EntryStatus,
) -> DbResult<Option<SpeakerListEntry>> {
    let sql = format!(
        "SELECT {} FROM speaker_list_entries e
         WHERE e.speaker_list_id = ?1 AND e.status = ?2
         ORDER BY e.position LIMIT 1",
        SpeakerListEntry::COLUMNS
    );
    let entry = conn
        .query_row(&sql, params![list_id, status], SpeakerListEntry::from_row)
        .optional()?;
    Ok(entry)
}

/// Which entries a shift moves
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Entries strictly after a position
    After(i64),
    /// Removed entries
    Parked,
}

/// Move the entries in `scope` by `delta` positions.
///
/// Moved rows pass through negative positions first so the unique position
/// index never sees a transient duplicate.
fn shift(conn: &Connection, list_id: i64, scope: Scope, delta: i64) -> DbResult<usize> {
    let moved = match scope {
        Scope::After(position) => conn.execute(
            "UPDATE speaker_list_entries SET position = -(position + ?3)
             WHERE speaker_list_id = ?1 AND position > ?2",
            params![list_id, position, delta],
        )?,
        Scope::Parked => conn.execute(
            "UPDATE speaker_list_entries SET position = -(position + ?2)
             WHERE speaker_list_id = ?1 AND status = 'removed'",
            params![list_id, delta],
        )?,
    };
    conn.execute(
        "UPDATE speaker_list_entries SET position = -position
         WHERE speaker_list_id = ?1 AND position < 0",
        params![list_id],
    )?;
    Ok(moved)
}

// ==================== Operations ====================

/// Append a delegate to the end of the queue as waiting
pub fn add_speaker(
    conn: &Connection,
    list_id: i64,
    delegate_id: i64,
) -> Result<QueueEntry, FloorError> {
    require_list(conn, list_id)?;
    if find_delegate(conn, delegate_id)?.is_none() {
        return Err(Missing::Delegate(delegate_id).into());
    }

    let position = i64::from(active_count(conn, list_id)?) + 1;
    shift(conn, list_id, Scope::Parked, 1)?;

    conn.execute(
        "INSERT INTO speaker_list_entries (speaker_list_id, delegate_id, position, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            list_id,
            delegate_id,
            position,
            EntryStatus::Waiting,
            timestamp(&Utc::now())
        ],
    )?;
    Ok(queue_entry(conn, conn.last_insert_rowid())?)
}

/// Give the floor to the first waiting delegate.
///
/// Starting while someone already speaks hands back that speaker unchanged.
pub fn start_timer(conn: &Connection, list_id: i64) -> Result<SpeakerListEntry, FloorError> {
    require_list(conn, list_id)?;
    if let Some(speaking) = entry_with_status(conn, list_id, EntryStatus::Speaking)? {
        return Ok(speaking);
    }

    let mut next = entry_with_status(conn, list_id, EntryStatus::Waiting)?
        .ok_or(StateViolation::NoWaitingSpeaker(list_id))?;
    conn.execute(
        "UPDATE speaker_list_entries SET status = ?1 WHERE id = ?2",
        params![EntryStatus::Speaking, next.id],
    )?;
    next.status = EntryStatus::Speaking;
    Ok(next)
}

/// Return the current speaker to waiting; `None` if nobody was speaking
pub fn stop_timer(conn: &Connection, list_id: i64) -> Result<Option<SpeakerListEntry>, FloorError> {
    require_list(conn, list_id)?;
    let Some(mut speaking) = entry_with_status(conn, list_id, EntryStatus::Speaking)? else {
        return Ok(None);
    };
    conn.execute(
        "UPDATE speaker_list_entries SET status = ?1 WHERE id = ?2",
        params![EntryStatus::Waiting, speaking.id],
    )?;
    speaking.status = EntryStatus::Waiting;
    Ok(Some(speaking))
}

/// Drop the current speaker (or the first waiting one) and close the gap.
///
/// Returns the updated visible queue.
pub fn next_speaker(conn: &Connection, list_id: i64) -> Result<Vec<QueueEntry>, FloorError> {
    require_list(conn, list_id)?;
    let current = match entry_with_status(conn, list_id, EntryStatus::Speaking)? {
        Some(entry) => entry,
        None => entry_with_status(conn, list_id, EntryStatus::Waiting)?
            .ok_or(StateViolation::NoCurrentSpeaker(list_id))?,
    };

    conn.execute(
        "DELETE FROM speaker_list_entries WHERE id = ?1",
        params![current.id],
    )?;
    let moved = shift(conn, list_id, Scope::After(current.position), -1)?;
    tracing::debug!(
        list_id,
        entry_id = current.id,
        position = current.position,
        moved,
        "Advanced speaker queue"
    );

    Ok(query(conn, list_id)?)
}

/// Apply a batch of edits, then renumber the whole list.
///
/// Edits run in order; a position edit moves the entry to that slot and
/// shifts the rest. Ids not in this list are skipped. Returns how many edits
/// matched an entry.
pub fn apply_edits(
    conn: &Connection,
    list_id: i64,
    edits: &[EntryEdit],
) -> Result<usize, FloorError> {
    let mut order = entries(conn, list_id)?;
    let mut applied = 0;

    for edit in edits {
        let Some(index) = order.iter().position(|e| e.id == edit.id) else {
            tracing::debug!(list_id, entry_id = edit.id, "Skipping edit for unknown entry");
            continue;
        };
        applied += 1;

        if let Some(status) = edit.status {
            order[index].status = status;
        }
        if let Some(position) = edit.position {
            let entry = order.remove(index);
            let slot = usize::try_from(position.saturating_sub(1))
                .unwrap_or(0)
                .min(order.len());
            order.insert(slot, entry);
        }
    }

    let speaking = order
        .iter()
        .filter(|e| e.status == EntryStatus::Speaking)
        .count();
    if speaking > 1 {
        return Err(StateViolation::MultipleSpeakers(list_id).into());
    }

    // Stable: active entries keep their edited order, parked ones follow
    order.sort_by_key(|e| !e.status.is_active());

    conn.execute(
        "UPDATE speaker_list_entries SET position = -position WHERE speaker_list_id = ?1",
        params![list_id],
    )?;
    let mut stmt = conn.prepare(
        "UPDATE speaker_list_entries SET position = ?1, status = ?2 WHERE id = ?3",
    )?;
    for (position, entry) in (1_i64..).zip(&order) {
        stmt.execute(params![position, entry.status, entry.id])?;
    }

    Ok(applied)
}
