//! Motion log
//!
//! Records procedural motions. List-spawning motion types open a new speaker
//! list and point the session at it in the same transaction as the insert.

use super::error::{FloorError, Missing};
use super::queue::{self, EntryEdit};
use super::session::{self, SessionDefaults};
use crate::db::{
    find_committee, find_delegate, timestamp, DbResult, Motion, MotionState, MotionType,
    SpeakerList, SpeakerListEntry,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;

/// Where a motion is filed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionTarget {
    /// An explicit session
    Session(i64),
    /// Whatever session is active for the committee, created if needed
    Committee(i64),
}

/// Speaking time granted by a motion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub unit_time_seconds: Option<u32>,
    pub total_time_seconds: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteFlags {
    pub vote_required: bool,
    pub veto_applicable: bool,
}

/// Validated create-motion command
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMotion {
    pub target: MotionTarget,
    pub motion_type: MotionType,
    pub proposer_id: Option<i64>,
    pub timing: Timing,
    pub flags: VoteFlags,
    pub state: MotionState,
    pub vote_result: Option<Value>,
    pub description: Option<String>,
}

impl CreateMotion {
    pub fn new(target: MotionTarget, motion_type: MotionType) -> Self {
        Self {
            target,
            motion_type,
            proposer_id: None,
            timing: Timing::default(),
            flags: VoteFlags::default(),
            state: MotionState::Pending,
            vote_result: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: MotionState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_proposer(mut self, delegate_id: i64) -> Self {
        self.proposer_id = Some(delegate_id);
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

/// A speaker list with every entry, parked ones included
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerListSnapshot {
    #[serde(flatten)]
    pub list: SpeakerList,
    pub entries: Vec<SpeakerListEntry>,
}

/// A motion joined with what the board shows about it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMotion {
    #[serde(flatten)]
    pub motion: Motion,
    pub motion_type_name: &'static str,
    pub proposer_country: Option<String>,
    pub proposer_name: Option<String>,
}

/// Which motions a history read returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryFilter {
    pub include_pending: bool,
    pub limit: Option<u32>,
}

impl HistoryFilter {
    pub const ALL: Self = Self {
        include_pending: true,
        limit: None,
    };
}

/// Get motion by ID
pub fn find(conn: &Connection, motion_id: i64) -> DbResult<Option<Motion>> {
    let sql = format!("SELECT {} FROM motions m WHERE m.id = ?1", Motion::COLUMNS);
    let motion = conn
        .query_row(&sql, params![motion_id], Motion::from_row)
        .optional()?;
    Ok(motion)
}

/// File a motion, resolving its session and spawning a list when the type
/// calls for one.
pub fn create(
    conn: &Connection,
    cmd: &CreateMotion,
    defaults: &SessionDefaults,
) -> Result<Motion, FloorError> {
    let session = match cmd.target {
        MotionTarget::Session(session_id) => {
            session::find(conn, session_id)?.ok_or(Missing::Session(session_id))?
        }
        MotionTarget::Committee(committee_id) => {
            if find_committee(conn, committee_id)?.is_none() {
                return Err(Missing::Committee(committee_id).into());
            }
            session::resolve_or_create(conn, committee_id, defaults)?
        }
    };

    if let Some(proposer_id) = cmd.proposer_id {
        if find_delegate(conn, proposer_id)?.is_none() {
            return Err(Missing::Delegate(proposer_id).into());
        }
    }

    let speaker_list_id = if cmd.motion_type.spawns_list() {
        let list = queue::create_list(conn, session.committee_id)?;
        session::set_current_list(conn, session.id, Some(list.id))?;
        Some(list.id)
    } else {
        None
    };

    let now = Utc::now();
    let vote_result = cmd.vote_result.as_ref().map(Value::to_string);
    conn.execute(
        "INSERT INTO motions (committee_session_id, motion_type, proposer_id, unit_time_seconds,
                              total_time_seconds, speaker_list_id, vote_required, veto_applicable,
                              state, vote_result, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            session.id,
            cmd.motion_type,
            cmd.proposer_id,
            cmd.timing.unit_time_seconds,
            cmd.timing.total_time_seconds,
            speaker_list_id,
            cmd.flags.vote_required,
            cmd.flags.veto_applicable,
            cmd.state,
            vote_result,
            cmd.description,
            timestamp(&now),
        ],
    )?;

    Ok(Motion {
        id: conn.last_insert_rowid(),
        committee_session_id: session.id,
        motion_type: cmd.motion_type,
        proposer_id: cmd.proposer_id,
        unit_time_seconds: cmd.timing.unit_time_seconds,
        total_time_seconds: cmd.timing.total_time_seconds,
        speaker_list_id,
        vote_required: cmd.flags.vote_required,
        veto_applicable: cmd.flags.veto_applicable,
        state: cmd.state,
        vote_result: cmd.vote_result.clone(),
        description: cmd.description.clone(),
        created_at: now,
    })
}

/// Apply entry edits to the list a motion spawned
pub fn update_entries(
    conn: &Connection,
    motion_id: i64,
    list_id: i64,
    edits: &[EntryEdit],
) -> Result<SpeakerListSnapshot, FloorError> {
    let motion = find(conn, motion_id)?.ok_or(Missing::Motion(motion_id))?;
    let list = queue::require_list(conn, list_id)?;
    if motion.speaker_list_id != Some(list_id) {
        return Err(FloorError::ListMismatch { motion_id, list_id });
    }

    let applied = queue::apply_edits(conn, list_id, edits)?;
    tracing::info!(
        motion_id,
        list_id,
        requested = edits.len(),
        applied,
        "Updated speaker list entries"
    );

    Ok(SpeakerListSnapshot {
        list,
        entries: queue::entries(conn, list_id)?,
    })
}

/// Motions of a committee across all its sessions, newest first
pub fn history(
    conn: &Connection,
    committee_id: i64,
    filter: HistoryFilter,
) -> DbResult<Vec<RecordedMotion>> {
    let sql = format!(
        "SELECT {}, d.country, u.name
         FROM motions m
         JOIN committee_sessions s ON s.id = m.committee_session_id
         LEFT JOIN delegates d ON d.id = m.proposer_id
         LEFT JOIN users u ON u.id = d.user_id
         WHERE s.committee_id = ?1 AND (?2 OR m.state != 'pending')
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ?3",
        Motion::COLUMNS
    );
    // SQLite treats a negative LIMIT as unbounded
    let limit = filter.limit.map_or(-1, i64::from);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![committee_id, filter.include_pending, limit], |row| {
        let motion = Motion::from_row(row)?;
        Ok(RecordedMotion {
            motion_type_name: motion.motion_type.label(),
            motion,
            proposer_country: row.get(Motion::WIDTH)?,
            proposer_name: row.get(Motion::WIDTH + 1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Most recent decided motion that spawned the given list
pub fn latest_decided_on_list(conn: &Connection, list_id: i64) -> DbResult<Option<Motion>> {
    let sql = format!(
        "SELECT {} FROM motions m
         WHERE m.speaker_list_id = ?1 AND m.state != 'pending'
         ORDER BY m.created_at DESC, m.id DESC LIMIT 1",
        Motion::COLUMNS
    );
    let motion = conn
        .query_row(&sql, params![list_id], Motion::from_row)
        .optional()?;
    Ok(motion)
}

/// Clear the list reference of every motion pointing at `list_id`
pub fn detach_list(conn: &Connection, list_id: i64) -> DbResult<usize> {
    let detached = conn.execute(
        "UPDATE motions SET speaker_list_id = NULL WHERE speaker_list_id = ?1",
        params![list_id],
    )?;
    Ok(detached)
}
