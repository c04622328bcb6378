//! Database schema and types

pub use crate::floor::MotionType;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// SQL schema for initialization
///
/// Users, committees and delegates belong to the upstream roster system; they
/// live in the same store so the floor can join against them.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS committees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    venue TEXT,
    status TEXT NOT NULL DEFAULT 'preparation',
    time_config TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS delegates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    committee_id INTEGER NOT NULL,
    user_id INTEGER,
    country TEXT NOT NULL,
    status TEXT,

    FOREIGN KEY (committee_id) REFERENCES committees(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_delegates_committee ON delegates(committee_id);

CREATE TABLE IF NOT EXISTS speaker_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    committee_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (committee_id) REFERENCES committees(id)
);

CREATE TABLE IF NOT EXISTS speaker_list_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    speaker_list_id INTEGER NOT NULL,
    delegate_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'waiting',
    created_at TEXT NOT NULL,

    FOREIGN KEY (speaker_list_id) REFERENCES speaker_lists(id),
    FOREIGN KEY (delegate_id) REFERENCES delegates(id),
    UNIQUE (speaker_list_id, position)
);

CREATE TABLE IF NOT EXISTS committee_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    committee_id INTEGER NOT NULL,
    topic TEXT NOT NULL,
    chair TEXT,
    start_time TEXT,
    duration_minutes INTEGER NOT NULL DEFAULT 30,
    current_speaker_list_id INTEGER,
    created_at TEXT NOT NULL,

    FOREIGN KEY (committee_id) REFERENCES committees(id) ON DELETE CASCADE,
    FOREIGN KEY (current_speaker_list_id) REFERENCES speaker_lists(id)
);

CREATE INDEX IF NOT EXISTS idx_sessions_committee ON committee_sessions(committee_id, created_at DESC);

CREATE TABLE IF NOT EXISTS motions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    committee_session_id INTEGER NOT NULL,
    motion_type TEXT NOT NULL,
    proposer_id INTEGER,
    unit_time_seconds INTEGER,
    total_time_seconds INTEGER,
    speaker_list_id INTEGER,
    vote_required BOOLEAN NOT NULL DEFAULT 0,
    veto_applicable BOOLEAN NOT NULL DEFAULT 0,
    state TEXT NOT NULL DEFAULT 'pending',
    vote_result TEXT,
    description TEXT,
    created_at TEXT NOT NULL,

    FOREIGN KEY (committee_session_id) REFERENCES committee_sessions(id),
    FOREIGN KEY (proposer_id) REFERENCES delegates(id),
    FOREIGN KEY (speaker_list_id) REFERENCES speaker_lists(id)
);

CREATE INDEX IF NOT EXISTS idx_motions_session ON motions(committee_session_id, created_at);
CREATE INDEX IF NOT EXISTS idx_motions_speaker_list ON motions(speaker_list_id);
";

/// A stored enum value that no longer parses
#[derive(Debug, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Stores an enum as its wire name in a TEXT column.
macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: ParseEnumError| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )+};
}

sql_text_enum!(CommitteeStatus, Attendance, EntryStatus, MotionState, MotionType);

// ==================== Roster ====================

/// Lifecycle of a committee as seen by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitteeStatus {
    Preparation,
    InSession,
    Paused,
    Closed,
}

impl CommitteeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preparation => "preparation",
            Self::InSession => "in_session",
            Self::Paused => "paused",
            Self::Closed => "closed",
        }
    }

    /// A session may only be opened from preparation or a pause.
    pub fn can_start_session(self) -> bool {
        matches!(self, Self::Preparation | Self::Paused)
    }
}

impl FromStr for CommitteeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preparation" => Ok(Self::Preparation),
            "in_session" => Ok(Self::InSession),
            "paused" => Ok(Self::Paused),
            "closed" => Ok(Self::Closed),
            other => Err(ParseEnumError::new("committee status", other)),
        }
    }
}

/// Roll-call result for one delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Present,
    Absent,
}

impl Attendance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

impl FromStr for Attendance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(ParseEnumError::new("attendance", other)),
        }
    }
}

/// Committee record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Committee {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub venue: Option<String>,
    pub status: CommitteeStatus,
    /// Opaque timer presets, always a JSON object
    pub time_config: Value,
    pub created_at: DateTime<Utc>,
}

impl Committee {
    pub(crate) const COLUMNS: &'static str =
        "c.id, c.code, c.name, c.venue, c.status, c.time_config, c.created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let time_config = row
            .get::<_, Option<String>>(5)?
            .and_then(|s| serde_json::from_str::<Value>(&s).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            venue: row.get(3)?,
            status: row.get(4)?,
            time_config,
            created_at: parse_datetime(&row.get::<_, String>(6)?),
        })
    }
}

/// Delegate record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegate {
    pub id: i64,
    pub committee_id: i64,
    pub user_id: Option<i64>,
    pub country: String,
    /// `None` until the first roll call
    pub status: Option<Attendance>,
}

impl Delegate {
    pub(crate) const COLUMNS: &'static str = "d.id, d.committee_id, d.user_id, d.country, d.status";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            committee_id: row.get(1)?,
            user_id: row.get(2)?,
            country: row.get(3)?,
            status: row.get(4)?,
        })
    }
}

// ==================== Floor ====================

/// One sitting of a committee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeSession {
    pub id: i64,
    pub committee_id: i64,
    pub topic: String,
    pub chair: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    /// The speaker list the display is showing
    pub current_speaker_list_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl CommitteeSession {
    pub(crate) const COLUMNS: &'static str = "s.id, s.committee_id, s.topic, s.chair, s.start_time, \
         s.duration_minutes, s.current_speaker_list_id, s.created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            committee_id: row.get(1)?,
            topic: row.get(2)?,
            chair: row.get(3)?,
            start_time: row
                .get::<_, Option<String>>(4)?
                .map(|s| parse_datetime(&s)),
            duration_minutes: row.get(5)?,
            current_speaker_list_id: row.get(6)?,
            created_at: parse_datetime(&row.get::<_, String>(7)?),
        })
    }
}

/// Container of speaking slots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerList {
    pub id: i64,
    pub committee_id: i64,
    pub created_at: DateTime<Utc>,
}

impl SpeakerList {
    pub(crate) const COLUMNS: &'static str = "l.id, l.committee_id, l.created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            committee_id: row.get(1)?,
            created_at: parse_datetime(&row.get::<_, String>(2)?),
        })
    }
}

/// Status of a speaking slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Waiting,
    Speaking,
    Removed,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Speaking => "speaking",
            Self::Removed => "removed",
        }
    }

    /// Waiting and speaking entries form the visible queue.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Removed)
    }
}

impl FromStr for EntryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "speaking" => Ok(Self::Speaking),
            "removed" => Ok(Self::Removed),
            other => Err(ParseEnumError::new("entry status", other)),
        }
    }
}

/// One delegate's slot in a speaker list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerListEntry {
    pub id: i64,
    pub speaker_list_id: i64,
    pub delegate_id: i64,
    pub position: i64,
    pub status: EntryStatus,
}

impl SpeakerListEntry {
    pub(crate) const COLUMNS: &'static str =
        "e.id, e.speaker_list_id, e.delegate_id, e.position, e.status";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            speaker_list_id: row.get(1)?,
            delegate_id: row.get(2)?,
            position: row.get(3)?,
            status: row.get(4)?,
        })
    }
}

/// Outcome of a motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Pending,
    Passed,
    Rejected,
}

impl MotionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for MotionState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "passed" => Ok(Self::Passed),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseEnumError::new("motion state", other)),
        }
    }
}

/// Procedural motion record. Immutable once written, except that deleting
/// its speaker list clears `speaker_list_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motion {
    pub id: i64,
    pub committee_session_id: i64,
    pub motion_type: MotionType,
    pub proposer_id: Option<i64>,
    pub unit_time_seconds: Option<u32>,
    pub total_time_seconds: Option<u32>,
    pub speaker_list_id: Option<i64>,
    pub vote_required: bool,
    pub veto_applicable: bool,
    pub state: MotionState,
    pub vote_result: Option<Value>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Motion {
    pub(crate) const COLUMNS: &'static str = "m.id, m.committee_session_id, m.motion_type, \
         m.proposer_id, m.unit_time_seconds, m.total_time_seconds, m.speaker_list_id, \
         m.vote_required, m.veto_applicable, m.state, m.vote_result, m.description, m.created_at";

    /// Number of columns `from_row` consumes
    pub(crate) const WIDTH: usize = 13;

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            committee_session_id: row.get(1)?,
            motion_type: row.get(2)?,
            proposer_id: row.get(3)?,
            unit_time_seconds: row.get(4)?,
            total_time_seconds: row.get(5)?,
            speaker_list_id: row.get(6)?,
            vote_required: row.get(7)?,
            veto_applicable: row.get(8)?,
            state: row.get(9)?,
            vote_result: row
                .get::<_, Option<String>>(10)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            description: row.get(11)?,
            created_at: parse_datetime(&row.get::<_, String>(12)?),
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
pub fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
