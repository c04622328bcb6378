//! Test fixtures
//!
//! An in-memory store seeded with one committee ("SC") and its delegates,
//! plus an empty second committee ("GA") for cross-committee cases.

use super::motions::{self, CreateMotion, MotionTarget};
use super::queue::{self, EntryEdit};
use super::{session, FloorEngine, MotionType, SessionDefaults};
use crate::db::{
    insert_committee, insert_delegate, insert_user, timestamp, CommitteeSession, CommitteeStatus,
    Database, DbError, EntryStatus, NewCommittee, SpeakerListEntry,
};
use chrono::Utc;
use rusqlite::params;

const COUNTRIES: [&str; 8] = [
    "France", "Chile", "Kenya", "Japan", "Brazil", "Canada", "Egypt", "Norway",
];

pub struct Fixture {
    pub engine: FloorEngine,
    pub committee_id: i64,
    pub other_committee_id: i64,
    /// Delegate ids of the main committee, in `COUNTRIES` order
    pub delegates: Vec<i64>,
}

impl Fixture {
    /// Seed the main committee with `delegates` delegates
    pub fn new(delegates: usize) -> Self {
        let db = Database::open_in_memory().unwrap();

        let (committee_id, other_committee_id, delegates) = db
            .write(|tx| {
                let main = insert_committee(tx, &committee("SC", "Security Council"))?;
                let other = insert_committee(tx, &committee("GA", "General Assembly"))?;

                let mut ids = Vec::with_capacity(delegates);
                for i in 0..delegates {
                    let country = COUNTRIES
                        .get(i)
                        .map_or_else(|| format!("Country {i}"), ToString::to_string);
                    let user = insert_user(tx, &format!("Delegate of {country}"))?;
                    ids.push(insert_delegate(tx, main.id, Some(user), &country)?.id);
                }
                Ok::<_, DbError>((main.id, other.id, ids))
            })
            .unwrap();

        Self {
            engine: FloorEngine::new(db, SessionDefaults::default()),
            committee_id,
            other_committee_id,
            delegates,
        }
    }

    pub fn db(&self) -> &Database {
        self.engine.db()
    }

    /// Insert a session for the main committee directly
    pub fn insert_session(&self, topic: &str) -> i64 {
        self.db()
            .write(|tx| {
                tx.execute(
                    "INSERT INTO committee_sessions (committee_id, topic, duration_minutes, created_at)
                     VALUES (?1, ?2, 30, ?3)",
                    params![self.committee_id, topic, timestamp(&Utc::now())],
                )?;
                Ok::<_, DbError>(tx.last_insert_rowid())
            })
            .unwrap()
    }

    /// A bare list of the main committee, not referenced by any motion
    pub fn insert_list(&self) -> i64 {
        self.db()
            .write(|tx| queue::create_list(tx, self.committee_id))
            .unwrap()
            .id
    }

    /// File an open_main_list motion and return the list it spawned
    pub fn open_list(&self) -> i64 {
        self.engine
            .create_motion(&CreateMotion::new(
                MotionTarget::Committee(self.committee_id),
                MotionType::OpenMainList,
            ))
            .unwrap()
            .speaker_list_id
            .unwrap()
    }

    /// A list of the second committee, not referenced by any motion
    pub fn other_committee_list(&self) -> i64 {
        self.db()
            .write(|tx| queue::create_list(tx, self.other_committee_id))
            .unwrap()
            .id
    }

    pub fn other_committee_delegate(&self) -> i64 {
        self.db()
            .write(|tx| insert_delegate(tx, self.other_committee_id, None, "Peru"))
            .unwrap()
            .id
    }

    /// Queue one delegate per status, in order, and return the entry ids.
    ///
    /// Removed entries end up parked behind the active ones.
    pub fn queue(&self, list_id: i64, statuses: &[EntryStatus]) -> Vec<i64> {
        let ids: Vec<i64> = statuses
            .iter()
            .zip(&self.delegates)
            .map(|(_, &delegate_id)| self.engine.add_speaker(list_id, delegate_id).unwrap().id)
            .collect();
        assert_eq!(ids.len(), statuses.len(), "not enough delegates seeded");

        let edits: Vec<EntryEdit> = ids
            .iter()
            .zip(statuses)
            .filter(|(_, status)| **status != EntryStatus::Waiting)
            .map(|(&id, &status)| EntryEdit {
                id,
                position: None,
                status: Some(status),
            })
            .collect();
        self.db()
            .write(|tx| queue::apply_edits(tx, list_id, &edits))
            .unwrap();
        ids
    }

    pub fn entries(&self, list_id: i64) -> Vec<SpeakerListEntry> {
        self.db().read(|conn| queue::entries(conn, list_id)).unwrap()
    }

    pub fn active_session(&self) -> Option<CommitteeSession> {
        self.db()
            .read(|conn| session::active(conn, self.committee_id))
            .unwrap()
    }

    /// Point the main committee's active session at a list
    pub fn point_at(&self, list_id: i64) {
        let session = self.active_session().expect("committee has no session");
        self.db()
            .write(|tx| session::set_current_list(tx, session.id, Some(list_id)))
            .unwrap();
    }

    pub fn list_count(&self) -> i64 {
        self.db()
            .read(|conn| {
                conn.query_row("SELECT COUNT(*) FROM speaker_lists", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap()
    }

    /// The motion that spawned a list
    pub fn motion_for_list(&self, list_id: i64) -> i64 {
        let history = self
            .db()
            .read(|conn| motions::history(conn, self.committee_id, motions::HistoryFilter::ALL))
            .unwrap();
        history
            .iter()
            .find(|m| m.motion.speaker_list_id == Some(list_id))
            .map(|m| m.motion.id)
            .expect("no motion spawned this list")
    }
}

fn committee<'a>(code: &'a str, name: &'a str) -> NewCommittee<'a> {
    NewCommittee {
        code,
        name,
        venue: Some("Hall A"),
        status: CommitteeStatus::Preparation,
        time_config: None,
    }
}

/// Active entries hold `1..=n`, parked entries follow, at most one speaks
pub fn assert_queue_invariants(entries: &[SpeakerListEntry]) {
    let positions: Vec<i64> = entries.iter().map(|e| e.position).collect();
    let expected: Vec<i64> = (1..).take(entries.len()).collect();
    assert_eq!(positions, expected, "positions must be 1..n without gaps");

    let active = entries.iter().take_while(|e| e.status.is_active()).count();
    assert!(
        entries[active..].iter().all(|e| !e.status.is_active()),
        "removed entries must be parked behind active ones: {entries:?}"
    );

    let speaking = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Speaking)
        .count();
    assert!(speaking <= 1, "at most one speaker, found {speaking}");
}
