//! Debate floor engine
//!
//! Speaker queues, the motion log, list navigation and the display board for
//! committees in session. Every mutating call is one store transaction: it
//! either lands completely or not at all.

mod board;
mod error;
mod motion_type;
mod motions;
mod navigator;
mod queue;
mod session;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub(crate) mod testing;

pub use board::{AttendanceStats, Board};
pub use error::{FloorError, FloorErrorKind, Missing, StateViolation};
pub use motion_type::MotionType;
pub use motions::{
    CreateMotion, MotionTarget, RecordedMotion, SpeakerListSnapshot, Timing, VoteFlags,
};
pub use navigator::{Direction, ListPosition, SwitchList};
pub use queue::{EntryEdit, QueueEntry};
pub use session::SessionDefaults;

use crate::db::{
    find_committee, set_attendance, set_committee_status, Attendance, Committee, CommitteeStatus,
    Database, Motion, SpeakerListEntry,
};
use std::collections::HashMap;

/// Entry point for every floor operation
#[derive(Clone)]
pub struct FloorEngine {
    db: Database,
    defaults: SessionDefaults,
}

impl FloorEngine {
    pub fn new(db: Database, defaults: SessionDefaults) -> Self {
        Self { db, defaults }
    }

    #[allow(dead_code)] // Used in tests
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ==================== Motions ====================

    pub fn create_motion(&self, cmd: &CreateMotion) -> Result<Motion, FloorError> {
        let motion = self.db.write(|tx| motions::create(tx, cmd, &self.defaults))?;
        tracing::info!(
            motion_id = motion.id,
            session_id = motion.committee_session_id,
            motion_type = %motion.motion_type,
            speaker_list_id = ?motion.speaker_list_id,
            "Recorded motion"
        );
        Ok(motion)
    }

    pub fn update_speaker_list(
        &self,
        motion_id: i64,
        list_id: i64,
        edits: &[EntryEdit],
    ) -> Result<SpeakerListSnapshot, FloorError> {
        self.db
            .write(|tx| motions::update_entries(tx, motion_id, list_id, edits))
    }

    /// Every motion of the committee, newest first, pending ones included
    pub fn motion_history(&self, committee_id: i64) -> Result<Vec<RecordedMotion>, FloorError> {
        self.db.read(|conn| {
            if find_committee(conn, committee_id)?.is_none() {
                return Err(Missing::Committee(committee_id).into());
            }
            Ok(motions::history(conn, committee_id, motions::HistoryFilter::ALL)?)
        })
    }

    // ==================== Display ====================

    pub fn board(&self, committee_id: i64) -> Result<Board, FloorError> {
        let board = self.db.read(|conn| board::snapshot(conn, committee_id))?;
        tracing::debug!(
            committee_id,
            speaker_list_id = ?board.speaker_list_id,
            queued = board.speaker_queue.len(),
            "Built board"
        );
        Ok(board)
    }

    pub fn switch_speaker_list(&self, cmd: &SwitchList) -> Result<ListPosition, FloorError> {
        let position = self.db.write(|tx| navigator::switch(tx, cmd))?;
        tracing::info!(
            committee_id = cmd.committee_id,
            direction = ?cmd.direction,
            speaker_list_id = position.speaker_list_id,
            current_index = position.current_index,
            total_lists = position.total_lists,
            "Switched speaker list"
        );
        Ok(position)
    }

    // ==================== Speaker queue ====================

    pub fn add_speaker(&self, list_id: i64, delegate_id: i64) -> Result<QueueEntry, FloorError> {
        let entry = self
            .db
            .write(|tx| queue::add_speaker(tx, list_id, delegate_id))?;
        tracing::info!(list_id, delegate_id, position = entry.position, "Added speaker");
        Ok(entry)
    }

    pub fn start_timer(&self, list_id: i64) -> Result<SpeakerListEntry, FloorError> {
        let entry = self.db.write(|tx| queue::start_timer(tx, list_id))?;
        tracing::info!(list_id, entry_id = entry.id, "Speaker has the floor");
        Ok(entry)
    }

    pub fn stop_timer(&self, list_id: i64) -> Result<Option<SpeakerListEntry>, FloorError> {
        let entry = self.db.write(|tx| queue::stop_timer(tx, list_id))?;
        tracing::info!(list_id, entry_id = ?entry.as_ref().map(|e| e.id), "Stopped speaker timer");
        Ok(entry)
    }

    pub fn next_speaker(&self, list_id: i64) -> Result<Vec<QueueEntry>, FloorError> {
        let queue = self.db.write(|tx| queue::next_speaker(tx, list_id))?;
        tracing::info!(list_id, remaining = queue.len(), "Advanced to next speaker");
        Ok(queue)
    }

    // ==================== Roster ====================

    /// Record attendance and return the recomputed thresholds.
    ///
    /// Delegates that do not sit on the committee are ignored.
    pub fn roll_call(
        &self,
        committee_id: i64,
        attendance: &HashMap<i64, Attendance>,
    ) -> Result<AttendanceStats, FloorError> {
        let stats = self.db.write(|tx| {
            if find_committee(tx, committee_id)?.is_none() {
                return Err(FloorError::from(Missing::Committee(committee_id)));
            }
            let mut updated = 0;
            for (&delegate_id, &status) in attendance {
                if set_attendance(tx, committee_id, delegate_id, status)? {
                    updated += 1;
                } else {
                    tracing::debug!(
                        committee_id,
                        delegate_id,
                        "Ignoring roll call for foreign delegate"
                    );
                }
            }
            tracing::info!(committee_id, updated, "Recorded roll call");
            Ok(AttendanceStats::load(tx, committee_id)?)
        })?;
        Ok(stats)
    }

    /// Put a committee in session. Only preparation or paused committees
    /// may start.
    pub fn start_session(&self, committee_id: i64) -> Result<Committee, FloorError> {
        self.db.write(|tx| {
            let mut committee =
                find_committee(tx, committee_id)?.ok_or(Missing::Committee(committee_id))?;
            if !committee.status.can_start_session() {
                return Err(StateViolation::CommitteeNotStartable(committee.status).into());
            }
            set_committee_status(tx, committee_id, CommitteeStatus::InSession)?;
            tracing::info!(committee_id, from = %committee.status, "Committee in session");
            committee.status = CommitteeStatus::InSession;
            Ok(committee)
        })
    }
}
