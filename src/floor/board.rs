//! Display board
//!
//! Read-only composition of everything the floor display polls for. Nothing
//! here writes.

use super::error::{FloorError, Missing};
use super::motions::{self, HistoryFilter, RecordedMotion};
use super::navigator;
use super::queue::{self, QueueEntry};
use super::session;
use crate::db::{
    attendance_counts, find_committee, CommitteeStatus, DbResult, MotionState, MotionType,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

/// Longest motion history the board carries
pub const HISTORY_LIMIT: u32 = 20;

/// Attendance and the vote thresholds derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: u32,
    pub present: u32,
    pub two_thirds: u32,
    pub half: u32,
    pub twenty_percent: u32,
}

impl AttendanceStats {
    pub fn new(total: u32, present: u32) -> Self {
        Self {
            total,
            present,
            two_thirds: present.saturating_mul(2).div_ceil(3),
            half: present.div_ceil(2),
            twenty_percent: present.div_ceil(5),
        }
    }

    pub fn load(conn: &Connection, committee_id: i64) -> DbResult<Self> {
        let (total, present) = attendance_counts(conn, committee_id)?;
        Ok(Self::new(total, present))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitteeSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub venue: Option<String>,
    pub status: CommitteeStatus,
    pub time_config: Value,
}

/// The decided motion that governs the list on display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMotion {
    pub id: i64,
    pub motion_type: MotionType,
    pub label: &'static str,
    pub state: MotionState,
    pub unit_time_seconds: Option<u32>,
    pub total_time_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub proposer: String,
    pub created_at: String,
}

impl HistoryEvent {
    fn from_motion(recorded: &RecordedMotion) -> Self {
        let motion = &recorded.motion;
        let label = motion.motion_type.label();
        let outcome = if motion.state == MotionState::Passed {
            "Motion passed"
        } else {
            "Motion failed"
        };

        let proposer = match (&recorded.proposer_country, &recorded.proposer_name) {
            (Some(country), Some(name)) => format!("{country} ({name})"),
            (Some(country), None) => country.clone(),
            (None, _) => String::new(),
        };

        let mut description = if proposer.is_empty() {
            label.to_string()
        } else {
            format!("{proposer} moved a {label}")
        };
        if let Some(unit) = motion.unit_time_seconds.filter(|&s| s > 0) {
            description.push_str(&format!(" · unit {unit}s"));
        }
        if let Some(total) = motion.total_time_seconds.filter(|&s| s > 0) {
            description.push_str(&format!(" · total {total}s"));
        }

        Self {
            id: motion.id,
            title: format!("{outcome}: {label}"),
            description,
            proposer,
            created_at: crate::db::timestamp(&motion.created_at),
        }
    }
}

/// Everything the floor display shows for one committee
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub committee: CommitteeSummary,
    pub statistics: AttendanceStats,
    pub speaker_queue: Vec<QueueEntry>,
    pub speaker_list_id: Option<i64>,
    pub active_motion: Option<ActiveMotion>,
    pub current_index: usize,
    pub total_lists: usize,
    pub history_events: Vec<HistoryEvent>,
}

pub fn snapshot(conn: &Connection, committee_id: i64) -> Result<Board, FloorError> {
    let committee = find_committee(conn, committee_id)?.ok_or(Missing::Committee(committee_id))?;
    let statistics = AttendanceStats::load(conn, committee_id)?;

    let speaker_list_id =
        session::active(conn, committee_id)?.and_then(|s| s.current_speaker_list_id);

    let (speaker_queue, active_motion) = match speaker_list_id {
        Some(list_id) => {
            let active_motion =
                motions::latest_decided_on_list(conn, list_id)?.map(|m| ActiveMotion {
                    id: m.id,
                    motion_type: m.motion_type,
                    label: m.motion_type.label(),
                    state: m.state,
                    unit_time_seconds: m.unit_time_seconds,
                    total_time_seconds: m.total_time_seconds,
                });
            (queue::query(conn, list_id)?, active_motion)
        }
        None => (Vec::new(), None),
    };

    let history_events = motions::history(
        conn,
        committee_id,
        HistoryFilter {
            include_pending: false,
            limit: Some(HISTORY_LIMIT),
        },
    )?
    .iter()
    .map(HistoryEvent::from_motion)
    .collect();

    let ids = navigator::list_ids(conn, committee_id)?;

    Ok(Board {
        committee: CommitteeSummary {
            id: committee.id,
            code: committee.code,
            name: committee.name,
            venue: committee.venue,
            status: committee.status,
            time_config: committee.time_config,
        },
        statistics,
        speaker_queue,
        speaker_list_id,
        active_motion,
        current_index: navigator::index_of(&ids, speaker_list_id),
        total_lists: ids.len(),
        history_events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Attendance, EntryStatus};
    use crate::floor::motions::{CreateMotion, MotionTarget, Timing};
    use crate::floor::navigator::{Direction, SwitchList};
    use crate::floor::testing::Fixture;
    use std::collections::HashMap;

    #[test]
    fn test_thresholds_round_up() {
        assert_eq!(AttendanceStats::new(0, 0), AttendanceStats::new(0, 0));
        let stats = AttendanceStats::new(20, 7);
        assert_eq!(stats.two_thirds, 5);
        assert_eq!(stats.half, 4);
        assert_eq!(stats.twenty_percent, 2);

        let stats = AttendanceStats::new(15, 15);
        assert_eq!(stats.two_thirds, 10);
        assert_eq!(stats.half, 8);
        assert_eq!(stats.twenty_percent, 3);

        let stats = AttendanceStats::new(3, 0);
        assert_eq!((stats.two_thirds, stats.half, stats.twenty_percent), (0, 0, 0));
    }

    #[test]
    fn test_board_for_fresh_committee() {
        let fx = Fixture::new(2);

        let board = fx.engine.board(fx.committee_id).unwrap();
        assert_eq!(board.committee.code, "SC");
        assert_eq!(board.statistics.total, 2);
        assert_eq!(board.statistics.present, 0);
        assert!(board.speaker_queue.is_empty());
        assert!(board.speaker_list_id.is_none());
        assert!(board.active_motion.is_none());
        assert_eq!((board.current_index, board.total_lists), (0, 0));
        assert!(board.history_events.is_empty());
    }

    #[test]
    fn test_board_missing_committee() {
        let fx = Fixture::new(0);
        let err = fx.engine.board(9999).unwrap_err();
        assert!(matches!(err, FloorError::NotFound(Missing::Committee(9999))));
    }

    #[test]
    fn test_board_shows_current_list_and_decided_motion() {
        let fx = Fixture::new(3);
        fx.engine
            .roll_call(
                fx.committee_id,
                &HashMap::from([
                    (fx.delegates[0], Attendance::Present),
                    (fx.delegates[1], Attendance::Present),
                    (fx.delegates[2], Attendance::Absent),
                ]),
            )
            .unwrap();

        let motion = fx
            .engine
            .create_motion(
                &CreateMotion::new(
                    MotionTarget::Committee(fx.committee_id),
                    MotionType::ModerateCaucus,
                )
                .with_proposer(fx.delegates[0])
                .with_state(MotionState::Passed)
                .with_timing(Timing {
                    unit_time_seconds: Some(60),
                    total_time_seconds: Some(600),
                }),
            )
            .unwrap();
        let list_id = motion.speaker_list_id.unwrap();
        fx.queue(list_id, &[EntryStatus::Speaking, EntryStatus::Waiting, EntryStatus::Removed]);

        let board = fx.engine.board(fx.committee_id).unwrap();
        assert_eq!(board.statistics.present, 2);
        assert_eq!(board.statistics.two_thirds, 2);
        assert_eq!(board.speaker_list_id, Some(list_id));
        assert_eq!(board.speaker_queue.len(), 2);
        assert_eq!(board.speaker_queue[0].status, EntryStatus::Speaking);

        let active = board.active_motion.unwrap();
        assert_eq!(active.id, motion.id);
        assert_eq!(active.unit_time_seconds, Some(60));

        assert_eq!(board.history_events.len(), 1);
        let event = &board.history_events[0];
        assert_eq!(event.title, "Motion passed: Moderated Caucus");
        assert_eq!(event.proposer, "France (Delegate of France)");
        assert_eq!(
            event.description,
            "France (Delegate of France) moved a Moderated Caucus · unit 60s · total 600s"
        );
    }

    #[test]
    fn test_pending_motion_is_not_active_or_historic() {
        let fx = Fixture::new(0);
        fx.open_list();

        let board = fx.engine.board(fx.committee_id).unwrap();
        assert!(board.speaker_list_id.is_some());
        assert!(board.active_motion.is_none());
        assert!(board.history_events.is_empty());
    }

    #[test]
    fn test_history_is_bounded_and_newest_first() {
        let fx = Fixture::new(0);
        for _ in 0..25 {
            fx.engine
                .create_motion(
                    &CreateMotion::new(
                        MotionTarget::Committee(fx.committee_id),
                        MotionType::UnmoderatedCaucus,
                    )
                    .with_state(MotionState::Rejected),
                )
                .unwrap();
        }

        let board = fx.engine.board(fx.committee_id).unwrap();
        assert_eq!(board.history_events.len(), 20);
        assert!(board
            .history_events
            .windows(2)
            .all(|pair| pair[0].id > pair[1].id));
        assert_eq!(
            board.history_events[0].title,
            "Motion failed: Unmoderated Caucus"
        );
    }

    #[test]
    fn test_board_index_matches_navigator() {
        let fx = Fixture::new(0);
        fx.open_list();
        fx.open_list();
        fx.open_list();

        let position = fx
            .engine
            .switch_speaker_list(&SwitchList {
                committee_id: fx.committee_id,
                direction: Direction::Next,
                delete_empty_list_id: None,
            })
            .unwrap();

        let board = fx.engine.board(fx.committee_id).unwrap();
        assert_eq!(board.speaker_list_id, Some(position.speaker_list_id));
        assert_eq!(board.current_index, position.current_index);
        assert_eq!(board.total_lists, position.total_lists);
    }
}
