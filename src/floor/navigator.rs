//! Speaker list navigation
//!
//! The lists of a committee are the distinct list ids its motions ever
//! spawned, ordered by creation. The sequence is rebuilt on every call; there
//! is no stored ring to keep in sync.

use super::error::{FloorError, Missing};
use super::{motions, queue, session};
use crate::db::DbResult;
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    /// Step from `index` in a ring of `len` items, wrapping both ways.
    /// `len` must be non-zero.
    pub fn step(self, index: usize, len: usize) -> usize {
        match self {
            Self::Next => (index + 1) % len,
            Self::Prev => (index + len - 1) % len,
        }
    }
}

/// Validated switch command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchList {
    pub committee_id: i64,
    pub direction: Direction,
    /// Delete this list first if it has no waiting or speaking entries
    pub delete_empty_list_id: Option<i64>,
}

/// Where the session pointer sits among the committee's lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPosition {
    pub speaker_list_id: i64,
    pub current_index: usize,
    pub total_lists: usize,
}

/// Distinct list ids spawned by the committee's motions, oldest first
pub fn list_ids(conn: &Connection, committee_id: i64) -> DbResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT m.speaker_list_id
         FROM motions m
         JOIN committee_sessions s ON s.id = m.committee_session_id
         WHERE s.committee_id = ?1 AND m.speaker_list_id IS NOT NULL
         GROUP BY m.speaker_list_id
         ORDER BY MIN(m.created_at), MIN(m.id)",
    )?;
    let rows = stmt.query_map(params![committee_id], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Index of the pointer in `ids`, or 0 when unset or no longer listed
pub fn index_of(ids: &[i64], current: Option<i64>) -> usize {
    current
        .and_then(|id| ids.iter().position(|&candidate| candidate == id))
        .unwrap_or(0)
}

/// Delete a list of this committee if nothing is waiting or speaking on it.
///
/// Parked entries go with it, and every motion and session reference is
/// cleared first. Returns whether the list was deleted.
pub fn delete_if_empty(conn: &Connection, committee_id: i64, list_id: i64) -> DbResult<bool> {
    let Some(list) = queue::find_list(conn, list_id)? else {
        return Ok(false);
    };
    if list.committee_id != committee_id || queue::active_count(conn, list_id)? > 0 {
        return Ok(false);
    }

    let detached = motions::detach_list(conn, list_id)?;
    session::clear_list_references(conn, list_id)?;
    conn.execute(
        "DELETE FROM speaker_list_entries WHERE speaker_list_id = ?1",
        params![list_id],
    )?;
    conn.execute("DELETE FROM speaker_lists WHERE id = ?1", params![list_id])?;

    tracing::info!(committee_id, list_id, detached, "Deleted empty speaker list");
    Ok(true)
}

/// Move the session pointer one list forward or back
pub fn switch(conn: &Connection, cmd: &SwitchList) -> Result<ListPosition, FloorError> {
    if let Some(list_id) = cmd.delete_empty_list_id {
        delete_if_empty(conn, cmd.committee_id, list_id)?;
    }

    let active = session::active(conn, cmd.committee_id)?
        .ok_or(Missing::ActiveSession(cmd.committee_id))?;

    let ids = list_ids(conn, cmd.committee_id)?;
    if ids.is_empty() {
        return Err(Missing::SpeakerLists(cmd.committee_id).into());
    }

    let current = index_of(&ids, active.current_speaker_list_id);
    let next = cmd.direction.step(current, ids.len());
    let speaker_list_id = ids[next];
    session::set_current_list(conn, active.id, Some(speaker_list_id))?;

    Ok(ListPosition {
        speaker_list_id,
        current_index: next,
        total_lists: ids.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EntryStatus;
    use crate::floor::testing::Fixture;

    fn switch_cmd(fx: &Fixture, direction: Direction) -> SwitchList {
        SwitchList {
            committee_id: fx.committee_id,
            direction,
            delete_empty_list_id: None,
        }
    }

    #[test]
    fn test_step_wraps_both_ways() {
        assert_eq!(Direction::Next.step(2, 3), 0);
        assert_eq!(Direction::Prev.step(0, 3), 2);
        assert_eq!(Direction::Next.step(0, 1), 0);
        assert_eq!(Direction::Prev.step(0, 1), 0);
    }

    #[test]
    fn test_index_of_defaults_to_zero() {
        assert_eq!(index_of(&[4, 7, 9], Some(9)), 2);
        assert_eq!(index_of(&[4, 7, 9], Some(5)), 0);
        assert_eq!(index_of(&[4, 7, 9], None), 0);
    }

    #[test]
    fn test_switch_next_wraps_around() {
        let fx = Fixture::new(0);
        let l1 = fx.open_list();
        let l2 = fx.open_list();
        let l3 = fx.open_list();
        fx.point_at(l2);

        let position = fx.engine.switch_speaker_list(&switch_cmd(&fx, Direction::Next)).unwrap();
        assert_eq!(
            position,
            ListPosition {
                speaker_list_id: l3,
                current_index: 2,
                total_lists: 3
            }
        );

        let position = fx.engine.switch_speaker_list(&switch_cmd(&fx, Direction::Next)).unwrap();
        assert_eq!(position.speaker_list_id, l1);
        assert_eq!(position.current_index, 0);
        assert_eq!(
            fx.active_session().unwrap().current_speaker_list_id,
            Some(l1)
        );
    }

    #[test]
    fn test_switch_prev_from_first_goes_to_last() {
        let fx = Fixture::new(0);
        let l1 = fx.open_list();
        fx.open_list();
        let l3 = fx.open_list();
        fx.point_at(l1);

        let position = fx.engine.switch_speaker_list(&switch_cmd(&fx, Direction::Prev)).unwrap();
        assert_eq!(position.speaker_list_id, l3);
        assert_eq!(position.current_index, 2);
    }

    #[test]
    fn test_switch_without_lists_or_session() {
        let fx = Fixture::new(0);

        let err = fx
            .engine
            .switch_speaker_list(&switch_cmd(&fx, Direction::Next))
            .unwrap_err();
        assert!(matches!(err, FloorError::NotFound(Missing::ActiveSession(_))));

        fx.insert_session("Opening");
        let err = fx
            .engine
            .switch_speaker_list(&switch_cmd(&fx, Direction::Next))
            .unwrap_err();
        assert!(matches!(err, FloorError::NotFound(Missing::SpeakerLists(_))));
    }

    #[test]
    fn test_delete_empty_list_detaches_motions() {
        let fx = Fixture::new(1);
        let l1 = fx.open_list();
        let l2 = fx.open_list();
        let l3 = fx.open_list();
        let motion = fx.motion_for_list(l2);
        fx.queue(l2, &[EntryStatus::Removed]);

        let position = fx
            .engine
            .switch_speaker_list(&SwitchList {
                delete_empty_list_id: Some(l2),
                ..switch_cmd(&fx, Direction::Next)
            })
            .unwrap();

        assert_eq!(position.total_lists, 2);
        let detached = fx
            .db()
            .read(|conn| motions::find(conn, motion))
            .unwrap()
            .unwrap();
        assert!(detached.speaker_list_id.is_none());
        assert!(fx.db().read(|conn| queue::find_list(conn, l2)).unwrap().is_none());

        let ids = fx.db().read(|conn| list_ids(conn, fx.committee_id)).unwrap();
        assert_eq!(ids, vec![l1, l3]);
    }

    #[test]
    fn test_non_empty_list_is_not_deleted() {
        let fx = Fixture::new(1);
        let l1 = fx.open_list();
        fx.open_list();
        fx.queue(l1, &[EntryStatus::Waiting]);

        let position = fx
            .engine
            .switch_speaker_list(&SwitchList {
                delete_empty_list_id: Some(l1),
                ..switch_cmd(&fx, Direction::Next)
            })
            .unwrap();

        assert_eq!(position.total_lists, 2);
        assert!(fx.db().read(|conn| queue::find_list(conn, l1)).unwrap().is_some());
    }

    #[test]
    fn test_other_committees_list_is_not_deleted() {
        let fx = Fixture::new(0);
        fx.open_list();
        let other = fx.other_committee_list();

        fx.engine
            .switch_speaker_list(&SwitchList {
                delete_empty_list_id: Some(other),
                ..switch_cmd(&fx, Direction::Next)
            })
            .unwrap();

        assert!(fx.db().read(|conn| queue::find_list(conn, other)).unwrap().is_some());
    }
}
