//! Property-based tests for the floor
//!
//! Random operation sequences against a real in-memory store; the queue
//! invariants must hold after every step, whether the step succeeded or not.

use super::testing::{assert_queue_invariants, Fixture};
use super::*;
use crate::db::EntryStatus;
use proptest::prelude::*;

const DELEGATES: usize = 6;

#[derive(Debug, Clone)]
enum QueueOp {
    Add(usize),
    Start,
    Stop,
    Next,
    Edit {
        entry: usize,
        position: Option<i64>,
        status: Option<EntryStatus>,
    },
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_status() -> impl Strategy<Value = EntryStatus> {
    prop_oneof![
        Just(EntryStatus::Waiting),
        Just(EntryStatus::Speaking),
        Just(EntryStatus::Removed),
    ]
}

fn arb_queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => (0..DELEGATES).prop_map(QueueOp::Add),
        2 => Just(QueueOp::Start),
        1 => Just(QueueOp::Stop),
        2 => Just(QueueOp::Next),
        2 => (0usize..8, proptest::option::of(-1i64..10), proptest::option::of(arb_status()))
            .prop_map(|(entry, position, status)| QueueOp::Edit { entry, position, status }),
    ]
}

fn apply(fx: &Fixture, list_id: i64, op: &QueueOp) -> Result<(), FloorError> {
    match *op {
        QueueOp::Add(delegate) => fx.engine.add_speaker(list_id, fx.delegates[delegate]).map(drop),
        QueueOp::Start => fx.engine.start_timer(list_id).map(drop),
        QueueOp::Stop => fx.engine.stop_timer(list_id).map(drop),
        QueueOp::Next => fx.engine.next_speaker(list_id).map(drop),
        QueueOp::Edit {
            entry,
            position,
            status,
        } => {
            // Index into the current entries; past the end targets an unknown id
            let id = fx
                .entries(list_id)
                .get(entry)
                .map_or(i64::MAX, |e| e.id);
            let edit = EntryEdit {
                id,
                position,
                status,
            };
            fx.db()
                .write(|tx| queue::apply_edits(tx, list_id, &[edit]))
                .map(drop)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_queue_invariants_hold(ops in proptest::collection::vec(arb_queue_op(), 1..40)) {
        let fx = Fixture::new(DELEGATES);
        let list_id = fx.insert_list();

        for op in &ops {
            let before = fx.entries(list_id);
            let result = apply(&fx, list_id, op);
            let after = fx.entries(list_id);

            assert_queue_invariants(&after);
            match result {
                Ok(()) => {
                    if matches!(op, QueueOp::Next) {
                        prop_assert_eq!(after.len() + 1, before.len());
                    }
                }
                Err(err) => {
                    prop_assert_eq!(err.kind(), FloorErrorKind::InvalidState);
                    prop_assert_eq!(&before, &after, "failed op must not change the list");
                }
            }
        }
    }

    #[test]
    fn prop_next_speaker_closes_gap(
        statuses in proptest::collection::vec(
            prop_oneof![Just(EntryStatus::Waiting), Just(EntryStatus::Removed)],
            1..DELEGATES,
        ),
        speaker in any::<prop::sample::Index>(),
    ) {
        let fx = Fixture::new(DELEGATES);
        let list_id = fx.insert_list();
        let mut statuses = statuses;
        let waiting: Vec<usize> = statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == EntryStatus::Waiting)
            .map(|(i, _)| i)
            .collect();
        if !waiting.is_empty() {
            statuses[waiting[speaker.index(waiting.len())]] = EntryStatus::Speaking;
        }
        fx.queue(list_id, &statuses);

        let before = fx.entries(list_id);
        match fx.engine.next_speaker(list_id) {
            Ok(queue) => {
                let removed = before
                    .iter()
                    .find(|e| e.status == EntryStatus::Speaking)
                    .map(|e| e.id);
                prop_assert!(removed.is_some());
                prop_assert!(queue.iter().all(|e| Some(e.id) != removed));
                let survivors: Vec<i64> =
                    before.iter().map(|e| e.id).filter(|&id| Some(id) != removed).collect();
                let after: Vec<i64> = fx.entries(list_id).iter().map(|e| e.id).collect();
                prop_assert_eq!(survivors, after, "relative order is kept");
            }
            Err(err) => {
                prop_assert!(waiting.is_empty());
                prop_assert_eq!(err.kind(), FloorErrorKind::InvalidState);
            }
        }
        assert_queue_invariants(&fx.entries(list_id));
    }

    #[test]
    fn prop_switch_next_then_prev_is_identity(lists in 1usize..6, start in any::<prop::sample::Index>()) {
        let fx = Fixture::new(0);
        let ids: Vec<i64> = (0..lists).map(|_| fx.open_list()).collect();
        let origin = ids[start.index(lists)];
        fx.point_at(origin);

        let switch = |direction| {
            fx.engine
                .switch_speaker_list(&SwitchList {
                    committee_id: fx.committee_id,
                    direction,
                    delete_empty_list_id: None,
                })
                .unwrap()
        };

        let forward = switch(Direction::Next);
        prop_assert_eq!(forward.total_lists, lists);
        let back = switch(Direction::Prev);
        prop_assert_eq!(back.speaker_list_id, origin);
        prop_assert_eq!(back.current_index, start.index(lists));
    }

    #[test]
    fn prop_switch_cycles_through_every_list(lists in 1usize..6) {
        let fx = Fixture::new(0);
        let ids: Vec<i64> = (0..lists).map(|_| fx.open_list()).collect();
        let origin = *ids.last().unwrap();

        let mut seen = Vec::new();
        for _ in 0..lists {
            let position = fx
                .engine
                .switch_speaker_list(&SwitchList {
                    committee_id: fx.committee_id,
                    direction: Direction::Next,
                    delete_empty_list_id: None,
                })
                .unwrap();
            seen.push(position.speaker_list_id);
        }

        prop_assert_eq!(seen.last().copied(), Some(origin));
        seen.sort_unstable();
        prop_assert_eq!(seen, ids);
    }
}
