use proptest::prelude::*;
use seis_history::*;
use seis_model::{ChangeScope, HistoryEntryId};
use seis_test_utils::{arb_log, arb_scope, entry, event_scope, global_entry, log};

proptest! {
    #[test]
    fn prop_undo_target_is_latest_included_applied(
        history in arb_log(12),
        scope in arb_scope()
    ) {
        let filter = ChangeFilter::for_scope(&scope);
        match last_included_for_undo(&history, &filter) {
            Some(target) => {
                prop_assert!(target.applied);
                prop_assert!(is_included_for_entry(target, &filter));
                let later = history
                    .applied()
                    .filter(|e| e.order > target.order)
                    .any(|e| is_included_for_entry(e, &filter));
                prop_assert!(!later);
            }
            None => prop_assert_eq!(number_of_undos(&history, &filter), 0),
        }
    }

    #[test]
    fn prop_redo_target_is_earliest_undone(history in arb_log(12)) {
        let expected = history.entries().iter().filter(|e| !e.applied).map(|e| e.order).min();
        prop_assert_eq!(next_ordered_redo(&history).map(|e| e.order), expected);
    }

    #[test]
    fn prop_counts_partition_the_log(history in arb_log(12)) {
        let total = number_of_undos(&history, &ChangeFilter::All)
            + number_of_redos(&history, &ChangeFilter::All);
        prop_assert_eq!(total, history.len());
    }

    #[test]
    fn prop_engine_never_mutates(history in arb_log(8), scope in arb_scope()) {
        let before = history.clone();
        let _ = undo_intent(&history, ChangeFilter::for_scope(&scope), scope.clone());
        let _ = redo_intent(&history, scope);
        prop_assert_eq!(before, history);
    }

    #[test]
    fn prop_event_history_only_holds_event_changes(history in arb_log(10)) {
        let a = seis_model::EventId::from("A");
        let view = history.event_history(&a);
        for e in view.entries() {
            prop_assert!(!e.changes.is_empty());
            prop_assert!(e.changes.iter().all(|c| c.is_for_event(&a)));
        }
    }
}

#[test]
fn undo_intent_for_open_event() {
    let history = log(vec![
        global_entry("E1", 1, true),
        entry("E2", 2, true, &[event_scope("A")]),
        entry("E3", 3, true, &[event_scope("B")]),
    ]);
    let scope = event_scope("A");

    let intent = undo_intent(&history, ChangeFilter::for_scope(&scope), scope).unwrap();
    assert_eq!(intent.target_entry_id, HistoryEntryId::from("E2"));
    assert_eq!(intent.direction, Direction::Undo);

    let affected = affected_entries(&history, &intent);
    pretty_assertions::assert_eq!(
        affected,
        vec![AffectedEntry {
            entry_id: HistoryEntryId::from("E2"),
            order: 2,
            change_ids: vec!["E2-C0".into()],
        }]
    );
}

#[test]
fn global_undo_includes_every_change_of_mixed_entry() {
    let history = log(vec![entry(
        "E1",
        1,
        true,
        &[ChangeScope::Global, event_scope("A"), event_scope("B")],
    )]);
    let intent = undo_intent(&history, ChangeFilter::All, ChangeScope::Global).unwrap();
    let affected = affected_entries(&history, &intent);
    assert_eq!(affected[0].change_ids.len(), 3);
}
