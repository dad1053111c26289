use proptest::prelude::*;
use seis_cache::*;
use seis_model::{
    CacheEntity, DataPayload, EntityCollection, EntityKind, Event, QcMask, SignalDetection,
    TimeRange, TimeWindowed,
};
use seis_test_utils::{arb_event, arb_payload, arb_qc_mask, event, event_payload, events, window};
use std::collections::HashSet;

const WINDOW: TimeRange = TimeRange::new(500.0, 1_500.0);

fn observed() -> ObservedWindows {
    ObservedWindows::none()
        .with(EntityKind::Event, WINDOW)
        .with(EntityKind::SignalDetection, WINDOW)
        .with(EntityKind::QcMask, WINDOW)
}

fn seeded(events: Vec<Event>, masks: Vec<QcMask>) -> PartitionSet {
    let mut set = PartitionSet::new();
    set.seed(EntityKind::Event, WINDOW, EntityCollection::Events(events))
        .unwrap();
    set.seed(
        EntityKind::SignalDetection,
        WINDOW,
        EntityCollection::SignalDetections(Vec::new()),
    )
    .unwrap();
    set.seed(
        EntityKind::QcMask,
        WINDOW,
        EntityCollection::QcMasks(masks.into_iter().filter(|m| m.overlaps(&WINDOW)).collect()),
    )
    .unwrap();
    set
}

fn assert_unique<T: PartitionedEntity>(set: &PartitionSet) -> Result<(), TestCaseError> {
    for partition in set.partitions_of::<T>() {
        let ids: HashSet<&T::Id> = partition.ids().collect();
        prop_assert_eq!(ids.len(), partition.len());
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_reconcile_is_idempotent(
        initial in proptest::collection::vec(arb_event(), 0..8),
        masks in proptest::collection::vec(arb_qc_mask(), 0..8),
        payload in arb_payload()
    ) {
        let mut set = seeded(initial, masks);
        reconcile(&mut set, &observed(), &payload);
        let once = set.clone();
        reconcile(&mut set, &observed(), &payload);
        prop_assert_eq!(set, once);
    }

    #[test]
    fn prop_ids_stay_unique(
        initial in proptest::collection::vec(arb_event(), 0..8),
        masks in proptest::collection::vec(arb_qc_mask(), 0..8),
        payloads in proptest::collection::vec(arb_payload(), 1..5)
    ) {
        let mut set = seeded(initial, masks);
        for payload in &payloads {
            reconcile(&mut set, &observed(), payload);
        }
        assert_unique::<Event>(&set)?;
        assert_unique::<SignalDetection>(&set)?;
        assert_unique::<QcMask>(&set)?;
    }

    #[test]
    fn prop_upserts_present_and_invalidations_absent(
        initial in proptest::collection::vec(arb_event(), 0..8),
        payload in arb_payload()
    ) {
        let mut set = seeded(initial, Vec::new());
        reconcile(&mut set, &observed(), &payload);

        let events = set.partition::<Event>(WINDOW).unwrap();
        let upserted: HashSet<_> = payload.events.iter().map(|e| e.id().clone()).collect();
        for id in &upserted {
            prop_assert!(events.contains(id));
        }
        // last upsert with a given id wins
        for e in &payload.events {
            let last = payload.events.iter().rev().find(|u| u.id == e.id).unwrap();
            prop_assert_eq!(events.get(&e.id).unwrap(), last);
        }
        for id in &payload.invalid.event_ids {
            if !upserted.contains(id) {
                prop_assert!(!events.contains(id));
            }
        }

        let masks = set.partition::<QcMask>(WINDOW).unwrap();
        for mask in masks.iter() {
            prop_assert!(mask.overlaps(&WINDOW));
        }
    }
}

#[test]
fn end_to_end_invalidate_and_append() {
    let mut set = seeded(events(&["E4", "E5"]), Vec::new());
    let payload = event_payload(vec![event("E9", 1_200.0)], &["E4"]);

    reconcile(&mut set, &observed(), &payload);

    let ids: Vec<String> = set
        .partition::<Event>(WINDOW)
        .unwrap()
        .ids()
        .map(ToString::to_string)
        .collect();
    pretty_assertions::assert_eq!(ids, vec!["E5", "E9"]);
}

#[test]
fn qc_mask_window_filter_table() {
    let mask = seis_test_utils::qc_mask("Q1", 100.0, 200.0);
    let payload = DataPayload::new().with_qc_masks(vec![mask]);

    for (w, kept) in [
        (window(150.0, 180.0), true),
        (window(50.0, 150.0), true),
        (window(190.0, 250.0), true),
        (window(0.0, 90.0), false),
        (window(210.0, 300.0), false),
    ] {
        let mut set = PartitionSet::new();
        set.insert_partition(CachePartition::<QcMask>::new(w));
        reconcile(&mut set, &ObservedWindows::none().with(EntityKind::QcMask, w), &payload);
        assert_eq!(set.partition::<QcMask>(w).unwrap().len(), usize::from(kept), "window {w}");
    }
}
