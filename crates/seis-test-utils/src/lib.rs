//! Testing utilities for the seis workspace
//!
//! Shared fixtures for entities, history logs and time windows, plus
//! proptest strategies that generate well-formed logs and payloads.

#![allow(missing_docs)]

use proptest::prelude::*;
use seis_history::HistoryLog;
use seis_model::{
    ChangeScope, DataPayload, EntityKind, EntityRef, Event, EventId, HistoryChange, HistoryEntry,
    QcMask, QcMaskId, SignalDetection, SignalDetectionId, TimeRange, UserActionDescription,
};

pub fn window(start: f64, end: f64) -> TimeRange {
    TimeRange::new(start, end)
}

pub fn event(id: &str, origin_time: f64) -> Event {
    Event::new(id, origin_time)
}

pub fn events(ids: &[&str]) -> Vec<Event> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| Event::new(*id, 1_000.0 + i as f64))
        .collect()
}

pub fn detection(id: &str, arrival_time: f64) -> SignalDetection {
    SignalDetection::new(id, "ASAR", arrival_time)
}

pub fn qc_mask(id: &str, start: f64, end: f64) -> QcMask {
    QcMask::new(id, "ASAR.AS01.SHZ", start, end)
}

pub fn event_scope(event_id: &str) -> ChangeScope {
    ChangeScope::Event(EventId::from(event_id))
}

pub fn change(id: &str, scope: ChangeScope) -> HistoryChange {
    HistoryChange::new(id, EntityRef::new(EntityKind::SignalDetection, format!("SD-{id}")), scope)
}

/// Entry with one change per scope; change ids are `{id}-C{n}`
pub fn entry(id: &str, order: u64, applied: bool, scopes: &[ChangeScope]) -> HistoryEntry {
    let changes = scopes
        .iter()
        .enumerate()
        .map(|(n, scope)| change(&format!("{id}-C{n}"), scope.clone()).with_active(applied))
        .collect();
    HistoryEntry::new(id, order, UserActionDescription::Associate, changes).with_applied(applied)
}

pub fn global_entry(id: &str, order: u64, applied: bool) -> HistoryEntry {
    entry(id, order, applied, &[ChangeScope::Global])
}

pub fn log(entries: Vec<HistoryEntry>) -> HistoryLog {
    HistoryLog::new(entries)
}

/// Payload that upserts `events` and invalidates `invalid`
pub fn event_payload(events: Vec<Event>, invalid: &[&str]) -> DataPayload {
    DataPayload::new()
        .with_events(events)
        .with_invalid_event_ids(invalid.iter().map(|id| EventId::from(*id)).collect())
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

pub fn arb_scope() -> impl Strategy<Value = ChangeScope> {
    prop_oneof![
        Just(ChangeScope::Global),
        Just(event_scope("A")),
        Just(event_scope("B")),
        Just(event_scope("C")),
    ]
}

/// Log with distinct orders and ids; each entry has 1..=3 changes whose
/// active flags match the entry's applied flag
pub fn arb_log(max_entries: usize) -> impl Strategy<Value = HistoryLog> {
    proptest::collection::vec(
        (any::<bool>(), proptest::collection::vec(arb_scope(), 1..=3)),
        0..=max_entries,
    )
    .prop_map(|specs| {
        let entries = specs
            .into_iter()
            .enumerate()
            .map(|(i, (applied, scopes))| entry(&format!("H{i}"), i as u64 + 1, applied, &scopes))
            .collect();
        HistoryLog::new(entries)
    })
}

/// Ids drawn from a small pool so that upserts and invalidations collide
pub fn arb_small_id(prefix: &'static str) -> impl Strategy<Value = String> {
    (0u8..8).prop_map(move |n| format!("{prefix}{n}"))
}

pub fn arb_event() -> impl Strategy<Value = Event> {
    (arb_small_id("E"), 0u64..4).prop_map(|(id, rev)| Event::new(id, 1_000.0).with_revision(rev))
}

pub fn arb_detection() -> impl Strategy<Value = SignalDetection> {
    (arb_small_id("S"), 900.0..1_100.0f64).prop_map(|(id, t)| SignalDetection::new(id, "ASAR", t))
}

pub fn arb_qc_mask() -> impl Strategy<Value = QcMask> {
    (arb_small_id("Q"), 0.0..2_000.0f64, 0.0..300.0f64)
        .prop_map(|(id, start, len)| QcMask::new(id, "ASAR.AS01.SHZ", start, start + len))
}

/// Payload with colliding upserts and invalidations across all kinds
pub fn arb_payload() -> impl Strategy<Value = DataPayload> {
    (
        proptest::collection::vec(arb_event(), 0..6),
        proptest::collection::vec(arb_detection(), 0..6),
        proptest::collection::vec(arb_qc_mask(), 0..6),
        proptest::collection::vec(arb_small_id("E"), 0..4),
        proptest::collection::vec(arb_small_id("S"), 0..4),
        proptest::collection::vec(arb_small_id("Q"), 0..4),
    )
        .prop_map(|(events, detections, masks, inv_e, inv_s, inv_q)| {
            DataPayload::new()
                .with_events(events)
                .with_signal_detections(detections)
                .with_qc_masks(masks)
                .with_invalid_event_ids(inv_e.into_iter().map(EventId::from).collect())
                .with_invalid_signal_detection_ids(
                    inv_s.into_iter().map(SignalDetectionId::from).collect(),
                )
                .with_invalid_qc_mask_ids(inv_q.into_iter().map(QcMaskId::from).collect())
        })
}
