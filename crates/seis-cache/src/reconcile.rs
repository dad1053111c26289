//! Payload reconciler
//!
//! Folds a [`DataPayload`] into the partitions currently observed by the
//! session. Per windowed kind:
//!
//! 1. `affected = ids(upserts) ∪ invalid`
//! 2. Events and signal detections: [`FilterAppend`]
//! 3. QC masks: [`WindowedReplace`] against the observed window
//!
//! Workspace state and history are singleton replacements. Partitions of
//! windows that are not currently observed are left alone, and a kind whose
//! observed partition has not been seeded yet is skipped.

use crate::store::{PartitionSet, PartitionedEntity};
use crate::strategy::{FilterAppend, ReconcileOutcome, ReconcileStrategy, WindowedReplace};
use seis_history::HistoryLog;
use seis_model::{DataPayload, EntityKind, TimeRange};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Window currently observed for each windowed kind
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservedWindows {
    /// Events window
    pub events: Option<TimeRange>,
    /// Signal detections window
    pub signal_detections: Option<TimeRange>,
    /// QC masks window
    pub qc_masks: Option<TimeRange>,
}

impl ObservedWindows {
    /// Nothing observed
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Observed window of `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<TimeRange> {
        match kind {
            EntityKind::Event => self.events,
            EntityKind::SignalDetection => self.signal_detections,
            EntityKind::QcMask => self.qc_masks,
        }
    }

    /// Set or clear the observed window of `kind`
    pub fn set(&mut self, kind: EntityKind, window: Option<TimeRange>) {
        match kind {
            EntityKind::Event => self.events = window,
            EntityKind::SignalDetection => self.signal_detections = window,
            EntityKind::QcMask => self.qc_masks = window,
        }
    }

    /// Builder: observe `kind` through `window`
    #[inline]
    #[must_use]
    pub fn with(mut self, kind: EntityKind, window: TimeRange) -> Self {
        self.set(kind, Some(window));
        self
    }
}

/// What reconciliation did to one kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindReport {
    /// Entity kind
    pub kind: EntityKind,
    /// Partition window
    pub window: TimeRange,
    /// Strategy outcome
    pub outcome: ReconcileOutcome,
}

/// Summary of one reconciliation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Kinds whose observed partition was updated
    pub applied: Vec<KindReport>,
    /// Kinds with payload content but no observed partition
    pub skipped: Vec<EntityKind>,
    /// Workspace state was replaced
    pub workspace_replaced: bool,
    /// History log was replaced
    pub history_replaced: bool,
}

impl ReconcileReport {
    /// Whether `kind` was written
    #[must_use]
    pub fn touched(&self, kind: EntityKind) -> bool {
        self.applied.iter().any(|k| k.kind == kind)
    }

    /// Entities removed across all kinds
    #[must_use]
    pub fn total_removed(&self) -> usize {
        self.applied.iter().map(|k| k.outcome.removed).sum()
    }

    /// Entities written across all kinds
    #[must_use]
    pub fn total_upserted(&self) -> usize {
        self.applied.iter().map(|k| k.outcome.upserted).sum()
    }
}

/// Fold `payload` into the observed partitions of `partitions`
///
/// Idempotent: reconciling the same payload twice leaves the set as after
/// the first call.
pub fn reconcile(
    partitions: &mut PartitionSet,
    windows: &ObservedWindows,
    payload: &DataPayload,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    reconcile_kind(
        partitions,
        windows.events,
        &payload.events,
        &payload.invalid.event_ids,
        &FilterAppend,
        &mut report,
    );
    reconcile_kind(
        partitions,
        windows.signal_detections,
        &payload.signal_detections,
        &payload.invalid.signal_detection_ids,
        &FilterAppend,
        &mut report,
    );
    reconcile_kind(
        partitions,
        windows.qc_masks,
        &payload.qc_masks,
        &payload.invalid.qc_mask_ids,
        &WindowedReplace,
        &mut report,
    );

    if let Some(state) = &payload.workspace_state {
        partitions.set_workspace_state(state.clone());
        report.workspace_replaced = true;
    }

    if let Some(entries) = &payload.history {
        let log = match HistoryLog::try_new(entries.clone()) {
            Ok(log) => log,
            Err(err) => {
                warn!("history log from authority is malformed: {}", err);
                HistoryLog::new(entries.clone())
            }
        };
        debug!("replacing history log: {} entries", log.len());
        partitions.set_history(log);
        report.history_replaced = true;
    }

    report
}

fn reconcile_kind<T, S>(
    set: &mut PartitionSet,
    window: Option<TimeRange>,
    upserts: &[T],
    invalid: &[T::Id],
    strategy: &S,
    report: &mut ReconcileReport,
) where
    T: PartitionedEntity,
    S: ReconcileStrategy<T>,
{
    if upserts.is_empty() && invalid.is_empty() {
        return;
    }

    let invalid: HashSet<T::Id> = invalid.iter().cloned().collect();
    for id in &invalid {
        let cached = T::partitions(set).values().any(|p| p.contains(id));
        let upserted = upserts.iter().any(|u| u.id() == id);
        if !cached && !upserted {
            debug!("invalidated {} id not cached: {}", T::KIND, id);
        }
    }

    let Some(window) = window else {
        debug!("{} not observed, skipping", T::KIND);
        report.skipped.push(T::KIND);
        return;
    };
    let Some(partition) = set.partition_mut::<T>(window) else {
        debug!("{} partition {} not seeded, skipping", T::KIND, window);
        report.skipped.push(T::KIND);
        return;
    };

    let outcome = strategy.apply(partition, upserts, &invalid);
    debug!(
        "reconciled {} {} via {}: removed {}, upserted {}",
        T::KIND,
        window,
        strategy.name(),
        outcome.removed,
        outcome.upserted
    );
    report.applied.push(KindReport {
        kind: T::KIND,
        window,
        outcome,
    });
}
