//! Partition set
//!
//! [`PartitionSet`] holds every cached partition of a session: one map per
//! windowed entity kind keyed by [`WindowKey`], plus the singleton
//! workspace-state and history partitions.

use crate::error::CacheError;
use crate::partition::CachePartition;
use seis_history::HistoryLog;
use seis_model::{
    CacheEntity, EntityCollection, EntityKind, Event, QcMask, SignalDetection, TimeRange,
    WindowKey, WorkspaceState,
};
use std::collections::HashMap;

/// Size statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of windowed partitions
    pub partition_count: usize,
    /// Number of cached entities across all windowed partitions
    pub entity_count: usize,
}

type Partitions<T> = HashMap<WindowKey, CachePartition<T>>;

/// Entity kinds that have windowed partitions in a [`PartitionSet`]
pub trait PartitionedEntity: CacheEntity {
    /// Partitions of this kind
    fn partitions(set: &PartitionSet) -> &Partitions<Self>;

    /// Mutable partitions of this kind
    fn partitions_mut(set: &mut PartitionSet) -> &mut Partitions<Self>;
}

impl PartitionedEntity for Event {
    fn partitions(set: &PartitionSet) -> &Partitions<Self> {
        &set.events
    }

    fn partitions_mut(set: &mut PartitionSet) -> &mut Partitions<Self> {
        &mut set.events
    }
}

impl PartitionedEntity for SignalDetection {
    fn partitions(set: &PartitionSet) -> &Partitions<Self> {
        &set.signal_detections
    }

    fn partitions_mut(set: &mut PartitionSet) -> &mut Partitions<Self> {
        &mut set.signal_detections
    }
}

impl PartitionedEntity for QcMask {
    fn partitions(set: &PartitionSet) -> &Partitions<Self> {
        &set.qc_masks
    }

    fn partitions_mut(set: &mut PartitionSet) -> &mut Partitions<Self> {
        &mut set.qc_masks
    }
}

/// Every cached partition of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionSet {
    events: Partitions<Event>,
    signal_detections: Partitions<SignalDetection>,
    qc_masks: Partitions<QcMask>,
    workspace_state: Option<WorkspaceState>,
    history: Option<HistoryLog>,
}

impl PartitionSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition of `T` for `window`, if it exists
    #[must_use]
    pub fn partition<T: PartitionedEntity>(&self, window: TimeRange) -> Option<&CachePartition<T>> {
        T::partitions(self).get(&window.key())
    }

    /// Mutable partition of `T` for `window`, if it exists
    pub fn partition_mut<T: PartitionedEntity>(
        &mut self,
        window: TimeRange,
    ) -> Option<&mut CachePartition<T>> {
        T::partitions_mut(self).get_mut(&window.key())
    }

    /// All partitions of `T`
    pub fn partitions_of<T: PartitionedEntity>(&self) -> impl Iterator<Item = &CachePartition<T>> {
        T::partitions(self).values()
    }

    /// Install a partition, replacing any previous one for the same window
    pub fn insert_partition<T: PartitionedEntity>(&mut self, partition: CachePartition<T>) {
        T::partitions_mut(self).insert(partition.window().key(), partition);
    }

    /// Seed the partition of `kind` for `window` from an authoritative query
    pub fn seed(
        &mut self,
        kind: EntityKind,
        window: TimeRange,
        collection: EntityCollection,
    ) -> Result<(), CacheError> {
        if !window.is_valid() {
            return Err(CacheError::InvalidWindow(window));
        }
        if collection.kind() != kind {
            return Err(CacheError::KindMismatch {
                expected: kind,
                actual: collection.kind(),
            });
        }

        match collection {
            EntityCollection::Events(items) => {
                self.insert_partition(CachePartition::seeded(window, items));
            }
            EntityCollection::SignalDetections(items) => {
                self.insert_partition(CachePartition::seeded(window, items));
            }
            EntityCollection::QcMasks(items) => {
                self.insert_partition(CachePartition::seeded(window, items));
            }
        }
        Ok(())
    }

    /// Drop the partition of `kind` for `window`
    pub fn release(&mut self, kind: EntityKind, window: TimeRange) -> Result<(), CacheError> {
        let key = window.key();
        let removed = match kind {
            EntityKind::Event => self.events.remove(&key).is_some(),
            EntityKind::SignalDetection => self.signal_detections.remove(&key).is_some(),
            EntityKind::QcMask => self.qc_masks.remove(&key).is_some(),
        };
        if removed {
            Ok(())
        } else {
            Err(CacheError::PartitionNotFound { kind, window })
        }
    }

    /// Whether a partition of `kind` exists for `window`
    #[must_use]
    pub fn has_partition(&self, kind: EntityKind, window: TimeRange) -> bool {
        let key = window.key();
        match kind {
            EntityKind::Event => self.events.contains_key(&key),
            EntityKind::SignalDetection => self.signal_detections.contains_key(&key),
            EntityKind::QcMask => self.qc_masks.contains_key(&key),
        }
    }

    /// Cached collection of `kind` for `window`, in partition order
    #[must_use]
    pub fn collection(&self, kind: EntityKind, window: TimeRange) -> Option<EntityCollection> {
        match kind {
            EntityKind::Event => self
                .partition::<Event>(window)
                .map(|p| EntityCollection::Events(p.to_vec())),
            EntityKind::SignalDetection => self
                .partition::<SignalDetection>(window)
                .map(|p| EntityCollection::SignalDetections(p.to_vec())),
            EntityKind::QcMask => self
                .partition::<QcMask>(window)
                .map(|p| EntityCollection::QcMasks(p.to_vec())),
        }
    }

    /// Cached workspace state
    #[inline]
    #[must_use]
    pub fn workspace_state(&self) -> Option<&WorkspaceState> {
        self.workspace_state.as_ref()
    }

    /// Replace the workspace state
    #[inline]
    pub fn set_workspace_state(&mut self, state: WorkspaceState) {
        self.workspace_state = Some(state);
    }

    /// Cached history log
    #[inline]
    #[must_use]
    pub fn history(&self) -> Option<&HistoryLog> {
        self.history.as_ref()
    }

    /// Replace the history log
    #[inline]
    pub fn set_history(&mut self, history: HistoryLog) {
        self.history = Some(history);
    }

    /// Partition and entity counts
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        fn count<T: CacheEntity>(map: &Partitions<T>) -> (usize, usize) {
            (map.len(), map.values().map(CachePartition::len).sum())
        }
        let parts = [
            count(&self.events),
            count(&self.signal_detections),
            count(&self.qc_masks),
        ];
        CacheStats {
            partition_count: parts.iter().map(|p| p.0).sum(),
            entity_count: parts.iter().map(|p| p.1).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::EventId;

    #[test]
    fn seed_and_lookup() {
        let mut set = PartitionSet::new();
        let window = TimeRange::new(0.0, 100.0);
        set.seed(
            EntityKind::Event,
            window,
            EntityCollection::Events(vec![Event::new("E1", 10.0)]),
        )
        .unwrap();

        let p = set.partition::<Event>(window).unwrap();
        assert!(p.contains(&EventId::from("E1")));
        assert!(set.partition::<Event>(TimeRange::new(0.0, 101.0)).is_none());
        assert_eq!(set.stats(), CacheStats { partition_count: 1, entity_count: 1 });
    }

    #[test]
    fn seed_rejects_mismatched_collection() {
        let mut set = PartitionSet::new();
        let err = set
            .seed(
                EntityKind::QcMask,
                TimeRange::new(0.0, 1.0),
                EntityCollection::Events(Vec::new()),
            )
            .unwrap_err();
        assert!(matches!(err, CacheError::KindMismatch { expected: EntityKind::QcMask, .. }));
    }

    #[test]
    fn seed_rejects_inverted_window() {
        let mut set = PartitionSet::new();
        let err = set
            .seed(
                EntityKind::Event,
                TimeRange::new(10.0, 1.0),
                EntityCollection::Events(Vec::new()),
            )
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidWindow(_)));
    }

    #[test]
    fn release_drops_partition() {
        let mut set = PartitionSet::new();
        let window = TimeRange::new(0.0, 1.0);
        set.insert_partition(CachePartition::<QcMask>::new(window));
        assert!(set.has_partition(EntityKind::QcMask, window));

        set.release(EntityKind::QcMask, window).unwrap();
        assert!(!set.has_partition(EntityKind::QcMask, window));
        assert!(set.release(EntityKind::QcMask, window).is_err());
    }
}
