//! Mutation payloads
//!
//! Every mutation, undo and redo included, answers with a [`DataPayload`].
//! Upserts and invalidations are per entity kind; workspace state and the
//! history log are optional wholesale replacements.

use crate::entity::{EntityKind, Event, QcMask, SignalDetection, WorkspaceState};
use crate::history::HistoryEntry;
use crate::ids::{EventId, QcMaskId, SignalDetectionId};
use serde::{Deserialize, Serialize};

/// Ids invalidated by a mutation, per entity kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidData {
    /// Events to drop from every observed partition
    #[serde(default)]
    pub event_ids: Vec<EventId>,
    /// Signal detections to drop
    #[serde(default)]
    pub signal_detection_ids: Vec<SignalDetectionId>,
    /// QC masks to drop
    #[serde(default)]
    pub qc_mask_ids: Vec<QcMaskId>,
}

impl InvalidData {
    /// Whether nothing is invalidated
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
            && self.signal_detection_ids.is_empty()
            && self.qc_mask_ids.is_empty()
    }
}

/// Authoritative result of a mutation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPayload {
    /// Created or updated events
    #[serde(default)]
    pub events: Vec<Event>,
    /// Created or updated signal detections
    #[serde(default)]
    pub signal_detections: Vec<SignalDetection>,
    /// Created or updated QC masks
    #[serde(default)]
    pub qc_masks: Vec<QcMask>,
    /// Replacement workspace state
    #[serde(default)]
    pub workspace_state: Option<WorkspaceState>,
    /// Replacement history log
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
    /// Invalidated ids
    #[serde(default)]
    pub invalid: InvalidData,
}

impl DataPayload {
    /// Empty payload
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: upsert events
    #[inline]
    #[must_use]
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Builder: upsert signal detections
    #[inline]
    #[must_use]
    pub fn with_signal_detections(mut self, detections: Vec<SignalDetection>) -> Self {
        self.signal_detections = detections;
        self
    }

    /// Builder: upsert QC masks
    #[inline]
    #[must_use]
    pub fn with_qc_masks(mut self, masks: Vec<QcMask>) -> Self {
        self.qc_masks = masks;
        self
    }

    /// Builder: replace workspace state
    #[inline]
    #[must_use]
    pub fn with_workspace_state(mut self, state: WorkspaceState) -> Self {
        self.workspace_state = Some(state);
        self
    }

    /// Builder: replace the history log
    #[inline]
    #[must_use]
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = Some(history);
        self
    }

    /// Builder: invalidate events
    #[inline]
    #[must_use]
    pub fn with_invalid_event_ids(mut self, ids: Vec<EventId>) -> Self {
        self.invalid.event_ids = ids;
        self
    }

    /// Builder: invalidate signal detections
    #[inline]
    #[must_use]
    pub fn with_invalid_signal_detection_ids(mut self, ids: Vec<SignalDetectionId>) -> Self {
        self.invalid.signal_detection_ids = ids;
        self
    }

    /// Builder: invalidate QC masks
    #[inline]
    #[must_use]
    pub fn with_invalid_qc_mask_ids(mut self, ids: Vec<QcMaskId>) -> Self {
        self.invalid.qc_mask_ids = ids;
        self
    }

    /// Whether the payload changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.signal_detections.is_empty()
            && self.qc_masks.is_empty()
            && self.workspace_state.is_none()
            && self.history.is_none()
            && self.invalid.is_empty()
    }
}

/// Authoritative contents of one time-windowed collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items")]
pub enum EntityCollection {
    /// Events
    Events(Vec<Event>),
    /// Signal detections
    SignalDetections(Vec<SignalDetection>),
    /// QC masks
    QcMasks(Vec<QcMask>),
}

impl EntityCollection {
    /// Empty collection of `kind`
    #[must_use]
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Event => Self::Events(Vec::new()),
            EntityKind::SignalDetection => Self::SignalDetections(Vec::new()),
            EntityKind::QcMask => Self::QcMasks(Vec::new()),
        }
    }

    /// Kind of the collection
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Events(_) => EntityKind::Event,
            Self::SignalDetections(_) => EntityKind::SignalDetection,
            Self::QcMasks(_) => EntityKind::QcMask,
        }
    }

    /// Number of entities
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Events(v) => v.len(),
            Self::SignalDetections(v) => v.len(),
            Self::QcMasks(v) => v.len(),
        }
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! collection_items {
    ($ty:ty, $variant:ident) => {
        impl TryFrom<EntityCollection> for Vec<$ty> {
            type Error = EntityCollection;

            fn try_from(collection: EntityCollection) -> Result<Self, Self::Error> {
                match collection {
                    EntityCollection::$variant(items) => Ok(items),
                    other => Err(other),
                }
            }
        }
    };
}

collection_items!(Event, Events);
collection_items!(SignalDetection, SignalDetections);
collection_items!(QcMask, QcMasks);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload() {
        assert!(DataPayload::new().is_empty());
        assert!(!DataPayload::new().with_history(vec![]).is_empty());
    }

    #[test]
    fn builders_fill_invalid_data() {
        let payload = DataPayload::new()
            .with_invalid_signal_detection_ids(vec![SignalDetectionId::from("S1")])
            .with_invalid_qc_mask_ids(vec![QcMaskId::from("Q1")]);
        assert_eq!(payload.invalid.signal_detection_ids.len(), 1);
        assert_eq!(payload.invalid.qc_mask_ids.len(), 1);
        assert!(payload.invalid.event_ids.is_empty());
    }

    #[test]
    fn collection_kind_matches_variant() {
        for kind in EntityKind::ALL {
            let collection = EntityCollection::empty(kind);
            assert_eq!(collection.kind(), kind);
            assert!(collection.is_empty());
        }
    }

    #[test]
    fn collection_into_items() {
        let events = EntityCollection::Events(vec![Event::new("E1", 1.0)]);
        assert_eq!(Vec::<Event>::try_from(events).unwrap().len(), 1);

        let masks = EntityCollection::empty(EntityKind::QcMask);
        assert_eq!(Vec::<Event>::try_from(masks.clone()), Err(masks));
    }
}
