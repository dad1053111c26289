//! Cached domain entities
//!
//! The client never interprets these beyond their id and, for QC masks, the
//! time span of the current version. Everything else is carried through so
//! that views can render it.

use crate::ids::{EventId, QcMaskId, SignalDetectionId};
use crate::time::TimeRange;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::Hash;

/// Kind of a cached entity collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Seismic events
    Event,
    /// Signal detections
    SignalDetection,
    /// Quality-control masks
    QcMask,
}

impl EntityKind {
    /// All time-windowed kinds, in reconciliation order
    pub const ALL: [EntityKind; 3] = [Self::Event, Self::SignalDetection, Self::QcMask];
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "events",
            Self::SignalDetection => "signal-detections",
            Self::QcMask => "qc-masks",
        };
        f.write_str(name)
    }
}

/// An entity that can live in a cache partition
pub trait CacheEntity: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Identifier type, unique within one partition
    type Id: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static;

    /// Collection this entity belongs to
    const KIND: EntityKind;

    /// Borrow the entity id
    fn id(&self) -> &Self::Id;
}

/// An entity with a time span that decides window membership
pub trait TimeWindowed {
    /// Start of the span in epoch seconds
    fn start_time(&self) -> f64;

    /// End of the span in epoch seconds
    fn end_time(&self) -> f64;

    /// Whether the span intersects `window` (inclusive)
    fn overlaps(&self, window: &TimeRange) -> bool {
        window.overlaps(self.start_time(), self.end_time())
    }
}

/// Workflow status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventStatus {
    /// Not yet opened
    #[default]
    ReadyForRefinement,
    /// Currently being refined by an analyst
    OpenForRefinement,
    /// Waiting on a reviewer
    AwaitingReview,
    /// Done
    Complete,
}

/// A seismic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event id
    pub id: EventId,
    /// Workflow status
    #[serde(default)]
    pub status: EventStatus,
    /// Preferred location hypothesis
    #[serde(default)]
    pub preferred_hypothesis_id: Option<String>,
    /// Origin time in epoch seconds
    pub origin_time: f64,
    /// Whether the event has unsaved changes
    #[serde(default)]
    pub modified: bool,
    /// Authority-side revision counter
    #[serde(default)]
    pub revision: u64,
}

impl Event {
    /// Create an unmodified event
    #[must_use]
    pub fn new(id: impl Into<EventId>, origin_time: f64) -> Self {
        Self {
            id: id.into(),
            status: EventStatus::default(),
            preferred_hypothesis_id: None,
            origin_time,
            modified: false,
            revision: 0,
        }
    }

    /// Builder: set status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder: set revision
    #[inline]
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }
}

impl CacheEntity for Event {
    type Id = EventId;
    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> &EventId {
        &self.id
    }
}

/// A signal detection on one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetection {
    /// Detection id
    pub id: SignalDetectionId,
    /// Station the detection was made on
    #[serde(default)]
    pub station_name: String,
    /// Phase label
    #[serde(default)]
    pub phase: String,
    /// Arrival time in epoch seconds
    pub arrival_time: f64,
    /// Rejected by an analyst
    #[serde(default)]
    pub rejected: bool,
    /// Whether the detection has unsaved changes
    #[serde(default)]
    pub modified: bool,
    /// Event this detection is associated to, if any
    #[serde(default)]
    pub associated_event_id: Option<EventId>,
    /// Authority-side revision counter
    #[serde(default)]
    pub revision: u64,
}

impl SignalDetection {
    /// Create an unassociated detection
    #[must_use]
    pub fn new(id: impl Into<SignalDetectionId>, station_name: impl Into<String>, arrival_time: f64) -> Self {
        Self {
            id: id.into(),
            station_name: station_name.into(),
            phase: "P".to_string(),
            arrival_time,
            rejected: false,
            modified: false,
            associated_event_id: None,
            revision: 0,
        }
    }

    /// Builder: associate to an event
    #[inline]
    #[must_use]
    pub fn associated_to(mut self, event_id: impl Into<EventId>) -> Self {
        self.associated_event_id = Some(event_id.into());
        self
    }
}

impl CacheEntity for SignalDetection {
    type Id = SignalDetectionId;
    const KIND: EntityKind = EntityKind::SignalDetection;

    fn id(&self) -> &SignalDetectionId {
        &self.id
    }
}

/// One version of a QC mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcMaskVersion {
    /// Version number
    #[serde(default)]
    pub version: u32,
    /// Mask category
    #[serde(default)]
    pub category: String,
    /// Start in epoch seconds
    pub start_time: f64,
    /// End in epoch seconds
    pub end_time: f64,
    /// Rejected by an analyst
    #[serde(default)]
    pub rejected: bool,
}

/// A QC mask over one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcMask {
    /// Mask id
    pub id: QcMaskId,
    /// Channel the mask applies to
    #[serde(default)]
    pub channel_name: String,
    /// Version currently in effect
    pub current_version: QcMaskVersion,
}

impl QcMask {
    /// Create a mask whose first version spans `[start_time, end_time]`
    #[must_use]
    pub fn new(
        id: impl Into<QcMaskId>,
        channel_name: impl Into<String>,
        start_time: f64,
        end_time: f64,
    ) -> Self {
        Self {
            id: id.into(),
            channel_name: channel_name.into(),
            current_version: QcMaskVersion {
                version: 0,
                category: "Analyst Defined".to_string(),
                start_time,
                end_time,
                rejected: false,
            },
        }
    }

    /// Builder: replace the current version span, bumping the version number
    #[must_use]
    pub fn with_span(mut self, start_time: f64, end_time: f64) -> Self {
        self.current_version.version += 1;
        self.current_version.start_time = start_time;
        self.current_version.end_time = end_time;
        self
    }
}

impl CacheEntity for QcMask {
    type Id = QcMaskId;
    const KIND: EntityKind = EntityKind::QcMask;

    fn id(&self) -> &QcMaskId {
        &self.id
    }
}

impl TimeWindowed for QcMask {
    fn start_time(&self) -> f64 {
        self.current_version.start_time
    }

    fn end_time(&self) -> f64 {
        self.current_version.end_time
    }
}

/// Users currently working an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventToUsers {
    /// Event id
    pub event_id: EventId,
    /// Analysts with the event open
    pub user_names: Vec<String>,
}

/// Collaborative workspace state, replaced wholesale on every payload that carries it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    /// Which analysts have which events open
    #[serde(default)]
    pub event_to_users: Vec<EventToUsers>,
}

impl WorkspaceState {
    /// Users that currently have `event_id` open
    #[must_use]
    pub fn users_of(&self, event_id: &EventId) -> &[String] {
        self.event_to_users
            .iter()
            .find(|e| &e.event_id == event_id)
            .map_or(&[][..], |e| e.user_names.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kinds_are_distinct() {
        assert_eq!(Event::KIND, EntityKind::Event);
        assert_eq!(SignalDetection::KIND, EntityKind::SignalDetection);
        assert_eq!(QcMask::KIND, EntityKind::QcMask);
    }

    #[test]
    fn qc_mask_span_follows_current_version() {
        let mask = QcMask::new("Q1", "ASAR.AS01.SHZ", 100.0, 200.0).with_span(300.0, 400.0);
        assert_eq!(mask.current_version.version, 1);
        assert_eq!(mask.start_time(), 300.0);
        assert!(mask.overlaps(&TimeRange::new(350.0, 360.0)));
        assert!(!mask.overlaps(&TimeRange::new(150.0, 180.0)));
    }

    #[test]
    fn workspace_users_lookup() {
        let state = WorkspaceState {
            event_to_users: vec![EventToUsers {
                event_id: EventId::from("E1"),
                user_names: vec!["analyst1".to_string()],
            }],
        };
        assert_eq!(state.users_of(&EventId::from("E1")), ["analyst1".to_string()]);
        assert!(state.users_of(&EventId::from("E2")).is_empty());
    }

    #[test]
    fn event_deserializes_with_defaults() {
        let event: Event = serde_json::from_str(r#"{"id":"E1","originTime":5.0}"#).unwrap();
        assert_eq!(event, Event::new("E1", 5.0));
    }
}
