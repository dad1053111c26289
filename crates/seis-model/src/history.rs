//! History log records
//!
//! A [`HistoryEntry`] is one atomic user action; its [`HistoryChange`]s are
//! the units that undo/redo actually revert. Scope is carried per change, so
//! a single entry may mix global and event-scoped changes.

use crate::entity::EntityKind;
use crate::ids::{EventId, HistoryChangeId, HistoryEntryId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Scope of a single change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "ScopeRepr", into = "ScopeRepr")]
pub enum ChangeScope {
    /// Session-wide
    #[default]
    Global,
    /// Belongs to one analysis event
    Event(EventId),
}

impl ChangeScope {
    /// Event this scope is narrowed to, if any
    #[inline]
    #[must_use]
    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            Self::Global => None,
            Self::Event(id) => Some(id),
        }
    }

    /// Whether this is the global scope
    #[inline]
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl Display for ChangeScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Event(id) => write!(f, "event:{id}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
enum ScopeRepr {
    Global,
    Event {
        #[serde(rename = "eventId")]
        event_id: EventId,
    },
}

impl From<ScopeRepr> for ChangeScope {
    fn from(repr: ScopeRepr) -> Self {
        match repr {
            ScopeRepr::Global => Self::Global,
            ScopeRepr::Event { event_id } => Self::Event(event_id),
        }
    }
}

impl From<ChangeScope> for ScopeRepr {
    fn from(scope: ChangeScope) -> Self {
        match scope {
            ChangeScope::Global => Self::Global,
            ChangeScope::Event(event_id) => Self::Event { event_id },
        }
    }
}

/// Opaque reference to the entity a change mutated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity collection
    pub kind: EntityKind,
    /// Raw entity id
    pub id: String,
}

impl EntityRef {
    /// Reference an entity by kind and raw id
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

fn default_active() -> bool {
    true
}

/// Smallest scoped unit of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChange {
    /// Change id, unique across the whole log
    pub id: HistoryChangeId,
    /// Mutated entity
    pub entity: EntityRef,
    /// Global or event-scoped
    #[serde(default)]
    pub scope: ChangeScope,
    /// Whether this change is currently in effect
    #[serde(default = "default_active")]
    pub active: bool,
    /// Set by the authority when applying this change created a conflict
    #[serde(default)]
    pub conflict_created: bool,
}

impl HistoryChange {
    /// Create an active, conflict-free change
    #[must_use]
    pub fn new(id: impl Into<HistoryChangeId>, entity: EntityRef, scope: ChangeScope) -> Self {
        Self {
            id: id.into(),
            entity,
            scope,
            active: true,
            conflict_created: false,
        }
    }

    /// Builder: set the active flag
    #[inline]
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Whether this change belongs to `event_id`
    #[inline]
    #[must_use]
    pub fn is_for_event(&self, event_id: &EventId) -> bool {
        self.scope.event_id() == Some(event_id)
    }
}

/// One atomic unit of the history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Stable entry id
    pub id: HistoryEntryId,
    /// Position in the total order of the log
    pub order: u64,
    /// User action that produced the entry
    #[serde(default)]
    pub description: UserActionDescription,
    /// Ordered changes; never empty in a valid log
    pub changes: Vec<HistoryChange>,
    /// In effect (true) or undone (false)
    pub applied: bool,
    /// Rank in the authority's redo stack, 1 = most recently undone
    #[serde(default)]
    pub redo_priority: Option<u32>,
}

impl HistoryEntry {
    /// Create an applied entry
    #[must_use]
    pub fn new(
        id: impl Into<HistoryEntryId>,
        order: u64,
        description: UserActionDescription,
        changes: Vec<HistoryChange>,
    ) -> Self {
        Self {
            id: id.into(),
            order,
            description,
            changes,
            applied: true,
            redo_priority: None,
        }
    }

    /// Builder: set the applied flag
    #[inline]
    #[must_use]
    pub fn with_applied(mut self, applied: bool) -> Self {
        self.applied = applied;
        self
    }

    /// Events touched by event-scoped changes of this entry
    #[must_use]
    pub fn event_ids(&self) -> BTreeSet<&EventId> {
        self.changes.iter().filter_map(|c| c.scope.event_id()).collect()
    }

    /// Whether any change of this entry is session-wide
    #[must_use]
    pub fn has_global_change(&self) -> bool {
        self.changes.iter().any(|c| c.scope.is_global())
    }

    /// Whether the entry touches more than one event or has a global change
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.has_global_change() || self.event_ids().len() > 1
    }

    /// Whether the entry holds a change with `id`
    #[must_use]
    pub fn contains_change(&self, id: &HistoryChangeId) -> bool {
        self.changes.iter().any(|c| &c.id == id)
    }

    /// Whether any change of the entry is currently undone
    #[must_use]
    pub fn has_inactive_change(&self) -> bool {
        self.changes.iter().any(|c| !c.active)
    }
}

/// Analyst action that produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum UserActionDescription {
    #[default]
    Unknown,
    Associate,
    AssociateMultiple,
    Unassociate,
    UnassociateMultiple,
    CreateDetection,
    RejectDetection,
    RejectMultipleDetections,
    RetimeDetection,
    RephaseDetection,
    RephaseMultipleDetections,
    UpdateDetectionAmplitude,
    UpdateDetectionReviewAmplitude,
    UpdateDetection,
    ComputeFk,
    ComputeMultipleFk,
    CreateEvent,
    LocateEvent,
    UpdateEventFromDetectionChange,
    UpdateEventFeaturePredictions,
    OpenEventForRefinement,
    MarkEventComplete,
    UpdateEventPreferredHypothesis,
    UpdateEventMagnitude,
    SaveEvent,
    CreateQcMask,
    UpdateQcMask,
    RejectQcMask,
}

impl UserActionDescription {
    /// Whether the action is recorded in the history log
    ///
    /// Status transitions, saves, feature-prediction refreshes and review
    /// amplitude updates take effect immediately and can never be undone.
    #[must_use]
    pub fn is_undoable(self) -> bool {
        !matches!(
            self,
            Self::UpdateEventFeaturePredictions
                | Self::OpenEventForRefinement
                | Self::MarkEventComplete
                | Self::SaveEvent
                | Self::UpdateDetectionReviewAmplitude
        )
    }

    /// Label shown in the history panel
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Associate => "Associate",
            Self::AssociateMultiple => "Associate multiple detections",
            Self::Unassociate => "Unassociate",
            Self::UnassociateMultiple => "Unassociate multiple detections",
            Self::CreateDetection => "Create detection",
            Self::RejectDetection => "Reject detection",
            Self::RejectMultipleDetections => "Reject multiple detections",
            Self::RetimeDetection => "Time",
            Self::RephaseDetection => "Phase",
            Self::RephaseMultipleDetections => "Phase multiple detections",
            Self::UpdateDetectionAmplitude => "Update detection amplitude",
            Self::UpdateDetectionReviewAmplitude => "Update detection review amplitude",
            Self::UpdateDetection => "Update detection",
            Self::ComputeFk => "Fk",
            Self::ComputeMultipleFk => "Fk multiple detections",
            Self::CreateEvent => "Create event",
            Self::LocateEvent => "Locate event",
            Self::UpdateEventFromDetectionChange => "Update event from signal detection change",
            Self::UpdateEventFeaturePredictions => "Update event feature predictions",
            Self::OpenEventForRefinement => "Event opened for refinement",
            Self::MarkEventComplete => "Event marked complete",
            Self::UpdateEventPreferredHypothesis => "Update event preferred hypothesis",
            Self::UpdateEventMagnitude => "Change Magnitude defining settings",
            Self::SaveEvent => "Save event",
            Self::CreateQcMask => "Create QC mask",
            Self::UpdateQcMask => "Update QC mask",
            Self::RejectQcMask => "Reject QC mask",
        }
    }
}

impl Display for UserActionDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
