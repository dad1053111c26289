//! In-memory mutation authority
//!
//! A single-process [`HistoryAuthority`] for tests, demos and the simulator.
//! It keeps entity state plus a history of before/after snapshots and
//! follows the undo/redo rules of the analyst gateway:
//!
//! - Recording an entry prunes undone changes that can no longer be redone
//! - Global undo reverts the latest fully applied entry; global redo
//!   re-applies the earliest entry that is not fully applied
//! - Event-scoped undo/redo only flips the changes of that event, so an
//!   entry may end up partially undone
//! - Every response carries the touched entities and the full history log

use super::{AuthorityError, HistoryAuthority, HistoryRequest, HistoryTarget};
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use seis_history::{Direction, HistoryLog};
use seis_model::{
    ChangeScope, DataPayload, EntityCollection, EntityKind, EntityRef, Event, EventId, EventStatus,
    EventToUsers, HistoryChange, HistoryChangeId, HistoryEntry, HistoryEntryId, QcMask, QcMaskId,
    SignalDetection, SignalDetectionId, TimeRange, TimeWindowed, UserActionDescription,
    WorkspaceState,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Full state of one entity at a point in history
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySnapshot {
    /// Event state
    Event(Event),
    /// Signal detection state
    SignalDetection(SignalDetection),
    /// QC mask state
    QcMask(QcMask),
}

impl EntitySnapshot {
    /// Reference to the entity this snapshot describes
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Self::Event(e) => EntityRef::new(EntityKind::Event, e.id.as_str()),
            Self::SignalDetection(d) => EntityRef::new(EntityKind::SignalDetection, d.id.as_str()),
            Self::QcMask(m) => EntityRef::new(EntityKind::QcMask, m.id.as_str()),
        }
    }
}

impl From<Event> for EntitySnapshot {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<SignalDetection> for EntitySnapshot {
    fn from(detection: SignalDetection) -> Self {
        Self::SignalDetection(detection)
    }
}

impl From<QcMask> for EntitySnapshot {
    fn from(mask: QcMask) -> Self {
        Self::QcMask(mask)
    }
}

/// One entity write requested by an analyst action
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Scope the resulting change is recorded under
    pub scope: ChangeScope,
    /// Entity written
    pub entity: EntityRef,
    /// New state, `None` to delete
    pub after: Option<EntitySnapshot>,
}

impl Mutation {
    /// Create or update an entity
    #[must_use]
    pub fn upsert(scope: ChangeScope, snapshot: impl Into<EntitySnapshot>) -> Self {
        let snapshot = snapshot.into();
        Self {
            scope,
            entity: snapshot.entity_ref(),
            after: Some(snapshot),
        }
    }

    /// Delete an entity
    #[must_use]
    pub fn delete(scope: ChangeScope, entity: EntityRef) -> Self {
        Self {
            scope,
            entity,
            after: None,
        }
    }
}

#[derive(Debug, Clone)]
struct RecordedChange {
    id: HistoryChangeId,
    entity: EntityRef,
    scope: ChangeScope,
    before: Option<EntitySnapshot>,
    after: Option<EntitySnapshot>,
    active: bool,
    conflict_created: bool,
}

impl RecordedChange {
    fn is_for(&self, event_id: Option<&EventId>) -> bool {
        event_id.map_or(true, |id| self.scope.event_id() == Some(id))
    }
}

#[derive(Debug, Clone)]
struct RecordedEntry {
    id: HistoryEntryId,
    order: u64,
    description: UserActionDescription,
    changes: Vec<RecordedChange>,
}

impl RecordedEntry {
    fn is_applied(&self) -> bool {
        self.changes.iter().all(|c| c.active)
    }

    fn event_ids(&self) -> BTreeSet<&EventId> {
        self.changes.iter().filter_map(|c| c.scope.event_id()).collect()
    }

    fn is_global(&self) -> bool {
        self.changes.iter().any(|c| c.scope.is_global()) || self.event_ids().len() > 1
    }

    fn has_active_for(&self, event_id: &EventId) -> bool {
        self.changes.iter().any(|c| c.active && c.is_for(Some(event_id)))
    }

    fn has_inactive_for(&self, event_id: &EventId) -> bool {
        self.changes.iter().any(|c| !c.active && c.is_for(Some(event_id)))
    }
}

#[derive(Debug, Default)]
struct Store {
    events: IndexMap<EventId, Event>,
    detections: IndexMap<SignalDetectionId, SignalDetection>,
    masks: IndexMap<QcMaskId, QcMask>,
    workspace: WorkspaceState,
}

impl Store {
    fn get(&self, entity: &EntityRef) -> Option<EntitySnapshot> {
        match entity.kind {
            EntityKind::Event => self
                .events
                .get(&EventId::from(entity.id.as_str()))
                .cloned()
                .map(EntitySnapshot::Event),
            EntityKind::SignalDetection => self
                .detections
                .get(&SignalDetectionId::from(entity.id.as_str()))
                .cloned()
                .map(EntitySnapshot::SignalDetection),
            EntityKind::QcMask => self
                .masks
                .get(&QcMaskId::from(entity.id.as_str()))
                .cloned()
                .map(EntitySnapshot::QcMask),
        }
    }

    fn put(&mut self, entity: &EntityRef, snapshot: Option<&EntitySnapshot>) {
        match snapshot {
            Some(EntitySnapshot::Event(e)) => {
                self.events.insert(e.id.clone(), e.clone());
            }
            Some(EntitySnapshot::SignalDetection(d)) => {
                self.detections.insert(d.id.clone(), d.clone());
            }
            Some(EntitySnapshot::QcMask(m)) => {
                self.masks.insert(m.id.clone(), m.clone());
            }
            None => match entity.kind {
                EntityKind::Event => {
                    self.events.shift_remove(&EventId::from(entity.id.as_str()));
                }
                EntityKind::SignalDetection => {
                    self.detections
                        .shift_remove(&SignalDetectionId::from(entity.id.as_str()));
                }
                EntityKind::QcMask => {
                    self.masks.shift_remove(&QcMaskId::from(entity.id.as_str()));
                }
            },
        }
    }

    fn query(&self, kind: EntityKind, window: TimeRange) -> EntityCollection {
        match kind {
            EntityKind::Event => EntityCollection::Events(
                self.events
                    .values()
                    .filter(|e| window.contains(e.origin_time))
                    .cloned()
                    .collect(),
            ),
            EntityKind::SignalDetection => EntityCollection::SignalDetections(
                self.detections
                    .values()
                    .filter(|d| window.contains(d.arrival_time))
                    .cloned()
                    .collect(),
            ),
            EntityKind::QcMask => EntityCollection::QcMasks(
                self.masks
                    .values()
                    .filter(|m| m.overlaps(&window))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    store: Store,
    entries: Vec<RecordedEntry>,
    last_order: u64,
    // most recently undone last
    redo_stack: Vec<HistoryEntryId>,
    pending_rejection: Option<AuthorityError>,
}

impl State {
    fn position(&self, id: &HistoryEntryId) -> Result<usize, AuthorityError> {
        self.entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| AuthorityError::EntryNotFound(id.clone()))
    }

    fn undo_entry(&mut self, idx: usize, event_id: Option<&EventId>, touched: &mut IndexSet<EntityRef>) {
        let Self {
            store,
            entries,
            redo_stack,
            ..
        } = self;
        let entry = &mut entries[idx];

        for change in entry.changes.iter_mut().rev() {
            if !change.active || !change.is_for(event_id) {
                continue;
            }
            if store.get(&change.entity) != change.after {
                debug!("undo of change {} overwrites a later edit", change.id);
                change.conflict_created = true;
            }
            store.put(&change.entity, change.before.as_ref());
            change.active = false;
            touched.insert(change.entity.clone());
        }

        redo_stack.retain(|id| id != &entry.id);
        redo_stack.push(entry.id.clone());
    }

    fn redo_entry(&mut self, idx: usize, event_id: Option<&EventId>, touched: &mut IndexSet<EntityRef>) {
        let Self { store, entries, .. } = self;
        let entry = &mut entries[idx];

        for change in &mut entry.changes {
            if change.active || !change.is_for(event_id) {
                continue;
            }
            if store.get(&change.entity) != change.before {
                debug!("redo of change {} overwrites a later edit", change.id);
                change.conflict_created = true;
            }
            store.put(&change.entity, change.after.as_ref());
            change.active = true;
            touched.insert(change.entity.clone());
        }
    }

    fn undo(&mut self, target: &HistoryTarget, event_id: Option<&EventId>, touched: &mut IndexSet<EntityRef>) -> Result<(), AuthorityError> {
        let undoable = |e: &RecordedEntry| match event_id {
            None => e.is_applied(),
            Some(id) => e.has_active_for(id),
        };

        match target {
            HistoryTarget::Quantity(n) => {
                for _ in 0..*n {
                    let Some(idx) = self.entries.iter().rposition(undoable) else {
                        break;
                    };
                    self.undo_entry(idx, event_id, touched);
                }
            }
            HistoryTarget::ById(id) => {
                let idx = self.position(id)?;
                if !undoable(&self.entries[idx]) {
                    return Err(AuthorityError::StaleHistory(format!("entry {id} cannot be undone")));
                }
                let order = self.entries[idx].order;
                let targets: Vec<usize> = (0..self.entries.len())
                    .rev()
                    .filter(|&i| self.entries[i].order >= order && undoable(&self.entries[i]))
                    .collect();
                for i in targets {
                    self.undo_entry(i, event_id, touched);
                }
            }
        }
        Ok(())
    }

    fn redo(&mut self, target: &HistoryTarget, event_id: Option<&EventId>, touched: &mut IndexSet<EntityRef>) -> Result<(), AuthorityError> {
        let redoable = |e: &RecordedEntry| match event_id {
            None => !e.is_applied(),
            Some(id) => e.has_inactive_for(id),
        };

        match target {
            HistoryTarget::Quantity(n) => {
                for _ in 0..*n {
                    let Some(idx) = self.entries.iter().position(redoable) else {
                        break;
                    };
                    self.redo_entry(idx, event_id, touched);
                }
            }
            HistoryTarget::ById(id) => {
                let idx = self.position(id)?;
                if !redoable(&self.entries[idx]) {
                    return Err(AuthorityError::StaleHistory(format!("entry {id} cannot be redone")));
                }
                let order = self.entries[idx].order;
                let targets: Vec<usize> = (0..self.entries.len())
                    .filter(|&i| self.entries[i].order <= order && redoable(&self.entries[i]))
                    .collect();
                for i in targets {
                    self.redo_entry(i, event_id, touched);
                }
            }
        }
        Ok(())
    }

    /// Drop undone changes that the incoming entry makes unredoable
    fn prune_for(&mut self, incoming: &RecordedEntry) {
        if incoming.is_global() {
            for entry in &mut self.entries {
                if entry.changes.iter().any(|c| !c.active) {
                    entry.changes.clear();
                }
            }
        } else {
            let events = incoming.event_ids();
            for entry in &mut self.entries {
                entry.changes.retain(|c| {
                    c.active || c.scope.event_id().map_or(true, |id| !events.contains(id))
                });
            }
        }
        self.entries.retain(|e| !e.changes.is_empty());
    }

    fn sync_redo_stack(&mut self) {
        let entries = &self.entries;
        self.redo_stack.retain(|id| {
            entries
                .iter()
                .any(|e| &e.id == id && e.changes.iter().any(|c| !c.active))
        });
    }

    fn redo_priority(&self, id: &HistoryEntryId) -> Option<u32> {
        self.redo_stack
            .iter()
            .position(|x| x == id)
            .and_then(|p| u32::try_from(self.redo_stack.len() - p).ok())
    }

    fn history(&self) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .map(|e| HistoryEntry {
                id: e.id.clone(),
                order: e.order,
                description: e.description,
                changes: e
                    .changes
                    .iter()
                    .map(|c| HistoryChange {
                        id: c.id.clone(),
                        entity: c.entity.clone(),
                        scope: c.scope.clone(),
                        active: c.active,
                        conflict_created: c.conflict_created,
                    })
                    .collect(),
                applied: e.is_applied(),
                redo_priority: self.redo_priority(&e.id),
            })
            .collect()
    }

    fn payload(&self, touched: &IndexSet<EntityRef>) -> DataPayload {
        let mut payload = DataPayload::new().with_history(self.history());
        for entity in touched {
            match self.store.get(entity) {
                Some(EntitySnapshot::Event(e)) => payload.events.push(e),
                Some(EntitySnapshot::SignalDetection(d)) => payload.signal_detections.push(d),
                Some(EntitySnapshot::QcMask(m)) => payload.qc_masks.push(m),
                None => match entity.kind {
                    EntityKind::Event => payload.invalid.event_ids.push(entity.id.clone().into()),
                    EntityKind::SignalDetection => payload
                        .invalid
                        .signal_detection_ids
                        .push(entity.id.clone().into()),
                    EntityKind::QcMask => payload.invalid.qc_mask_ids.push(entity.id.clone().into()),
                },
            }
        }
        payload
    }
}

/// Single-process authority backed by a mutex-guarded state
#[derive(Debug, Default)]
pub struct InMemoryAuthority {
    state: Mutex<State>,
}

impl InMemoryAuthority {
    /// Empty authority
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load entities without recording history
    pub fn seed(&self, snapshots: impl IntoIterator<Item = EntitySnapshot>) {
        let mut state = self.state.lock();
        for snapshot in snapshots {
            let entity = snapshot.entity_ref();
            state.store.put(&entity, Some(&snapshot));
        }
    }

    /// Apply an analyst action
    ///
    /// Undoable actions append one history entry holding every mutation as a
    /// change; other actions take effect without entering the log.
    pub fn record(
        &self,
        description: UserActionDescription,
        mutations: Vec<Mutation>,
    ) -> Result<DataPayload, AuthorityError> {
        if let Some(bad) = mutations
            .iter()
            .find(|m| m.after.as_ref().is_some_and(|a| a.entity_ref() != m.entity))
        {
            return Err(AuthorityError::Rejected(format!(
                "snapshot does not match entity {}",
                bad.entity.id
            )));
        }

        let mut state = self.state.lock();
        let mut touched = IndexSet::new();
        let mut changes = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            let before = state.store.get(&mutation.entity);
            state.store.put(&mutation.entity, mutation.after.as_ref());
            touched.insert(mutation.entity.clone());
            changes.push(RecordedChange {
                id: HistoryChangeId::generate(),
                entity: mutation.entity,
                scope: mutation.scope,
                before,
                after: mutation.after,
                active: true,
                conflict_created: false,
            });
        }

        if description.is_undoable() && !changes.is_empty() {
            state.last_order += 1;
            let entry = RecordedEntry {
                id: HistoryEntryId::generate(),
                order: state.last_order,
                description,
                changes,
            };
            state.prune_for(&entry);
            info!("recorded {}: entry {} order {}", description, entry.id, entry.order);
            state.entries.push(entry);
            state.sync_redo_stack();
        } else {
            info!("applied {} without history", description);
        }

        Ok(state.payload(&touched))
    }

    /// Open an event for refinement on behalf of `user`
    ///
    /// Not undoable; the response carries the updated event and workspace state.
    pub fn open_event(&self, event_id: &EventId, user: &str) -> Result<DataPayload, AuthorityError> {
        let mut state = self.state.lock();
        let Some(event) = state.store.events.get_mut(event_id) else {
            return Err(AuthorityError::Rejected(format!("unknown event {event_id}")));
        };
        event.status = EventStatus::OpenForRefinement;
        let event = event.clone();

        let workspace = &mut state.store.workspace;
        match workspace.event_to_users.iter_mut().find(|e| &e.event_id == event_id) {
            Some(entry) if !entry.user_names.iter().any(|u| u == user) => {
                entry.user_names.push(user.to_string());
            }
            Some(_) => {}
            None => workspace.event_to_users.push(EventToUsers {
                event_id: event_id.clone(),
                user_names: vec![user.to_string()],
            }),
        }
        info!("{} opened event {}", user, event_id);

        Ok(DataPayload::new()
            .with_events(vec![event])
            .with_workspace_state(state.store.workspace.clone()))
    }

    /// Fail the next undo/redo request with [`AuthorityError::Rejected`]
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().pending_rejection = Some(AuthorityError::Rejected(reason.into()));
    }

    /// Current history log
    #[must_use]
    pub fn history_log(&self) -> HistoryLog {
        HistoryLog::new(self.state.lock().history())
    }

    /// Current state of one entity
    #[must_use]
    pub fn entity(&self, entity: &EntityRef) -> Option<EntitySnapshot> {
        self.state.lock().store.get(entity)
    }

    /// Authoritative collection, without going through the async interface
    #[must_use]
    pub fn collection(&self, kind: EntityKind, window: TimeRange) -> EntityCollection {
        self.state.lock().store.query(kind, window)
    }
}

#[async_trait::async_trait]
impl HistoryAuthority for InMemoryAuthority {
    async fn apply_history(&self, request: &HistoryRequest) -> Result<DataPayload, AuthorityError> {
        let mut state = self.state.lock();

        if let Some(err) = state.pending_rejection.take() {
            warn!("rejecting {}: {}", request, err);
            return Err(err);
        }
        if request.target == HistoryTarget::Quantity(0) {
            return Err(AuthorityError::Rejected("quantity must be positive".to_string()));
        }

        let mut touched = IndexSet::new();
        let event_id = request.scope.event_id();
        match request.direction {
            Direction::Undo => state.undo(&request.target, event_id, &mut touched)?,
            Direction::Redo => state.redo(&request.target, event_id, &mut touched)?,
        }
        state.sync_redo_stack();

        info!("applied {}: {} entities touched", request, touched.len());
        Ok(state.payload(&touched))
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, AuthorityError> {
        Ok(self.state.lock().history())
    }

    async fn query(&self, kind: EntityKind, window: TimeRange) -> Result<EntityCollection, AuthorityError> {
        Ok(self.state.lock().store.query(kind, window))
    }
}
