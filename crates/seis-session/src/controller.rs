//! History session controller
//!
//! One [`HistorySession`] per analyst session, shared by `Arc`. It issues
//! undo/redo requests to the authority, folds the responses into the cached
//! partitions and holds the hover intent slot.
//!
//! # Workflow
//! 1. Validate the request (quantity bounds, open event)
//! 2. Mark it in flight
//! 3. Await the authority
//! 4. Reconcile the payload under the partition write lock
//!
//! A failed request reconciles nothing. Locks are never held across an
//! `.await`, so readers always see a fully reconciled partition set.

use crate::authority::{HistoryAuthority, HistoryRequest, HistoryTarget};
use crate::config::{AnalystActivity, SessionConfig};
use crate::error::{Result, SessionError};
use crate::progress::ActionProgress;
use futures::future::try_join_all;
use parking_lot::RwLock;
use seis_cache::{reconcile, ObservedWindows, PartitionSet, ReconcileReport};
use seis_history::{
    affected_entries, entry_intent, number_of_redos, number_of_undos, redo_intent, undo_intent,
    ActionIntent, AffectedEntry, ChangeFilter, Direction, HistoryLog,
};
use seis_model::{
    ChangeScope, DataPayload, EntityCollection, EntityKind, EventId, HistoryEntryId, TimeRange,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What the analyst is looking at
#[derive(Debug, Clone, PartialEq)]
pub struct ViewContext {
    /// Current time interval
    pub interval: TimeRange,
    /// Current activity
    pub activity: AnalystActivity,
    /// Event open for refinement
    pub open_event_id: Option<EventId>,
    /// Kinds with a mounted view and the window each was seeded for
    pub observed: BTreeMap<EntityKind, TimeRange>,
}

impl ViewContext {
    /// Context for `interval`, nothing observed
    #[must_use]
    pub fn new(interval: TimeRange) -> Self {
        Self {
            interval,
            activity: AnalystActivity::default(),
            open_event_id: None,
            observed: BTreeMap::new(),
        }
    }
}

/// Session-wide undo/redo controller
pub struct HistorySession {
    config: SessionConfig,
    authority: Arc<dyn HistoryAuthority>,
    partitions: RwLock<PartitionSet>,
    view: RwLock<ViewContext>,
    intent: RwLock<Option<ActionIntent>>,
    progress: ActionProgress,
}

impl fmt::Debug for HistorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistorySession")
            .field("config", &self.config)
            .field("view", &*self.view.read())
            .field("cache", &self.partitions.read().stats())
            .field("in_progress", &self.progress.in_progress())
            .finish_non_exhaustive()
    }
}

impl HistorySession {
    /// Create a session over `authority` starting at `interval`
    #[must_use]
    pub fn new(authority: Arc<dyn HistoryAuthority>, config: SessionConfig, interval: TimeRange) -> Self {
        Self {
            config,
            authority,
            partitions: RwLock::new(PartitionSet::new()),
            view: RwLock::new(ViewContext::new(interval)),
            intent: RwLock::new(None),
            progress: ActionProgress::new(),
        }
    }

    /// Session configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // View context
    // ------------------------------------------------------------------

    /// Snapshot of the view context
    #[must_use]
    pub fn view(&self) -> ViewContext {
        self.view.read().clone()
    }

    /// Move to a new interval
    ///
    /// Views whose window moves are unmounted and their partitions dropped.
    /// Returns those kinds; observe them again to seed the new windows.
    pub fn set_interval(&self, interval: TimeRange) -> Vec<EntityKind> {
        info!("interval changed to {}", interval);
        let mut view = self.view.write();
        view.interval = interval;
        self.drop_moved_windows(&mut view)
    }

    /// Move to a new interval and re-seed every view it unmounted
    pub async fn change_interval(&self, interval: TimeRange) -> Result<Vec<TimeRange>> {
        let moved = self.set_interval(interval);
        try_join_all(moved.into_iter().map(|kind| self.observe(kind))).await
    }

    /// Switch analyst activity
    ///
    /// Same unmount rule as [`set_interval`](Self::set_interval).
    pub fn set_activity(&self, activity: AnalystActivity) -> Vec<EntityKind> {
        let mut view = self.view.write();
        view.activity = activity;
        self.drop_moved_windows(&mut view)
    }

    fn drop_moved_windows(&self, view: &mut ViewContext) -> Vec<EntityKind> {
        let moved: Vec<(EntityKind, TimeRange)> = view
            .observed
            .iter()
            .filter(|&(&kind, &window)| self.config.window_for(kind, view.interval, view.activity) != window)
            .map(|(&kind, &window)| (kind, window))
            .collect();

        let mut partitions = self.partitions.write();
        for (kind, window) in &moved {
            if let Err(err) = partitions.release(*kind, *window) {
                warn!("{} partition {} already gone: {}", kind, window, err);
            }
            view.observed.remove(kind);
            debug!("unmounted {} {}", kind, window);
        }
        moved.into_iter().map(|(kind, _)| kind).collect()
    }

    /// Open an event for refinement, or close the current one with `None`
    pub fn set_open_event(&self, event_id: Option<EventId>) {
        match &event_id {
            Some(id) => info!("event {} open for refinement", id),
            None => debug!("no event open"),
        }
        self.view.write().open_event_id = event_id;
    }

    /// Event open for refinement
    #[must_use]
    pub fn open_event_id(&self) -> Option<EventId> {
        self.view.read().open_event_id.clone()
    }

    /// Window of `kind` for the current interval and activity
    #[must_use]
    pub fn window_for(&self, kind: EntityKind) -> TimeRange {
        let view = self.view.read();
        self.config.window_for(kind, view.interval, view.activity)
    }

    /// Windows of every observed kind
    #[must_use]
    pub fn observed_windows(&self) -> ObservedWindows {
        let view = self.view.read();
        let mut windows = ObservedWindows::none();
        for (&kind, &window) in &view.observed {
            windows.set(kind, Some(window));
        }
        windows
    }

    /// Mount a view of `kind`, seeding its partition from the authority
    ///
    /// Returns the window for the current interval. An observed partition
    /// is reused. If the interval moves while the query is in flight the
    /// result is discarded and the kind stays unobserved.
    pub async fn observe(&self, kind: EntityKind) -> Result<TimeRange> {
        let window = self.window_for(kind);
        if self.view.read().observed.get(&kind) == Some(&window) {
            return Ok(window);
        }

        let collection = self.authority.query(kind, window).await?;

        let mut view = self.view.write();
        if self.config.window_for(kind, view.interval, view.activity) != window {
            debug!("{} window moved while seeding {}, discarded", kind, window);
            return Ok(window);
        }
        if view.observed.get(&kind) == Some(&window) {
            debug!("{} {} seeded by a concurrent observe", kind, window);
            return Ok(window);
        }
        debug!("seeding {} {}: {} entities", kind, window, collection.len());
        self.partitions.write().seed(kind, window, collection)?;
        view.observed.insert(kind, window);
        info!("observing {} through {}", kind, window);
        Ok(window)
    }

    /// Observe every kind concurrently
    pub async fn observe_all(&self) -> Result<Vec<TimeRange>> {
        try_join_all(EntityKind::ALL.iter().map(|&kind| self.observe(kind))).await
    }

    /// Unmount the view of `kind` and drop the partition it observed
    pub fn release(&self, kind: EntityKind) -> Result<()> {
        let mut view = self.view.write();
        let window = view
            .observed
            .get(&kind)
            .copied()
            .unwrap_or_else(|| self.config.window_for(kind, view.interval, view.activity));
        self.partitions.write().release(kind, window)?;
        view.observed.remove(&kind);
        info!("released {} {}", kind, window);
        Ok(())
    }

    /// Reload the history partition from the authority
    ///
    /// Returns the number of entries loaded.
    pub async fn refresh_history(&self) -> Result<usize> {
        let entries = self.authority.history().await?;
        let log = HistoryLog::try_new(entries)?;
        let len = log.len();
        self.partitions.write().set_history(log);
        debug!("history refreshed: {} entries", len);
        Ok(len)
    }

    // ------------------------------------------------------------------
    // Cache access
    // ------------------------------------------------------------------

    /// Cached history log
    #[must_use]
    pub fn history(&self) -> Option<HistoryLog> {
        self.partitions.read().history().cloned()
    }

    /// Clone of the whole partition set
    #[must_use]
    pub fn partitions(&self) -> PartitionSet {
        self.partitions.read().clone()
    }

    /// Run `f` against the partition set under the read lock
    pub fn with_partitions<R>(&self, f: impl FnOnce(&PartitionSet) -> R) -> R {
        f(&self.partitions.read())
    }

    /// Cached collection of the observed partition of `kind`
    #[must_use]
    pub fn collection(&self, kind: EntityKind) -> Option<EntityCollection> {
        let window = self.view.read().observed.get(&kind).copied()?;
        self.partitions.read().collection(kind, window)
    }

    /// Fold a payload from any authority call into the observed partitions
    pub fn apply_payload(&self, payload: &DataPayload) -> ReconcileReport {
        let windows = self.observed_windows();
        let mut partitions = self.partitions.write();
        reconcile(&mut partitions, &windows, payload)
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    /// Undo the latest `quantity` applied entries
    pub async fn undo(&self, quantity: usize) -> Result<ReconcileReport> {
        self.check_quantity(quantity)?;
        self.execute(HistoryRequest::undo(quantity)).await
    }

    /// Redo the earliest `quantity` undone entries
    pub async fn redo(&self, quantity: usize) -> Result<ReconcileReport> {
        self.check_quantity(quantity)?;
        self.execute(HistoryRequest::redo(quantity)).await
    }

    /// Undo every applied entry from the newest through `id`
    pub async fn undo_by_id(&self, id: &HistoryEntryId) -> Result<ReconcileReport> {
        self.execute(HistoryRequest::new(
            Direction::Undo,
            HistoryTarget::ById(id.clone()),
            ChangeScope::Global,
        ))
        .await
    }

    /// Redo every undone entry from the oldest through `id`
    pub async fn redo_by_id(&self, id: &HistoryEntryId) -> Result<ReconcileReport> {
        self.execute(HistoryRequest::new(
            Direction::Redo,
            HistoryTarget::ById(id.clone()),
            ChangeScope::Global,
        ))
        .await
    }

    /// Undo `quantity` entries of the open event
    pub async fn undo_event_history(&self, quantity: usize) -> Result<ReconcileReport> {
        self.check_quantity(quantity)?;
        let scope = self.open_event_scope()?;
        self.execute(HistoryRequest::undo(quantity).with_scope(scope)).await
    }

    /// Redo `quantity` entries of the open event
    pub async fn redo_event_history(&self, quantity: usize) -> Result<ReconcileReport> {
        self.check_quantity(quantity)?;
        let scope = self.open_event_scope()?;
        self.execute(HistoryRequest::redo(quantity).with_scope(scope)).await
    }

    /// Undo the open event's changes from the newest through `id`
    pub async fn undo_event_history_by_id(&self, id: &HistoryEntryId) -> Result<ReconcileReport> {
        let scope = self.open_event_scope()?;
        self.execute(HistoryRequest::new(Direction::Undo, HistoryTarget::ById(id.clone()), scope))
            .await
    }

    /// Redo the open event's changes from the oldest through `id`
    pub async fn redo_event_history_by_id(&self, id: &HistoryEntryId) -> Result<ReconcileReport> {
        let scope = self.open_event_scope()?;
        self.execute(HistoryRequest::new(Direction::Redo, HistoryTarget::ById(id.clone()), scope))
            .await
    }

    fn check_quantity(&self, quantity: usize) -> Result<()> {
        if quantity == 0 || quantity > self.config.max_quantity {
            return Err(SessionError::InvalidQuantity {
                quantity,
                max: self.config.max_quantity,
            });
        }
        Ok(())
    }

    fn open_event_scope(&self) -> Result<ChangeScope> {
        self.open_event_id()
            .map(ChangeScope::Event)
            .ok_or(SessionError::NoOpenEvent)
    }

    async fn execute(&self, request: HistoryRequest) -> Result<ReconcileReport> {
        let _in_flight = self.progress.begin(request.scope.clone());
        info!("issuing {}", request);

        let payload = match self.authority.apply_history(&request).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!("{} rejected: {}", request, err);
                return Err(err.into());
            }
        };

        let report = self.apply_payload(&payload);
        self.clear_intent();
        info!(
            "{} completed: {} upserted, {} removed",
            request,
            report.total_upserted(),
            report.total_removed()
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------

    /// Undo/redo requests currently in flight
    #[inline]
    #[must_use]
    pub fn history_action_in_progress(&self) -> usize {
        self.progress.in_progress()
    }

    /// Whether a request for `scope` is in flight
    #[must_use]
    pub fn is_scope_busy(&self, scope: &ChangeScope) -> bool {
        self.progress.is_scope_busy(scope)
    }

    /// Receiver of the in-flight count
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<usize> {
        self.progress.subscribe()
    }

    // ------------------------------------------------------------------
    // Intent slot
    // ------------------------------------------------------------------

    /// Replace the hover intent
    pub fn set_history_action_intent(&self, intent: Option<ActionIntent>) {
        *self.intent.write() = intent;
    }

    /// Current hover intent
    #[must_use]
    pub fn history_action_intent(&self) -> Option<ActionIntent> {
        self.intent.read().clone()
    }

    /// Drop the hover intent
    pub fn clear_intent(&self) {
        self.intent.write().take();
    }

    /// Hover the undo button of `scope`
    ///
    /// Stores and returns the intent; `None` when nothing can be undone.
    pub fn preview_undo(&self, scope: ChangeScope) -> Result<Option<ActionIntent>> {
        let log = self.scoped_log(&scope)?;
        let intent = undo_intent(&log, ChangeFilter::for_scope(&scope), scope);
        self.set_history_action_intent(intent.clone());
        Ok(intent)
    }

    /// Hover the redo button of `scope`
    pub fn preview_redo(&self, scope: ChangeScope) -> Result<Option<ActionIntent>> {
        let log = self.scoped_log(&scope)?;
        let intent = redo_intent(&log, scope);
        self.set_history_action_intent(intent.clone());
        Ok(intent)
    }

    /// Hover a row of the history list
    pub fn preview_entry(
        &self,
        id: &HistoryEntryId,
        direction: Direction,
        scope: ChangeScope,
    ) -> Result<ActionIntent> {
        let log = self.history().ok_or(SessionError::HistoryNotLoaded)?;
        let intent = entry_intent(&log, id, direction, scope)?;
        self.set_history_action_intent(Some(intent.clone()));
        Ok(intent)
    }

    /// Entries and changes the current intent would flip if committed
    #[must_use]
    pub fn affected_by_intent(&self) -> Vec<AffectedEntry> {
        let Some(intent) = self.history_action_intent() else {
            return Vec::new();
        };
        self.with_partitions(|p| {
            p.history()
                .map(|log| affected_entries(log, &intent))
                .unwrap_or_default()
        })
    }

    /// Whether the undo button of `scope` is enabled
    #[must_use]
    pub fn can_undo(&self, scope: &ChangeScope) -> bool {
        self.scoped_log(scope)
            .is_ok_and(|log| number_of_undos(&log, &ChangeFilter::for_scope(scope)) > 0)
    }

    /// Whether the redo button of `scope` is enabled
    #[must_use]
    pub fn can_redo(&self, scope: &ChangeScope) -> bool {
        self.scoped_log(scope)
            .is_ok_and(|log| number_of_redos(&log, &ChangeFilter::for_scope(scope)) > 0)
    }

    fn scoped_log(&self, scope: &ChangeScope) -> Result<HistoryLog> {
        self.with_partitions(|p| {
            let log = p.history().ok_or(SessionError::HistoryNotLoaded)?;
            Ok(match scope {
                ChangeScope::Global => log.clone(),
                ChangeScope::Event(id) => log.event_history(id),
            })
        })
    }
}
