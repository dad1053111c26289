//! Action intent engine
//!
//! Pure queries over a [`HistoryLog`] that answer "what would this undo or
//! redo touch?" without touching anything. Hover handlers build an
//! [`ActionIntent`] from these; the history panel uses the counts to enable
//! or disable its buttons.
//!
//! All functions are total: an empty log yields `None`, `false` or `0`.

use crate::error::LogError;
use crate::filter::{ChangeFilter, ChangePredicate};
use crate::log::HistoryLog;
use seis_model::{ChangeScope, HistoryChangeId, HistoryEntry, HistoryEntryId};
use std::fmt::{self, Display, Formatter};

/// Direction of a history action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Revert changes
    Undo,
    /// Re-apply reverted changes
    Redo,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

/// Ephemeral description of a pending undo or redo
///
/// Lives only in the session's intent slot while an affordance is hovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionIntent {
    /// Entry the action is aimed at
    pub target_entry_id: HistoryEntryId,
    /// Undo or redo
    pub direction: Direction,
    /// Global or narrowed to one event
    pub scope: ChangeScope,
    /// Which changes to highlight
    pub filter: ChangeFilter,
}

impl ActionIntent {
    /// Create an intent
    #[must_use]
    pub fn new(
        target_entry_id: HistoryEntryId,
        direction: Direction,
        scope: ChangeScope,
        filter: ChangeFilter,
    ) -> Self {
        Self {
            target_entry_id,
            direction,
            scope,
            filter,
        }
    }

    /// Whether a change is part of this intent
    #[inline]
    #[must_use]
    pub fn is_change_included(&self, change: &seis_model::HistoryChange) -> bool {
        self.filter.is_change_included(change)
    }

    /// Whether an entry has at least one change in this intent
    #[inline]
    #[must_use]
    pub fn is_entry_included(&self, entry: &HistoryEntry) -> bool {
        is_included_for_entry(entry, &self.filter)
    }

    /// Whether the intent is narrowed to an event
    #[inline]
    #[must_use]
    pub fn is_event_mode(&self) -> bool {
        !self.scope.is_global()
    }
}

/// One entry a committed action would touch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedEntry {
    /// Entry id
    pub entry_id: HistoryEntryId,
    /// Entry order
    pub order: u64,
    /// Changes of the entry that would flip
    pub change_ids: Vec<HistoryChangeId>,
}

/// Whether at least one change of `entry` satisfies the predicate
#[must_use]
pub fn is_included_for_entry<P>(entry: &HistoryEntry, is_included: &P) -> bool
where
    P: ChangePredicate + ?Sized,
{
    entry.changes.iter().any(|c| is_included.is_change_included(c))
}

/// Latest applied entry with at least one included change
#[must_use]
pub fn last_included_for_undo<'a, P>(log: &'a HistoryLog, is_included: &P) -> Option<&'a HistoryEntry>
where
    P: ChangePredicate + ?Sized,
{
    log.applied().rev().find(|e| is_included_for_entry(e, is_included))
}

/// Earliest undone entry, regardless of any predicate
#[must_use]
pub fn next_ordered_redo(log: &HistoryLog) -> Option<&HistoryEntry> {
    log.undone().next()
}

/// Predicate true exactly for the changes of `entry`
#[must_use]
pub fn change_inclusion_predicate(entry: &HistoryEntry) -> ChangeFilter {
    ChangeFilter::for_entry(entry)
}

/// Number of applied entries with an included change
#[must_use]
pub fn number_of_undos<P>(log: &HistoryLog, is_included: &P) -> usize
where
    P: ChangePredicate + ?Sized,
{
    log.applied().filter(|e| is_included_for_entry(e, is_included)).count()
}

/// Number of undone entries with an included change
#[must_use]
pub fn number_of_redos<P>(log: &HistoryLog, is_included: &P) -> usize
where
    P: ChangePredicate + ?Sized,
{
    log.undone().filter(|e| is_included_for_entry(e, is_included)).count()
}

/// Intent for hovering the undo button
#[must_use]
pub fn undo_intent(log: &HistoryLog, filter: ChangeFilter, scope: ChangeScope) -> Option<ActionIntent> {
    let target = last_included_for_undo(log, &filter)?;
    Some(ActionIntent::new(target.id.clone(), Direction::Undo, scope, filter))
}

/// Intent for hovering the redo button
///
/// Targets the earliest undone entry and highlights exactly its changes.
#[must_use]
pub fn redo_intent(log: &HistoryLog, scope: ChangeScope) -> Option<ActionIntent> {
    let target = next_ordered_redo(log)?;
    Some(ActionIntent::new(
        target.id.clone(),
        Direction::Redo,
        scope,
        change_inclusion_predicate(target),
    ))
}

/// Intent for hovering a specific row of the history list
pub fn entry_intent(
    log: &HistoryLog,
    entry_id: &HistoryEntryId,
    direction: Direction,
    scope: ChangeScope,
) -> Result<ActionIntent, LogError> {
    let target = log.require(entry_id)?;
    let filter = ChangeFilter::for_scope(&scope);
    Ok(ActionIntent::new(target.id.clone(), direction, scope, filter))
}

/// Entries and changes a committed intent would flip
///
/// Global undo walks applied entries from the newest down to the target;
/// global redo walks undone entries from the oldest up to the target. Both
/// take every change of an entry. Event-scoped actions walk the same ranges
/// but only take the event's changes that are currently active (undo) or
/// inactive (redo), skipping entries with none.
#[must_use]
pub fn affected_entries(log: &HistoryLog, intent: &ActionIntent) -> Vec<AffectedEntry> {
    let Some(target) = log.get(&intent.target_entry_id) else {
        return Vec::new();
    };
    let bound = target.order;

    let candidates: Vec<&HistoryEntry> = match (&intent.scope, intent.direction) {
        (ChangeScope::Global, Direction::Undo) => {
            log.applied().rev().filter(|e| e.order >= bound).collect()
        }
        (ChangeScope::Global, Direction::Redo) => {
            log.undone().filter(|e| e.order <= bound).collect()
        }
        (ChangeScope::Event(_), Direction::Undo) => {
            log.entries().iter().rev().filter(|e| e.order >= bound).collect()
        }
        (ChangeScope::Event(_), Direction::Redo) => {
            log.entries().iter().filter(|e| e.order <= bound).collect()
        }
    };

    candidates
        .into_iter()
        .filter_map(|entry| {
            let change_ids: Vec<HistoryChangeId> = match &intent.scope {
                ChangeScope::Global => entry.changes.iter().map(|c| c.id.clone()).collect(),
                ChangeScope::Event(event_id) => entry
                    .changes
                    .iter()
                    .filter(|c| c.is_for_event(event_id))
                    .filter(|c| c.active == (intent.direction == Direction::Undo))
                    .map(|c| c.id.clone())
                    .collect(),
            };
            (!change_ids.is_empty()).then(|| AffectedEntry {
                entry_id: entry.id.clone(),
                order: entry.order,
                change_ids,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::{EntityKind, EntityRef, EventId, HistoryChange, UserActionDescription};

    fn scoped(id: &str, order: u64, applied: bool, scope: ChangeScope) -> HistoryEntry {
        let change = HistoryChange::new(
            format!("{id}-C"),
            EntityRef::new(EntityKind::SignalDetection, "S1"),
            scope,
        )
        .with_active(applied);
        HistoryEntry::new(id, order, UserActionDescription::Associate, vec![change])
            .with_applied(applied)
    }

    fn event(id: &str) -> ChangeScope {
        ChangeScope::Event(EventId::from(id))
    }

    fn mixed_log() -> HistoryLog {
        HistoryLog::new(vec![
            scoped("E1", 1, true, ChangeScope::Global),
            scoped("E2", 2, true, event("A")),
            scoped("E3", 3, true, event("B")),
        ])
    }

    #[test]
    fn undo_scoped_to_event_skips_other_events() {
        let log = mixed_log();
        let found = last_included_for_undo(&log, &ChangeFilter::Scope(event("A"))).unwrap();
        assert_eq!(found.id, HistoryEntryId::from("E2"));
    }

    #[test]
    fn global_undo_targets_latest() {
        let log = mixed_log();
        let found = last_included_for_undo(&log, &ChangeFilter::All).unwrap();
        assert_eq!(found.id, HistoryEntryId::from("E3"));
    }

    #[test]
    fn redo_is_adjacent_to_boundary() {
        let log = HistoryLog::new(vec![
            scoped("E1", 1, true, ChangeScope::Global),
            scoped("E2", 2, false, ChangeScope::Global),
            scoped("E3", 3, false, ChangeScope::Global),
        ]);
        assert_eq!(next_ordered_redo(&log).unwrap().id, HistoryEntryId::from("E2"));
    }

    #[test]
    fn empty_log_is_total() {
        let log = HistoryLog::empty();
        assert!(last_included_for_undo(&log, &ChangeFilter::All).is_none());
        assert!(next_ordered_redo(&log).is_none());
        assert_eq!(number_of_undos(&log, &ChangeFilter::All), 0);
        assert_eq!(number_of_redos(&log, &ChangeFilter::All), 0);
        assert!(undo_intent(&log, ChangeFilter::All, ChangeScope::Global).is_none());
        assert!(redo_intent(&log, ChangeScope::Global).is_none());
    }

    #[test]
    fn counts_respect_predicate() {
        let log = HistoryLog::new(vec![
            scoped("E1", 1, true, event("A")),
            scoped("E2", 2, true, event("B")),
            scoped("E3", 3, false, event("A")),
        ]);
        let only_a = |c: &HistoryChange| c.is_for_event(&EventId::from("A"));
        assert_eq!(number_of_undos(&log, &only_a), 1);
        assert_eq!(number_of_redos(&log, &only_a), 1);
        assert_eq!(number_of_undos(&log, &ChangeFilter::All), 2);
    }

    #[test]
    fn redo_intent_highlights_target_changes_only() {
        let log = HistoryLog::new(vec![
            scoped("E1", 1, true, ChangeScope::Global),
            scoped("E2", 2, false, ChangeScope::Global),
            scoped("E3", 3, false, ChangeScope::Global),
        ]);
        let intent = redo_intent(&log, ChangeScope::Global).unwrap();
        assert_eq!(intent.target_entry_id, HistoryEntryId::from("E2"));
        assert!(intent.is_entry_included(&log.entries()[1]));
        assert!(!intent.is_entry_included(&log.entries()[2]));
    }

    #[test]
    fn entry_intent_requires_known_entry() {
        let log = mixed_log();
        let err = entry_intent(&log, &HistoryEntryId::from("E9"), Direction::Undo, ChangeScope::Global)
            .unwrap_err();
        assert_eq!(err, LogError::EntryNotFound(HistoryEntryId::from("E9")));
    }

    #[test]
    fn affected_by_global_undo_by_id() {
        let log = mixed_log();
        let intent =
            entry_intent(&log, &HistoryEntryId::from("E2"), Direction::Undo, ChangeScope::Global).unwrap();
        let ids: Vec<_> = affected_entries(&log, &intent).into_iter().map(|a| a.entry_id).collect();
        assert_eq!(ids, vec![HistoryEntryId::from("E3"), HistoryEntryId::from("E2")]);
    }

    #[test]
    fn affected_by_event_undo_is_restricted_to_event() {
        let log = mixed_log();
        let intent =
            entry_intent(&log, &HistoryEntryId::from("E1"), Direction::Undo, event("A")).unwrap();
        let affected = affected_entries(&log, &intent);
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].entry_id, HistoryEntryId::from("E2"));
        assert!(intent.is_event_mode());
    }

    #[test]
    fn affected_by_global_redo_walks_up_to_target() {
        let log = HistoryLog::new(vec![
            scoped("E1", 1, false, ChangeScope::Global),
            scoped("E2", 2, false, ChangeScope::Global),
            scoped("E3", 3, false, ChangeScope::Global),
        ]);
        let intent =
            entry_intent(&log, &HistoryEntryId::from("E2"), Direction::Redo, ChangeScope::Global).unwrap();
        let orders: Vec<u64> = affected_entries(&log, &intent).iter().map(|a| a.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }
}
