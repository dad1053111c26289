//! History log model
//!
//! [`HistoryLog`] is the ordered list of entries as last reported by the
//! authority. The client never edits it; a payload carrying a new log
//! replaces it wholesale.
//!
//! # Boundary
//!
//! Under strict LIFO the log splits at a boundary `b`: entries with
//! `order < b` are applied, entries with `order >= b` are undone. Event-scoped
//! undo can leave undone entries below applied ones, so [`HistoryLog::is_lifo`]
//! reports whether the simple picture currently holds.

use crate::error::LogError;
use seis_model::{EventId, HistoryEntry, HistoryEntryId};
use std::collections::HashSet;

/// Ordered history log
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// Build a log, sorting entries by order
    #[must_use]
    pub fn new(mut entries: Vec<HistoryEntry>) -> Self {
        entries.sort_by_key(|e| e.order);
        Self { entries }
    }

    /// Build a log, rejecting empty entries and duplicate orders or ids
    pub fn try_new(entries: Vec<HistoryEntry>) -> Result<Self, LogError> {
        let mut orders = HashSet::with_capacity(entries.len());
        let mut ids = HashSet::with_capacity(entries.len());
        let mut change_ids = HashSet::new();

        for entry in &entries {
            if entry.changes.is_empty() {
                return Err(LogError::EmptyEntry(entry.id.clone()));
            }
            if !orders.insert(entry.order) {
                return Err(LogError::DuplicateOrder(entry.order));
            }
            if !ids.insert(&entry.id) {
                return Err(LogError::DuplicateEntry(entry.id.clone()));
            }

            for change in &entry.changes {
                if !change_ids.insert(&change.id) {
                    return Err(LogError::DuplicateChange {
                        entry: entry.id.clone(),
                        change: change.id.clone(),
                    });
                }
            }
        }

        Ok(Self::new(entries))
    }

    /// Empty log
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entries in ascending order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Consume into the ordered entries
    #[inline]
    #[must_use]
    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log has no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id
    #[must_use]
    pub fn get(&self, id: &HistoryEntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Look up an entry by id, failing with [`LogError::EntryNotFound`]
    pub fn require(&self, id: &HistoryEntryId) -> Result<&HistoryEntry, LogError> {
        self.get(id).ok_or_else(|| LogError::EntryNotFound(id.clone()))
    }

    /// Applied entries, ascending
    pub fn applied(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| e.applied)
    }

    /// Undone entries, ascending
    pub fn undone(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter().filter(|e| !e.applied)
    }

    /// Undo/redo boundary
    ///
    /// Order of the earliest undone entry, or one past the last order when
    /// everything is applied (0 for an empty log). Saturates at `u64::MAX`.
    #[must_use]
    pub fn boundary(&self) -> u64 {
        self.undone()
            .next()
            .map(|e| e.order)
            .or_else(|| self.entries.last().map(|e| e.order.saturating_add(1)))
            .unwrap_or(0)
    }

    /// Whether every entry below the boundary is applied and every entry at
    /// or above it is undone
    #[must_use]
    pub fn is_lifo(&self) -> bool {
        let b = self.boundary();
        self.entries.iter().all(|e| e.applied == (e.order < b))
    }

    /// Per-event view of the log
    ///
    /// Keeps only the changes scoped to `event_id`, drops entries left
    /// without changes and marks a derived entry applied iff all of its
    /// remaining changes are active.
    #[must_use]
    pub fn event_history(&self, event_id: &EventId) -> Self {
        let entries = self
            .entries
            .iter()
            .filter_map(|entry| {
                let changes: Vec<_> = entry
                    .changes
                    .iter()
                    .filter(|c| c.is_for_event(event_id))
                    .cloned()
                    .collect();
                if changes.is_empty() {
                    return None;
                }
                let applied = changes.iter().all(|c| c.active);
                Some(HistoryEntry {
                    changes,
                    applied,
                    ..entry.clone()
                })
            })
            .collect();
        Self { entries }
    }
}

impl From<Vec<HistoryEntry>> for HistoryLog {
    fn from(entries: Vec<HistoryEntry>) -> Self {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::{ChangeScope, EntityKind, EntityRef, HistoryChange, UserActionDescription};

    fn entry(id: &str, order: u64, applied: bool, scopes: &[ChangeScope]) -> HistoryEntry {
        let changes = scopes
            .iter()
            .enumerate()
            .map(|(i, s)| {
                HistoryChange::new(
                    format!("{id}-C{i}"),
                    EntityRef::new(EntityKind::Event, "E"),
                    s.clone(),
                )
                .with_active(applied)
            })
            .collect();
        HistoryEntry::new(id, order, UserActionDescription::Unknown, changes).with_applied(applied)
    }

    fn event(id: &str) -> ChangeScope {
        ChangeScope::Event(EventId::from(id))
    }

    #[test]
    fn new_sorts_by_order() {
        let log = HistoryLog::new(vec![
            entry("H3", 3, true, &[ChangeScope::Global]),
            entry("H1", 1, true, &[ChangeScope::Global]),
            entry("H2", 2, true, &[ChangeScope::Global]),
        ]);
        let orders: Vec<u64> = log.entries().iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn try_new_rejects_empty_entry() {
        let err = HistoryLog::try_new(vec![entry("H1", 1, true, &[])]).unwrap_err();
        assert_eq!(err, LogError::EmptyEntry(HistoryEntryId::from("H1")));
    }

    #[test]
    fn try_new_rejects_duplicate_order() {
        let err = HistoryLog::try_new(vec![
            entry("H1", 1, true, &[ChangeScope::Global]),
            entry("H2", 1, true, &[ChangeScope::Global]),
        ])
        .unwrap_err();
        assert_eq!(err, LogError::DuplicateOrder(1));
    }

    #[test]
    fn try_new_rejects_duplicate_id() {
        let err = HistoryLog::try_new(vec![
            entry("H1", 1, true, &[ChangeScope::Global]),
            entry("H1", 2, true, &[ChangeScope::Global]),
        ])
        .unwrap_err();
        assert_eq!(err, LogError::DuplicateEntry(HistoryEntryId::from("H1")));
    }

    #[test]
    fn try_new_rejects_change_id_shared_across_entries() {
        let mut second = entry("H2", 2, true, &[ChangeScope::Global]);
        second.changes[0].id = "H1-C0".into();

        let err = HistoryLog::try_new(vec![entry("H1", 1, true, &[ChangeScope::Global]), second])
            .unwrap_err();
        assert_eq!(
            err,
            LogError::DuplicateChange {
                entry: HistoryEntryId::from("H2"),
                change: "H1-C0".into(),
            }
        );
    }

    #[test]
    fn boundary_saturates_at_max_order() {
        let log = HistoryLog::new(vec![entry("H1", u64::MAX, true, &[ChangeScope::Global])]);
        assert_eq!(log.boundary(), u64::MAX);
    }

    #[test]
    fn boundary_of_lifo_log() {
        let log = HistoryLog::new(vec![
            entry("H1", 1, true, &[ChangeScope::Global]),
            entry("H2", 2, false, &[ChangeScope::Global]),
            entry("H3", 3, false, &[ChangeScope::Global]),
        ]);
        assert_eq!(log.boundary(), 2);
        assert!(log.is_lifo());
    }

    #[test]
    fn boundary_when_all_applied() {
        let log = HistoryLog::new(vec![entry("H1", 5, true, &[ChangeScope::Global])]);
        assert_eq!(log.boundary(), 6);
        assert_eq!(HistoryLog::empty().boundary(), 0);
    }

    #[test]
    fn event_undo_breaks_lifo() {
        let log = HistoryLog::new(vec![
            entry("H1", 1, false, &[event("A")]),
            entry("H2", 2, true, &[event("B")]),
        ]);
        assert!(!log.is_lifo());
    }

    #[test]
    fn event_history_keeps_only_event_changes() {
        let mut mixed = entry("H2", 2, true, &[event("A"), event("B")]);
        mixed.changes[1].active = false;
        mixed.applied = false;

        let log = HistoryLog::new(vec![
            entry("H1", 1, true, &[ChangeScope::Global]),
            mixed,
            entry("H3", 3, true, &[event("B")]),
        ]);

        let a = log.event_history(&EventId::from("A"));
        assert_eq!(a.len(), 1);
        assert_eq!(a.entries()[0].changes.len(), 1);
        // the A change of H2 is still active
        assert!(a.entries()[0].applied);

        let b = log.event_history(&EventId::from("B"));
        assert_eq!(b.len(), 2);
        assert!(!b.entries()[0].applied);
        assert!(b.entries()[1].applied);
    }

    #[test]
    fn require_reports_missing_entry() {
        let log = HistoryLog::empty();
        assert_eq!(
            log.require(&HistoryEntryId::from("H9")).unwrap_err(),
            LogError::EntryNotFound(HistoryEntryId::from("H9"))
        );
    }
}
