//! Change inclusion predicates
//!
//! Every engine function takes anything implementing [`ChangePredicate`]:
//! a [`ChangeFilter`] (clonable, comparable, what an intent stores) or a
//! plain closure over `&HistoryChange`.

use seis_model::{ChangeScope, HistoryChange, HistoryChangeId, HistoryEntry};
use std::collections::BTreeSet;

/// Decides whether a change takes part in an undo or redo
pub trait ChangePredicate {
    /// Whether `change` is included
    fn is_change_included(&self, change: &HistoryChange) -> bool;
}

impl<F> ChangePredicate for F
where
    F: Fn(&HistoryChange) -> bool,
{
    fn is_change_included(&self, change: &HistoryChange) -> bool {
        self(change)
    }
}

/// Closed set of change predicates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChangeFilter {
    /// Every change
    #[default]
    All,
    /// Changes whose scope equals the given one
    Scope(ChangeScope),
    /// Changes with one of the given ids
    Changes(BTreeSet<HistoryChangeId>),
}

impl ChangeFilter {
    /// Filter used by the undo/redo buttons of a given scope
    ///
    /// Global actions include every change; event-scoped actions only the
    /// changes of that event.
    #[must_use]
    pub fn for_scope(scope: &ChangeScope) -> Self {
        match scope {
            ChangeScope::Global => Self::All,
            ChangeScope::Event(_) => Self::Scope(scope.clone()),
        }
    }

    /// Filter matching exactly the changes of `entry`
    ///
    /// Matches by change id alone; ids are unique across the log, which
    /// [`HistoryLog::try_new`](crate::HistoryLog::try_new) enforces.
    #[must_use]
    pub fn for_entry(entry: &HistoryEntry) -> Self {
        Self::Changes(entry.changes.iter().map(|c| c.id.clone()).collect())
    }
}

impl ChangePredicate for ChangeFilter {
    fn is_change_included(&self, change: &HistoryChange) -> bool {
        match self {
            Self::All => true,
            Self::Scope(scope) => &change.scope == scope,
            Self::Changes(ids) => ids.contains(&change.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::{EntityKind, EntityRef, EventId, UserActionDescription};

    fn change(id: &str, scope: ChangeScope) -> HistoryChange {
        HistoryChange::new(id, EntityRef::new(EntityKind::SignalDetection, "S1"), scope)
    }

    #[test]
    fn scope_filter_matches_event_only() {
        let a = ChangeScope::Event(EventId::from("A"));
        let filter = ChangeFilter::for_scope(&a);

        assert!(filter.is_change_included(&change("C1", a.clone())));
        assert!(!filter.is_change_included(&change("C2", ChangeScope::Global)));
        assert!(!filter.is_change_included(&change("C3", ChangeScope::Event(EventId::from("B")))));
    }

    #[test]
    fn global_scope_filter_includes_everything() {
        let filter = ChangeFilter::for_scope(&ChangeScope::Global);
        assert_eq!(filter, ChangeFilter::All);
        assert!(filter.is_change_included(&change("C1", ChangeScope::Event(EventId::from("A")))));
    }

    #[test]
    fn entry_filter_matches_by_id() {
        let entry = HistoryEntry::new(
            "H1",
            1,
            UserActionDescription::Associate,
            vec![change("C1", ChangeScope::Global)],
        );
        let filter = ChangeFilter::for_entry(&entry);
        assert!(filter.is_change_included(&change("C1", ChangeScope::Global)));
        assert!(!filter.is_change_included(&change("C2", ChangeScope::Global)));
    }

    #[test]
    fn closures_are_predicates() {
        let only_active = |c: &HistoryChange| c.active;
        assert!(only_active.is_change_included(&change("C1", ChangeScope::Global)));
        assert!(!only_active.is_change_included(&change("C1", ChangeScope::Global).with_active(false)));
    }
}
