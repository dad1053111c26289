//! In-flight history action tracking
//!
//! An advisory busy counter for the history panel. Each request holds an
//! [`InFlightGuard`] for its lifetime, so the count drops back even when a
//! request fails or its future is dropped.

use dashmap::DashMap;
use seis_model::ChangeScope;
use tokio::sync::watch;

/// Busy counter, total and per scope
#[derive(Debug)]
pub struct ActionProgress {
    total: watch::Sender<usize>,
    by_scope: DashMap<ChangeScope, usize>,
}

impl Default for ActionProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionProgress {
    /// Idle counter
    #[must_use]
    pub fn new() -> Self {
        let (total, _) = watch::channel(0);
        Self {
            total,
            by_scope: DashMap::new(),
        }
    }

    /// Mark one request in flight until the guard drops
    pub fn begin(&self, scope: ChangeScope) -> InFlightGuard<'_> {
        *self.by_scope.entry(scope.clone()).or_insert(0) += 1;
        self.total.send_modify(|n| *n += 1);
        InFlightGuard {
            progress: self,
            scope,
        }
    }

    /// Requests currently in flight
    #[inline]
    #[must_use]
    pub fn in_progress(&self) -> usize {
        *self.total.borrow()
    }

    /// Whether any request for `scope` is in flight
    #[must_use]
    pub fn is_scope_busy(&self, scope: &ChangeScope) -> bool {
        self.by_scope.get(scope).is_some_and(|n| *n > 0)
    }

    /// Receiver notified whenever the count changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.total.subscribe()
    }

    fn end(&self, scope: &ChangeScope) {
        if let Some(mut n) = self.by_scope.get_mut(scope) {
            *n = n.saturating_sub(1);
        }
        self.by_scope.remove_if(scope, |_, n| *n == 0);
        self.total.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Decrements the counter on drop
#[derive(Debug)]
#[must_use = "the request counts as in flight only while the guard lives"]
pub struct InFlightGuard<'a> {
    progress: &'a ActionProgress,
    scope: ChangeScope,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.progress.end(&self.scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::EventId;

    #[test]
    fn guards_count_per_scope() {
        let progress = ActionProgress::new();
        let scope_a = ChangeScope::Event(EventId::from("A"));

        let g1 = progress.begin(ChangeScope::Global);
        let g2 = progress.begin(scope_a.clone());
        let g3 = progress.begin(scope_a.clone());
        assert_eq!(progress.in_progress(), 3);
        assert!(progress.is_scope_busy(&scope_a));

        drop(g2);
        assert!(progress.is_scope_busy(&scope_a));
        drop(g3);
        assert!(!progress.is_scope_busy(&scope_a));
        assert!(progress.is_scope_busy(&ChangeScope::Global));

        drop(g1);
        assert_eq!(progress.in_progress(), 0);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let progress = ActionProgress::new();
        let mut rx = progress.subscribe();

        let guard = progress.begin(ChangeScope::Global);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        drop(guard);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 0);
    }
}
