//! Reconciliation strategies
//!
//! Provides the [`ReconcileStrategy`] trait and the two strategies the
//! reconciler uses:
//! - [`FilterAppend`]: drop every affected id, then append the upserts
//! - [`WindowedReplace`]: replace in place, admitting only upserts that
//!   overlap the partition window

use crate::partition::CachePartition;
use seis_model::{CacheEntity, TimeWindowed};
use std::collections::HashSet;
use std::fmt::Debug;

/// What one strategy application did to a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Entities dropped (invalidated, superseded or moved out of window)
    pub removed: usize,
    /// Entities written
    pub upserted: usize,
}

/// Folds one kind's upserts and invalidations into a partition
///
/// Implementations must be idempotent: applying the same inputs twice
/// leaves the partition as after the first application.
pub trait ReconcileStrategy<T: CacheEntity>: Send + Sync + Debug {
    /// Apply upserts and invalidations
    fn apply(
        &self,
        partition: &mut CachePartition<T>,
        upserts: &[T],
        invalid: &HashSet<T::Id>,
    ) -> ReconcileOutcome;

    /// Strategy name (for logging)
    fn name(&self) -> &'static str;
}

/// `p = [e in p : id(e) not in ids(U) ∪ I] ++ U`
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterAppend;

impl<T: CacheEntity> ReconcileStrategy<T> for FilterAppend {
    fn apply(
        &self,
        partition: &mut CachePartition<T>,
        upserts: &[T],
        invalid: &HashSet<T::Id>,
    ) -> ReconcileOutcome {
        let mut affected: HashSet<T::Id> = invalid.clone();
        affected.extend(upserts.iter().map(|u| u.id().clone()));

        let removed = partition.remove_all(&affected);
        for item in upserts {
            partition.upsert(item.clone());
        }

        ReconcileOutcome {
            removed,
            upserted: upserts.len(),
        }
    }

    fn name(&self) -> &'static str {
        "filter-append"
    }
}

/// Window-filtered replace-in-place
///
/// Invalidated ids that are not upserted are removed. An upsert overlapping
/// the window replaces the cached entity at its position or is appended. An
/// upsert outside the window removes any cached entity with that id.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowedReplace;

impl<T: CacheEntity + TimeWindowed> ReconcileStrategy<T> for WindowedReplace {
    fn apply(
        &self,
        partition: &mut CachePartition<T>,
        upserts: &[T],
        invalid: &HashSet<T::Id>,
    ) -> ReconcileOutcome {
        let upserted_ids: HashSet<&T::Id> = upserts.iter().map(CacheEntity::id).collect();
        let dropped: HashSet<T::Id> = invalid
            .iter()
            .filter(|id| !upserted_ids.contains(id))
            .cloned()
            .collect();

        let mut outcome = ReconcileOutcome {
            removed: partition.remove_all(&dropped),
            upserted: 0,
        };

        let window = partition.window();
        for item in upserts {
            if item.overlaps(&window) {
                partition.upsert(item.clone());
                outcome.upserted += 1;
            } else if partition.remove(item.id()).is_some() {
                outcome.removed += 1;
            }
        }

        outcome
    }

    fn name(&self) -> &'static str {
        "windowed-replace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::{Event, EventId, QcMask, QcMaskId, TimeRange};

    fn event_ids(p: &CachePartition<Event>) -> Vec<String> {
        p.ids().map(ToString::to_string).collect()
    }

    #[test]
    fn filter_append_moves_updates_to_end() {
        let mut p = CachePartition::seeded(
            TimeRange::new(0.0, 10.0),
            vec![Event::new("E1", 1.0), Event::new("E2", 2.0), Event::new("E3", 3.0)],
        );
        let outcome = FilterAppend.apply(
            &mut p,
            &[Event::new("E1", 1.5)],
            &HashSet::from([EventId::from("E2")]),
        );
        assert_eq!(event_ids(&p), vec!["E3", "E1"]);
        assert_eq!(outcome, ReconcileOutcome { removed: 2, upserted: 1 });
    }

    #[test]
    fn filter_append_upsert_wins_over_invalidation() {
        let mut p = CachePartition::new(TimeRange::new(0.0, 10.0));
        FilterAppend.apply(
            &mut p,
            &[Event::new("E1", 1.0)],
            &HashSet::from([EventId::from("E1")]),
        );
        assert!(p.contains(&EventId::from("E1")));
    }

    #[test]
    fn windowed_replace_keeps_position() {
        let window = TimeRange::new(0.0, 1000.0);
        let mut p = CachePartition::seeded(
            window,
            vec![QcMask::new("Q1", "c", 10.0, 20.0), QcMask::new("Q2", "c", 30.0, 40.0)],
        );
        WindowedReplace.apply(&mut p, &[QcMask::new("Q1", "c", 50.0, 60.0)], &HashSet::new());

        let ids: Vec<String> = p.ids().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["Q1", "Q2"]);
        assert_eq!(p.get(&QcMaskId::from("Q1")).unwrap().current_version.start_time, 50.0);
    }

    #[test]
    fn windowed_replace_filters_by_overlap() {
        let mask = QcMask::new("Q1", "c", 100.0, 200.0);
        for (start, end, kept) in [
            (150.0, 180.0, true),
            (50.0, 150.0, true),
            (190.0, 250.0, true),
            (0.0, 90.0, false),
            (210.0, 300.0, false),
        ] {
            let mut p = CachePartition::new(TimeRange::new(start, end));
            WindowedReplace.apply(&mut p, &[mask.clone()], &HashSet::new());
            assert_eq!(p.contains(&QcMaskId::from("Q1")), kept, "window [{start}, {end}]");
        }
    }

    #[test]
    fn windowed_replace_drops_mask_moved_out_of_window() {
        let mut p = CachePartition::seeded(
            TimeRange::new(0.0, 100.0),
            vec![QcMask::new("Q1", "c", 10.0, 20.0)],
        );
        let outcome =
            WindowedReplace.apply(&mut p, &[QcMask::new("Q1", "c", 500.0, 600.0)], &HashSet::new());
        assert!(p.is_empty());
        assert_eq!(outcome.removed, 1);
    }
}
