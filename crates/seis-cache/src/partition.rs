//! Single cache partition
//!
//! A [`CachePartition`] is one time-windowed slice of an entity collection.
//! Ids are unique by construction (the store is an [`IndexMap`]) and
//! insertion order is preserved so views see a stable ordering.

use indexmap::IndexMap;
use seis_model::{CacheEntity, TimeRange};
use std::collections::HashSet;

/// Entities of one kind cached for one time window
#[derive(Debug, Clone)]
pub struct CachePartition<T: CacheEntity> {
    window: TimeRange,
    items: IndexMap<T::Id, T>,
}

impl<T: CacheEntity> CachePartition<T> {
    /// Empty partition for `window`
    #[inline]
    #[must_use]
    pub fn new(window: TimeRange) -> Self {
        Self {
            window,
            items: IndexMap::new(),
        }
    }

    /// Partition seeded from an authoritative query result
    ///
    /// A repeated id keeps its first position and its last value.
    #[must_use]
    pub fn seeded(window: TimeRange, items: impl IntoIterator<Item = T>) -> Self {
        let mut partition = Self::new(window);
        for item in items {
            partition.upsert(item);
        }
        partition
    }

    /// Window this partition is keyed by
    #[inline]
    #[must_use]
    pub fn window(&self) -> TimeRange {
        self.window
    }

    /// Number of cached entities
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the partition is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an entity
    #[inline]
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.get(id)
    }

    /// Whether an entity is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &T::Id) -> bool {
        self.items.contains_key(id)
    }

    /// Entities in partition order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Ids in partition order
    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.items.keys()
    }

    /// Clone the entities out in partition order
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }

    /// Replace an entity in place, or append it when absent
    pub fn upsert(&mut self, item: T) {
        self.items.insert(item.id().clone(), item);
    }

    /// Remove an entity, keeping the order of the rest
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.items.shift_remove(id)
    }

    /// Remove every entity whose id is in `ids`; returns how many were removed
    pub fn remove_all(&mut self, ids: &HashSet<T::Id>) -> usize {
        let before = self.items.len();
        self.items.retain(|id, _| !ids.contains(id));
        before - self.items.len()
    }
}

impl<T: CacheEntity> PartialEq for CachePartition<T> {
    fn eq(&self, other: &Self) -> bool {
        // order-sensitive, unlike IndexMap's own equality
        self.window == other.window && self.items.iter().eq(other.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::{Event, EventId};

    fn ids(p: &CachePartition<Event>) -> Vec<&str> {
        p.ids().map(EventId::as_str).collect()
    }

    #[test]
    fn seeding_dedupes_ids() {
        let p = CachePartition::seeded(
            TimeRange::new(0.0, 10.0),
            vec![Event::new("E1", 1.0), Event::new("E2", 2.0), Event::new("E1", 3.0)],
        );
        assert_eq!(ids(&p), vec!["E1", "E2"]);
        assert_eq!(p.get(&EventId::from("E1")).unwrap().origin_time, 3.0);
    }

    #[test]
    fn remove_all_keeps_order() {
        let mut p = CachePartition::seeded(
            TimeRange::new(0.0, 10.0),
            vec![Event::new("E1", 1.0), Event::new("E2", 2.0), Event::new("E3", 3.0)],
        );
        let removed = p.remove_all(&HashSet::from([EventId::from("E2"), EventId::from("E9")]));
        assert_eq!(removed, 1);
        assert_eq!(ids(&p), vec!["E1", "E3"]);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let w = TimeRange::new(0.0, 10.0);
        let a = CachePartition::seeded(w, vec![Event::new("E1", 1.0), Event::new("E2", 2.0)]);
        let b = CachePartition::seeded(w, vec![Event::new("E2", 2.0), Event::new("E1", 1.0)]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
