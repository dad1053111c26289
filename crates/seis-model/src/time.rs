//! Time windows
//!
//! Provides [`TimeRange`] (epoch seconds, inclusive on both ends) and
//! [`WindowKey`], its hashable form used to key cache partitions.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Time range in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    /// Inclusive start
    pub start_time: f64,
    /// Inclusive end
    pub end_time: f64,
}

impl TimeRange {
    /// Create a new range
    #[inline]
    #[must_use]
    pub const fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Width of the range in seconds
    #[inline]
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Check that start precedes end and both are finite
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start_time.is_finite() && self.end_time.is_finite() && self.start_time <= self.end_time
    }

    /// Check whether `[start, end]` intersects this range
    ///
    /// Touching endpoints count as overlap.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        end >= self.start_time && start <= self.end_time
    }

    /// Check whether an instant lies inside the range
    #[inline]
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// Widen the range by `before` seconds at the start and `after` at the end
    #[inline]
    #[must_use]
    pub fn expand(&self, before: f64, after: f64) -> Self {
        Self::new(self.start_time - before, self.end_time + after)
    }

    /// Hashable key for this exact range
    #[inline]
    #[must_use]
    pub fn key(&self) -> WindowKey {
        WindowKey::from(*self)
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start_time, self.end_time)
    }
}

/// Bit-exact, hashable form of a [`TimeRange`]
///
/// Two windows are the same partition key only when both bounds are
/// bit-identical, which is how query variables are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowKey {
    start_bits: u64,
    end_bits: u64,
}

impl WindowKey {
    /// Recover the range this key was built from
    #[inline]
    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange::new(f64::from_bits(self.start_bits), f64::from_bits(self.end_bits))
    }
}

impl From<TimeRange> for WindowKey {
    fn from(range: TimeRange) -> Self {
        // normalise -0.0 so it keys the same partition as 0.0
        let norm = |v: f64| if v == 0.0 { 0.0_f64 } else { v };
        Self {
            start_bits: norm(range.start_time).to_bits(),
            end_bits: norm(range.end_time).to_bits(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn overlap_is_inclusive() {
        let window = TimeRange::new(150.0, 180.0);
        assert!(window.overlaps(100.0, 200.0));
        assert!(window.overlaps(180.0, 181.0));
        assert!(window.overlaps(149.0, 150.0));
        assert!(!window.overlaps(181.0, 190.0));
    }

    #[test]
    fn expand_widens_both_ends() {
        let range = TimeRange::new(1000.0, 2000.0).expand(2700.0, 900.0);
        assert_eq!(range, TimeRange::new(-1700.0, 2900.0));
        assert_eq!(range.duration(), 4600.0);
    }

    #[test]
    fn window_key_roundtrip() {
        let range = TimeRange::new(12.5, 99.25);
        assert_eq!(range.key().range(), range);
    }

    #[test]
    fn window_keys_hash_by_value() {
        let mut keys = HashSet::new();
        keys.insert(TimeRange::new(0.0, 10.0).key());
        keys.insert(TimeRange::new(-0.0, 10.0).key());
        keys.insert(TimeRange::new(0.0, 11.0).key());
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn validity() {
        assert!(TimeRange::new(1.0, 2.0).is_valid());
        assert!(!TimeRange::new(2.0, 1.0).is_valid());
        assert!(!TimeRange::new(f64::NAN, 1.0).is_valid());
    }
}
