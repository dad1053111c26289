//! Cache errors

use seis_model::{EntityKind, TimeRange};

/// Errors raised by partition management
///
/// Reconciliation itself never fails; these cover seeding and releasing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// Seed collection does not match the requested kind
    #[error("collection kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        /// Requested kind
        expected: EntityKind,
        /// Kind of the supplied collection
        actual: EntityKind,
    },

    /// Window is inverted or not finite
    #[error("invalid time window: {0}")]
    InvalidWindow(TimeRange),

    /// No partition for this kind and window
    #[error("partition not found: {kind} {window}")]
    PartitionNotFound {
        /// Entity kind
        kind: EntityKind,
        /// Window key
        window: TimeRange,
    },
}

impl CacheError {
    /// Whether the error came from caller input rather than cache state
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::KindMismatch { .. } | Self::InvalidWindow(_))
    }
}
