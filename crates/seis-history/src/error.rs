//! History log errors

use seis_model::{HistoryChangeId, HistoryEntryId};
use thiserror::Error;

/// Errors raised while validating or querying a history log
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// Entry carries no changes
    #[error("history entry has no changes: {0}")]
    EmptyEntry(HistoryEntryId),

    /// Two entries share an order
    #[error("duplicate history order: {0}")]
    DuplicateOrder(u64),

    /// Two entries share an id
    #[error("duplicate history entry: {0}")]
    DuplicateEntry(HistoryEntryId),

    /// Two changes in the log share an id
    #[error("duplicate change {change} in entry {entry}")]
    DuplicateChange {
        /// Owning entry
        entry: HistoryEntryId,
        /// Repeated change id
        change: HistoryChangeId,
    },

    /// Lookup of an entry that is not in the log
    #[error("history entry not found: {0}")]
    EntryNotFound(HistoryEntryId),
}

impl LogError {
    /// Whether the error describes a malformed log rather than a bad lookup
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::EntryNotFound(_))
    }
}
