//! Mutation authority interface
//!
//! The authority owns the history log and serializes every mutation. The
//! session only talks to it through [`HistoryAuthority`]; transport is the
//! implementor's business.

mod memory;

pub use memory::{EntitySnapshot, InMemoryAuthority, Mutation};

use seis_history::Direction;
use seis_model::{
    ChangeScope, DataPayload, EntityCollection, EntityKind, HistoryEntry, HistoryEntryId, TimeRange,
};
use std::fmt::{self, Display, Formatter};

/// What an undo/redo request aims at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryTarget {
    /// The next `n` entries from the boundary
    Quantity(usize),
    /// Every entry from the boundary through this one
    ById(HistoryEntryId),
}

/// One undo/redo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Undo or redo
    pub direction: Direction,
    /// Quantity or id
    pub target: HistoryTarget,
    /// Global or narrowed to one event
    pub scope: ChangeScope,
}

impl HistoryRequest {
    /// Create a request
    #[inline]
    #[must_use]
    pub fn new(direction: Direction, target: HistoryTarget, scope: ChangeScope) -> Self {
        Self {
            direction,
            target,
            scope,
        }
    }

    /// Global undo of `quantity` entries
    #[inline]
    #[must_use]
    pub fn undo(quantity: usize) -> Self {
        Self::new(Direction::Undo, HistoryTarget::Quantity(quantity), ChangeScope::Global)
    }

    /// Global redo of `quantity` entries
    #[inline]
    #[must_use]
    pub fn redo(quantity: usize) -> Self {
        Self::new(Direction::Redo, HistoryTarget::Quantity(quantity), ChangeScope::Global)
    }

    /// Builder: narrow the request to a scope
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: ChangeScope) -> Self {
        self.scope = scope;
        self
    }
}

impl Display for HistoryRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.target {
            HistoryTarget::Quantity(n) => write!(f, "{} x{} ({})", self.direction, n, self.scope),
            HistoryTarget::ById(id) => write!(f, "{} through {} ({})", self.direction, id, self.scope),
        }
    }
}

/// Errors returned by the authority
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    /// Request was based on a log the authority no longer has
    #[error("stale history: {0}")]
    StaleHistory(String),

    /// Target entry does not exist
    #[error("history entry not found: {0}")]
    EntryNotFound(HistoryEntryId),

    /// Concurrent edit conflict
    #[error("conflict: {0}")]
    Conflict(String),

    /// Request refused
    #[error("rejected: {0}")]
    Rejected(String),

    /// Transport failed
    #[error("transport error: {0}")]
    Transport(String),
}

impl AuthorityError {
    /// Check if the same request might succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if the client's view of the log is out of date
    #[inline]
    #[must_use]
    pub fn requires_refresh(&self) -> bool {
        matches!(self, Self::StaleHistory(_) | Self::EntryNotFound(_) | Self::Conflict(_))
    }
}

/// The service that owns and serializes the history log
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryAuthority: Send + Sync {
    /// Apply an undo/redo request and return the resulting payload
    async fn apply_history(&self, request: &HistoryRequest) -> Result<DataPayload, AuthorityError>;

    /// Live history log
    async fn history(&self) -> Result<Vec<HistoryEntry>, AuthorityError>;

    /// Authoritative collection of `kind` within `window`
    async fn query(&self, kind: EntityKind, window: TimeRange) -> Result<EntityCollection, AuthorityError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use seis_model::EventId;

    #[test]
    fn request_display() {
        let request = HistoryRequest::undo(2).with_scope(ChangeScope::Event(EventId::from("A")));
        assert_eq!(request.to_string(), "undo x2 (event:A)");

        let request = HistoryRequest::new(
            Direction::Redo,
            HistoryTarget::ById(HistoryEntryId::from("H3")),
            ChangeScope::Global,
        );
        assert_eq!(request.to_string(), "redo through H3 (global)");
    }

    #[test]
    fn error_classification() {
        assert!(AuthorityError::Transport("reset".into()).is_retryable());
        assert!(!AuthorityError::Conflict("x".into()).is_retryable());
        assert!(AuthorityError::StaleHistory("x".into()).requires_refresh());
    }
}
