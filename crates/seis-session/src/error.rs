//! Error types for the history session
//!
//! Covers:
//! - Requests refused before reaching the authority
//! - Authority rejections (stale log, conflict, transport)
//! - Cache seeding and release failures
//! - History lookups against the cached log

use crate::authority::AuthorityError;
use seis_cache::CacheError;
use seis_history::LogError;

/// Main session error type
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Quantity outside `1..=max_quantity`
    #[error("invalid quantity {quantity}: must be between 1 and {max}")]
    InvalidQuantity {
        /// Requested quantity
        quantity: usize,
        /// Configured upper bound
        max: usize,
    },

    /// Event-scoped action with no event open
    #[error("no event is open for refinement")]
    NoOpenEvent,

    /// History partition has not been loaded yet
    #[error("history log not loaded")]
    HistoryNotLoaded,

    /// Authority refused or failed the request
    #[error("authority error: {0}")]
    Authority(#[from] AuthorityError),

    /// Cache operation failed
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Cached history lookup failed
    #[error("history error: {0}")]
    History(#[from] LogError),
}

impl SessionError {
    /// Check if retrying the same call might succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Authority(e) if e.is_retryable())
    }

    /// Check if the cached history should be refreshed before retrying
    #[inline]
    #[must_use]
    pub fn requires_refresh(&self) -> bool {
        match self {
            Self::Authority(e) => e.requires_refresh(),
            Self::HistoryNotLoaded | Self::History(_) => true,
            _ => false,
        }
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let err = SessionError::from(AuthorityError::Transport("reset".into()));
        assert!(err.is_retryable());
        assert!(!err.requires_refresh());

        let err = SessionError::from(AuthorityError::StaleHistory("order 4".into()));
        assert!(!err.is_retryable());
        assert!(err.requires_refresh());

        assert!(!SessionError::NoOpenEvent.requires_refresh());
    }

    #[test]
    fn messages() {
        let err = SessionError::InvalidQuantity { quantity: 0, max: 100 };
        assert_eq!(err.to_string(), "invalid quantity 0: must be between 1 and 100");
    }
}
