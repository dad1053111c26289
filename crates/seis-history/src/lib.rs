//! Seismic Analysis History
//!
//! Ordered undo/redo log and the side-effect-free intent engine that
//! previews what an undo or redo would do.
//!
//! # Overview
//!
//! - **HistoryLog**: Entries sorted by order, with the applied/undone boundary
//! - **ChangeFilter**: Which changes an action includes (by scope or by id)
//! - **Intent engine**: `last_included_for_undo`, `next_ordered_redo`, counts
//!   and [`affected_entries`] for hover previews
//!
//! # Example
//!
//! ```rust,ignore
//! use seis_history::{last_included_for_undo, ChangeFilter, HistoryLog};
//! use seis_model::{ChangeScope, EventId};
//!
//! let log = HistoryLog::new(entries);
//! let scope = ChangeScope::Event(EventId::from("A"));
//! let target = last_included_for_undo(&log, &ChangeFilter::for_scope(&scope));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod filter;
pub mod intent;
pub mod log;

// Re-exports
pub use error::LogError;
pub use filter::{ChangeFilter, ChangePredicate};
pub use intent::{
    affected_entries, change_inclusion_predicate, entry_intent, is_included_for_entry,
    last_included_for_undo, next_ordered_redo, number_of_redos, number_of_undos, redo_intent,
    undo_intent, ActionIntent, AffectedEntry, Direction,
};
pub use log::HistoryLog;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for history queries
    pub use crate::{
        ActionIntent, AffectedEntry, ChangeFilter, ChangePredicate, Direction, HistoryLog,
        LogError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
