//! Seismic Analysis History Session
//!
//! The session-wide controller that issues scoped undo/redo requests to the
//! mutation authority and keeps the cached partitions consistent with its
//! responses.
//!
//! # Overview
//!
//! - **HistorySession**: undo/redo entry points, view context, intent slot
//! - **HistoryAuthority**: the external service that owns the log
//! - **InMemoryAuthority**: single-process authority for tests and simulation
//! - **SessionConfig**: per-activity window offsets and request limits
//!
//! # Example
//!
//! ```rust,ignore
//! use seis_session::{HistorySession, InMemoryAuthority, SessionConfig};
//! use seis_model::{EntityKind, TimeRange};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authority = Arc::new(InMemoryAuthority::new());
//! let session = HistorySession::new(authority, SessionConfig::new(), TimeRange::new(0.0, 3600.0));
//!
//! session.observe(EntityKind::Event).await?;
//! session.refresh_history().await?;
//! let report = session.undo(1).await?;
//! println!("{} entities updated", report.total_upserted());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod authority;
pub mod config;
pub mod controller;
pub mod error;
pub mod progress;

// Re-exports
pub use authority::{
    AuthorityError, EntitySnapshot, HistoryAuthority, HistoryRequest, HistoryTarget,
    InMemoryAuthority, Mutation,
};
pub use config::{ActivityOffsets, AnalystActivity, ConfigError, SessionConfig};
pub use controller::{HistorySession, ViewContext};
pub use error::SessionError;
pub use progress::{ActionProgress, InFlightGuard};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a history session
    pub use crate::{
        AnalystActivity, HistoryAuthority, HistorySession, InMemoryAuthority, Mutation,
        SessionConfig, SessionError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
