//! Seismic Analysis Entity Cache
//!
//! Time-windowed client cache partitions and the reconciler that folds
//! authority payloads into them.
//!
//! # Architecture
//!
//! ```text
//! DataPayload ──► reconcile() ──► PartitionSet
//!                    │               ├── events[window]            (FilterAppend)
//!                    │               ├── signal_detections[window] (FilterAppend)
//!                    │               ├── qc_masks[window]          (WindowedReplace)
//!                    │               ├── workspace_state           (replace)
//!                    └───────────────└── history                   (replace)
//! ```
//!
//! # Invariants
//!
//! - Ids are unique within every partition
//! - After reconciling, every upserted id is present exactly once in each
//!   observed partition it belongs to and every invalidated, non-upserted id
//!   is absent
//! - Reconciliation is idempotent

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod partition;
pub mod reconcile;
pub mod store;
pub mod strategy;

// Re-exports
pub use error::CacheError;
pub use partition::CachePartition;
pub use reconcile::{reconcile, KindReport, ObservedWindows, ReconcileReport};
pub use store::{CacheStats, PartitionSet, PartitionedEntity};
pub use strategy::{FilterAppend, ReconcileOutcome, ReconcileStrategy, WindowedReplace};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
