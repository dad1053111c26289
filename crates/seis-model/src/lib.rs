//! Seismic Analysis Data Model
//!
//! Shared, read-only data types exchanged between the analyst client and the
//! mutation authority.
//!
//! # Core Concepts
//!
//! - [`TimeRange`]: Epoch-seconds window used to key cached collections
//! - [`Event`], [`SignalDetection`], [`QcMask`]: Cached domain entities
//! - [`HistoryEntry`] / [`HistoryChange`]: Records of the undo/redo log
//! - [`DataPayload`]: Authoritative result of every mutation
//!
//! # Example
//!
//! ```rust,ignore
//! use seis_model::{DataPayload, Event, EventId};
//!
//! let payload = DataPayload::new()
//!     .with_events(vec![Event::new("E9", 1_200.0)])
//!     .with_invalid_event_ids(vec![EventId::from("E4")]);
//!
//! assert!(payload.invalid.event_ids.contains(&EventId::from("E4")));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod entity;
mod history;
mod ids;
mod payload;
mod time;

// Re-exports
pub use entity::{
    CacheEntity, EntityKind, Event, EventStatus, EventToUsers, QcMask, QcMaskVersion,
    SignalDetection, TimeWindowed, WorkspaceState,
};
pub use history::{ChangeScope, EntityRef, HistoryChange, HistoryEntry, UserActionDescription};
pub use ids::{EventId, HistoryChangeId, HistoryEntryId, QcMaskId, SignalDetectionId};
pub use payload::{DataPayload, EntityCollection, InvalidData};
pub use time::{TimeRange, WindowKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn payload_wire_format_roundtrip_keeps_scopes() {
        let json = r#"{
            "events": [{ "id": "E9", "status": "OpenForRefinement", "originTime": 1200.0 }],
            "invalid": { "eventIds": ["E4"] },
            "history": [{
                "id": "H1",
                "order": 1,
                "description": "CREATE_EVENT",
                "applied": true,
                "changes": [
                    { "id": "C1", "entity": { "kind": "Event", "id": "E9" }, "scope": { "kind": "Event", "eventId": "E9" } },
                    { "id": "C2", "entity": { "kind": "SignalDetection", "id": "S1" } }
                ]
            }]
        }"#;

        let payload: DataPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.events.len(), 1);
        assert_eq!(payload.invalid.event_ids, vec![EventId::from("E4")]);

        let history = payload.history.as_ref().unwrap();
        let changes = &history[0].changes;
        assert_eq!(changes[0].scope, ChangeScope::Event(EventId::from("E9")));
        // missing scope falls back to global
        assert_eq!(changes[1].scope, ChangeScope::Global);
        assert!(changes[1].active);
    }

    #[test]
    fn qc_mask_overlap_uses_current_version() {
        let mask = QcMask::new("Q1", "ASAR.AS01.SHZ", 100.0, 200.0);
        assert!(mask.overlaps(&TimeRange::new(150.0, 180.0)));
        assert!(!mask.overlaps(&TimeRange::new(210.0, 300.0)));
    }
}
