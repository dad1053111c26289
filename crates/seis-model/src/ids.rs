//! Strongly-typed identifiers
//!
//! Every id is an opaque string owned by the authority. The client only
//! compares them; [`HistoryEntryId::generate`] and
//! [`HistoryChangeId::generate`] exist for authorities that mint new records.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use ulid::Ulid;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Unwrap into the raw id
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a seismic event
    EventId
);

string_id!(
    /// Identifier of a signal detection
    SignalDetectionId
);

string_id!(
    /// Identifier of a QC mask
    QcMaskId
);

string_id!(
    /// Identifier of one entry of the history log
    HistoryEntryId
);

string_id!(
    /// Identifier of one change inside a history entry
    HistoryChangeId
);

impl HistoryEntryId {
    /// Mint a new, lexicographically sortable entry id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }
}

impl HistoryChangeId {
    /// Mint a new random change id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(EventId::from("E1"), EventId::new("E1".to_string()));
        assert_ne!(EventId::from("E1"), EventId::from("E2"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&QcMaskId::from("Q7")).unwrap();
        assert_eq!(json, "\"Q7\"");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(HistoryEntryId::generate(), HistoryEntryId::generate());
        assert_ne!(HistoryChangeId::generate(), HistoryChangeId::generate());
    }

    #[test]
    fn display_is_raw_id() {
        assert_eq!(SignalDetectionId::from("S3").to_string(), "S3");
    }
}
