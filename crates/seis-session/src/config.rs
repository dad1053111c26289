//! Session configuration
//!
//! Window derivation per analyst activity. Each entity kind is queried over
//! the current interval widened by activity-specific offsets:
//!
//! | kind               | window                               |
//! |--------------------|--------------------------------------|
//! | QC masks (default) | `[start - data, end + data]`         |
//! | events             | `[start - event_data, end + data]`   |
//! | signal detections  | `[start - data, end + event_data]`   |

use seis_model::{EntityKind, TimeRange};
use serde::{Deserialize, Serialize};

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What the analyst is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalystActivity {
    /// Refining events in an interval
    #[default]
    EventRefinement,
    /// Global scan
    GlobalScan,
    /// Regional scan
    RegionalScan,
}

/// Extra data loaded around the interval, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityOffsets {
    /// Padding applied to both ends by default
    pub additional_data_to_load: f64,
    /// Wider padding for event-related lookback/lookahead
    pub additional_event_data_to_load: f64,
}

impl Default for ActivityOffsets {
    fn default() -> Self {
        Self {
            additional_data_to_load: 900.0,
            additional_event_data_to_load: 2700.0,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Offsets while refining events
    pub event_refinement: ActivityOffsets,
    /// Offsets during a global scan
    pub global_scan: ActivityOffsets,
    /// Offsets during a regional scan
    pub regional_scan: ActivityOffsets,
    /// Largest quantity accepted by quantity undo/redo
    pub max_quantity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_refinement: ActivityOffsets::default(),
            global_scan: ActivityOffsets::default(),
            regional_scan: ActivityOffsets::default(),
            max_quantity: 100,
        }
    }
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// With offsets for one activity
    #[inline]
    #[must_use]
    pub fn with_offsets(mut self, activity: AnalystActivity, offsets: ActivityOffsets) -> Self {
        match activity {
            AnalystActivity::EventRefinement => self.event_refinement = offsets,
            AnalystActivity::GlobalScan => self.global_scan = offsets,
            AnalystActivity::RegionalScan => self.regional_scan = offsets,
        }
        self
    }

    /// With max quantity
    #[inline]
    #[must_use]
    pub fn with_max_quantity(mut self, max: usize) -> Self {
        self.max_quantity = max;
        self
    }

    /// Reject negative or non-finite offsets and a zero max quantity
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_quantity == 0 {
            return Err(ConfigError::Invalid("maxQuantity must be at least 1".to_string()));
        }
        for (name, offsets) in [
            ("eventRefinement", &self.event_refinement),
            ("globalScan", &self.global_scan),
            ("regionalScan", &self.regional_scan),
        ] {
            for value in [
                offsets.additional_data_to_load,
                offsets.additional_event_data_to_load,
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{name}: offsets must be finite and non-negative, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Offsets for `activity`
    #[inline]
    #[must_use]
    pub fn offsets(&self, activity: AnalystActivity) -> ActivityOffsets {
        match activity {
            AnalystActivity::EventRefinement => self.event_refinement,
            AnalystActivity::GlobalScan => self.global_scan,
            AnalystActivity::RegionalScan => self.regional_scan,
        }
    }

    /// Default window (QC masks and anything without a specific rule)
    #[must_use]
    pub fn default_window(&self, interval: TimeRange, activity: AnalystActivity) -> TimeRange {
        let o = self.offsets(activity);
        interval.expand(o.additional_data_to_load, o.additional_data_to_load)
    }

    /// Events window
    #[must_use]
    pub fn event_window(&self, interval: TimeRange, activity: AnalystActivity) -> TimeRange {
        let o = self.offsets(activity);
        interval.expand(o.additional_event_data_to_load, o.additional_data_to_load)
    }

    /// Signal detections window
    #[must_use]
    pub fn signal_detection_window(&self, interval: TimeRange, activity: AnalystActivity) -> TimeRange {
        let o = self.offsets(activity);
        interval.expand(o.additional_data_to_load, o.additional_event_data_to_load)
    }

    /// Window of `kind`
    #[must_use]
    pub fn window_for(&self, kind: EntityKind, interval: TimeRange, activity: AnalystActivity) -> TimeRange {
        match kind {
            EntityKind::Event => self.event_window(interval, activity),
            EntityKind::SignalDetection => self.signal_detection_window(interval, activity),
            EntityKind::QcMask => self.default_window(interval, activity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: TimeRange = TimeRange::new(10_000.0, 12_000.0);

    #[test]
    fn windows_per_kind() {
        let config = SessionConfig::new();
        let activity = AnalystActivity::EventRefinement;

        assert_eq!(
            config.window_for(EntityKind::QcMask, INTERVAL, activity),
            TimeRange::new(9_100.0, 12_900.0)
        );
        assert_eq!(
            config.window_for(EntityKind::Event, INTERVAL, activity),
            TimeRange::new(7_300.0, 12_900.0)
        );
        assert_eq!(
            config.window_for(EntityKind::SignalDetection, INTERVAL, activity),
            TimeRange::new(9_100.0, 14_700.0)
        );
    }

    #[test]
    fn activity_specific_offsets() {
        let config = SessionConfig::new().with_offsets(
            AnalystActivity::GlobalScan,
            ActivityOffsets {
                additional_data_to_load: 0.0,
                additional_event_data_to_load: 60.0,
            },
        );
        assert_eq!(
            config.event_window(INTERVAL, AnalystActivity::GlobalScan),
            TimeRange::new(9_940.0, 12_000.0)
        );
        assert_eq!(
            config.event_window(INTERVAL, AnalystActivity::EventRefinement),
            TimeRange::new(7_300.0, 12_900.0)
        );
    }

    #[test]
    fn parse_toml_with_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            maxQuantity = 5

            [regionalScan]
            additionalDataToLoad = 300.0
            "#,
        )
        .unwrap();

        assert_eq!(config.max_quantity, 5);
        assert_eq!(config.regional_scan.additional_data_to_load, 300.0);
        assert_eq!(config.regional_scan.additional_event_data_to_load, 2700.0);
        assert_eq!(config.event_refinement, ActivityOffsets::default());
    }

    #[test]
    fn rejects_invalid_values() {
        let err = SessionConfig::from_toml_str("maxQuantity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SessionConfig::from_toml_str("[globalScan]\nadditionalDataToLoad = -1.0").unwrap_err();
        assert!(err.to_string().contains("globalScan"));

        let err = SessionConfig::from_toml_str("maxQuantity = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
