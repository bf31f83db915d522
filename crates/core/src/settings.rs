//! Scheduler settings and their validation bounds.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// Persisted scheduler configuration.
///
/// Bounds: the run interval must be between 1 and 12 hours and the batch
/// size between 5 and 100 submissions. Out-of-range values are rejected
/// before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SchedulerSettings {
    /// Hours between scheduled runs. Fire slots are the multiples of this
    /// interval below 24, starting at hour 0.
    #[validate(range(min = 1, max = 12))]
    pub interval_hours: u32,

    /// Maximum number of payment submissions dispatched concurrently.
    #[validate(range(min = 5, max = 100))]
    pub batch_size: u32,

    /// Whether inactive clients are included in the run.
    #[serde(default)]
    pub include_inactive: bool,

    /// Whether the recurring schedule is enabled.
    #[serde(default)]
    pub enabled: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_hours: 4,
            batch_size: 50,
            include_inactive: false,
            enabled: false,
        }
    }
}

impl SchedulerSettings {
    /// Validate the bounds, flattening validator errors into a single
    /// human-readable message.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(|errs| {
            let mut parts: Vec<String> = Vec::new();
            for (field, errors) in errs.field_errors() {
                for error in errors {
                    parts.push(match &error.message {
                        Some(msg) => format!("{field}: {msg}"),
                        None => format!("{field}: out of range"),
                    });
                }
            }
            parts.sort();
            CoreError::Validation(parts.join("; "))
        })
    }

    /// Apply a partial update, returning the merged settings.
    ///
    /// The `enabled` flag is not part of the patch — it is owned by the
    /// start/stop operations.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            interval_hours: patch.interval_hours.unwrap_or(self.interval_hours),
            batch_size: patch.batch_size.unwrap_or(self.batch_size),
            include_inactive: patch.include_inactive.unwrap_or(self.include_inactive),
            enabled: self.enabled,
        }
    }
}

/// Partial settings update as accepted by `PATCH /scheduler/settings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub interval_hours: Option<u32>,
    pub batch_size: Option<u32>,
    pub include_inactive: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(SchedulerSettings::default().check().is_ok());
    }

    #[test]
    fn interval_below_one_hour_rejected() {
        let settings = SchedulerSettings {
            interval_hours: 0,
            ..Default::default()
        };
        assert!(settings.check().is_err());
    }

    #[test]
    fn interval_above_twelve_hours_rejected() {
        let settings = SchedulerSettings {
            interval_hours: 13,
            ..Default::default()
        };
        assert!(settings.check().is_err());
    }

    #[test]
    fn batch_size_bounds() {
        for (batch_size, ok) in [(4, false), (5, true), (100, true), (101, false)] {
            let settings = SchedulerSettings {
                batch_size,
                ..Default::default()
            };
            assert_eq!(settings.check().is_ok(), ok, "batch_size {batch_size}");
        }
    }

    #[test]
    fn merge_overrides_only_provided_fields() {
        let settings = SchedulerSettings {
            interval_hours: 4,
            batch_size: 50,
            include_inactive: false,
            enabled: true,
        };
        let patch = SettingsPatch {
            batch_size: Some(75),
            ..Default::default()
        };

        let merged = settings.merged(&patch);
        assert_eq!(merged.interval_hours, 4);
        assert_eq!(merged.batch_size, 75);
        assert!(!merged.include_inactive);
        assert!(merged.enabled, "enabled flag must survive a patch");
    }

    #[test]
    fn validation_message_names_the_field() {
        let settings = SchedulerSettings {
            interval_hours: 99,
            ..Default::default()
        };
        let err = settings.check().unwrap_err();
        assert!(err.to_string().contains("interval_hours"));
    }
}
