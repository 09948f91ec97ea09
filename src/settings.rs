use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const MIN_TIME_LIMIT_HOURS: i64 = 1;
pub const MAX_TIME_LIMIT_HOURS: i64 = 168;
pub const DEFAULT_TIME_LIMIT_HOURS: i64 = 24;

/// User preferences, persisted as a single record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Hours a new or re-added task stays active.
    pub default_time_limit: i64,
    /// Show the time left on active tasks.
    pub show_time_remaining: bool,
    /// Show when completed tasks were completed.
    pub show_time_completed: bool,
    /// Show when expired tasks expired.
    pub show_time_expired: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_time_limit: DEFAULT_TIME_LIMIT_HOURS,
            show_time_remaining: true,
            show_time_completed: true,
            show_time_expired: true,
        }
    }
}

impl Settings {
    /// The expiration window as a duration, clamped to the allowed range.
    pub fn window(&self) -> Duration {
        Duration::hours(clamp_time_limit(self.default_time_limit))
    }

    /// Returns a copy with the time limit pulled into range.
    pub fn normalized(mut self) -> Settings {
        self.default_time_limit = clamp_time_limit(self.default_time_limit);
        self
    }
}

/// Pulls an hour count into `1..=168`.
pub fn clamp_time_limit(hours: i64) -> i64 {
    hours.clamp(MIN_TIME_LIMIT_HOURS, MAX_TIME_LIMIT_HOURS)
}
