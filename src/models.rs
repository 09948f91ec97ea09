use std::fmt;

use chrono::{DateTime, Duration, Local, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hours a completed recurring task waits before it is reopened.
pub const RECURRENCE_COOLDOWN_HOURS: i64 = 24;

/// Number of id characters shown in listings.
pub const SHORT_ID_LEN: usize = 8;

/// Formats an instant in the local time zone for display.
pub fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Drops sub-millisecond precision so in-memory instants match what is stored.
pub(crate) fn to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Represents a single task in the list.
///
/// Instants are stored as milliseconds since the Unix epoch so the JSON blob
/// stays compatible with the browser build of the app.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: String,
    /// The text of the task, always trimmed and non-empty.
    pub title: String,
    /// Whether the task has been completed.
    #[serde(default)]
    pub completed: bool,
    /// When the task was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When the task stops being active unless completed first.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    /// When the task was completed. Present iff `completed` is true.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    /// Recurring tasks reopen a fixed cooldown after completion.
    #[serde(default)]
    pub is_recurring: bool,
    /// Position among the active tasks, set by reordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// The status a task displays as. Never stored, always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Active,
    Completed,
    Expired,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Active, TaskStatus::Completed, TaskStatus::Expired];

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Active => "Active",
            TaskStatus::Completed => "Completed",
            TaskStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Task {
    /// Creates a fresh active task expiring `window` after `now`.
    ///
    /// The title is stored as given; callers trim and validate it.
    pub fn new(title: String, now: DateTime<Utc>, window: Duration) -> Task {
        let now = to_millis(now);
        Task {
            id: Uuid::new_v4().to_string(),
            title,
            completed: false,
            created_at: now,
            expires_at: now + window,
            completed_at: None,
            is_recurring: false,
            order: None,
        }
    }

    /// Derives the status of the task at `now`.
    ///
    /// This is the only place status is computed; partitioning, rendering
    /// and bucketing all go through it.
    pub fn status(&self, now: DateTime<Utc>) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else if self.expires_at > now {
            TaskStatus::Active
        } else {
            TaskStatus::Expired
        }
    }

    /// Whether a recurring, completed task has sat out its cooldown.
    pub fn recurrence_due(&self, now: DateTime<Utc>) -> bool {
        match (self.is_recurring, self.completed, self.completed_at) {
            (true, true, Some(done)) => now - done >= Duration::hours(RECURRENCE_COOLDOWN_HOURS),
            _ => false,
        }
    }

    /// Marks the task completed at `now`.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(to_millis(now));
    }

    /// Clears completion and gives the task a fresh deadline.
    pub fn reopen(&mut self, now: DateTime<Utc>, window: Duration) {
        self.completed = false;
        self.completed_at = None;
        self.expires_at = to_millis(now) + window;
    }

    /// Leading characters of the id, enough to address a task by prefix.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(SHORT_ID_LEN)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// Human readable time left, e.g. `"3h 12m left"` or `"45m left"`.
    ///
    /// Returns `None` unless the task is active at `now`.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<String> {
        if self.status(now) != TaskStatus::Active {
            return None;
        }
        let left = self.expires_at - now;
        let hours = left.num_hours();
        let minutes = left.num_minutes() % 60;
        if hours > 0 {
            Some(format!("{}h {}m left", hours, minutes))
        } else {
            Some(format!("{}m left", minutes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    #[test]
    fn status_flips_only_at_expiry() {
        let t = Task::new("x".into(), at(8), Duration::hours(2));
        assert_eq!(t.status(at(9)), TaskStatus::Active);
        assert_eq!(t.status(t.expires_at - Duration::milliseconds(1)), TaskStatus::Active);
        assert_eq!(t.status(t.expires_at), TaskStatus::Expired);
        assert_eq!(t.status(at(20)), TaskStatus::Expired);
    }

    #[test]
    fn completed_wins_over_expiry() {
        let mut t = Task::new("x".into(), at(8), Duration::hours(1));
        t.mark_completed(at(8));
        assert_eq!(t.status(at(23)), TaskStatus::Completed);
    }

    #[test]
    fn serializes_camel_case_millis() {
        let mut t = Task::new("x".into(), at(8), Duration::hours(1));
        t.id = "abc".into();
        let v: serde_json::Value = serde_json::to_value(&t).unwrap();
        assert_eq!(v["createdAt"], serde_json::json!(at(8).timestamp_millis()));
        assert_eq!(v["isRecurring"], serde_json::json!(false));
        assert!(v.get("completedAt").is_none());
        assert!(v.get("order").is_none());
    }

    #[test]
    fn sub_millisecond_instants_survive_json() {
        let now = at(8) + Duration::nanoseconds(932_476_761);
        let mut t = Task::new("x".into(), now, Duration::hours(24));
        t.mark_completed(now + Duration::nanoseconds(1_500));
        let back: Task = serde_json::from_str(&serde_json::to_string(&t).unwrap()).unwrap();
        assert_eq!(back, t);
        assert_eq!(t.created_at, at(8) + Duration::milliseconds(932));
    }

    #[test]
    fn loads_browser_record_with_extra_fields() {
        let raw = r#"{"id":"a1","title":"Water plants","completed":true,
            "createdAt":1700000000000,"expiresAt":1700086400000,
            "completedAt":1700000500000,"isRecurring":true,"repeatInterval":86400000}"#;
        let t: Task = serde_json::from_str(raw).unwrap();
        assert!(t.completed);
        assert_eq!(t.completed_at.map(|d| d.timestamp_millis()), Some(1_700_000_500_000));
        assert_eq!(t.order, None);
    }

    #[test]
    fn time_remaining_format() {
        let t = Task::new("x".into(), at(8), Duration::hours(2) + Duration::minutes(5));
        assert_eq!(t.time_remaining(at(8)).as_deref(), Some("2h 5m left"));
        assert_eq!(t.time_remaining(at(9) + Duration::minutes(30)).as_deref(), Some("35m left"));
        assert_eq!(t.time_remaining(at(11)), None);
    }

    #[test]
    fn short_id_is_prefix() {
        let t = Task::new("x".into(), at(8), Duration::hours(1));
        assert_eq!(t.short_id().len(), SHORT_ID_LEN);
        assert!(t.id.starts_with(t.short_id()));
    }
}
