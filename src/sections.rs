use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveTime, Offset, TimeZone, Utc};

use crate::models::{Task, TaskStatus};

/// Relative-time groupings used for the completed and expired views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeSection {
    Today,
    ThisWeek,
    LastWeek,
    Last30Days,
    LastYear,
    All,
}

impl TimeSection {
    /// All sections in display order.
    pub const ORDERED: [TimeSection; 6] = [
        TimeSection::Today,
        TimeSection::ThisWeek,
        TimeSection::LastWeek,
        TimeSection::Last30Days,
        TimeSection::LastYear,
        TimeSection::All,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeSection::Today => "Today",
            TimeSection::ThisWeek => "This Week",
            TimeSection::LastWeek => "Last Week",
            TimeSection::Last30Days => "Last 30 Days",
            TimeSection::LastYear => "Last Year",
            TimeSection::All => "All",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for TimeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which timestamp of a task decides its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionField {
    CompletedAt,
    ExpiresAt,
}

impl SectionField {
    /// The field grouped on for a given tab. Active tasks are not grouped.
    pub fn for_status(status: TaskStatus) -> Option<SectionField> {
        match status {
            TaskStatus::Active => None,
            TaskStatus::Completed => Some(SectionField::CompletedAt),
            TaskStatus::Expired => Some(SectionField::ExpiresAt),
        }
    }

    fn read(&self, task: &Task) -> Option<DateTime<Utc>> {
        match self {
            SectionField::CompletedAt => task.completed_at,
            SectionField::ExpiresAt => Some(task.expires_at),
        }
    }
}

/// Local midnight at the start of the day containing `now`.
fn start_of_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = now.with_timezone(tz);
    let midnight = local.date_naive().and_time(NaiveTime::MIN);
    // When midnight falls in a DST gap the day starts at the first local
    // minute that exists, which is the transition itself.
    (0..=24 * 60)
        .find_map(|m| tz.from_local_datetime(&(midnight + Duration::minutes(m))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
            let offset = local.offset().fix().local_minus_utc();
            (midnight - Duration::seconds(offset as i64)).and_utc()
        })
}

/// Classifies `timestamp` relative to `now`, with "today" taken in `tz`.
///
/// Rules are checked in order and the first match wins, so a timestamp
/// from earlier today is `Today` even when a later rule would also match.
pub fn classify_in<Tz: TimeZone>(timestamp: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> TimeSection {
    let diff = now - timestamp;
    if timestamp >= start_of_day(now, tz) {
        TimeSection::Today
    } else if diff <= Duration::days(7) {
        TimeSection::ThisWeek
    } else if diff <= Duration::days(14) {
        TimeSection::LastWeek
    } else if diff <= Duration::days(30) {
        TimeSection::Last30Days
    } else if diff <= Duration::days(365) {
        TimeSection::LastYear
    } else {
        TimeSection::All
    }
}

/// Classifies `timestamp` relative to `now` in the local time zone.
pub fn classify(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> TimeSection {
    classify_in(timestamp, now, &Local)
}

/// Splits tasks into the six sections, in display order.
///
/// Every section is returned, possibly empty. Tasks keep their relative
/// order inside a section; tasks lacking `field` are left out.
pub fn group_by_section_in<'a, Tz: TimeZone>(
    tasks: impl IntoIterator<Item = &'a Task>,
    field: SectionField,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<(TimeSection, Vec<&'a Task>)> {
    let mut buckets: Vec<(TimeSection, Vec<&'a Task>)> =
        TimeSection::ORDERED.iter().map(|s| (*s, Vec::new())).collect();
    for task in tasks {
        if let Some(ts) = field.read(task) {
            let section = classify_in(ts, now, tz);
            buckets[section.index()].1.push(task);
        }
    }
    buckets
}

pub fn group_by_section<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    field: SectionField,
    now: DateTime<Utc>,
) -> Vec<(TimeSection, Vec<&'a Task>)> {
    group_by_section_in(tasks, field, now, &Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn boundaries() {
        let now = noon();
        assert_eq!(classify_in(now, now, &Utc), TimeSection::Today);
        assert_eq!(classify_in(now - Duration::hours(12), now, &Utc), TimeSection::Today);
        assert_eq!(classify_in(now - Duration::hours(13), now, &Utc), TimeSection::ThisWeek);
        assert_eq!(classify_in(now - Duration::days(7), now, &Utc), TimeSection::ThisWeek);
        assert_eq!(
            classify_in(now - Duration::days(7) - Duration::milliseconds(1), now, &Utc),
            TimeSection::LastWeek
        );
        assert_eq!(classify_in(now - Duration::days(10), now, &Utc), TimeSection::LastWeek);
        assert_eq!(classify_in(now - Duration::days(20), now, &Utc), TimeSection::Last30Days);
        assert_eq!(classify_in(now - Duration::days(200), now, &Utc), TimeSection::LastYear);
        assert_eq!(classify_in(now - Duration::days(400), now, &Utc), TimeSection::All);
    }

    #[test]
    fn future_timestamps_are_today() {
        let now = noon();
        assert_eq!(classify_in(now + Duration::days(3), now, &Utc), TimeSection::Today);
    }

    #[test]
    fn today_follows_the_zone() {
        let now = noon();
        let ts = now - Duration::hours(14);
        assert_eq!(classify_in(ts, now, &Utc), TimeSection::ThisWeek);
        // At UTC+11 it is 23:00 locally, so 14h earlier is still today.
        let east = FixedOffset::east_opt(11 * 3600).unwrap();
        assert_eq!(classify_in(ts, now, &east), TimeSection::Today);
    }

    /// UTC-3 until 2025-11-02 03:00 UTC, then UTC-2; local midnight that
    /// night is skipped.
    #[derive(Clone)]
    struct MidnightGap;

    impl MidnightGap {
        fn transition() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 11, 2).unwrap().and_hms_opt(3, 0, 0).unwrap()
        }

        fn before() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::west_opt(2 * 3600).unwrap()
        }
    }

    impl TimeZone for MidnightGap {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            MidnightGap
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::transition() + Duration::seconds(Self::before().local_minus_utc() as i64);
            let gap_end = Self::transition() + Duration::seconds(Self::after().local_minus_utc() as i64);
            if *local < gap_start {
                LocalResult::Single(Self::before())
            } else if *local < gap_end {
                LocalResult::None
            } else {
                LocalResult::Single(Self::after())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::transition() { Self::before() } else { Self::after() }
        }
    }

    #[test]
    fn day_starting_in_a_gap_begins_at_the_transition() {
        let transition = MidnightGap::transition().and_utc();
        let now = transition + Duration::hours(10);
        assert_eq!(start_of_day(now, &MidnightGap), transition);
        assert_eq!(classify_in(transition, now, &MidnightGap), TimeSection::Today);
        assert_eq!(
            classify_in(transition - Duration::minutes(1), now, &MidnightGap),
            TimeSection::ThisWeek
        );
    }

    #[test]
    fn grouping_is_stable_and_skips_missing_field() {
        let now = noon();
        let mut a = Task::new("a".into(), now - Duration::days(40), Duration::hours(1));
        a.mark_completed(now - Duration::hours(1));
        let mut b = Task::new("b".into(), now - Duration::days(40), Duration::hours(1));
        b.mark_completed(now - Duration::days(3));
        let mut c = Task::new("c".into(), now - Duration::days(40), Duration::hours(1));
        c.mark_completed(now - Duration::hours(2));
        let d = Task::new("d".into(), now, Duration::hours(1));
        let tasks = vec![a, b, c, d];

        let grouped = group_by_section_in(&tasks, SectionField::CompletedAt, now, &Utc);
        assert_eq!(grouped.len(), 6);
        let today: Vec<&str> = grouped[0].1.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(today, vec!["a", "c"]);
        assert_eq!(grouped[1].0, TimeSection::ThisWeek);
        assert_eq!(grouped[1].1.len(), 1);
        let total: usize = grouped.iter().map(|(_, v)| v.len()).sum();
        assert_eq!(total, 3);
    }
}
